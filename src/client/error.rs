use http::StatusCode;
use thiserror::Error;

/// Everything `AuthenticatedHttpClient` can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure or timeout; never retried here.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A non-2xx answer, including a 401 on an already retried request.
    #[error("backend answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The token could not be refreshed. The store has been cleared and the
    /// navigator sent to the login route.
    #[error("session expired; sign in again")]
    SessionExpired,

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("invalid client configuration: {0}")]
    Configuration(String),

    #[error("token store failure: {0}")]
    Store(String),
}

impl ClientError {
    /// The HTTP status behind the error: the backend's answer for `Status`,
    /// or whatever status reqwest attached to a `Transport` error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
