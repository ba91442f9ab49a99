use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::error::ClientError;
use super::refresh::TokenRefresher;
use crate::config::ClientConfig;
use crate::models::{ApiRequest, PendingRequest, ResponseBody, ResponseKind};
use crate::navigation::Navigator;
use crate::store::TokenStore;
use crate::utils::log_throttle::LogThrottle;

const UNAUTHENTICATED_LOG_WINDOW: Duration = Duration::from_secs(30);

/// What to do with a request after its response has been classified.
enum Handled {
    Done(ResponseBody),
    /// Dispatch again with this access token.
    Retry(String),
}

/// HTTP client for the dispatch-management backend.
///
/// Every request carries the stored access token. A 401 triggers one refresh
/// of the token pair and one retry of the request; if the refresh fails the
/// session is cleared and the navigator is sent to the login route.
pub struct AuthenticatedHttpClient {
    pub(super) config: ClientConfig,
    pub(super) http: reqwest::Client,
    pub(super) store: Arc<dyn TokenStore>,
    refresher: TokenRefresher,
    throttle: LogThrottle,
}

impl AuthenticatedHttpClient {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Creating client for '{}' with {} store",
            config.base_url,
            store.get_name()
        );

        let refresher = TokenRefresher::new(
            http.clone(),
            config.url_for(&config.refresh_path),
            config.login_route.clone(),
            store.clone(),
            navigator,
        );

        Ok(AuthenticatedHttpClient {
            config: config.clone(),
            http,
            store,
            refresher,
            throttle: LogThrottle::new(UNAUTHENTICATED_LOG_WINDOW),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Issues `request` and returns the decoded 2xx body.
    pub async fn send(&self, request: ApiRequest) -> Result<ResponseBody, ClientError> {
        let span = info_span!(
            "send",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path
        );
        self.dispatch(PendingRequest::new(request))
            .instrument(span)
            .await
    }

    /// Like `send`, decoding the JSON body into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        match self.send(request).await? {
            ResponseBody::Json(value) => serde_json::from_value(value)
                .map_err(|e| ClientError::Decode(e.to_string())),
            ResponseBody::Blob(_) => Err(ClientError::Decode(
                "expected a JSON response, got a blob".to_string(),
            )),
        }
    }

    async fn dispatch(&self, mut pending: PendingRequest) -> Result<ResponseBody, ClientError> {
        let mut token = self
            .store
            .access_token()
            .await
            .map_err(ClientError::Store)?;

        loop {
            let outcome = self
                .decorate_request(&pending.request, token.as_deref())
                .send()
                .await;
            match self
                .handle_response_or_error(&mut pending, token.as_deref(), outcome)
                .await?
            {
                Handled::Done(body) => return Ok(body),
                Handled::Retry(fresh) => token = Some(fresh),
            }
        }
    }

    /// Builds the transport request, attaching `Authorization: Bearer` when a token is present.
    fn decorate_request(&self, request: &ApiRequest, token: Option<&str>) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(request.method.clone(), self.config.url_for(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        match token {
            Some(token) => builder.bearer_auth(token),
            None => {
                if let Some(suppressed_count) =
                    self.throttle.should_emit("client.dispatch.unauthenticated")
                {
                    debug!(
                        event_name = "client.dispatch.unauthenticated",
                        event_domain = "client",
                        suppressed_count,
                        "no access token stored; dispatching without Authorization"
                    );
                }
                builder
            }
        }
    }

    async fn handle_response_or_error(
        &self,
        pending: &mut PendingRequest,
        sent_token: Option<&str>,
        outcome: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<Handled, ClientError> {
        let response = outcome.map_err(|e| {
            warn!("Request failed before a response arrived: {}", e);
            ClientError::Transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "request succeeded");
            return decode_body(response, pending.request.response_kind)
                .await
                .map(Handled::Done);
        }

        if status != StatusCode::UNAUTHORIZED {
            debug!(status = status.as_u16(), "request failed");
            return Err(status_error(response).await);
        }

        if !pending.mark_retried() {
            warn!("Retried request was rejected again; giving up");
            return Err(status_error(response).await);
        }

        info!(
            event_name = "client.refresh.requested",
            event_domain = "client",
            "access token rejected; refreshing"
        );
        match self.refresher.refresh(sent_token).await {
            Ok(pair) => Ok(Handled::Retry(pair.access_token)),
            Err(failure) => {
                debug!("Refresh failed: {}", failure);
                Err(ClientError::SessionExpired)
            }
        }
    }
}

pub(super) async fn decode_body(
    response: reqwest::Response,
    kind: ResponseKind,
) -> Result<ResponseBody, ClientError> {
    let bytes = response.bytes().await?;
    match kind {
        ResponseKind::Blob => Ok(ResponseBody::Blob(bytes.to_vec())),
        ResponseKind::Json if bytes.is_empty() => Ok(ResponseBody::Json(Value::Null)),
        ResponseKind::Json => serde_json::from_slice(&bytes)
            .map(ResponseBody::Json)
            .map_err(|e| ClientError::Decode(e.to_string())),
    }
}

pub(super) async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::Status { status, body }
}
