use tracing::{debug, info, warn};

use super::client::{status_error, AuthenticatedHttpClient};
use super::error::ClientError;
use crate::models::{ApiRequest, LoginRequest, TokenPair};
use crate::store::TokenStore;

impl AuthenticatedHttpClient {
    /// Signs in and stores the issued pair.
    ///
    /// Goes straight to the transport: a 401 here means bad credentials, not an
    /// expired token, so the refresh path must not kick in.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<TokenPair, ClientError> {
        let url = self.config.url_for(&self.config.login_path);
        debug!("Signing in as '{}' at '{}'", credentials.username, url);

        let response = self.http.post(&url).json(credentials).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let pair = response
            .json::<TokenPair>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        if !pair.is_complete() {
            return Err(ClientError::Decode(
                "login response is missing a token".to_string(),
            ));
        }

        self.store.set(&pair).await.map_err(ClientError::Store)?;
        info!(username = credentials.username.as_str(), "signed in");
        Ok(pair)
    }

    /// Tells the backend the session is over, then forgets the local tokens
    /// whatever the backend answered.
    pub async fn logout(&self) -> Result<(), ClientError> {
        match self.send(ApiRequest::post(self.config.logout_path.clone())).await {
            Ok(_) => debug!("Backend acknowledged logout"),
            Err(e) => warn!("Logout call failed ({}); clearing local session anyway", e),
        }
        self.store.clear().await.map_err(ClientError::Store)?;
        info!("signed out");
        Ok(())
    }

    /// Whether a token pair is currently stored.
    pub async fn is_authenticated(&self) -> Result<bool, ClientError> {
        Ok(self
            .store
            .get()
            .await
            .map_err(ClientError::Store)?
            .is_some())
    }
}
