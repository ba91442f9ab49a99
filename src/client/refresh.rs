use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::token::RefreshRequest;
use crate::models::TokenPair;
use crate::navigation::Navigator;
use crate::store::TokenStore;

/// Why a refresh did not produce a new pair. Cloneable so every waiter on a
/// shared refresh can receive it.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub(crate) struct RefreshFailure(String);

pub(crate) type RefreshOutcome = Result<TokenPair, RefreshFailure>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// What a refresh run needs; cloned into the `'static` refresh future.
#[derive(Clone)]
struct RefreshContext {
    http: reqwest::Client,
    refresh_url: String,
    login_route: String,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
}

/// Exchanges the stored refresh token for a new pair, at most one exchange at a time.
///
/// Every caller that observes a 401 while an exchange is running awaits that
/// same exchange. On failure the store is cleared and the navigator redirected
/// once, however many callers were waiting.
pub(crate) struct TokenRefresher {
    ctx: RefreshContext,
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl TokenRefresher {
    pub(crate) fn new(
        http: reqwest::Client,
        refresh_url: String,
        login_route: String,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        TokenRefresher {
            ctx: RefreshContext {
                http,
                refresh_url,
                login_route,
                store,
                navigator,
            },
            in_flight: Mutex::new(None),
        }
    }

    /// `rejected` is the access token the failed request carried, if any.
    pub(crate) async fn refresh(&self, rejected: Option<&str>) -> RefreshOutcome {
        let refresh = self.join_or_start(rejected);
        let outcome = refresh.clone().await;
        self.release(&refresh);
        outcome
    }

    fn join_or_start(&self, rejected: Option<&str>) -> SharedRefresh {
        let mut slot = self.in_flight.lock().expect("refresh slot mutex poisoned");
        if let Some(existing) = slot.as_ref() {
            // A finished refresh left behind by a cancelled caller must not be replayed.
            if existing.peek().is_none() {
                debug!(
                    event_name = "client.refresh.joined",
                    event_domain = "client",
                    "joining in-flight token refresh"
                );
                return existing.clone();
            }
        }

        let refresh = run_refresh(self.ctx.clone(), rejected.map(str::to_string))
            .boxed()
            .shared();
        *slot = Some(refresh.clone());
        refresh
    }

    fn release(&self, refresh: &SharedRefresh) {
        let mut slot = self.in_flight.lock().expect("refresh slot mutex poisoned");
        if slot
            .as_ref()
            .is_some_and(|current| current.ptr_eq(refresh))
        {
            *slot = None;
        }
    }
}

async fn run_refresh(ctx: RefreshContext, rejected: Option<String>) -> RefreshOutcome {
    // Runs inside the single flight: a refresh that settled before this one
    // started has already stored its pair, so a rotated token shows up here.
    match ctx.store.get().await {
        Ok(Some(current)) if rejected.as_deref() != Some(current.access_token.as_str()) => {
            debug!(
                event_name = "client.refresh.already_rotated",
                event_domain = "client",
                "access token was rotated meanwhile; reusing it"
            );
            return Ok(current);
        }
        Ok(_) => {}
        Err(e) => warn!("Could not read token store before refresh: {}", e),
    }

    match exchange(&ctx).await {
        Ok(pair) => {
            info!(
                event_name = "client.refresh.succeeded",
                event_domain = "client",
                "access token refreshed"
            );
            Ok(pair)
        }
        Err(failure) => {
            warn!(
                event_name = "client.refresh.failed",
                event_domain = "client",
                reason = %failure,
                "token refresh failed; ending session"
            );
            if let Err(e) = ctx.store.clear().await {
                error!("Failed to clear token store after refresh failure: {}", e);
            }
            ctx.navigator.redirect(&ctx.login_route);
            Err(failure)
        }
    }
}

async fn exchange(ctx: &RefreshContext) -> RefreshOutcome {
    let refresh_token = ctx
        .store
        .refresh_token()
        .await
        .map_err(|e| RefreshFailure(format!("Failed to read refresh token: {}", e)))?
        .ok_or_else(|| RefreshFailure("No refresh token stored".to_string()))?;

    debug!("Exchanging refresh token at '{}'", ctx.refresh_url);
    let response = ctx
        .http
        .post(&ctx.refresh_url)
        .json(&RefreshRequest {
            refresh_token: &refresh_token,
        })
        .send()
        .await
        .map_err(|e| RefreshFailure(format!("Failed to call refresh endpoint: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RefreshFailure(format!(
            "Refresh endpoint answered {}",
            status
        )));
    }

    let pair = response
        .json::<TokenPair>()
        .await
        .map_err(|e| RefreshFailure(format!("Failed to parse refresh response: {}", e)))?;
    if !pair.is_complete() {
        return Err(RefreshFailure(
            "Refresh response is missing a token".to_string(),
        ));
    }

    ctx.store
        .set(&pair)
        .await
        .map_err(|e| RefreshFailure(format!("Failed to store refreshed tokens: {}", e)))?;
    Ok(pair)
}
