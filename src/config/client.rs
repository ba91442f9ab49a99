use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the dispatch-management backend.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ClientConfig {
    pub base_url: String,
    /// Applies to the original dispatch, the refresh call and the retry alike.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Where the navigator is sent once the session cannot be recovered.
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            timeout_in_ms: default_timeout_in_ms(),
            refresh_path: default_refresh_path(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            login_route: default_login_route(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }

    /// Joins a backend-relative path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_timeout_in_ms() -> u64 {
    30_000
}

fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_logout_path() -> String {
    "/auth/logout".to_string()
}

fn default_login_route() -> String {
    "/login".to_string()
}
