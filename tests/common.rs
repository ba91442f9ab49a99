#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use kobetsu_client::config::{parse_config, ConfigV1};
use kobetsu_client::store::MemoryTokenStore;
use kobetsu_client::{AuthenticatedHttpClient, Navigator, TokenPair};

/// Remembers every redirect instead of performing it.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, location: &str) {
        self.redirects.lock().unwrap().push(location.to_string());
    }
}

pub struct TestClient {
    pub client: AuthenticatedHttpClient,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn build_config(base_url: &str) -> ConfigV1 {
    build_config_with_timeout(base_url, 3000)
}

pub fn build_config_with_timeout(base_url: &str, timeout_in_ms: u64) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
client:
  base_url: "{base_url}"
  timeout_in_ms: {timeout_in_ms}
store:
  type: memory
logging:
  level: "warn"
  format: "json"
"#
    );
    parse_config(&yaml).expect("Failed to parse integration test config")
}

pub fn build_client(base_url: &str, pair: Option<TokenPair>) -> TestClient {
    build_client_with_timeout(base_url, pair, 3000)
}

pub fn build_client_with_timeout(
    base_url: &str,
    pair: Option<TokenPair>,
    timeout_in_ms: u64,
) -> TestClient {
    let config = build_config_with_timeout(base_url, timeout_in_ms);
    let store = Arc::new(match pair {
        Some(pair) => MemoryTokenStore::with_pair(pair),
        None => MemoryTokenStore::new(),
    });
    let navigator = Arc::new(RecordingNavigator::default());
    let client = AuthenticatedHttpClient::new(&config.client, store.clone(), navigator.clone())
        .expect("client should build");

    TestClient {
        client,
        store,
        navigator,
    }
}

pub fn pair(access: &str, refresh: &str) -> TokenPair {
    TokenPair::new(access, refresh)
}
