use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileTokenStore, memory_store::MemoryTokenStore};
use crate::config::StoreConfig;
use crate::models::TokenPair;

/// The TokenStore trait abstracts where the session credentials live.
///
/// A store holds at most one `TokenPair`, and it is either complete or absent.
/// `set` replaces both tokens together; `clear` removes both.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Result<Option<TokenPair>, String>;
    async fn set(&self, pair: &TokenPair) -> Result<(), String>;
    async fn clear(&self) -> Result<(), String>;

    async fn access_token(&self) -> Result<Option<String>, String> {
        Ok(self.get().await?.map(|pair| pair.access_token))
    }

    async fn refresh_token(&self) -> Result<Option<String>, String> {
        Ok(self.get().await?.map(|pair| pair.refresh_token))
    }

    fn get_name(&self) -> &str;
}

/// Creates a concrete store implementation based on the StoreConfig.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn TokenStore>, String> {
    match config {
        StoreConfig::Memory => {
            info!("Using in-memory token store; the session ends with the process.");
            Ok(Arc::new(MemoryTokenStore::new()))
        }
        StoreConfig::File(file_config) => {
            let store = FileTokenStore::new(file_config).await?;
            info!(
                "Using file token store at '{}'.",
                file_config.path.display()
            );
            Ok(Arc::new(store))
        }
    }
}
