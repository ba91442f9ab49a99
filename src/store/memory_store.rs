use async_trait::async_trait;
use tokio::sync::RwLock;

use super::TokenStore;
use crate::models::TokenPair;

/// Keeps the token pair in process memory.
#[derive(Default)]
pub struct MemoryTokenStore {
    pair: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out already logged in.
    pub fn with_pair(pair: TokenPair) -> Self {
        MemoryTokenStore {
            pair: RwLock::new(Some(pair)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<Option<TokenPair>, String> {
        Ok(self.pair.read().await.clone())
    }

    async fn set(&self, pair: &TokenPair) -> Result<(), String> {
        if !pair.is_complete() {
            return Err("Refusing to store an incomplete token pair".into());
        }
        *self.pair.write().await = Some(pair.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), String> {
        *self.pair.write().await = None;
        Ok(())
    }

    fn get_name(&self) -> &str {
        "memory"
    }
}
