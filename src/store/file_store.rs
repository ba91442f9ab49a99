use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::TokenStore;
use crate::models::TokenPair;

/// The config struct for the file-backed store.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct FileStoreConfig {
    pub path: PathBuf,
}

/// A `TokenStore` that persists the pair as a small JSON document so that the
/// session survives restarts of the embedding process.
///
/// Writes go to a sibling temp file which is then renamed over the target, so a
/// reader never sees a half-written pair.
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes writers; readers only ever see a fully renamed file.
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Creates the store, making sure the parent directory exists.
    pub async fn new(config: &FileStoreConfig) -> Result<Self, String> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    format!(
                        "Failed to create token directory '{}': {}",
                        parent.display(),
                        e
                    )
                })?;
            }
        }
        Ok(FileTokenStore {
            path: config.path.clone(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<Option<TokenPair>, String> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(format!(
                    "Failed to read token file '{}': {}",
                    self.path.display(),
                    e
                ))
            }
        };

        match serde_json::from_slice::<TokenPair>(&raw) {
            Ok(pair) if pair.is_complete() => Ok(Some(pair)),
            Ok(_) => {
                warn!(
                    "Token file '{}' holds an incomplete pair; treating as logged out.",
                    self.path.display()
                );
                Ok(None)
            }
            Err(e) => {
                warn!(
                    "Token file '{}' is not valid JSON ({}); treating as logged out.",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn set(&self, pair: &TokenPair) -> Result<(), String> {
        if !pair.is_complete() {
            return Err("Refusing to store an incomplete token pair".into());
        }
        let serialized = serde_json::to_vec(pair)
            .map_err(|e| format!("Failed to serialize token pair: {}", e))?;

        let _guard = self.write_lock.lock().await;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &serialized)
            .await
            .map_err(|e| format!("Failed to write token file '{}': {}", temp.display(), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| format!("Failed to restrict token file permissions: {}", e))?;
        }

        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| format!("Failed to replace token file '{}': {}", self.path.display(), e))?;
        debug!("Token pair written to '{}'", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Token file '{}' removed", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!(
                "Failed to remove token file '{}': {}",
                self.path.display(),
                e
            )),
        }
    }

    fn get_name(&self) -> &str {
        "file"
    }
}
