use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::file_store::FileStoreConfig;

/// The token store backends. We differentiate them via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// Tokens live only as long as the process.
    #[default]
    #[serde(rename = "memory")]
    Memory,
    /// Tokens are persisted to a JSON file and survive restarts.
    #[serde(rename = "file")]
    File(FileStoreConfig),
}
