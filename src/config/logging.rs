use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// LoggingConfig controls how we initialize tracing/logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct LoggingConfig {
    pub level: String, // e.g. "info", "debug", "warn"
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Console,
}

fn default_service_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::default(),
            service_name: default_service_name(),
        }
    }
}
