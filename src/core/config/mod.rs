pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

use thiserror::Error;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{
    CrawlerSettings, LlmSettings, LoggingSettings, RagSettings, SearchEndpoints, SearchSettings,
    ServerSettings, Settings,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config at '{path}': {reason}")]
    Invalid { path: String, reason: String },

    #[error("Failed to deserialize settings: {0}")]
    Deserialize(#[from] serde_json::Error),
}
