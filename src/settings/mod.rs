//! Settings module
//!
//! Runtime configuration (TOML or YAML) and the region keyword tables.

pub mod region;
pub mod settings_struct;

use thiserror::Error;

pub use region::RegionConfig;
pub use settings_struct::{
    CancellationPolicy, FetchSettings, OutputSettings, ParserSettings, PipelineSettings,
    RegionSettings, Settings, SourceSettings,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
