use thiserror::Error;

use crate::generator::SynthesisError;
use crate::settings::SettingsError;

use super::storage::StorageError;

/// Errors that end a pipeline run or an on-demand render.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("a pipeline run is already in progress")]
    AlreadyRunning,

    #[error("no subscription sources configured")]
    NoSourcesConfigured,

    #[error("no valid nodes after parsing and filtering")]
    NoValidNodes,

    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("run cancelled by stop request")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(#[from] SettingsError),

    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("failed to store {name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: StorageError,
    },

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("internal error: {0}")]
    Internal(String),
}
