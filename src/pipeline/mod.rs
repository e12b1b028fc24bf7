//! Pipeline module
//!
//! Single-flight orchestration of a full update run together with its
//! collaborators: where sources come from, how they are fetched and where
//! the generated artifacts go.

mod error;
pub mod record;
pub mod source;
pub mod storage;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod updater;

pub use error::PipelineError;
pub use record::{
    LogEntry, LogLevel, PipelineState, RunCounts, RunLog, RunRecord, RunStatus, StatusReport,
};
pub use source::{
    FetchError, HttpFetcher, SettingsFile, SourceConfig, SourceFetcher, SourceProvider,
};
pub use storage::{ArtifactStore, FileStore, StorageError};
#[cfg(any(test, feature = "test-util"))]
pub use testing::{MemoryStore, StaticFetcher};
pub use updater::{render_links, ConfigUpdater};

pub use crate::settings::CancellationPolicy;
