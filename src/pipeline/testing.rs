//! In-memory fetcher and store for driving the pipeline without network or
//! disk. Built for unit tests and behind the `test-util` feature.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::source::{FetchError, SourceFetcher};
use super::storage::{check_name, ArtifactStore, StorageError};

/// In-memory fetcher serving canned bodies. Unknown URLs fail.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Result<String, String>>,
    delays: HashMap<String, Duration>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(url.into(), Ok(body.into()));
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>, reason: impl Into<String>) -> Self {
        self.responses.insert(url.into(), Err(reason.into()));
        self
    }

    /// Sleeps before answering `url`, to simulate a slow source.
    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }
}

impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(reason)) => Err(FetchError::Other(reason.clone())),
            None => Err(FetchError::Other(format!("no response registered for {}", url))),
        }
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn len(&self) -> usize {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryStore {
    async fn put(&self, name: &str, content: Vec<u8>) -> Result<(), StorageError> {
        check_name(name)?;
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), content);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_name(name)?;
        Ok(self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }
}
