use std::future::Future;
use std::path::PathBuf;

use reqwest::Client;

use crate::settings::{FetchSettings, Settings};
use crate::utils::http::{build_client, parse_proxy, web_get_async};

pub use crate::utils::http::FetchError;

use super::PipelineError;

/// Source URLs and name filters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfig {
    pub urls: Vec<String>,
    pub filter_keywords: Vec<String>,
}

impl SourceConfig {
    pub fn new(urls: Vec<String>, filter_keywords: Vec<String>) -> Self {
        Self {
            urls,
            filter_keywords,
        }
    }

    /// Drops blank URLs and keywords.
    pub fn normalized(mut self) -> Self {
        self.urls = self
            .urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        self.filter_keywords.retain(|k| !k.trim().is_empty());
        self
    }
}

/// Supplies the source configuration. Consulted at the start of every run
/// so edits take effect without rebuilding the orchestrator.
pub trait SourceProvider {
    fn load_sources(&self) -> Result<SourceConfig, PipelineError>;
}

impl SourceProvider for SourceConfig {
    fn load_sources(&self) -> Result<SourceConfig, PipelineError> {
        Ok(self.clone())
    }
}

/// Re-reads the `[sources]` section of a settings file on every call.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceProvider for SettingsFile {
    fn load_sources(&self) -> Result<SourceConfig, PipelineError> {
        let settings = Settings::load(&self.path)?;
        Ok(SourceConfig::new(
            settings.sources.urls,
            settings.sources.filter_keywords,
        ))
    }
}

/// Retrieves the raw body of one subscription source.
pub trait SourceFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetches sources over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = build_client(
            settings.timeout(),
            &settings.user_agent,
            &parse_proxy(&settings.proxy),
        )?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        web_get_async(&self.client, url).await
    }
}
