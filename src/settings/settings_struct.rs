use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SettingsError;
use crate::generator::ClashOptions;
use crate::utils::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

fn default_target_dir() -> String {
    "./uploads/config".to_string()
}

fn default_clash_file() -> String {
    "clash.yaml".to_string()
}

fn default_v2ray_file() -> String {
    "xr".to_string()
}

fn default_workers() -> usize {
    crate::parser::pool::DEFAULT_WORKERS
}

fn default_cache_ttl_secs() -> u64 {
    crate::parser::cache::DEFAULT_CACHE_TTL.as_secs()
}

fn default_cache_sweep_threshold() -> usize {
    crate::parser::cache::DEFAULT_SWEEP_THRESHOLD
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_log_capacity() -> usize {
    100
}

fn default_history_capacity() -> usize {
    20
}

/// What `request_stop` does to a run already in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationPolicy {
    /// The stop request is logged; the current run always completes.
    #[default]
    Deferred,
    /// The run checks the stop flag between phases and fails as cancelled.
    Cooperative,
}

/// Where nodes come from and which names to drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub urls: Vec<String>,
    pub filter_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    #[serde(default = "default_target_dir")]
    pub target_dir: String,
    #[serde(default = "default_clash_file")]
    pub clash_file: String,
    #[serde(default = "default_v2ray_file")]
    pub v2ray_file: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            target_dir: default_target_dir(),
            clash_file: default_clash_file(),
            v2ray_file: default_v2ray_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_sweep_threshold")]
    pub cache_sweep_threshold: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_sweep_threshold: default_cache_sweep_threshold(),
        }
    }
}

impl ParserSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// `SYSTEM`, `NONE` or a proxy URL.
    pub proxy: String,
    /// Sources fetched at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            proxy: String::new(),
            concurrency: default_concurrency(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    pub cancellation: CancellationPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            history_capacity: default_history_capacity(),
            cancellation: CancellationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSettings {
    pub config_path: Option<String>,
}

/// Top-level configuration.
///
/// Every section is optional; missing keys take the defaults above. Load
/// with [`Settings::load`], which picks TOML or YAML by file extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sources: SourceSettings,
    pub output: OutputSettings,
    pub parser: ParserSettings,
    pub fetch: FetchSettings,
    pub pipeline: PipelineSettings,
    pub clash: ClashOptions,
    pub region: RegionSettings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parses `content` as YAML for `.yaml`/`.yml` paths and TOML otherwise.
    pub fn from_content(content: &str, path: &Path) -> Result<Self, SettingsError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::from_yaml_str(content)
            }
            _ => Self::from_toml_str(content),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_content(&content, path)
    }

    pub fn target_dir(&self) -> PathBuf {
        PathBuf::from(&self.output.target_dir)
    }

    pub fn region_config_path(&self) -> Option<PathBuf> {
        self.region
            .config_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.output.target_dir, "./uploads/config");
        assert_eq!(settings.output.clash_file, "clash.yaml");
        assert_eq!(settings.output.v2ray_file, "xr");
        assert_eq!(settings.parser.workers, 10);
        assert_eq!(settings.parser.cache_ttl(), Duration::from_secs(300));
        assert_eq!(settings.pipeline.log_capacity, 100);
        assert_eq!(settings.pipeline.history_capacity, 20);
        assert_eq!(settings.pipeline.cancellation, CancellationPolicy::Deferred);
        assert_eq!(settings.clash.port, 7890);
    }

    #[test]
    fn test_partial_toml() {
        let settings = Settings::from_toml_str(
            r#"
            [sources]
            urls = ["https://example.com/sub"]

            [pipeline]
            cancellation = "cooperative"

            [clash]
            port = 7990
            "#,
        )
        .unwrap();
        assert_eq!(settings.sources.urls, vec!["https://example.com/sub"]);
        assert!(settings.sources.filter_keywords.is_empty());
        assert_eq!(settings.pipeline.cancellation, CancellationPolicy::Cooperative);
        assert_eq!(settings.pipeline.log_capacity, 100);
        assert_eq!(settings.clash.port, 7990);
        assert_eq!(settings.clash.socks_port, 7891);
    }

    #[test]
    fn test_extension_picks_format() {
        let yaml = "sources:\n  urls:\n    - https://a.example.com\n";
        let settings = Settings::from_content(yaml, Path::new("conf.yml")).unwrap();
        assert_eq!(settings.sources.urls.len(), 1);
        assert!(Settings::from_content(yaml, Path::new("conf.toml")).is_err());
    }
}
