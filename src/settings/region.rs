use std::fs;
use std::path::{Path, PathBuf};

use linked_hash_map::LinkedHashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::SettingsError;

/// File name probed when no region config path is configured.
pub const DEFAULT_REGION_FILE: &str = "region_config.json";

/// Keyword tables for the region matcher.
///
/// ```json
/// {"region_map": {"HK": "HongKong"}, "server_map": {".hk.": "HongKong"}}
/// ```
///
/// Key order in the file is kept: it decides ties between name keywords of
/// equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub region_map: LinkedHashMap<String, String>,
    pub server_map: LinkedHashMap<String, String>,
}

impl RegionConfig {
    pub fn from_json_str(content: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Loads the first readable candidate, or empty tables with a warning.
    ///
    /// An explicit `path` is the only candidate when given. Otherwise the
    /// working directory and the executable's directory are probed.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let candidates: Vec<PathBuf> = match path {
            Some(p) => vec![p.to_path_buf()],
            None => default_candidates(),
        };

        let mut last_error = None;
        for candidate in &candidates {
            match Self::load(candidate) {
                Ok(config) if !config.is_empty() => {
                    info!(
                        "Loaded region config from {} ({} name keywords, {} server keywords)",
                        candidate.display(),
                        config.region_map.len(),
                        config.server_map.len()
                    );
                    return config;
                }
                Ok(_) => last_error = Some(format!("{} is empty", candidate.display())),
                Err(e) => last_error = Some(format!("{}: {}", candidate.display(), e)),
            }
        }

        warn!(
            "No usable region config, every node will be tagged unknown ({})",
            last_error.unwrap_or_else(|| "no candidates".to_string())
        );
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.region_map.is_empty() && self.server_map.is_empty()
    }
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(DEFAULT_REGION_FILE)];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(DEFAULT_REGION_FILE));
    }
    candidates
}
