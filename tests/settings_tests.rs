use std::fs;

use nodeforge::pipeline::{SettingsFile, SourceProvider};
use nodeforge::settings::{CancellationPolicy, RegionConfig, Settings};

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodeforge.toml");
        fs::write(
            &path,
            r#"
[sources]
urls = ["https://a.example.com/sub", "https://b.example.com/sub"]
filter_keywords = ["Expire", "Traffic"]

[output]
target_dir = "/srv/config"

[fetch]
timeout_secs = 5
proxy = "NONE"

[clash]
select_group = "Select"
geoip_direct = ["CN", "HK"]

[region]
config_path = "regions.json"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.sources.urls.len(), 2);
        assert_eq!(settings.sources.filter_keywords, vec!["Expire", "Traffic"]);
        assert_eq!(settings.target_dir().to_str(), Some("/srv/config"));
        assert_eq!(settings.output.clash_file, "clash.yaml");
        assert_eq!(settings.fetch.timeout().as_secs(), 5);
        assert_eq!(settings.fetch.concurrency, 4);
        assert_eq!(settings.clash.select_group, "Select");
        assert_eq!(settings.clash.auto_group, "Auto");
        assert_eq!(settings.clash.geoip_direct, vec!["CN", "HK"]);
        assert_eq!(
            settings.region_config_path().unwrap().to_str(),
            Some("regions.json")
        );
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodeforge.yaml");
        fs::write(
            &path,
            r#"
sources:
  urls:
    - https://a.example.com/sub
pipeline:
  cancellation: cooperative
  history_capacity: 5
parser:
  workers: 2
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.pipeline.cancellation, CancellationPolicy::Cooperative);
        assert_eq!(settings.pipeline.history_capacity, 5);
        assert_eq!(settings.pipeline.log_capacity, 100);
        assert_eq!(settings.parser.workers, 2);
        assert_eq!(settings.parser.cache_ttl_secs, 300);
    }

    #[test]
    fn test_invalid_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[sources\nurls = 1").unwrap();
        assert!(Settings::load(&path).is_err());
        assert!(Settings::load(dir.path().join("absent.toml")).is_err());

        let provider = SettingsFile::new(dir.path().join("absent.toml"));
        assert!(provider.load_sources().is_err());
    }

    #[test]
    fn test_region_config_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region_config.json");
        fs::write(
            &path,
            r#"{"region_map": {"US": "UnitedStates", "HK": "HongKong", "AU": "Australia"}}"#,
        )
        .unwrap();

        let config = RegionConfig::load_or_default(Some(path.as_path()));
        let keys: Vec<&str> = config.region_map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["US", "HK", "AU"]);
        assert!(config.server_map.is_empty());

        fs::write(&path, "not json").unwrap();
        assert!(RegionConfig::load_or_default(Some(path.as_path())).is_empty());
    }
}
