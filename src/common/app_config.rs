//! Runner settings read from `link_budget.toml` next to a link configuration.

use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up in the configuration's directory.
pub const APP_CONFIG_FILE: &str = "link_budget.toml";

/// Optional settings for the script runner.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AppConfig {
    /// Element reference to use instead of the built-in one. Relative paths
    /// are resolved against the settings file's directory.
    pub catalog: Option<PathBuf>,
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Read runner settings from `path`. A relative `catalog` entry is made
    /// relative to the directory holding `path`; read and parse failures come
    /// back as a message naming which of the two went wrong.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| format!("Failed to read settings file: {}", e))?;

        let mut config: AppConfig = toml::from_str(&content).map_err(|e| format!("Failed to parse settings file: {}", e))?;
        if let Some(catalog) = config.catalog.take() {
            let base = path.parent().unwrap_or(Path::new("."));
            config.catalog = Some(base.join(catalog));
        }
        Ok(config)
    }

    /// Where the runner looks for settings: [`APP_CONFIG_FILE`] next to
    /// `config_path`, or in the working directory for a bare file name.
    pub fn path_for(config_path: &Path) -> PathBuf {
        config_path.parent().unwrap_or(Path::new(".")).join(APP_CONFIG_FILE)
    }

    /// Settings for `config_path`, or defaults when no settings file exists.
    pub fn for_configuration(config_path: &Path) -> Result<Self, String> {
        let path = Self::path_for(config_path);
        if path.is_file() { Self::load(&path) } else { Ok(Self::default()) }
    }

    /// The configured log level, if it names a valid one.
    pub fn level_filter(&self) -> Option<LevelFilter> {
        self.log_level.as_deref().and_then(|level| level.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_sit_next_to_the_configuration() {
        let path = AppConfig::path_for(Path::new("cases/leo/downlink.yaml"));
        assert_eq!(path, Path::new("cases/leo").join(APP_CONFIG_FILE));
        assert_eq!(AppConfig::path_for(Path::new("downlink.json")), Path::new("").join(APP_CONFIG_FILE));
    }

    #[test]
    fn kebab_case_keys() {
        let config: AppConfig = toml::from_str("catalog = \"reference.toml\"\nlog-level = \"debug\"\n").unwrap();
        assert_eq!(config.catalog.as_deref(), Some(Path::new("reference.toml")));
        assert_eq!(config.level_filter(), Some(LevelFilter::Debug));
    }

    #[test]
    fn unknown_level_is_ignored() {
        let config = AppConfig {
            catalog: None,
            log_level: Some("loud".to_string()),
        };
        assert_eq!(config.level_filter(), None);
    }

    #[test]
    fn catalog_is_resolved_against_settings_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_CONFIG_FILE);
        std::fs::write(&path, "catalog = \"custom.toml\"\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.catalog, Some(dir.path().join("custom.toml")));
        assert_eq!(config.log_level, None);

        let missing = AppConfig::for_configuration(&dir.path().join("nowhere").join("case.json")).unwrap();
        assert_eq!(missing, AppConfig::default());
    }

    #[test]
    fn unknown_keys_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_CONFIG_FILE);
        std::fs::write(&path, "api-key = \"x\"\n").unwrap();
        assert!(AppConfig::load(&path).unwrap_err().contains("Failed to parse"));
    }
}
