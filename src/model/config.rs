use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Configuration from plandoc.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectFileConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFileConfig {
    /// Path of the persisted project file, relative to plandoc.toml
    #[serde(default = "default_project_file")]
    pub file: String,
}

impl Default for ProjectFileConfig {
    fn default() -> Self {
        ProjectFileConfig {
            file: default_project_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Used when RUST_LOG is unset (e.g. "warn", "plandoc=debug")
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Write an `_Archived on: YYYY-MM-DD_` line above archived sections
    #[serde(default = "default_true")]
    pub marker: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig { marker: true }
    }
}

fn default_project_file() -> String {
    "project.json".to_string()
}

fn default_log_filter() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

/// UI settings carried in the project file.
///
/// The core never interprets these; they are kept in insertion order and
/// written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    pub values: IndexMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.project.file, "project.json");
        assert_eq!(config.log.filter, "warn");
        assert!(config.archive.marker);
    }

    #[test]
    fn test_config_overrides() {
        let config: Config = toml::from_str(
            r#"
[project]
file = "plans/q3.json"

[archive]
marker = false
"#,
        )
        .unwrap();
        assert_eq!(config.project.file, "plans/q3.json");
        assert!(!config.archive.marker);
    }

    #[test]
    fn test_settings_preserve_order() {
        let json = r#"{"zeta":1,"alpha":{"x":true}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&settings).unwrap(), json);
    }
}
