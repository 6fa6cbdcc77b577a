use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::model::config::Config;

/// Name of the config file marking a plandoc directory
pub const CONFIG_FILE: &str = "plandoc.toml";

/// Error type for config discovery and I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a plandoc directory: no {CONFIG_FILE} found (run `pd init`)")]
    NotFound,
    #[error("{CONFIG_FILE} already exists in {0}")]
    AlreadyExists(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {CONFIG_FILE}: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not serialize {CONFIG_FILE}: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Walk up from `start` to the first directory holding `plandoc.toml`.
pub fn discover_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Read `plandoc.toml` from `root`. Missing keys take their defaults.
pub fn read_config(root: &Path) -> Result<Config, ConfigError> {
    let path = root.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Write `config` as `plandoc.toml` in `root`, refusing to overwrite.
pub fn write_new_config(root: &Path, config: &Config) -> Result<PathBuf, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        return Err(ConfigError::AlreadyExists(root.to_path_buf()));
    }
    let text = toml::to_string_pretty(config)?;
    atomic_write(&path, text.as_bytes())?;
    Ok(path)
}

/// Where the project file named in `config` lives
pub fn project_file_path(root: &Path, config: &Config) -> PathBuf {
    root.join(&config.project.file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_walks_up() {
        let tmp = TempDir::new().unwrap();
        write_new_config(tmp.path(), &Config::default()).unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(discover_root(&nested).unwrap(), tmp.path());
    }

    #[test]
    fn test_discover_fails_outside_project() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(discover_root(tmp.path()), Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_read_partial_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[archive]\nmarker = false\n").unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert!(!config.archive.marker);
        assert_eq!(config.project.file, "project.json");
        assert_eq!(project_file_path(tmp.path(), &config), tmp.path().join("project.json"));
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        write_new_config(tmp.path(), &Config::default()).unwrap();
        assert!(matches!(
            write_new_config(tmp.path(), &Config::default()),
            Err(ConfigError::AlreadyExists(_))
        ));
    }
}
