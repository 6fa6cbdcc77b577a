use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::io::recovery::{RecoveryEntry, atomic_write, log_recovery};
use crate::model::config::Settings;
use crate::model::document::{Document, Documents};
use crate::model::user::User;
use crate::ops::session::Session;

/// Error type for project file I/O
#[derive(Debug, thiserror::Error)]
pub enum ProjectFileError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("not valid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("invalid project file: {0}")]
    Invalid(String),
}

/// The persisted project: `{ users, markdown, archiveMarkdown?, settings? }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub users: Vec<User>,
    pub markdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl ProjectFile {
    /// Open a session over this file's content
    pub fn into_session(self) -> Session {
        let docs = Documents {
            live: Document::from(self.markdown),
            archive: Document::from(self.archive_markdown.unwrap_or_default()),
        };
        Session::new(self.users, docs, self.settings.unwrap_or_default())
    }

    /// Snapshot a session for saving
    pub fn from_session(session: &Session) -> Self {
        let docs = session.documents();
        let settings = session.settings();
        ProjectFile {
            users: session.users().to_vec(),
            markdown: docs.live.to_string(),
            archive_markdown: (!docs.archive.is_empty()).then(|| docs.archive.to_string()),
            settings: (!settings.values.is_empty()).then(|| settings.clone()),
        }
    }
}

/// Parse and validate project file JSON.
///
/// `users` must be a list and `markdown` text; the optional fields must have
/// the right shape when present. Nothing is guessed: anything else is an
/// error.
pub fn parse_project_file(text: &str) -> Result<ProjectFile, ProjectFileError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(ref map) = value else {
        return Err(ProjectFileError::Invalid("expected a JSON object".into()));
    };
    if !map.get("users").is_some_and(Value::is_array) {
        return Err(ProjectFileError::Invalid("\"users\" must be a list".into()));
    }
    if !map.get("markdown").is_some_and(Value::is_string) {
        return Err(ProjectFileError::Invalid("\"markdown\" must be text".into()));
    }
    if map
        .get("archiveMarkdown")
        .is_some_and(|v| !v.is_string() && !v.is_null())
    {
        return Err(ProjectFileError::Invalid("\"archiveMarkdown\" must be text".into()));
    }
    if map
        .get("settings")
        .is_some_and(|v| !v.is_object() && !v.is_null())
    {
        return Err(ProjectFileError::Invalid("\"settings\" must be an object".into()));
    }
    Ok(serde_json::from_value(value)?)
}

/// Read and validate a project file
pub fn load_project_file(path: &Path) -> Result<ProjectFile, ProjectFileError> {
    let text = fs::read_to_string(path).map_err(|e| ProjectFileError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file = parse_project_file(&text)?;
    tracing::info!(path = %path.display(), users = file.users.len(), "loaded project file");
    Ok(file)
}

/// Write a project file atomically. If the write fails, the markdown is
/// appended to the recovery log next to the file before the error is
/// returned.
pub fn save_project_file(path: &Path, file: &ProjectFile) -> Result<(), ProjectFileError> {
    let json = serde_json::to_string_pretty(file)?;
    if let Err(e) = atomic_write(path, format!("{}\n", json).as_bytes()) {
        tracing::warn!(path = %path.display(), error = %e, "save failed, writing recovery entry");
        let dir = path.parent().unwrap_or(Path::new("."));
        log_recovery(
            dir,
            RecoveryEntry {
                timestamp: chrono::Utc::now(),
                description: "project file write failed".to_string(),
                fields: vec![
                    ("File".to_string(), path.display().to_string()),
                    ("Error".to_string(), e.to_string()),
                ],
                body: file.markdown.clone(),
            },
        );
        return Err(ProjectFileError::WriteError {
            path: path.to_path_buf(),
            source: e,
        });
    }
    tracing::info!(path = %path.display(), "saved project file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FILE: &str = r##"{
  "users": [{"alias": "ann", "name": "Ann", "emails": ["ann@example.com"]}],
  "markdown": "# P\n- [ ] a (@ann)\n",
  "settings": {"theme": "dark", "zoom": 1.5}
}"##;

    #[test]
    fn test_parse_valid_file() {
        let file = parse_project_file(FILE).unwrap();
        assert_eq!(file.users[0].alias, "ann");
        assert_eq!(file.markdown, "# P\n- [ ] a (@ann)\n");
        assert_eq!(file.archive_markdown, None);
        let settings = file.settings.unwrap();
        let keys: Vec<&String> = settings.values.keys().collect();
        assert_eq!(keys, vec!["theme", "zoom"]);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for bad in [
            "[]",
            "not json",
            r#"{"markdown": "x"}"#,
            r#"{"users": {}, "markdown": "x"}"#,
            r#"{"users": [], "markdown": 3}"#,
            r#"{"users": [], "markdown": "x", "archiveMarkdown": []}"#,
            r#"{"users": [], "markdown": "x", "settings": "dark"}"#,
        ] {
            assert!(parse_project_file(bad).is_err(), "accepted: {}", bad);
        }
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");
        let file = parse_project_file(FILE).unwrap();
        save_project_file(&path, &file).unwrap();
        assert_eq!(load_project_file(&path).unwrap(), file);
    }

    #[test]
    fn test_session_round_trip_keeps_settings() {
        let file = parse_project_file(FILE).unwrap();
        let session = file.clone().into_session();
        assert_eq!(ProjectFile::from_session(&session), file);
    }

    #[test]
    fn test_failed_save_writes_recovery_log() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.json");
        // a directory in the way makes the final rename fail
        std::fs::create_dir(&path).unwrap();
        let file = ProjectFile {
            markdown: "# Unsaved\n".into(),
            ..ProjectFile::default()
        };
        assert!(matches!(
            save_project_file(&path, &file),
            Err(ProjectFileError::WriteError { .. })
        ));
        let log = std::fs::read_to_string(crate::io::recovery::recovery_log_path(tmp.path())).unwrap();
        assert!(log.contains("# Unsaved"));
    }
}
