use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io;
use crate::io::project_io::{self, ProjectFile};
use crate::model::config::Config;

/// Markdown for a fresh project file
fn initial_markdown(title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => format!("# {}\n", title),
        None => String::new(),
    }
}

/// Write `plandoc.toml` in `dir`, plus the project file unless one is
/// already there.
pub fn cmd_init(args: InitArgs, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if args.file.trim().is_empty() {
        return Err("project file name cannot be empty".into());
    }
    let mut config = Config::default();
    config.project.file = args.file;

    let project_path = config_io::project_file_path(dir, &config);
    let existing = project_path.exists();
    if existing {
        // validate, but never overwrite someone's plan
        project_io::load_project_file(&project_path)?;
    }

    let config_path = config_io::write_new_config(dir, &config)?;
    println!("wrote {}", config_path.display());

    if existing {
        println!("using existing {}", project_path.display());
    } else {
        if let Some(parent) = project_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = ProjectFile {
            markdown: initial_markdown(args.title.as_deref()),
            ..ProjectFile::default()
        };
        project_io::save_project_file(&project_path, &file)?;
        println!("wrote {}", project_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(file: &str, title: Option<&str>) -> InitArgs {
        InitArgs {
            file: file.to_string(),
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn test_initial_markdown() {
        assert_eq!(initial_markdown(Some(" Q3 Plan ")), "# Q3 Plan\n");
        assert_eq!(initial_markdown(Some("  ")), "");
        assert_eq!(initial_markdown(None), "");
    }

    #[test]
    fn test_init_creates_config_and_project() {
        let tmp = TempDir::new().unwrap();
        cmd_init(args("plans/q3.json", Some("Q3")), tmp.path()).unwrap();
        let config = config_io::read_config(tmp.path()).unwrap();
        assert_eq!(config.project.file, "plans/q3.json");
        let file = project_io::load_project_file(&tmp.path().join("plans/q3.json")).unwrap();
        assert_eq!(file.markdown, "# Q3\n");
        assert!(file.users.is_empty());
    }

    #[test]
    fn test_init_twice_fails() {
        let tmp = TempDir::new().unwrap();
        cmd_init(args("project.json", None), tmp.path()).unwrap();
        assert!(cmd_init(args("project.json", None), tmp.path()).is_err());
    }

    #[test]
    fn test_init_keeps_existing_project_file() {
        let tmp = TempDir::new().unwrap();
        let existing = r##"{"users": [], "markdown": "# Kept\n"}"##;
        std::fs::write(tmp.path().join("project.json"), existing).unwrap();
        cmd_init(args("project.json", Some("New")), tmp.path()).unwrap();
        let file = project_io::load_project_file(&tmp.path().join("project.json")).unwrap();
        assert_eq!(file.markdown, "# Kept\n");
    }
}
