//! `migr8.toml` project configuration.
//!
//! Every key is optional. Command-line flags override file values, and
//! file values override the built-in defaults.

use std::path::{Path, PathBuf};

use migr8_core::ScanOptions;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "migr8.toml";
pub const DEFAULT_RULES_DIR: &str = "migr8-rules";
pub const DEFAULT_BACKUP_DIR: &str = ".migr8/backups";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory names never entered while scanning.
    pub exclude: Option<Vec<String>>,
    /// Globs a source file must match.
    pub include: Option<Vec<String>>,
    /// Globs that drop an otherwise included file.
    pub ignore: Option<Vec<String>>,
    pub rules_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub annotate_placeholders: Option<bool>,
    /// Concurrent file writes.
    pub jobs: Option<usize>,
}

impl Config {
    /// Read `explicit`, or `<root>/migr8.toml` when it exists. A missing
    /// default file is not an error; a missing explicit one is.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Config, String> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = root.join(CONFIG_FILE);
                if !p.is_file() {
                    return Ok(Config::default());
                }
                p
            }
        };
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("could not parse '{}': {}", path.display(), e))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Scan options with `exclude` from the command line taking precedence.
    pub fn scan_options(&self, exclude: &[String]) -> ScanOptions {
        let mut opts = ScanOptions::default();
        if !exclude.is_empty() {
            opts.exclude = exclude.to_vec();
        } else if let Some(e) = &self.exclude {
            opts.exclude = e.clone();
        }
        if let Some(i) = &self.include {
            opts.include = i.clone();
        }
        if let Some(i) = &self.ignore {
            opts.ignore = i.clone();
        }
        opts
    }

    /// Relative paths resolve against the project root.
    pub fn rules_dir(&self, root: &Path, flag: Option<&Path>) -> PathBuf {
        let dir = flag
            .map(Path::to_path_buf)
            .or_else(|| self.rules_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_DIR));
        root.join(dir)
    }

    pub fn backup_dir(&self, root: &Path) -> PathBuf {
        root.join(
            self.backup_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let config: Config = toml::from_str(
            r#"
exclude = ["vendor"]
rules_dir = "rules"
jobs = 2
"#,
        )
        .unwrap();
        assert_eq!(config.scan_options(&[]).exclude, vec!["vendor".to_string()]);
        assert_eq!(
            config.scan_options(&["out".to_string()]).exclude,
            vec!["out".to_string()]
        );
        let root = Path::new("/p");
        assert_eq!(config.rules_dir(root, None), PathBuf::from("/p/rules"));
        assert_eq!(
            config.rules_dir(root, Some(Path::new("/abs"))),
            PathBuf::from("/abs")
        );
        assert_eq!(config.backup_dir(root), PathBuf::from("/p/.migr8/backups"));
        assert_eq!(config.jobs, Some(2));
    }

    #[test]
    fn defaults_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scan_options(&[]), ScanOptions::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "rulesdir = \"x\"\n").unwrap();
        let err = Config::load(dir.path(), None).unwrap_err();
        assert!(err.contains("could not parse"));
    }
}
