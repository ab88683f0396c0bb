//! Settings file and its merge with command-line flags.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Args;

/// Settings file looked up when `--config` is not given
pub const DEFAULT_SETTINGS_FILE: &str = "capcrawl.yaml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("no {0} configured, set it in capcrawl.yaml or pass --{0}")]
    Missing(&'static str),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Contents of the settings file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub proxy: Option<String>,
    pub concurrency: Option<usize>,
}

/// Proxy and concurrency after merging file and flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub proxy: String,
    pub concurrency: usize,
}

impl Settings {
    /// Read the settings file.
    ///
    /// `explicit` marks a path passed with `--config`: it must exist. The
    /// default file is optional.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, SettingsError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line overrides and check both values are present.
    pub fn resolve(self, args: &Args) -> Result<Resolved, SettingsError> {
        let proxy = args
            .proxy
            .clone()
            .or(self.proxy)
            .filter(|p| !p.trim().is_empty())
            .ok_or(SettingsError::Missing("proxy"))?;

        let concurrency = args
            .concurrency
            .map(usize::from)
            .or(self.concurrency)
            .ok_or(SettingsError::Missing("concurrency"))?;

        if concurrency == 0 {
            return Err(SettingsError::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }

        Ok(Resolved { proxy, concurrency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["capcrawl"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_load_yaml() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("capcrawl.yaml");
        fs::write(&path, "proxy: socks5://127.0.0.1:1080\nconcurrency: 20\n").unwrap();

        let settings = Settings::load(&path, true).unwrap();
        assert_eq!(settings.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(settings.concurrency, Some(20));
    }

    #[test]
    fn test_load_partial_and_empty() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("capcrawl.yaml");

        fs::write(&path, "concurrency: 5\n").unwrap();
        assert_eq!(
            Settings::load(&path, true).unwrap(),
            Settings {
                proxy: None,
                concurrency: Some(5)
            }
        );

        fs::write(&path, "\n").unwrap();
        assert_eq!(Settings::load(&path, true).unwrap(), Settings::default());
    }

    #[test]
    fn test_load_missing_default_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("capcrawl.yaml");
        assert_eq!(Settings::load(&path, false).unwrap(), Settings::default());
        assert!(matches!(
            Settings::load(&path, true),
            Err(SettingsError::Io { .. })
        ));
    }

    #[test]
    fn test_load_rejects_unknown_key() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("capcrawl.yaml");
        fs::write(&path, "proxi: http://x\n").unwrap();
        assert!(matches!(
            Settings::load(&path, true),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_resolve_flags_override_file() {
        let settings = Settings {
            proxy: Some("http://file:1".to_string()),
            concurrency: Some(4),
        };
        let resolved = settings
            .resolve(&args(&["--proxy", "http://flag:2", "-c", "9"]))
            .unwrap();
        assert_eq!(
            resolved,
            Resolved {
                proxy: "http://flag:2".to_string(),
                concurrency: 9
            }
        );
    }

    #[test]
    fn test_resolve_from_file_only() {
        let settings = Settings {
            proxy: Some("http://file:1".to_string()),
            concurrency: Some(4),
        };
        let resolved = settings.resolve(&args(&[])).unwrap();
        assert_eq!(resolved.proxy, "http://file:1");
        assert_eq!(resolved.concurrency, 4);
    }

    #[test]
    fn test_resolve_requires_both_values() {
        let missing_proxy = Settings {
            proxy: None,
            concurrency: Some(4),
        };
        assert!(matches!(
            missing_proxy.resolve(&args(&[])),
            Err(SettingsError::Missing("proxy"))
        ));

        let missing_concurrency = Settings {
            proxy: Some("http://p:1".to_string()),
            concurrency: None,
        };
        assert!(matches!(
            missing_concurrency.resolve(&args(&[])),
            Err(SettingsError::Missing("concurrency"))
        ));
    }

    #[test]
    fn test_resolve_rejects_zero_concurrency_from_file() {
        let settings = Settings {
            proxy: Some("http://p:1".to_string()),
            concurrency: Some(0),
        };
        assert!(matches!(
            settings.resolve(&args(&[])),
            Err(SettingsError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_message_names_flag() {
        assert_eq!(
            SettingsError::Missing("proxy").to_string(),
            "no proxy configured, set it in capcrawl.yaml or pass --proxy"
        );
    }
}
