use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sort::SortMethod;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read config file at {path:?}.")]
    ReadConfig { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse config file at {path:?}.")]
    ParseConfig { path: PathBuf, source: toml::de::Error },
    #[error("{message}")]
    Validation { message: String },
}

pub const DEFAULT_SIZE_WARNING_CHARS: usize = 5_000_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub storage: StorageConfig,
    pub remote: Option<RemoteConfig>,
    pub log: LogConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite file; defaults to the platform data directory.
    pub path: Option<PathBuf>,
    pub quota_bytes: Option<u64>,
    /// Serialized size above which a save still succeeds but warns.
    pub size_warning_chars: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            quota_bytes: None,
            size_warning_chars: DEFAULT_SIZE_WARNING_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub project_id: String,
    pub api_key: String,
    pub firestore_url: String,
    pub auth_url: String,
    pub token_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: String::new(),
            firestore_url: "https://firestore.googleapis.com".to_string(),
            auth_url: "https://identitytoolkit.googleapis.com".to_string(),
            token_url: "https://securetoken.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiConfig {
    pub default_sort: SortMethod,
}

pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "jobtrack").map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn load(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

    normalize(&mut cfg);

    validate(&cfg)?;

    Ok(cfg)
}

/// An explicit path must exist; the default location is optional.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load(path);
    }
    match default_path() {
        Some(path) if path.exists() => load(&path),
        _ => Ok(Config::default()),
    }
}

fn normalize(cfg: &mut Config) {
    cfg.log.level = cfg.log.level.trim().to_string();
    if let Some(remote) = cfg.remote.as_mut() {
        remote.project_id = remote.project_id.trim().to_string();
        remote.api_key = remote.api_key.trim().to_string();
        for url in [&mut remote.firestore_url, &mut remote.auth_url, &mut remote.token_url] {
            *url = url.trim().trim_end_matches('/').to_string();
        }
    }
}

pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.storage.size_warning_chars == 0 {
        return Err(Error::Validation {
            message: "storage.size_warning_chars must be greater than zero.".to_string(),
        });
    }
    if cfg.storage.quota_bytes == Some(0) {
        return Err(Error::Validation {
            message: "storage.quota_bytes must be greater than zero.".to_string(),
        });
    }
    if cfg.log.level.is_empty() {
        return Err(Error::Validation {
            message: "log.level must be non-empty.".to_string(),
        });
    }
    if let Some(remote) = &cfg.remote {
        if remote.project_id.is_empty() {
            return Err(Error::Validation {
                message: "remote.project_id must be non-empty.".to_string(),
            });
        }
        if remote.api_key.is_empty() {
            return Err(Error::Validation {
                message: "remote.api_key must be non-empty.".to_string(),
            });
        }
        for (name, url) in [
            ("remote.firestore_url", &remote.firestore_url),
            ("remote.auth_url", &remote.auth_url),
            ("remote.token_url", &remote.token_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Validation {
                    message: format!("{} must be an http(s) URL.", name),
                });
            }
        }
    }
    Ok(())
}
