use std::{fs, path::PathBuf};

use common::sync::UserKey;
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "termfs";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_REMOTE: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the content store
    #[serde(default = "default_remote")]
    pub remote: Url,
    /// Key the tree is stored under on the content store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_key: Option<String>,
    /// Default log filter, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_remote() -> Url {
    Url::parse(DEFAULT_REMOTE).expect("hardcoded URL must parse")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            user_key: None,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the termfs directory (~/.termfs)
    pub termfs_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the termfs directory path (custom or default ~/.termfs)
    pub fn termfs_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    pub fn exists(custom_path: Option<PathBuf>) -> Result<bool, StateError> {
        let termfs_dir = Self::termfs_dir(custom_path)?;
        Ok(termfs_dir.join(CONFIG_FILE_NAME).exists())
    }

    /// Initialize a new termfs state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let termfs_dir = Self::termfs_dir(custom_path)?;
        let config_path = termfs_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let config = config.unwrap_or_default();
        if let Some(key) = &config.user_key {
            UserKey::parse(key).map_err(|_| StateError::InvalidUserKey)?;
        }

        fs::create_dir_all(&termfs_dir)?;
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            termfs_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the termfs directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let termfs_dir = Self::termfs_dir(custom_path)?;

        if !termfs_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = termfs_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            termfs_dir,
            config_path,
            config,
        })
    }

    /// Like [`AppState::load`], but an uninitialized directory yields the
    ///  default configuration instead of an error. Nothing is written.
    pub fn load_or_default(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        match Self::load(custom_path.clone()) {
            Err(StateError::NotInitialized) | Err(StateError::MissingFile(_)) => {
                let termfs_dir = Self::termfs_dir(custom_path)?;
                Ok(Self {
                    config_path: termfs_dir.join(CONFIG_FILE_NAME),
                    termfs_dir,
                    config: AppConfig::default(),
                })
            }
            other => other,
        }
    }

    /// The configured user key, checked against the content store grammar
    pub fn user_key(&self) -> Result<Option<UserKey>, StateError> {
        self.config
            .user_key
            .as_deref()
            .map(|raw| UserKey::parse(raw).map_err(|_| StateError::InvalidUserKey))
            .transpose()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("termfs directory not initialized. Run 'termfs init' first")]
    NotInitialized,

    #[error("termfs directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("user key must match [A-Za-z_][A-Za-z0-9_]{{5,}}")]
    InvalidUserKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("termfs");
        let config = AppConfig {
            remote: Url::parse("http://store.example:8000").unwrap(),
            user_key: Some("alice_key".to_string()),
            log_level: "debug".to_string(),
        };

        let state = AppState::init(Some(dir.clone()), Some(config.clone())).unwrap();
        assert_eq!(state.config_path, dir.join(CONFIG_FILE_NAME));

        let loaded = AppState::load(Some(dir)).unwrap();
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.user_key().unwrap().unwrap().as_str(), "alice_key");
    }

    #[test]
    fn test_second_init_fails() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();

        AppState::init(Some(dir.clone()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_init_rejects_bad_user_key() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            user_key: Some("no".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            AppState::init(Some(temp.path().to_path_buf()), Some(config)),
            Err(StateError::InvalidUserKey)
        ));
        assert!(!temp.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_load_missing() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        assert!(matches!(
            AppState::load(Some(missing.clone())),
            Err(StateError::NotInitialized)
        ));
        let state = AppState::load_or_default(Some(missing)).unwrap();
        assert_eq!(state.config, AppConfig::default());
        assert!(state.user_key().unwrap().is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "user_key = \"bob_key_1\"\n",
        )
        .unwrap();

        let state = AppState::load(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(state.config.remote.as_str(), "http://localhost:3000/");
        assert_eq!(state.config.log_level, "info");
        assert_eq!(state.config.user_key.as_deref(), Some("bob_key_1"));
    }
}
