//! Configuration File Loading
//!
//! Handles loading and saving configuration files from the standard
//! locations, falling back to built-in defaults.

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "AIDERCHAT_CONFIG";

const CONFIG_FILE: &str = "config.toml";

/// Configuration file loader
pub struct ConfigLoader {
    /// Candidate configuration files, in priority order
    search_paths: Vec<PathBuf>,
    /// Path of the file the last load came from
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick a format from a file extension; TOML unless it says json
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

impl ConfigLoader {
    /// Create a loader over the default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
            current_path: None,
        }
    }

    /// Load configuration from the first existing search path, or defaults
    pub fn load() -> Result<Config> {
        let mut loader = Self::new();
        loader.load_first()
    }

    /// Load configuration from an explicit file
    ///
    /// Unlike [`ConfigLoader::load`], a missing explicit file is an error.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(Error::ConfigLoadFailed {
                path: path.to_path_buf(),
                reason: "Configuration file does not exist".to_string(),
            });
        }
        let config = Self::read_config_file(path)?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Walk the search paths and load the first file found
    pub fn load_first(&mut self) -> Result<Config> {
        for path in &self.search_paths {
            if !path.is_file() {
                continue;
            }
            let config = Self::read_config_file(path)?;
            Self::validate_config(&config)?;
            info!("Configuration loaded from {}", path.display());
            self.current_path = Some(path.clone());
            return Ok(config);
        }

        debug!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Save configuration to a specific path; format follows the extension
    pub fn save_to_path(&self, config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| {
                Error::ConfigSerializationFailed {
                    format: "JSON".to_string(),
                    reason: e.to_string(),
                }
            })?,
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| Error::ConfigSerializationFailed {
                    format: "TOML".to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Read and parse one configuration file
    fn read_config_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| Error::ConfigParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
            ConfigFormat::Json => {
                serde_json::from_str(&content).map_err(|e| Error::ConfigParseFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Default candidate files, highest priority first
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(explicit) = env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(explicit));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("aiderchat").join(CONFIG_FILE));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".aiderchat").join(CONFIG_FILE));
        }

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join("aiderchat.toml"));
        }

        paths
    }

    /// Validate configuration
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.assistant.binary.trim().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "assistant.binary".to_string(),
                reason: "Assistant binary cannot be empty".to_string(),
            });
        }

        if config.assistant.model.trim().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "assistant.model".to_string(),
                reason: "Model name cannot be empty".to_string(),
            });
        }

        if config.assistant.credential_env.trim().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "assistant.credential_env".to_string(),
                reason: "Credential variable name cannot be empty".to_string(),
            });
        }

        if config.relay.poll_timeout_ms == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "relay.poll_timeout_ms".to_string(),
                reason: "Poll timeout must be greater than 0".to_string(),
            });
        }

        if config.relay.poll_timeout_ms > 10_000 {
            return Err(Error::ConfigValidationFailed {
                field: "relay.poll_timeout_ms".to_string(),
                reason: "Poll timeout cannot exceed 10 seconds".to_string(),
            });
        }

        if config.relay.max_consecutive_read_errors == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "relay.max_consecutive_read_errors".to_string(),
                reason: "At least one read attempt is required".to_string(),
            });
        }

        Ok(())
    }

    /// Get the path of the loaded configuration file
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// List all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Clear all search paths and add a single path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
