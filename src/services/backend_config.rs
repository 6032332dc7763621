// Smartmark Backend Config
// Manages connection settings for the managed backend service: loading,
// saving, and environment overrides. Settings are stored as a JSON file.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::errors::ConfigError;

const DEFAULT_CONFIG_FILE: &str = "smartmark.json";

/// Connection settings for the managed backend service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the backend project, e.g. `https://abc.example.co`.
    pub base_url: String,
    /// Publishable API key sent with every request.
    pub anon_key: String,
    /// Identity provider id passed to the auth collaborator.
    pub provider_id: String,
    /// Where the provider redirects after sign-in.
    pub redirect_url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            provider_id: "google".to_string(),
            redirect_url: "http://localhost:3000/auth/callback".to_string(),
        }
    }
}

/// Trait defining the backend config interface.
pub trait BackendConfigTrait {
    fn load(&mut self) -> Result<BackendSettings, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn settings(&self) -> &BackendSettings;
    fn config_path(&self) -> &str;
}

/// Backend config implementation that persists settings as JSON on disk.
pub struct BackendConfig {
    config_path: String,
    settings: BackendSettings,
}

impl BackendConfig {
    /// Creates a new BackendConfig.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise honors the `SMARTMARK_CONFIG` environment variable and
    /// falls back to `smartmark.json` in the working directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => env::var("SMARTMARK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string()),
        };

        Self {
            config_path,
            settings: BackendSettings::default(),
        }
    }

    /// Applies individual environment overrides on top of loaded settings.
    ///
    /// `SMARTMARK_BASE_URL` and `SMARTMARK_ANON_KEY` win over the file so
    /// deployments can keep the key out of the config on disk.
    fn apply_env_overrides(settings: &mut BackendSettings) {
        if let Ok(base_url) = env::var("SMARTMARK_BASE_URL") {
            if !base_url.is_empty() {
                settings.base_url = base_url;
            }
        }
        if let Ok(anon_key) = env::var("SMARTMARK_ANON_KEY") {
            if !anon_key.is_empty() {
                settings.anon_key = anon_key;
            }
        }
    }
}

impl BackendConfigTrait for BackendConfig {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings. If the file
    /// exists but is malformed, returns a serialization error. Environment
    /// overrides are applied in both cases.
    fn load(&mut self) -> Result<BackendSettings, ConfigError> {
        let path = Path::new(&self.config_path);

        let mut settings = if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;
            serde_json::from_str(&content).map_err(|e| {
                ConfigError::SerializationError(format!("Failed to parse config file: {}", e))
            })?
        } else {
            BackendSettings::default()
        };

        Self::apply_env_overrides(&mut settings);
        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), ConfigError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::IoError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Returns a reference to the current in-memory settings.
    fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    fn config_path(&self) -> &str {
        &self.config_path
    }
}
