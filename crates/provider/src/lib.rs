//! Persisted provider configuration.
//!
//! The credential list and optional endpoint override are the only state
//! that survives a restart. Older installs stored a single key, either as a
//! bare string or as `{"apiKey": "..."}`; both load and are written back in
//! the list form.

use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use url::Url;

use crate::core::config::DispatchSettings;
use crate::core::pool::{normalize_credentials, Credential};
use crate::core::transport::TransportConfig;
use crate::core::SdkError;

const CONFIG_FILE_NAME: &str = "config.json";

/// Everything needed to rebuild the credential pool and its clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    pub api_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Current on-disk layout.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api_keys: Vec<String>,
    /// Single-key layout written by older versions.
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    text_model: Option<String>,
    #[serde(default)]
    image_model: Option<String>,
    #[serde(default)]
    dispatch: DispatchSettings,
    #[serde(default)]
    transport: TransportConfig,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSettings {
    Current(SettingsFile),
    LegacyKey(String),
}

impl From<StoredSettings> for ProviderSettings {
    fn from(stored: StoredSettings) -> Self {
        match stored {
            StoredSettings::LegacyKey(key) => ProviderSettings::with_keys(vec![key]),
            StoredSettings::Current(file) => {
                let mut api_keys = file.api_keys;
                if let Some(key) = file.api_key {
                    api_keys.insert(0, key);
                }
                let mut settings = ProviderSettings {
                    api_keys,
                    base_url: file.base_url,
                    text_model: file.text_model,
                    image_model: file.image_model,
                    dispatch: file.dispatch,
                    transport: file.transport,
                };
                settings.normalize();
                settings
            }
        }
    }
}

impl<'de> Deserialize<'de> for ProviderSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        StoredSettings::deserialize(deserializer).map(ProviderSettings::from)
    }
}

impl ProviderSettings {
    pub fn with_keys(keys: Vec<String>) -> Self {
        let mut settings = Self {
            api_keys: keys,
            ..Default::default()
        };
        settings.normalize();
        settings
    }

    /// Trim and de-duplicate keys, drop a blank endpoint override.
    pub fn normalize(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.api_keys = std::mem::take(&mut self.api_keys)
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();
        self.base_url = self
            .base_url
            .take()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
    }

    /// Reject an endpoint override that is not an http(s) URL.
    pub fn validate(&self) -> Result<(), SdkError> {
        if let Some(base) = &self.base_url {
            let url = Url::parse(base).map_err(|e| SdkError::Config {
                message: format!("invalid base url '{base}': {e}"),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(SdkError::Config {
                    message: format!("base url must be http or https, got '{}'", url.scheme()),
                });
            }
        }
        Ok(())
    }

    /// Use the key in `var` when nothing is configured.
    pub fn or_env_key(mut self, var: &str) -> Self {
        if self.api_keys.is_empty() {
            if let Some(key) = std::env::var(var).ok().filter(|k| !k.trim().is_empty()) {
                tracing::debug!(target: "storyboard::config", var, "using api key from environment");
                self.api_keys.push(key.trim().to_string());
            }
        }
        self
    }

    /// Pool credentials; every key shares the endpoint override.
    pub fn credentials(&self) -> Vec<Credential> {
        normalize_credentials(
            self.api_keys
                .iter()
                .map(|k| Credential::new(k.clone(), self.base_url.clone())),
        )
    }

    /// Parse any stored layout.
    pub fn from_json_str(raw: &str) -> Result<Self, SdkError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<ProviderSettings>(trimmed) {
            Ok(settings) => Ok(settings),
            // A key saved as plain text, not JSON at all.
            Err(_) if !trimmed.starts_with(['{', '[', '"']) && !trimmed.contains(char::is_whitespace) => {
                Ok(Self::with_keys(vec![trimmed.to_string()]))
            }
            Err(e) => Err(SdkError::Config {
                message: format!("unreadable settings: {e}"),
            }),
        }
    }
}

/// JSON file holding `ProviderSettings`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the platform config directory.
    pub fn default_location() -> Result<Self, SdkError> {
        let dirs = directories::ProjectDirs::from("ai", "storyboard", "storyboard").ok_or_else(
            || SdkError::Config {
                message: "no home directory available for config".into(),
            },
        )?;
        Ok(Self::new(dirs.config_dir().join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing file yields defaults.
    pub fn load(&self) -> Result<ProviderSettings, SdkError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                tracing::debug!(target: "storyboard::config", path = %self.path.display(), "no settings file");
                return Ok(ProviderSettings::default());
            }
            Err(e) => {
                return Err(SdkError::Config {
                    message: format!("reading {}: {e}", self.path.display()),
                })
            }
        };
        let settings = ProviderSettings::from_json_str(&raw)?;
        tracing::debug!(
            target: "storyboard::config",
            path = %self.path.display(),
            keys = settings.api_keys.len(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Write settings in the current layout.
    pub fn save(&self, settings: &ProviderSettings) -> Result<(), SdkError> {
        settings.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SdkError::Config {
                message: format!("creating {}: {e}", parent.display()),
            })?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json).map_err(|e| SdkError::Config {
            message: format!("writing {}: {e}", self.path.display()),
        })
    }

    pub fn clear(&self) -> Result<(), SdkError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(SdkError::Config {
                message: format!("removing {}: {e}", self.path.display()),
            }),
        }
    }
}

#[cfg(test)]
#[path = "../tests/settings_store_tests.rs"]
mod settings_store_tests;
