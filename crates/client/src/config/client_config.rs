//! Client configuration module.
//!
//! Supports loading configuration from:
//! 1. Config file (TOML, JSON, or YAML) named by `VOXMAIL_CONFIG`
//! 2. Environment variables (`VOXMAIL_` prefix)
//!
//! Environment variables take precedence over config file values. Every
//! field has a local-development fallback so an empty environment still
//! yields a usable client.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote API configuration
    pub api: ApiConfig,
    /// Payment processor configuration
    pub payments: PaymentsConfig,
    /// Durable storage location
    pub storage: StorageConfig,
    /// Query staleness windows
    pub cache: CacheConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL (default: "http://localhost:3001/api")
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

/// Payment processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Publishable key attached to checkout redirects
    pub publishable_key: String,
    /// Hosted checkout page base URL
    pub checkout_base_url: String,
}

/// Durable storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `storage.json` (default: ~/.voxmail)
    pub dir: Option<PathBuf>,
}

/// Staleness windows per resource, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub voice_messages_secs: u64,
    pub analytics_secs: u64,
    pub profile_secs: u64,
    pub settings_secs: u64,
    /// How long an unused entry is kept once its window has passed
    pub gc_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            publishable_key: "pk_test_placeholder".to_string(),
            checkout_base_url: "https://checkout.stripe.com/c/pay".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            voice_messages_secs: 120, // 2 minutes
            analytics_secs: 300,      // 5 minutes
            profile_secs: 600,        // 10 minutes
            settings_secs: 300,       // 5 minutes
            gc_secs: 300,             // 5 minutes
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StorageConfig {
    /// Resolved storage directory, falling back to `~/.voxmail`.
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".voxmail")))
    }
}

impl CacheConfig {
    pub fn voice_messages(&self) -> Duration {
        Duration::from_secs(self.voice_messages_secs)
    }

    pub fn analytics(&self) -> Duration {
        Duration::from_secs(self.analytics_secs)
    }

    pub fn profile(&self) -> Duration {
        Duration::from_secs(self.profile_secs)
    }

    pub fn settings(&self) -> Duration {
        Duration::from_secs(self.settings_secs)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_secs(self.gc_secs)
    }
}

impl ClientConfig {
    /// Load configuration from file and environment variables.
    /// Environment variables override file values.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(config_path) = std::env::var("VOXMAIL_CONFIG") {
            config = Self::from_file(&config_path)?;
            tracing::info!("Loaded configuration from: {}", config_path);
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Load configuration from a file (supports TOML, JSON, YAML)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::parse(&content, extension)
    }

    fn parse(content: &str, extension: &str) -> Result<Self, ConfigError> {
        let config = match extension {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            "yaml" | "yml" => serde_yaml::from_str(content)?,
            _ => {
                if content.trim().starts_with('{') {
                    serde_json::from_str(content)?
                } else if content.contains("---") || content.contains(": ") {
                    serde_yaml::from_str(content)?
                } else {
                    toml::from_str(content)?
                }
            }
        };
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str| lookup(key).and_then(|v| v.parse::<u64>().ok());

        // API config
        if let Some(val) = lookup("VOXMAIL_API_URL") {
            self.api.base_url = val;
        }
        if let Some(val) = secs("VOXMAIL_API_TIMEOUT_SECS") {
            self.api.timeout_secs = val;
        }

        // Payments config
        if let Some(val) = lookup("VOXMAIL_STRIPE_PUBLISHABLE_KEY") {
            self.payments.publishable_key = val;
        }
        if let Some(val) = lookup("VOXMAIL_CHECKOUT_URL") {
            self.payments.checkout_base_url = val;
        }

        // Storage config
        if let Some(val) = lookup("VOXMAIL_STORAGE_DIR") {
            self.storage.dir = Some(PathBuf::from(val));
        }

        // Cache config
        if let Some(val) = secs("VOXMAIL_CACHE_VOICE_MESSAGES_SECS") {
            self.cache.voice_messages_secs = val;
        }
        if let Some(val) = secs("VOXMAIL_CACHE_ANALYTICS_SECS") {
            self.cache.analytics_secs = val;
        }
        if let Some(val) = secs("VOXMAIL_CACHE_PROFILE_SECS") {
            self.cache.profile_secs = val;
        }
        if let Some(val) = secs("VOXMAIL_CACHE_SETTINGS_SECS") {
            self.cache.settings_secs = val;
        }
        if let Some(val) = secs("VOXMAIL_CACHE_GC_SECS") {
            self.cache.gc_secs = val;
        }
    }
}
