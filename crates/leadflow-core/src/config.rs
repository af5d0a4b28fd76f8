//! Leadflow configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LeadflowError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadflowConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub campaign: CampaignConfig,
}

impl LeadflowConfig {
    /// Load config from `LEADFLOW_CONFIG` or the default path (~/.leadflow/config.toml).
    pub fn load() -> Result<Self> {
        let path = std::env::var("LEADFLOW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LeadflowError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| LeadflowError::Config(format!("Failed to parse config: {e}")))?;
        config.campaign.validate()?;
        Ok(config)
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| LeadflowError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Leadflow home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".leadflow")
    }
}

/// SQLite lead store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.leadflow/leadflow.db".into() }

impl DatabaseConfig {
    /// Path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 { 3000 }
fn default_host() -> String { "127.0.0.1".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// WhatsApp gateway (Evolution-style REST API) credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Gateway base URL, e.g. `https://evo.example.com`.
    #[serde(default)]
    pub base_url: String,
    /// Instance identifier appended to `/message/sendText/`.
    #[serde(default)]
    pub instance: String,
    /// Sent as the `apiKey` header.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            instance: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WhatsAppConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.instance.is_empty() && !self.api_key.is_empty()
    }
}

/// Campaign pacing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Lower bound of the randomized gap between two sends.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Upper bound (inclusive) of the randomized gap.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Prefixed to contact handles that do not already start with it.
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

fn default_min_delay_ms() -> u64 { 60_000 }
fn default_max_delay_ms() -> u64 { 150_000 }
fn default_country_code() -> String { "55".into() }

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            country_code: default_country_code(),
        }
    }
}

impl CampaignConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(LeadflowError::Config(format!(
                "campaign.min_delay_ms ({}) exceeds campaign.max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        if self.country_code.is_empty() || !self.country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(LeadflowError::Config(format!(
                "campaign.country_code must be a non-empty run of digits, got '{}'",
                self.country_code
            )));
        }
        Ok(())
    }
}
