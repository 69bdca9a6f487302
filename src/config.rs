//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - GitHub OAuth credentials and the comment-posting API token
//! - Server binding settings and the public domain
//! - Contact details shown on error pages
//! - Database, session, and reward backend settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub github: GitHubConfig,
    pub server: ServerConfig,
    pub contact: ContactConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

/// GitHub credentials: the OAuth app pair plus the token used for comments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GitHub OAuth App client ID (env: GITHUB_CLIENT_ID)
    #[serde(default)]
    pub client_id: String,
    /// GitHub OAuth App client secret (env: GITHUB_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret: String,
    /// Token used when posting invitation comments (env: GITHUB_TOKEN)
    #[serde(default)]
    pub api_token: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used in invitation links and the OAuth callback
    pub domain: String,
}

/// Contact details rendered on error pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    pub url: String,
    pub value: String,
}

/// SQLite location (DATABASE_PATH env var takes precedence)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "contribot.db".to_string(),
        }
    }
}

/// Session lifetime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    pub ttl_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

/// Reward backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Each URL receives a POST with the submission JSON
    #[serde(default)]
    pub fulfillment_urls: Vec<String>,
    /// Optional local JSON-lines ledger
    #[serde(default)]
    pub ledger_path: Option<String>,
}

/// Environment override, ignoring empty values
fn env_override(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

impl Config {
    /// Load from config.toml or use defaults
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load from specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            // Use embedded default config
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")
        }
    }

    /// Get GitHub client ID (env var takes precedence, required if config value is empty)
    pub fn github_client_id(&self) -> Option<String> {
        env_override("GITHUB_CLIENT_ID").or_else(|| {
            if self.github.client_id.is_empty() {
                None
            } else {
                Some(self.github.client_id.clone())
            }
        })
    }

    /// Get GitHub client secret (env var takes precedence)
    pub fn github_client_secret(&self) -> Option<String> {
        env_override("GITHUB_CLIENT_SECRET").or_else(|| {
            if self.github.client_secret.is_empty() {
                None
            } else {
                Some(self.github.client_secret.clone())
            }
        })
    }

    /// Get the comment-posting token (env var takes precedence, optional)
    pub fn github_api_token(&self) -> Option<String> {
        env_override("GITHUB_TOKEN").or_else(|| {
            if self.github.api_token.is_empty() {
                None
            } else {
                Some(self.github.api_token.clone())
            }
        })
    }

    /// Public base URL, without a trailing slash
    pub fn domain(&self) -> String {
        let domain = env_override("DOMAIN").unwrap_or_else(|| self.server.domain.clone());
        domain.trim_end_matches('/').to_string()
    }

    pub fn host(&self) -> String {
        env_override("CONTRIBOT_HOST").unwrap_or_else(|| self.server.host.clone())
    }

    pub fn port(&self) -> u16 {
        env_override("CONTRIBOT_PORT")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(self.server.port)
    }

    pub fn database_path(&self) -> String {
        env_override("DATABASE_PATH").unwrap_or_else(|| self.database.path.clone())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.sessions.ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        // The embedded default config is validated at compile time,
        // so this should never fail. Using a fallback for robustness.
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            github: GitHubConfig {
                client_id: String::new(),
                client_secret: String::new(),
                api_token: String::new(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                domain: "http://localhost:8080".to_string(),
            },
            contact: ContactConfig {
                url: "https://github.com/PlatformNetwork/contribot/issues".to_string(),
                value: "open an issue".to_string(),
            },
            database: DatabaseConfig::default(),
            sessions: SessionsConfig::default(),
            rewards: RewardsConfig::default(),
        })
    }
}
