//! Configuration management for the Gmail Assistant MCP Server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, GmailMcpError, Result};

/// Name of the OAuth client secret file looked up in the working directory
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Name of the stored token file
pub const TOKEN_FILE_NAME: &str = "token.json";

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default OAuth callback port
pub const DEFAULT_OAUTH_PORT: u16 = 3000;

/// Configuration for the Gmail Assistant MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for storing configuration files
    pub config_dir: PathBuf,

    /// Path to the OAuth client credentials (client id/secret)
    pub credentials_path: PathBuf,

    /// Path to the stored OAuth token (access/refresh tokens)
    pub token_path: PathBuf,

    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,

    /// OAuth callback URL
    pub oauth_callback_url: String,

    /// OAuth callback port
    pub oauth_callback_port: u16,

    /// Gmail API scopes
    pub scopes: Vec<String>,
}

impl Config {
    /// Create a configuration from the process environment
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Self::from_lookup(config_dir, |var| std::env::var(var).ok())
    }

    /// Build a configuration rooted at `config_dir`, reading settings through `lookup`
    pub fn from_lookup<F>(config_dir: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials_path = lookup("CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join(CREDENTIALS_FILE_NAME));

        let token_path = lookup("TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join(TOKEN_FILE_NAME));

        let log_level = lookup("LOG_LEVEL")
            .filter(|level| !level.trim().is_empty())
            .map(|level| level.trim().to_lowercase())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let oauth_callback_port = match lookup("OAUTH_PORT") {
            Some(port) => port.trim().parse().map_err(|_| {
                GmailMcpError::Config(ConfigError::InvalidValue {
                    var: "OAUTH_PORT".to_string(),
                    value: port.clone(),
                })
            })?,
            None => DEFAULT_OAUTH_PORT,
        };

        let oauth_callback_url = format!("http://localhost:{}/oauth2callback", oauth_callback_port);

        Ok(Self {
            config_dir,
            credentials_path,
            token_path,
            log_level,
            oauth_callback_url,
            oauth_callback_port,
            scopes: vec![
                "https://www.googleapis.com/auth/gmail.readonly".to_string(),
                "https://www.googleapis.com/auth/gmail.compose".to_string(),
            ],
        })
    }

    /// Apply command-line overrides on top of the environment
    pub fn with_overrides(
        mut self,
        credentials_path: Option<PathBuf>,
        token_path: Option<PathBuf>,
        log_level: Option<String>,
    ) -> Self {
        if let Some(path) = credentials_path {
            self.credentials_path = path;
        }
        if let Some(path) = token_path {
            self.token_path = path;
        }
        if let Some(level) = log_level {
            self.log_level = level.to_lowercase();
        }
        self
    }

    /// Get the configuration directory, creating it if necessary
    fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| {
                GmailMcpError::Config(ConfigError::DirNotFound {
                    path: "~".to_string(),
                })
            })?
            .join(".gmail-assistant");

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|_| {
                GmailMcpError::Config(ConfigError::DirCreationFailed {
                    path: config_dir.display().to_string(),
                })
            })?;
        }

        Ok(config_dir)
    }

    /// Check if the OAuth client credentials file exists
    pub fn credentials_exist(&self) -> bool {
        self.credentials_path.exists()
    }

    /// Check if a stored token exists
    pub fn token_exists(&self) -> bool {
        self.token_path.exists()
    }

    /// Copy `credentials.json` from `dir` to the configured path if that one is missing
    pub fn adopt_local_credentials(&self, dir: &Path) -> Result<bool> {
        let local = dir.join(CREDENTIALS_FILE_NAME);

        if local.exists() && !self.credentials_exist() && local != self.credentials_path {
            if let Some(parent) = self.credentials_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&local, &self.credentials_path)?;
            return Ok(true);
        }

        Ok(false)
    }
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// Largest page Gmail returns from `messages.list`
    pub const MAX_LIST_RESULTS: u32 = 500;

    /// System label IDs
    pub mod labels {
        pub const UNREAD: &str = "UNREAD";
    }
}
