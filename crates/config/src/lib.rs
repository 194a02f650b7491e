//! Server configuration loading and validation.
//!
//! Loads from a TOML file when one is given, then applies environment
//! variable overrides (`STATECRAFT_HOST`, `STATECRAFT_PORT`,
//! `STATECRAFT_BUDGET`). All settings are validated before the server
//! starts; a bad value is a startup failure, not a runtime surprise.

use serde::{Deserialize, Serialize};
use std::path::Path;

use statecraft_core::error::{Error, Result};

/// The server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-turn LLM call budget.
    #[serde(default = "default_budget")]
    pub budget: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8017
}
fn default_budget() -> u64 {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            budget: default_budget(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("cannot read {}: {e}", path.display()))
                })?;
                toml::from_str(&raw)
                    .map_err(|e| Error::config(format!("invalid config file: {e}")))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("STATECRAFT_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("STATECRAFT_PORT") {
            self.port = port
                .parse()
                .map_err(|_| Error::config(format!("STATECRAFT_PORT={port} is not a port")))?;
        }
        if let Ok(budget) = std::env::var("STATECRAFT_BUDGET") {
            self.budget = budget
                .parse()
                .map_err(|_| Error::config(format!("STATECRAFT_BUDGET={budget} is not a number")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::config("host must be non-empty"));
        }
        if self.budget == 0 {
            return Err(Error::config("budget must be at least 1"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::config(format!("invalid bind address: {e}")))
    }
}
