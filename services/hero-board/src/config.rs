//! Configuration types for the hero-board service

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table: default_table(),
            backend: BackendConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// Where the hero table lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    /// In-process table, lost on restart
    #[default]
    #[serde(rename = "memory")]
    Memory,
    /// Hosted table behind a PostgREST endpoint
    #[serde(rename = "postgrest")]
    Postgrest {
        url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
    },
}

impl BackendConfig {
    pub fn type_name(&self) -> &str {
        match self {
            BackendConfig::Memory => "memory",
            BackendConfig::Postgrest { .. } => "postgrest",
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

impl Config {
    /// Fill in secrets that are kept out of the config file.
    ///
    /// A postgrest backend without an inline `api_key` reads it from the
    /// environment variable named by `api_key_env`.
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        self.resolve_secrets_with(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::resolve_secrets`] with an injectable variable lookup
    pub fn resolve_secrets_with<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let BackendConfig::Postgrest {
            api_key,
            api_key_env,
            ..
        } = &mut self.backend
        {
            if api_key.is_none() {
                tracing::debug!("Resolving postgrest api_key from ${}", api_key_env);
                let value = lookup(api_key_env).filter(|v| !v.trim().is_empty());
                match value {
                    Some(value) => *api_key = Some(value.trim().to_string()),
                    None => {
                        return Err(crate::HeroBoardError::Config(format!(
                            "postgrest backend needs an api_key or the {} environment variable",
                            api_key_env
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

fn default_table() -> String {
    "heroes".to_string()
}

fn default_api_key_env() -> String {
    "HERO_BOARD_API_KEY".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::HeroBoardError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
