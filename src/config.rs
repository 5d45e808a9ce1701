//! Configuration management
//!
//! Loads settings from `config.toml` with `LANSHARE_*` environment
//! overrides, falling back to defaults suitable for a LAN deployment.
//! Values are validated before the server starts.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Complete server configuration, loaded once at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the HTTP listener
    pub bind_address: String,

    /// Port for the HTTP listener
    pub port: u16,

    /// Directory the entire service is confined to; created if absent
    pub storage_root: String,

    /// Maximum nesting depth for newly created folders
    pub max_folder_depth: usize,

    /// Per-subscriber change event queue capacity
    pub event_queue_capacity: usize,

    /// Maximum size of a single uploaded file in MB
    pub max_upload_size_mb: u64,
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .set_default("bind_address", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("storage_root", "./shared_files")?
            .set_default("max_folder_depth", 5)?
            .set_default("event_queue_capacity", 32)?
            .set_default("max_upload_size_mb", 1024)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("LANSHARE"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }
        if self.storage_root.is_empty() {
            return Err(config::ConfigError::Message(
                "storage_root cannot be empty".into(),
            ));
        }
        if self.max_folder_depth == 0 {
            return Err(config::ConfigError::Message(
                "max_folder_depth must be greater than 0".into(),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(config::ConfigError::Message(
                "event_queue_capacity must be greater than 0".into(),
            ));
        }
        if self.max_upload_size_mb == 0 {
            return Err(config::ConfigError::Message(
                "max_upload_size_mb must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Bind address and port as a socket address string.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Storage root as a PathBuf.
    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}
