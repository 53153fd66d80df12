//! Configuration handling for the CoAP service.
//!
//! Values come from a YAML file, then environment variables, then CLI flags
//! (applied by the caller).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// CoAP service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// UDP address to serve on
    pub listen_addr: SocketAddr,
    /// Client response timeout in milliseconds
    pub response_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5683)),
            response_timeout_ms: coap_transport::RESPONSE_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Root of the YAML file; the service section is optional
#[derive(Debug, Deserialize)]
struct RootConfig {
    coap: Option<ServiceConfig>,
}

impl ServiceConfig {
    /// Load configuration from file and environment variables.
    ///
    /// A missing or unparsable file falls back to defaults.
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<RootConfig>(&content) {
                Ok(root) => {
                    info!("Loaded configuration from {:?}", path);
                    root.coap.unwrap_or_default()
                }
                Err(e) => {
                    warn!("Failed to parse config file {:?}, using defaults: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                warn!("Config file {:?} not found, using defaults", path);
                Self::default()
            }
        };

        config.apply_environment_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `COAP_*` overrides read through `lookup`
    fn apply_environment_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("COAP_LISTEN_ADDR") {
            self.listen_addr = addr
                .parse()
                .with_context(|| format!("invalid COAP_LISTEN_ADDR: {}", addr))?;
            info!("Listen address overridden by environment: {}", self.listen_addr);
        }

        if let Some(timeout) = lookup("COAP_RESPONSE_TIMEOUT_MS") {
            self.response_timeout_ms = timeout
                .parse()
                .with_context(|| format!("invalid COAP_RESPONSE_TIMEOUT_MS: {}", timeout))?;
        }

        Ok(())
    }

    /// Response timeout as a duration
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}
