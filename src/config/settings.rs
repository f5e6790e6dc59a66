// Configuration structs

use super::constants::{
    DEFAULT_DIALOG_TITLE, DEFAULT_TIMEOUT_SECS, DEFAULT_UI_HOST_ADDR,
};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Correlation broker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Seconds a waiter may stay pending before it times out
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BrokerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// UI host link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiHostConfig {
    /// Listen for a UI host at all. When false every request goes
    /// straight to the native dialog fallback.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Address the link listens on (e.g., "127.0.0.1:47821")
    #[serde(default = "default_ui_host_addr")]
    pub bind_address: String,

    /// Where to publish the bound address for the UI host.
    /// Defaults to ~/.parley/ui-host.json
    #[serde(default)]
    pub endpoint_file: Option<PathBuf>,
}

impl Default for UiHostConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: DEFAULT_UI_HOST_ADDR.to_string(),
            endpoint_file: None,
        }
    }
}

/// Native dialog fallback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogConfig {
    /// Fall back to OS-native dialogs when the UI host cannot answer
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Window title for native dialogs
    #[serde(default = "default_dialog_title")]
    pub title: String,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: DEFAULT_DIALOG_TITLE.to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset (e.g., "info", "parley=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_ui_host_addr() -> String {
    DEFAULT_UI_HOST_ADDR.to_string()
}

fn default_dialog_title() -> String {
    DEFAULT_DIALOG_TITLE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub ui_host: UiHostConfig,

    #[serde(default)]
    pub dialog: DialogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.broker.timeout_secs == 0 {
            bail!("broker.timeout_secs must be greater than zero");
        }

        if self.ui_host.enabled {
            self.ui_host
                .bind_address
                .parse::<SocketAddr>()
                .with_context(|| {
                    format!(
                        "ui_host.bind_address is not a socket address: {}",
                        self.ui_host.bind_address
                    )
                })?;
        }

        Ok(())
    }
}
