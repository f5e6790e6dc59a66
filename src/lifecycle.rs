// Endpoint file for UI-host discovery
//
// The UI host finds the out-of-band listener by reading
// ~/.parley/ui-host.json, written once the listener is bound and removed
// at shutdown.

use crate::config::constants::{CONFIG_DIR_NAME, ENDPOINT_FILE_NAME};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Contents of the endpoint file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub address: String,
    pub pid: u32,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

/// Default endpoint file location
pub fn default_endpoint_path() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("Cannot determine home directory"))?
        .join(CONFIG_DIR_NAME)
        .join(ENDPOINT_FILE_NAME))
}

/// A published endpoint file. Remove it with `cleanup` on shutdown.
pub struct EndpointFile {
    path: PathBuf,
}

impl EndpointFile {
    /// Write `address` and this process's PID to `path`.
    pub fn publish(path: impl Into<PathBuf>, address: SocketAddr) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let info = EndpointInfo {
            address: address.to_string(),
            pid: std::process::id(),
            started_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&info).context("Failed to encode endpoint file")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write endpoint file: {}", path.display()))?;

        info!(path = %path.display(), address = %address, "Endpoint file written");
        Ok(Self { path })
    }

    pub fn read(path: &Path) -> Result<EndpointInfo> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read endpoint file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid endpoint file: {}", path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file, unless another process has since replaced it.
    pub fn cleanup(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        match Self::read(&self.path) {
            Ok(info) if info.pid != std::process::id() => {
                warn!(pid = info.pid, "Endpoint file belongs to another process, leaving it");
                return Ok(());
            }
            _ => {}
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove endpoint file: {}", self.path.display()))?;
        info!("Endpoint file removed");
        Ok(())
    }
}
