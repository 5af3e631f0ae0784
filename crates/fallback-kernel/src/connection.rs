// Jupyter connection file

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, WireError};

/// Supported signature scheme
pub const HMAC_SHA256: &str = "hmac-sha256";

/// Contents of a kernel connection file written by the Jupyter server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(default = "default_transport")]
    pub transport: String,
    pub ip: String,
    pub shell_port: u16,
    pub iopub_port: u16,
    pub stdin_port: u16,
    pub control_port: u16,
    pub hb_port: u16,
    /// Signing key; empty disables signatures
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_signature_scheme")]
    pub signature_scheme: String,
    #[serde(default)]
    pub kernel_name: Option<String>,
}

fn default_transport() -> String {
    "tcp".to_string()
}

fn default_signature_scheme() -> String {
    HMAC_SHA256.to_string()
}

impl ConnectionInfo {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WireError::Connection(format!("cannot read {}: {}", path.display(), e))
        })?;
        let info: Self = serde_json::from_str(&content).map_err(|e| {
            WireError::Connection(format!("invalid connection file {}: {}", path.display(), e))
        })?;
        info.validate()?;
        Ok(info)
    }

    fn validate(&self) -> Result<()> {
        if !self.key.is_empty() && self.signature_scheme != HMAC_SHA256 {
            return Err(WireError::Connection(format!(
                "unsupported signature scheme {}",
                self.signature_scheme
            )));
        }
        match self.transport.as_str() {
            "tcp" | "ipc" => Ok(()),
            other => Err(WireError::Connection(format!("unsupported transport {}", other))),
        }
    }

    /// ZeroMQ endpoint of one channel
    ///
    /// IPC endpoints use `<ip>-<port>` as the socket path, as Jupyter does.
    pub fn endpoint(&self, port: u16) -> String {
        match self.transport.as_str() {
            "ipc" => format!("ipc://{}-{}", self.ip, port),
            _ => format!("tcp://{}:{}", self.ip, port),
        }
    }
}
