//! HTTP Request/Response Types

use serde::{Deserialize, Serialize};

/// POST {base_url}/pixi-kernel/envs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvsRequest {
    /// Jupyter server root directory, may start with `~`
    #[serde(rename = "serverRoot")]
    pub server_root: String,
    /// Notebook (or directory) path relative to the server root
    #[serde(rename = "localPath")]
    pub local_path: String,
}
