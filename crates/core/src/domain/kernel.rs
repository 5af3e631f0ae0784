// Kernel Domain Model
// Jupyter kernel spec (kernel.json) as seen by the launcher

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::error::{DomainError, Result};

/// Key of the kernel/notebook metadata section owned by this project
pub const METADATA_KEY: &str = "pixi-kernel";

/// Required-package key inside the kernel metadata section
pub const REQUIRED_PACKAGE_KEY: &str = "required-package";

/// Environment selector key inside the notebook metadata section
pub const ENVIRONMENT_KEY: &str = "environment";

/// Jupyter kernel spec (`kernel.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    #[serde(default)]
    pub argv: Vec<String>,
    pub display_name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl KernelSpec {
    /// Load `kernel.json` from a kernel resource directory
    pub fn from_resource_dir(dir: &Path) -> Result<Self> {
        let path = dir.join("kernel.json");
        let content = std::fs::read_to_string(&path).map_err(|e| {
            DomainError::InvalidKernelSpec(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| DomainError::InvalidKernelSpec(e.to_string()))
    }

    /// Pixi metadata section, if the spec has one
    pub fn pixi_metadata(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.metadata.get(METADATA_KEY).and_then(|v| v.as_object())
    }
}

/// Validated Pixi metadata of a kernel spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelMetadata {
    pub display_name: String,
    pub required_package: String,
}

/// Process launch request produced once an environment is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    /// Variables layered on top of the inherited environment
    pub env: HashMap<String, String>,
    /// Inherited variables the kernel process must not see
    pub remove_env: Vec<String>,
}

impl LaunchPlan {
    /// Full argument vector, program first
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}
