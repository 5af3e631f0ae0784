// Project Domain Model
// Shapes decoded from `pixi info --json` and `pixi list --json`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Decoded `pixi info --json` output
///
/// Only the fields the readiness protocol consumes are modelled; everything else Pixi
/// reports (platform, cache dir, auth file, ...) is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(rename = "environments_info")]
    pub environments: Vec<Environment>,

    /// `None` when no manifest was found in the directory or its ancestors
    #[serde(rename = "project_info", default)]
    pub project: Option<Project>,
}

impl ProjectInfo {
    /// Look up an environment by its exact name
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|env| env.name == name)
    }
}

/// Project manifest location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub manifest_path: PathBuf,
}

/// A named, isolated environment within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub dependencies: Vec<String>,
    pub pypi_dependencies: Vec<String>,
    pub prefix: PathBuf,
}

impl Environment {
    /// Direct dependencies: conda dependencies followed by PyPI dependencies
    pub fn direct_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .chain(self.pypi_dependencies.iter())
            .map(String::as_str)
    }

    /// Check whether `package` is a direct dependency of this environment
    pub fn depends_on(&self, package: &str) -> bool {
        self.direct_dependencies().any(|dep| dep == package)
    }
}

/// One entry of `pixi list --json` (direct and transitive packages)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedPackage {
    pub name: String,
}
