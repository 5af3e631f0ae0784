// Launch planning
// Kernel metadata validation, environment selection and argv rewriting

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::constants::{
    PIXI_EXECUTABLE, R_KERNEL_PACKAGE, R_LIBRARY_VARS, SESSION_NAME_VAR, SHELL_MARKER_VAR,
};
use super::shell_env::default_environment_name;
use crate::domain::kernel::{ENVIRONMENT_KEY, METADATA_KEY, REQUIRED_PACKAGE_KEY};
use crate::domain::{EnvMap, Environment, KernelMetadata, KernelSpec, LaunchPlan};

/// Configuration problems that send the kernel to the fallback path
///
/// These are not readiness failures: Pixi is never consulted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchConfigError {
    #[error("Kernel {display_name} uses pixi-kernel but does not have any Pixi kernel metadata.")]
    MissingMetadata { display_name: String },

    #[error("Kernel {display_name} is missing the 'required-package' metadata.")]
    MissingRequiredPackage { display_name: String },

    #[error("Kernel {display_name} has an empty command line.")]
    EmptyArgv { display_name: String },

    #[error("{var} is not set", var = SESSION_NAME_VAR)]
    SessionNameUnset,

    #[error("Cannot read notebook {}: {reason}", .path.display())]
    NotebookUnreadable { path: PathBuf, reason: String },

    #[error("Notebook {} has no pixi-kernel environment metadata", .path.display())]
    NotebookWithoutEnvironment { path: PathBuf },
}

/// Validate the Pixi section of a kernel spec
pub fn kernel_metadata(spec: &KernelSpec) -> Result<KernelMetadata, LaunchConfigError> {
    let section = spec
        .pixi_metadata()
        .ok_or_else(|| LaunchConfigError::MissingMetadata {
            display_name: spec.display_name.clone(),
        })?;

    let required_package = section
        .get(REQUIRED_PACKAGE_KEY)
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LaunchConfigError::MissingRequiredPackage {
            display_name: spec.display_name.clone(),
        })?;

    Ok(KernelMetadata {
        display_name: spec.display_name.clone(),
        required_package: required_package.to_string(),
    })
}

/// Environment selected in a notebook's `metadata.pixi-kernel.environment`
pub fn notebook_environment(path: &Path) -> Result<String, LaunchConfigError> {
    let unreadable = |reason: String| LaunchConfigError::NotebookUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let notebook: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;

    notebook
        .get("metadata")
        .and_then(|m| m.get(METADATA_KEY))
        .and_then(|m| m.get(ENVIRONMENT_KEY))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| LaunchConfigError::NotebookWithoutEnvironment {
            path: path.to_path_buf(),
        })
}

/// Environment name for a kernel session
///
/// Reads the notebook named by `JPY_SESSION_NAME`. Any failure falls back to the
/// default environment name; a broken notebook never blocks kernel startup.
pub fn resolve_environment_name(env: &EnvMap) -> String {
    let selected = env
        .get(SESSION_NAME_VAR)
        .ok_or(LaunchConfigError::SessionNameUnset)
        .and_then(|path| notebook_environment(Path::new(path)));

    match selected {
        Ok(name) => {
            debug!(environment = %name, "Environment selected by notebook metadata");
            name
        }
        Err(e) => {
            let fallback = default_environment_name(env);
            warn!(error = %e, environment = %fallback, "Falling back to the default environment");
            fallback
        }
    }
}

/// Insert `--environment <name>` after the first two tokens (`pixi run`)
///
/// Relative order of the original tokens is preserved.
pub fn insert_environment_flag(argv: &[String], environment: &str) -> Vec<String> {
    let at = argv.len().min(2);
    let mut rewritten = Vec::with_capacity(argv.len() + 2);
    rewritten.extend_from_slice(&argv[..at]);
    rewritten.push("--environment".to_string());
    rewritten.push(environment.to_string());
    rewritten.extend_from_slice(&argv[at..]);
    rewritten
}

/// Library directory of an R environment
pub fn r_library_path(prefix: &Path) -> PathBuf {
    prefix.join("lib").join("R").join("library")
}

/// Build the launch plan for a ready environment
///
/// # Arguments
/// * `argv` - Guest kernel command line, normally starting with `pixi run`
/// * `spec_env` - Variables from the kernel spec
/// * `pixi` - Located Pixi binary, substituted for a bare `pixi` program name
pub fn plan_launch(
    metadata: &KernelMetadata,
    argv: &[String],
    spec_env: &HashMap<String, String>,
    environment: &Environment,
    pixi: &Path,
) -> Result<LaunchPlan, LaunchConfigError> {
    if argv.is_empty() {
        return Err(LaunchConfigError::EmptyArgv {
            display_name: metadata.display_name.clone(),
        });
    }

    let mut rewritten = insert_environment_flag(argv, &environment.name);
    let program = rewritten.remove(0);
    let program = if program == PIXI_EXECUTABLE {
        pixi.to_string_lossy().into_owned()
    } else {
        program
    };

    let mut env = spec_env.clone();
    if metadata.required_package == R_KERNEL_PACKAGE {
        let library = r_library_path(&environment.prefix)
            .to_string_lossy()
            .into_owned();
        for var in R_LIBRARY_VARS {
            env.insert(var.to_string(), library.clone());
        }
    }

    Ok(LaunchPlan {
        program,
        args: rewritten,
        env,
        remove_env: vec![SHELL_MARKER_VAR.to_string()],
    })
}

/// Connection file of a guest command line: the first existing `.json` argument
pub fn find_connection_file(argv: &[String]) -> Option<PathBuf> {
    argv.iter()
        .map(PathBuf::from)
        .find(|p| p.extension().is_some_and(|ext| ext == "json") && p.is_file())
}
