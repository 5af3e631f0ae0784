// Central Error Type for readiness verification
//
// Every variant renders to a message that is shown to the notebook user as-is,
// either as an HTTP error body or through the fallback kernel.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::VersionTuple;

/// Where users are pointed when a remediation does not work
pub const ISSUE_TRACKER_URL: &str = "https://github.com/renan-r-santos/pixi-kernel/issues";

/// Pixi installation guide
pub const INSTALL_GUIDE_URL: &str = "https://pixi.sh/latest/";

/// Readiness failure taxonomy
///
/// All variants are terminal for a single readiness check; none are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    #[error(
        "Pixi was not found on this system, but it is required to run the {kernel_name} kernel.\n\
         To install Pixi:\n    \
             1. Follow the installation guide at {guide}\n    \
             2. Restart JupyterLab.\n    \
             3. Check that Pixi is on your PATH by running 'which pixi' in a terminal.\n\n\
         If the problem persists, report it at {issues}\n",
        guide = INSTALL_GUIDE_URL,
        issues = ISSUE_TRACKER_URL
    )]
    ToolNotFound { kernel_name: String },

    #[error(
        "Pixi was found on this system but it does not seem to work.\n\
         To run the {kernel_name} kernel, reinstall Pixi:\n    \
             1. Follow the installation guide at {guide}\n    \
             2. Restart JupyterLab.\n    \
             3. Check that 'pixi --version' works in a terminal.\n\n\
         If the problem persists, report it at {issues}\n",
        guide = INSTALL_GUIDE_URL,
        issues = ISSUE_TRACKER_URL
    )]
    ToolCorrupted { kernel_name: String },

    #[error(
        "Pixi {found} was found on this system but the {kernel_name} kernel needs at least \
         Pixi {minimum}.\n\
         Run 'pixi self-update' in a terminal to upgrade Pixi and restart your kernel.\n\n\
         If the problem persists, report it at {issues}\n",
        issues = ISSUE_TRACKER_URL
    )]
    ToolOutdated {
        kernel_name: String,
        minimum: VersionTuple,
        found: VersionTuple,
    },

    #[error("Failed to run '{command}': {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Failed to parse '{command}' output: {raw}\n{reason}")]
    OutputMalformed {
        command: String,
        raw: String,
        reason: String,
    },

    /// Message is the package manager's own explanation (manifest parse error,
    /// no manifest found, ...) relayed verbatim
    #[error("{message}")]
    ProjectNotFound { message: String },

    #[error("Pixi environment {name} not found.")]
    EnvironmentNotFound { name: String },

    #[error(
        "To run the {kernel_name} kernel, add the {package} package to your project \
         dependencies.\n\
         Run 'pixi add {package}' in your project directory and restart your kernel.\n\
         Make sure the environment prefix\n{}\npoints to the correct Pixi environment.\n\n\
         If the problem persists, report it at {issues}\n",
        .prefix.display(),
        issues = ISSUE_TRACKER_URL
    )]
    PackageNotFound {
        kernel_name: String,
        package: String,
        prefix: PathBuf,
    },

    #[error("Failed to run 'pixi install --environment {environment}': {stderr}")]
    InstallFailed { environment: String, stderr: String },
}

/// Result type alias using ReadinessError
pub type Result<T> = std::result::Result<T, ReadinessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_not_found_is_actionable() {
        let err = ReadinessError::PackageNotFound {
            kernel_name: "Python (Pixi)".to_string(),
            package: "ipykernel".to_string(),
            prefix: PathBuf::from("/work/.pixi/envs/default"),
        };
        let message = err.to_string();

        assert!(message.contains("Python (Pixi)"));
        assert!(message.contains("pixi add ipykernel"));
        assert!(message.contains("/work/.pixi/envs/default"));
        assert!(message.contains(ISSUE_TRACKER_URL));
    }

    #[test]
    fn test_outdated_mentions_both_versions() {
        let err = ReadinessError::ToolOutdated {
            kernel_name: "R (Pixi)".to_string(),
            minimum: VersionTuple::new(0, 30, 0),
            found: VersionTuple::new(0, 15, 2),
        };
        let message = err.to_string();

        assert!(message.contains("0.30.0"));
        assert!(message.contains("0.15.2"));
        assert!(message.contains("pixi self-update"));
    }

    #[test]
    fn test_project_not_found_is_verbatim() {
        let err = ReadinessError::ProjectNotFound {
            message: "could not find pixi.toml or pyproject.toml".to_string(),
        };
        assert_eq!(err.to_string(), "could not find pixi.toml or pyproject.toml");
    }

    #[test]
    fn test_malformed_output_contains_raw() {
        let err = ReadinessError::OutputMalformed {
            command: "pixi info".to_string(),
            raw: "not JSON".to_string(),
            reason: "expected value at line 1 column 1".to_string(),
        };
        let message = err.to_string();

        assert!(message.starts_with("Failed to parse 'pixi info' output"));
        assert!(message.contains("not JSON"));
        assert!(message.contains("expected value"));
    }
}
