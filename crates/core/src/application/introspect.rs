// Project Introspector
// Runs `pixi info --json` and decodes it into ProjectInfo

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::pixi::PixiClient;
use super::shell_env::without_shell_marker;
use crate::domain::{EnvMap, ProjectInfo};
use crate::error::ReadinessError;
use crate::port::ExecutionError;

const INFO_COMMAND: &str = "pixi info";

/// Introspection failures
///
/// An absent project is *not* an error here; callers decide how to report it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntrospectError {
    #[error("'pixi info' could not be started: {0}")]
    Execution(#[from] ExecutionError),

    #[error("'pixi info' failed: {stderr}")]
    CommandFailed { stderr: String },

    #[error("'pixi info' printed malformed JSON: {reason}")]
    Malformed { raw: String, reason: String },
}

impl From<IntrospectError> for ReadinessError {
    fn from(err: IntrospectError) -> Self {
        match err {
            IntrospectError::Execution(e) => ReadinessError::CommandFailed {
                command: INFO_COMMAND.to_string(),
                stderr: e.to_string(),
            },
            IntrospectError::CommandFailed { stderr } => ReadinessError::CommandFailed {
                command: INFO_COMMAND.to_string(),
                stderr,
            },
            IntrospectError::Malformed { raw, reason } => ReadinessError::OutputMalformed {
                command: INFO_COMMAND.to_string(),
                raw,
                reason,
            },
        }
    }
}

/// Project introspector
pub struct ProjectIntrospector {
    client: Arc<PixiClient>,
}

impl ProjectIntrospector {
    pub fn new(client: Arc<PixiClient>) -> Self {
        Self { client }
    }

    /// Describe the project containing `cwd`
    ///
    /// # Arguments
    /// * `cwd` - Directory Pixi starts its manifest search from
    /// * `env` - Environment for the child; the shell marker is removed first
    /// * `manifest_path` - Optional explicit manifest, bypassing the directory search
    pub async fn info(
        &self,
        cwd: &Path,
        env: &EnvMap,
        manifest_path: Option<&Path>,
    ) -> Result<ProjectInfo, IntrospectError> {
        let env = without_shell_marker(env);

        let manifest_arg = manifest_path.map(|p| format!("--manifest-path={}", p.display()));
        let mut args = vec!["info", "--json"];
        if let Some(arg) = manifest_arg.as_deref() {
            args.push(arg);
        }

        let output = self.client.run(&args, cwd, &env).await?;

        debug!(stdout = %output.stdout, stderr = %output.stderr, "pixi info finished");

        if !output.success() {
            warn!(exit_code = output.exit_code, "pixi info failed");
            return Err(IntrospectError::CommandFailed {
                stderr: output.stderr,
            });
        }

        decode_info(&output.stdout)
    }
}

/// Decode `pixi info --json` stdout
pub fn decode_info(stdout: &str) -> Result<ProjectInfo, IntrospectError> {
    serde_json::from_str(stdout).map_err(|e| IntrospectError::Malformed {
        raw: stdout.to_string(),
        reason: e.to_string(),
    })
}
