// Pixi client: locator + version gate + command runner

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::locator::BinaryLocator;
use super::shell_env::without_shell_marker;
use super::version_gate::VersionGate;
use crate::domain::{EnvMap, VersionTuple};
use crate::error::{ReadinessError, Result};
use crate::port::{BinaryProbe, CommandOutput, CommandRunner, CommandSpec, ExecutionError};

/// Handle on the Pixi binary
///
/// Owns the process-lifetime caches (binary location and version pass). Share one
/// instance behind an `Arc` for the whole process.
pub struct PixiClient {
    locator: BinaryLocator,
    gate: VersionGate,
    runner: Arc<dyn CommandRunner>,
}

impl PixiClient {
    pub fn new(probe: Arc<dyn BinaryProbe>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            locator: BinaryLocator::new(probe),
            gate: VersionGate::default(),
            runner,
        }
    }

    /// Override the minimum supported version
    pub fn with_minimum_version(mut self, minimum: VersionTuple) -> Self {
        self.gate = VersionGate::new(minimum);
        self
    }

    pub fn locator(&self) -> &BinaryLocator {
        &self.locator
    }

    pub fn gate(&self) -> &VersionGate {
        &self.gate
    }

    /// Clear both process-lifetime caches
    pub fn reset_caches(&self) {
        self.locator.reset();
        self.gate.reset();
    }

    /// Locate the binary and confirm its version
    ///
    /// `--version` runs with `env` minus the `pixi shell` marker.
    ///
    /// # Errors
    /// - ReadinessError::ToolNotFound if no binary was located
    /// - ReadinessError::ToolCorrupted / ToolOutdated from the version gate
    pub async fn ensure_compatible(&self, kernel_name: &str, env: &EnvMap) -> Result<PathBuf> {
        let binary = self
            .locator
            .locate()
            .map_err(|_| ReadinessError::ToolNotFound {
                kernel_name: kernel_name.to_string(),
            })?;

        self.gate
            .check(
                &binary,
                self.runner.as_ref(),
                kernel_name,
                &without_shell_marker(env),
            )
            .await?;

        Ok(binary)
    }

    /// Run a Pixi subcommand in `cwd` with exactly the variables in `env`
    pub async fn run(
        &self,
        args: &[&str],
        cwd: &Path,
        env: &EnvMap,
    ) -> std::result::Result<CommandOutput, ExecutionError> {
        let binary = self
            .locator
            .locate()
            .map_err(|e| ExecutionError::SpawnFailed(e.to_string()))?;

        debug!(args = ?args, cwd = %cwd.display(), "Running pixi");

        let spec = CommandSpec::new(binary)
            .args(args.iter().copied())
            .current_dir(cwd)
            .env(env.clone());

        self.runner.run(&spec).await
    }
}
