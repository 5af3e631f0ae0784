// Version Gate
// Confirms the located binary runs and is recent enough; caches a pass

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use super::constants::{MINIMUM_PIXI_VERSION, VERSION_OUTPUT_PREFIX};
use crate::domain::{EnvMap, VersionTuple};
use crate::error::{ReadinessError, Result};
use crate::port::{CommandOutput, CommandRunner, CommandSpec};

/// Version gate
///
/// Only a positive result is cached. A corrupted or outdated binary is re-checked on
/// the next call so that a `pixi self-update` is picked up without a restart.
pub struct VersionGate {
    minimum: VersionTuple,
    passed: AtomicBool,
}

impl Default for VersionGate {
    fn default() -> Self {
        Self::new(MINIMUM_PIXI_VERSION)
    }
}

impl VersionGate {
    pub fn new(minimum: VersionTuple) -> Self {
        Self {
            minimum,
            passed: AtomicBool::new(false),
        }
    }

    /// Whether a previous check passed
    pub fn is_verified(&self) -> bool {
        self.passed.load(Ordering::Acquire)
    }

    /// Forget a previous pass
    pub fn reset(&self) {
        self.passed.store(false, Ordering::Release);
    }

    /// Run `<binary> --version` with exactly `env` and compare against the minimum
    ///
    /// # Errors
    /// - ReadinessError::ToolCorrupted if the binary cannot run, exits non-zero, or
    ///   prints something other than `pixi <major>.<minor>.<patch>`
    /// - ReadinessError::ToolOutdated if the version is below the minimum
    pub async fn check(
        &self,
        binary: &Path,
        runner: &dyn CommandRunner,
        kernel_name: &str,
        env: &EnvMap,
    ) -> Result<()> {
        if self.is_verified() {
            debug!("Pixi version already verified");
            return Ok(());
        }

        let corrupted = || ReadinessError::ToolCorrupted {
            kernel_name: kernel_name.to_string(),
        };

        let output = runner
            .run(
                &CommandSpec::new(binary)
                    .args(["--version"])
                    .env(env.clone()),
            )
            .await
            .map_err(|e| {
                warn!(binary = %binary.display(), error = %e, "Failed to run pixi --version");
                corrupted()
            })?;

        let version = parse_version_output(&output).ok_or_else(|| {
            warn!(
                exit_code = output.exit_code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "Unexpected pixi --version output"
            );
            corrupted()
        })?;

        if version < self.minimum {
            warn!(found = %version, minimum = %self.minimum, "Pixi is outdated");
            return Err(ReadinessError::ToolOutdated {
                kernel_name: kernel_name.to_string(),
                minimum: self.minimum,
                found: version,
            });
        }

        info!(version = %version, "Pixi version verified");
        self.passed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Parse `pixi X.Y.Z` from a successful `--version` run
pub fn parse_version_output(output: &CommandOutput) -> Option<VersionTuple> {
    if !output.success() {
        return None;
    }

    output
        .stdout
        .strip_prefix(VERSION_OUTPUT_PREFIX)?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::command_runner::mocks::ScriptedCommandRunner;
    use crate::port::ExecutionError;
    use std::path::PathBuf;

    fn binary() -> PathBuf {
        PathBuf::from("/usr/bin/pixi")
    }

    #[tokio::test]
    async fn test_equal_to_minimum_is_accepted() {
        let runner = ScriptedCommandRunner::new().on(&["--version"], 0, "pixi 0.30.0\n", "");
        let gate = VersionGate::default();

        tokio_test::assert_ok!(gate.check(&binary(), &runner, "Python", &EnvMap::new()).await);
        assert!(gate.is_verified());
    }

    #[tokio::test]
    async fn test_one_patch_below_minimum_is_rejected() {
        let runner = ScriptedCommandRunner::new().on(&["--version"], 0, "pixi 0.30.0\n", "");
        let gate = VersionGate::new(VersionTuple::new(0, 30, 1));

        let result = gate.check(&binary(), &runner, "Python", &EnvMap::new()).await;

        assert_eq!(
            result,
            Err(ReadinessError::ToolOutdated {
                kernel_name: "Python".to_string(),
                minimum: VersionTuple::new(0, 30, 1),
                found: VersionTuple::new(0, 30, 0),
            })
        );
        assert!(!gate.is_verified());
    }

    #[tokio::test]
    async fn test_outdated_release() {
        let runner = ScriptedCommandRunner::new().on(&["--version"], 0, "pixi 0.15.0\n", "");
        let gate = VersionGate::default();

        let result = gate.check(&binary(), &runner, "Python", &EnvMap::new()).await;
        assert!(matches!(result, Err(ReadinessError::ToolOutdated { .. })));
    }

    #[tokio::test]
    async fn test_bad_exit_code_is_corrupted() {
        let runner = ScriptedCommandRunner::new().on(&["--version"], 1, "", "");
        let gate = VersionGate::default();

        let result = gate.check(&binary(), &runner, "Python", &EnvMap::new()).await;
        assert_eq!(
            result,
            Err(ReadinessError::ToolCorrupted {
                kernel_name: "Python".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_wrong_stdout_is_corrupted() {
        for stdout in ["wrong output", "pixi version unknown", "pixi 0.30"] {
            let runner = ScriptedCommandRunner::new().on(&["--version"], 0, stdout, "");
            let gate = VersionGate::default();

            let result = gate.check(&binary(), &runner, "Python", &EnvMap::new()).await;
            assert!(
                matches!(result, Err(ReadinessError::ToolCorrupted { .. })),
                "{stdout}"
            );
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_is_corrupted() {
        let runner = ScriptedCommandRunner::new().on_error(
            &["--version"],
            ExecutionError::SpawnFailed("permission denied".to_string()),
        );
        let gate = VersionGate::default();

        let result = gate.check(&binary(), &runner, "Python", &EnvMap::new()).await;
        assert!(matches!(result, Err(ReadinessError::ToolCorrupted { .. })));
    }

    #[tokio::test]
    async fn test_pass_is_cached() {
        let runner = ScriptedCommandRunner::new().on(&["--version"], 0, "pixi 0.41.3\n", "");
        let gate = VersionGate::default();

        gate.check(&binary(), &runner, "Python", &EnvMap::new()).await.unwrap();
        gate.check(&binary(), &runner, "Python", &EnvMap::new()).await.unwrap();
        assert_eq!(runner.calls_with(&["--version"]), 1);

        gate.reset();
        gate.check(&binary(), &runner, "Python", &EnvMap::new()).await.unwrap();
        assert_eq!(runner.calls_with(&["--version"]), 2);
    }
}
