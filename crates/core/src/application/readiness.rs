// Readiness Verifier
// Confirms that a named environment exists, contains the kernel package, and is installed

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::introspect::ProjectIntrospector;
use super::pixi::PixiClient;
use super::shell_env::strip_shell_marker;
use crate::domain::{EnvMap, Environment, ListedPackage};
use crate::error::{ReadinessError, Result};

const LIST_COMMAND: &str = "pixi list";

/// Input of one readiness check
#[derive(Debug, Clone)]
pub struct ReadinessRequest {
    pub environment_name: String,
    pub cwd: PathBuf,
    pub env: EnvMap,
    pub required_package: String,
    /// Display name of the kernel, used in user-facing messages
    pub kernel_name: String,
}

/// Readiness verifier
///
/// Pipeline (strictly sequential, stops at the first failure):
/// 1. Strip the `pixi shell` marker from the request environment
/// 2. Locate Pixi and check its version
/// 3. `pixi info --json` in the working directory
/// 4. No project: `pixi project version get` for a precise message
/// 5. Find the requested environment
/// 6. Direct dependency check, then `pixi list --json` for transitive ones
/// 7. `pixi install --environment <name>`
/// 8. Return the environment
pub struct ReadinessVerifier {
    client: Arc<PixiClient>,
    introspector: ProjectIntrospector,
}

impl ReadinessVerifier {
    pub fn new(client: Arc<PixiClient>) -> Self {
        Self {
            introspector: ProjectIntrospector::new(client.clone()),
            client,
        }
    }

    /// Run the full readiness pipeline
    ///
    /// # Example
    /// ```text
    /// let environment = verifier.verify(ReadinessRequest {
    ///     environment_name: "default".into(),
    ///     cwd: notebook_dir,
    ///     env: std::env::vars().collect(),
    ///     required_package: "ipykernel".into(),
    ///     kernel_name: "Python (Pixi)".into(),
    /// }).await?;
    /// println!("kernel prefix: {}", environment.prefix.display());
    /// ```
    pub async fn verify(&self, request: ReadinessRequest) -> Result<Environment> {
        let ReadinessRequest {
            environment_name,
            cwd,
            mut env,
            required_package,
            kernel_name,
        } = request;

        info!(
            environment = %environment_name,
            cwd = %cwd.display(),
            required_package = %required_package,
            kernel = %kernel_name,
            "Verifying environment readiness"
        );

        strip_shell_marker(&mut env);

        self.client.ensure_compatible(&kernel_name, &env).await?;

        let project_info = self.introspector.info(&cwd, &env, None).await?;

        let Some(project) = project_info.project.as_ref() else {
            return Err(self.explain_missing_project(&cwd, &env).await);
        };
        debug!(manifest = %project.manifest_path.display(), "Found Pixi project");

        let environment = project_info
            .environment(&environment_name)
            .cloned()
            .ok_or_else(|| ReadinessError::EnvironmentNotFound {
                name: environment_name.clone(),
            })?;

        if environment.depends_on(&required_package) {
            debug!(package = %required_package, "Required package is a direct dependency");
        } else {
            self.check_transitive(&environment, &required_package, &kernel_name, &cwd, &env)
                .await?;
        }

        self.install(&environment_name, &cwd, &env).await?;

        info!(
            environment = %environment.name,
            prefix = %environment.prefix.display(),
            "Environment is ready"
        );
        Ok(environment)
    }

    /// Ask Pixi why there is no project; its exit code is irrelevant
    async fn explain_missing_project(&self, cwd: &Path, env: &EnvMap) -> ReadinessError {
        let generic = || {
            format!(
                "could not find pixi.toml or pyproject.toml at directory {} or any of its parents",
                cwd.display()
            )
        };

        let message = match self
            .client
            .run(&["project", "version", "get"], cwd, env)
            .await
        {
            Ok(output) if !output.stderr.trim().is_empty() => output.stderr,
            Ok(_) => generic(),
            Err(e) => {
                warn!(error = %e, "pixi project version get could not run");
                generic()
            }
        };

        ReadinessError::ProjectNotFound { message }
    }

    async fn check_transitive(
        &self,
        environment: &Environment,
        required_package: &str,
        kernel_name: &str,
        cwd: &Path,
        env: &EnvMap,
    ) -> Result<()> {
        let output = self
            .client
            .run(
                &["list", "--json", "--environment", &environment.name],
                cwd,
                env,
            )
            .await
            .map_err(|e| ReadinessError::CommandFailed {
                command: LIST_COMMAND.to_string(),
                stderr: e.to_string(),
            })?;

        debug!(stdout = %output.stdout, stderr = %output.stderr, "pixi list finished");

        if !output.success() {
            return Err(ReadinessError::CommandFailed {
                command: LIST_COMMAND.to_string(),
                stderr: output.stderr,
            });
        }

        let packages: Vec<ListedPackage> =
            serde_json::from_str(&output.stdout).map_err(|e| ReadinessError::OutputMalformed {
                command: LIST_COMMAND.to_string(),
                raw: output.stdout.clone(),
                reason: e.to_string(),
            })?;

        if packages.iter().any(|p| p.name == required_package) {
            debug!(package = %required_package, "Required package is a transitive dependency");
            return Ok(());
        }

        Err(ReadinessError::PackageNotFound {
            kernel_name: kernel_name.to_string(),
            package: required_package.to_string(),
            prefix: environment.prefix.clone(),
        })
    }

    async fn install(&self, environment_name: &str, cwd: &Path, env: &EnvMap) -> Result<()> {
        let install_failed = |stderr: String| ReadinessError::InstallFailed {
            environment: environment_name.to_string(),
            stderr,
        };

        let output = self
            .client
            .run(&["install", "--environment", environment_name], cwd, env)
            .await
            .map_err(|e| install_failed(e.to_string()))?;

        if !output.success() {
            warn!(environment = %environment_name, exit_code = output.exit_code, "pixi install failed");
            return Err(install_failed(output.stderr));
        }

        Ok(())
    }
}
