// Kernel Provisioner
// Decides between launching the guest kernel and serving the fallback kernel

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use super::launch::{kernel_metadata, plan_launch, resolve_environment_name};
use super::pixi::PixiClient;
use super::readiness::{ReadinessRequest, ReadinessVerifier};
use crate::domain::{EnvMap, KernelSpec, LaunchPlan};
use crate::error::ReadinessError;

/// Everything known about one kernel start
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub spec: KernelSpec,
    /// Guest command line; the kernel spec argv when empty
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub env: EnvMap,
}

/// Outcome of provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchDecision {
    /// Start the guest kernel with this plan
    Kernel(LaunchPlan),
    /// Start the fallback kernel, relaying this message to the user
    Fallback { message: String },
}

pub struct KernelProvisioner {
    client: Arc<PixiClient>,
    verifier: ReadinessVerifier,
}

impl KernelProvisioner {
    pub fn new(client: Arc<PixiClient>) -> Self {
        Self {
            verifier: ReadinessVerifier::new(client.clone()),
            client,
        }
    }

    /// Validate metadata, verify readiness and build the launch plan
    ///
    /// Never fails: every problem becomes a `Fallback` with a user-facing message.
    pub async fn prepare(&self, request: ProvisionRequest) -> LaunchDecision {
        let ProvisionRequest {
            spec,
            argv,
            cwd,
            env,
        } = request;

        let metadata = match kernel_metadata(&spec) {
            Ok(metadata) => metadata,
            Err(e) => return fallback(e.to_string()),
        };

        let environment_name = resolve_environment_name(&env);
        info!(
            kernel = %metadata.display_name,
            environment = %environment_name,
            cwd = %cwd.display(),
            "Provisioning kernel"
        );

        let environment = match self
            .verifier
            .verify(ReadinessRequest {
                environment_name,
                cwd,
                env,
                required_package: metadata.required_package.clone(),
                kernel_name: metadata.display_name.clone(),
            })
            .await
        {
            Ok(environment) => environment,
            Err(e) => return fallback(e.to_string()),
        };

        // Readiness already located the binary
        let pixi = match self.client.locator().locate() {
            Ok(path) => path,
            Err(_) => {
                return fallback(
                    ReadinessError::ToolNotFound {
                        kernel_name: metadata.display_name,
                    }
                    .to_string(),
                )
            }
        };

        let argv = if argv.is_empty() { &spec.argv } else { &argv };
        match plan_launch(&metadata, argv, &spec.env, &environment, &pixi) {
            Ok(plan) => {
                info!(argv = ?plan.argv(), "Launching {}", metadata.display_name);
                LaunchDecision::Kernel(plan)
            }
            Err(e) => fallback(e.to_string()),
        }
    }
}

fn fallback(message: String) -> LaunchDecision {
    error!(message = %message, "Kernel cannot start, serving fallback kernel");
    LaunchDecision::Fallback { message }
}
