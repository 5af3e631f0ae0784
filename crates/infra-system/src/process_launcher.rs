// Process launcher for the guest kernel
// Unix replaces the current process by default; managed mode spawns and forwards signals
use std::process::ExitStatus;
use thiserror::Error;
use tracing::info;

use pixi_kernel_core::domain::LaunchPlan;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("Failed to wait for {program}: {reason}")]
    Wait { program: String, reason: String },
}

/// How the guest kernel process relates to this one
///
/// Windows only has `Managed`. There the child shares the launcher's console, so
/// Ctrl+C and Ctrl+Break reach it from the console itself and nothing is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// exec(2) into the kernel; no signal forwarding needed (Unix only)
    Replace,
    /// Spawn the kernel as a child, forward signals, exit with its code
    Managed,
}

impl Default for LaunchMode {
    fn default() -> Self {
        if cfg!(unix) {
            LaunchMode::Replace
        } else {
            LaunchMode::Managed
        }
    }
}

/// Start the guest kernel described by `plan`
///
/// Returns the exit code to terminate this process with. In `Replace` mode this only
/// returns on failure.
pub async fn launch(plan: &LaunchPlan, mode: LaunchMode) -> Result<i32, LaunchError> {
    info!(argv = ?plan.argv(), mode = ?mode, "Starting kernel process");

    match mode {
        #[cfg(unix)]
        LaunchMode::Replace => Err(replace(plan)),
        _ => run_managed(plan).await,
    }
}

#[cfg(unix)]
fn replace(plan: &LaunchPlan) -> LaunchError {
    use std::os::unix::process::CommandExt;

    let mut command = std::process::Command::new(&plan.program);
    command.args(&plan.args);
    for name in &plan.remove_env {
        command.env_remove(name);
    }
    let err = command.envs(&plan.env).exec();

    LaunchError::Spawn {
        program: plan.program.clone(),
        reason: err.to_string(),
    }
}

async fn run_managed(plan: &LaunchPlan) -> Result<i32, LaunchError> {
    // Listen before spawning so a signal arriving during startup is queued, not lost
    #[cfg(unix)]
    let forwarder = crate::signal_forwarder::SignalForwarder::listen();

    let mut command = tokio::process::Command::new(&plan.program);
    command.args(&plan.args);
    for name in &plan.remove_env {
        command.env_remove(name);
    }
    let mut child = command
        .envs(&plan.env)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| LaunchError::Spawn {
            program: plan.program.clone(),
            reason: e.to_string(),
        })?;

    #[cfg(unix)]
    let _forwarder = child.id().map(|pid| forwarder.forward_to(pid));

    let status = child.wait().await.map_err(|e| LaunchError::Wait {
        program: plan.program.clone(),
        reason: e.to_string(),
    })?;

    let code = exit_code(status);
    info!(exit_code = code, "Kernel process exited");
    Ok(code)
}

/// Exit code to propagate: the child's own, or 128 + signal number when it was killed
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
