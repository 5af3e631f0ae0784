// Subprocess executor implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::io::Read;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::{Child, ChildStderr, ChildStdout, Output, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use pixi_kernel_core::port::{CommandOutput, CommandRunner, CommandSpec, ExecutionError};

/// Poll interval while reaping a child whose output pipes are already closed
const REAP_INTERVAL: Duration = Duration::from_millis(5);

/// How a child process is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// tokio child process, awaited on the runtime's reactor
    Async,
    /// std child process, waited on a blocking thread (or inline without a runtime)
    Blocking,
}

impl SpawnMode {
    /// Async when the current tokio runtime can drive child processes, blocking otherwise
    ///
    /// tokio process handles need the runtime's IO driver. A caller polled by another
    /// executor, or by a runtime built without `enable_io`, gets the blocking path.
    pub fn detect() -> Self {
        if tokio::runtime::Handle::try_current().is_ok() && io_driver_available() {
            SpawnMode::Async
        } else {
            SpawnMode::Blocking
        }
    }
}

/// Whether the current runtime has an IO driver
///
/// tokio has no query for this and panics when IO is registered without one, so a
/// throwaway socket is registered under `catch_unwind`. Built with `panic = "abort"`,
/// a runtime without IO aborts here instead.
fn io_driver_available() -> bool {
    let Ok(socket) = std::net::UdpSocket::bind((std::net::Ipv4Addr::LOCALHOST, 0)) else {
        return false;
    };
    if socket.set_nonblocking(true).is_err() {
        return false;
    }

    catch_unwind(AssertUnwindSafe(move || {
        tokio::net::UdpSocket::from_std(socket).is_ok()
    }))
    .unwrap_or(false)
}

/// Child shared between a blocking waiter and the future awaiting it
///
/// The waiter takes the child once reaped. Dropping the guard while the child is
/// still in the slot kills it.
struct KillOnDrop(Arc<Mutex<Option<Child>>>);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(child) = slot.as_mut() {
            debug!(pid = child.id(), "Killing subprocess of a cancelled run");
            if let Err(e) = child.kill() {
                warn!(pid = child.id(), error = %e, "Failed to kill subprocess");
            }
        }
    }
}

fn io_error(e: std::io::Error) -> ExecutionError {
    ExecutionError::IoError(e.to_string())
}

fn read_pipe(pipe: Option<impl Read>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

/// Drain both pipes, then reap the child left in `slot`
fn collect_output(
    slot: &Mutex<Option<Child>>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> Result<Output, ExecutionError> {
    let (stdout, stderr) = std::thread::scope(|scope| {
        let stderr = scope.spawn(move || read_pipe(stderr));
        let stdout = read_pipe(stdout);
        let stderr = stderr
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("stderr reader panicked")));
        (stdout, stderr)
    });
    let stdout = stdout.map_err(io_error)?;
    let stderr = stderr.map_err(io_error)?;

    loop {
        {
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            let child = slot
                .as_mut()
                .ok_or_else(|| ExecutionError::IoError("child handle missing".to_string()))?;
            if let Some(status) = child.try_wait().map_err(io_error)? {
                slot.take();
                return Ok(Output {
                    status,
                    stdout,
                    stderr,
                });
            }
        }
        std::thread::sleep(REAP_INTERVAL);
    }
}

/// Subprocess executor
///
/// Captures stdout/stderr as strict UTF-8. A cancelled run kills its child in either
/// mode, so no process outlives the future driving it.
#[derive(Debug, Clone, Default)]
pub struct SubprocessExecutor {
    forced_mode: Option<SpawnMode>,
}

impl SubprocessExecutor {
    /// Create an executor that detects the spawn mode per call
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor that always uses `mode`
    ///
    /// Forcing `Async` requires a tokio runtime with IO enabled.
    pub fn with_mode(mode: SpawnMode) -> Self {
        Self {
            forced_mode: Some(mode),
        }
    }

    fn mode(&self) -> SpawnMode {
        self.forced_mode.unwrap_or_else(SpawnMode::detect)
    }

    /// Spawn with tokio and wait for output
    async fn run_async(spec: &CommandSpec) -> Result<Output, ExecutionError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = &spec.env {
            command.env_clear().envs(env);
        }

        let child = command
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(e.to_string()))?;

        child.wait_with_output().await.map_err(io_error)
    }

    fn std_command(spec: &CommandSpec) -> std::process::Command {
        let mut command = std::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = &spec.env {
            command.env_clear().envs(env);
        }
        command
    }

    /// Spawn with std and block until the child exits
    fn run_blocking(spec: &CommandSpec) -> Result<Output, ExecutionError> {
        let child = Self::std_command(spec)
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(e.to_string()))?;

        child.wait_with_output().map_err(io_error)
    }

    /// Blocking run moved off the async worker when a runtime exists
    ///
    /// The child is spawned here and only waited on the blocking thread, so dropping
    /// this future kills it through [`KillOnDrop`].
    async fn run_offloaded(spec: &CommandSpec) -> Result<Output, ExecutionError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Self::run_blocking(spec);
        }

        let mut child = Self::std_command(spec)
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(e.to_string()))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let slot = Arc::new(Mutex::new(Some(child)));
        let _guard = KillOnDrop(slot.clone());

        tokio::task::spawn_blocking(move || collect_output(&slot, stdout, stderr))
            .await
            .map_err(|e| ExecutionError::IoError(format!("blocking task failed: {}", e)))?
    }

    /// Build the port result from raw process output
    fn build_output(spec: &CommandSpec, output: Output) -> Result<CommandOutput, ExecutionError> {
        // Signal-terminated processes have no exit code
        let exit_code = output.status.code().unwrap_or(-1);

        let stdout = String::from_utf8(output.stdout).map_err(|e| ExecutionError::InvalidUtf8 {
            stream: "stdout",
            reason: e.to_string(),
        })?;
        let stderr = String::from_utf8(output.stderr).map_err(|e| ExecutionError::InvalidUtf8 {
            stream: "stderr",
            reason: e.to_string(),
        })?;

        if spec.check && exit_code != 0 {
            return Err(ExecutionError::NonZeroExit {
                code: exit_code,
                stderr,
            });
        }

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

#[async_trait]
impl CommandRunner for SubprocessExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutionError> {
        let mode = self.mode();

        debug!(
            program = %spec.program.display(),
            args = ?spec.args,
            cwd = ?spec.cwd,
            mode = ?mode,
            "Starting subprocess"
        );

        let output = match mode {
            SpawnMode::Async => Self::run_async(spec).await?,
            SpawnMode::Blocking => Self::run_offloaded(spec).await?,
        };

        let result = Self::build_output(spec, output)?;

        info!(
            program = %spec.program.display(),
            args = ?spec.args,
            exit_code = result.exit_code,
            "Subprocess completed"
        );

        Ok(result)
    }
}
