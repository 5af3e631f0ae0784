// Command Runner Port
// Abstraction for running external programs (the package manager binary)

use crate::domain::EnvMap;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// A single external program invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Complete environment for the child; `None` inherits the caller's environment
    pub env: Option<EnvMap>,
    /// Treat a non-zero exit code as `ExecutionError::NonZeroExit`
    pub check: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, env: EnvMap) -> Self {
        self.env = Some(env);
        self
    }

    pub fn checked(mut self) -> Self {
        self.check = true;
        self
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` when the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Process {stream} is not valid UTF-8: {reason}")]
    InvalidUtf8 {
        stream: &'static str,
        reason: String,
    },

    #[error("Process exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
}

/// Command Runner trait
///
/// Implementations:
/// - SubprocessExecutor: spawns a real child process
/// - ScriptedCommandRunner: canned responses for tests
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion and capture its output
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the program cannot be started
    /// - ExecutionError::InvalidUtf8 if stdout or stderr is not UTF-8
    /// - ExecutionError::NonZeroExit if `spec.check` is set and the exit code is non-zero
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Scripted response for one argument vector
    #[derive(Debug, Clone)]
    pub enum MockResponse {
        Output(CommandOutput),
        Error(ExecutionError),
    }

    /// Command runner answering from a script keyed by exact argument vector
    ///
    /// The program path is ignored; responses can be matched any number of times.
    #[derive(Default)]
    pub struct ScriptedCommandRunner {
        script: Mutex<Vec<(Vec<String>, MockResponse)>>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedCommandRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer `args` with the given exit code and output
        pub fn on(self, args: &[&str], exit_code: i32, stdout: &str, stderr: &str) -> Self {
            self.push(args, MockResponse::Output(CommandOutput::new(exit_code, stdout, stderr)))
        }

        /// Answer `args` with an execution error
        pub fn on_error(self, args: &[&str], error: ExecutionError) -> Self {
            self.push(args, MockResponse::Error(error))
        }

        fn push(self, args: &[&str], response: MockResponse) -> Self {
            let args = args.iter().map(|a| a.to_string()).collect();
            self.script.lock().unwrap().push((args, response));
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Number of recorded calls whose arguments equal `args`
        pub fn calls_with(&self, args: &[&str]) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|spec| spec.args.iter().map(String::as_str).eq(args.iter().copied()))
                .count()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedCommandRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutionError> {
            self.calls.lock().unwrap().push(spec.clone());

            let response = self
                .script
                .lock()
                .unwrap()
                .iter()
                .find(|(args, _)| *args == spec.args)
                .map(|(_, response)| response.clone());

            match response {
                Some(MockResponse::Output(output)) if spec.check && !output.success() => {
                    Err(ExecutionError::NonZeroExit {
                        code: output.exit_code,
                        stderr: output.stderr,
                    })
                }
                Some(MockResponse::Output(output)) => Ok(output),
                Some(MockResponse::Error(error)) => Err(error),
                None => Err(ExecutionError::SpawnFailed(format!(
                    "no scripted response for {:?}",
                    spec.args
                ))),
            }
        }
    }
}
