// Port Layer - Interfaces for external dependencies

pub mod binary_probe;
pub mod command_runner;
pub mod id_provider; // For deterministic testing
pub mod time_provider;

// Re-exports
pub use binary_probe::BinaryProbe;
pub use command_runner::{CommandOutput, CommandRunner, CommandSpec, ExecutionError};
pub use id_provider::IdProvider;
pub use time_provider::TimeProvider;
