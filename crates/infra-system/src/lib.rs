// Pixi Kernel Infrastructure - System Adapters
// Implements: CommandRunner, BinaryProbe, kernel process launching

pub mod binary_probe_impl;
pub mod process_launcher;
#[cfg(unix)]
pub mod signal_forwarder;
pub mod subprocess_executor;

pub use binary_probe_impl::SystemBinaryProbe;
pub use process_launcher::{launch, LaunchError, LaunchMode};
pub use subprocess_executor::{SpawnMode, SubprocessExecutor};
