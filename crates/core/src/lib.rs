// Pixi Kernel Core - Domain Logic & Ports
// NO infrastructure dependencies: processes, files and sockets live behind ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{ReadinessError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
