//! Fallback Kernel
//!
//! A minimal Jupyter kernel started when the Pixi environment is not usable.
//! Every execution fails with the readiness diagnostic, so the notebook shows
//! why the real kernel did not start.

pub mod connection;
pub mod error;
pub mod handler;
pub mod kernel;
pub mod shutdown;
pub mod wire;

pub use connection::ConnectionInfo;
pub use error::WireError;
pub use handler::{FallbackHandler, Outcome};
pub use kernel::FallbackKernel;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
