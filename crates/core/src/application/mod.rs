// Application Layer - Readiness protocol and launch decisions

pub mod catalog;
pub mod constants;
pub mod introspect;
pub mod launch;
pub mod locator;
pub mod pixi;
pub mod provisioner;
pub mod readiness;
pub mod shell_env;
pub mod version_gate;

// Re-exports
pub use catalog::{EnvironmentCatalog, EnvironmentEntry};
pub use introspect::{IntrospectError, ProjectIntrospector};
pub use launch::LaunchConfigError;
pub use locator::{BinaryLocator, LocatorError};
pub use pixi::PixiClient;
pub use provisioner::{KernelProvisioner, LaunchDecision, ProvisionRequest};
pub use readiness::{ReadinessRequest, ReadinessVerifier};
pub use version_gate::VersionGate;
