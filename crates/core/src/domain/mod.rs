// Domain Layer - Pure data shapes and value types

pub mod error;
pub mod kernel;
pub mod project;
pub mod version;

// Re-exports
pub use error::DomainError;
pub use kernel::{KernelMetadata, KernelSpec, LaunchPlan};
pub use project::{Environment, ListedPackage, Project, ProjectInfo};
pub use version::VersionTuple;

/// Environment variable mapping handed to external commands
pub type EnvMap = std::collections::HashMap<String, String>;
