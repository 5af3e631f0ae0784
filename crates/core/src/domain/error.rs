// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid version string: {0:?}")]
    InvalidVersion(String),

    #[error("Invalid kernel spec: {0}")]
    InvalidKernelSpec(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
