// Fallback kernel errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Connection file error: {0}")]
    Connection(String),

    #[error("Message has no <IDS|MSG> delimiter")]
    MissingDelimiter,

    #[error("Message has {0} frames after the delimiter, expected at least 5")]
    Truncated(usize),

    #[error("Message signature does not match")]
    BadSignature,

    #[error("Invalid message JSON: {0}")]
    Json(String),

    #[error("ZeroMQ error: {0}")]
    Socket(String),
}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        WireError::Json(err.to_string())
    }
}

impl From<zeromq::ZmqError> for WireError {
    fn from(err: zeromq::ZmqError) -> Self {
        WireError::Socket(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
