use std::io;
use thiserror::Error;

/// Custom error type for the GPU monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not find rocm-smi or amd-smi executable")]
    ToolNotFound,

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for the GPU monitor
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    /// Create a command error
    pub fn command<S: Into<String>>(msg: S) -> Self {
        MonitorError::Command(msg.into())
    }

    pub fn decode<S: Into<String>>(msg: S) -> Self {
        MonitorError::Decode(msg.into())
    }

    pub fn publish<S: Into<String>>(msg: S) -> Self {
        MonitorError::Publish(msg.into())
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        MonitorError::Runtime(msg.into())
    }
}
