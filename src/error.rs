//! Error types for layerkv

use std::io;
use thiserror::Error;

/// Result type alias for layerkv operations
pub type Result<T> = std::result::Result<T, LayerKvError>;

/// Custom error types for layerkv
#[derive(Error, Debug)]
pub enum LayerKvError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Protocol parse error: {0}")]
    Protocol(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for LayerKvError {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        LayerKvError::Protocol(format!("Parse error: {:?}", err))
    }
}
