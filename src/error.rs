//! Error types for nestkv

use thiserror::Error;
use std::io;

/// Result type alias for nestkv operations
pub type Result<T> = std::result::Result<T, NestKvError>;

/// Custom error types for nestkv
#[derive(Error, Debug)]
pub enum NestKvError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("KEY NOT FOUND: {0}")]
    KeyNotFound(String),

    #[error("TRANSACTION NOT FOUND")]
    NoActiveTransaction,

    #[error("EMPTY STATEMENT PROVIDED")]
    EmptyStatement,

    #[error("INVALID COMMAND: {0}")]
    InvalidCommand(String),

    #[error("INVALID NUMBER OF ARGUMENTS PROVIDED: {command} expects {expected}, got {found}")]
    InvalidArgumentCount {
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("Protocol parse error: {0}")]
    Protocol(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for NestKvError {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        NestKvError::Protocol(format!("Parse error: {:?}", err))
    }
}
