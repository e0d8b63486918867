//! Error types for rangefeat

use thiserror::Error;

/// Main error type for rangefeat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Invalid data: {0}")]
    InvalidData(String),
    
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
    
    #[error("Scan dimensions not yet known, frame rejected")]
    Uninitialized,
    
    #[error("Publish error on {topic}: {reason}")]
    Publish { topic: String, reason: String },
    
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),
}

/// Result type alias for rangefeat operations
pub type Result<T> = std::result::Result<T, Error>;
