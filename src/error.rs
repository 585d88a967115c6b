//! Error types for the friction rig tools

use thiserror::Error;

/// Error type for rig acquisition and analysis operations
#[derive(Error, Debug)]
pub enum RigError {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error from the serial stream or the log file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No serial ports found on the system
    #[error("No serial ports found")]
    NoPortsFound,

    /// Frame decoding error
    #[error("Short frame: expected {expected} bytes, got {actual}")]
    ShortFrame { expected: usize, actual: usize },

    /// Malformed row in a logged CSV file
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Not enough data to run an analysis
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Chart rendering error
    #[cfg(feature = "analysis")]
    #[error("Plot error: {0}")]
    Plot(String),
}

/// Result type for rig operations
pub type Result<T> = std::result::Result<T, RigError>;
