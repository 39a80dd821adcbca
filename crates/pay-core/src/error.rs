use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the pay analyzer.
#[derive(Error, Debug)]
pub enum PayError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The selected file is not a `.csv` export.
    #[error("Invalid file type: {0} (please upload a CSV file)")]
    InvalidFileType(PathBuf),

    /// The exchange-rate endpoint could not be reached or answered badly.
    #[error("Failed to fetch exchange rates: {0}")]
    RateFetch(String),

    /// The feedback webhook rejected or never received a message.
    #[error("Webhook error: {0}")]
    Webhook(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the pay crates.
pub type Result<T> = std::result::Result<T, PayError>;
