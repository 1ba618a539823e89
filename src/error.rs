//! Error type shared by the ingest and rendering paths.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] mysql::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Table or series name that cannot be used as an SQL identifier.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The remote API answered, but with an error payload.
    #[error("API error: {0}")]
    Api(String),

    /// The relational store could not be reached when the run started.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Chart error: {0}")]
    Chart(String),
}
