use thiserror::Error;

#[derive(Error, Debug)]
pub enum MandatoError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Job already running: {0}")]
    JobConflict(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
