use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecsqlError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Parse error: {message}")]
    Parse { message: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("Integrity error: {0}")]
    Integrity(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("The store connection has been closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, RecsqlError>;

impl RecsqlError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }
}

// Helper conversions
impl From<config::ConfigError> for RecsqlError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<csv::Error> for RecsqlError {
    fn from(e: csv::Error) -> Self { Self::Csv(e.to_string()) }
}
