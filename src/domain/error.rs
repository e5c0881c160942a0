use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Market or oracle data missing or malformed. Callers skip the candidate.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Position already open: {0}")]
    DuplicateTicker(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persisted state is corrupt: {0}")]
    PersistenceCorrupt(String),

    #[error("No trained model available")]
    ModelUnavailable,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Filesystem or file-format write failure (model, exports).
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl DomainError {
    /// True for the non-fatal "skip this candidate" family.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DomainError::DataUnavailable(_) | DomainError::ModelUnavailable
        )
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<&str> for DomainError {
    fn from(s: &str) -> Self {
        DomainError::InvalidInput(s.to_string())
    }
}
