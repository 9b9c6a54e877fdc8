use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// Update targeted an id the store has never assigned (or the payload
    /// carried no id at all). The message keeps the rejected payload so
    /// call sites can log what was turned away.
    NotFound(String),
    /// The backing engine rejected or could not complete an operation.
    /// Fatal for the call; nothing here retries.
    Execution(String),
    Validation(String),
    Configuration(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StoreError::Execution(msg) => write!(f, "Execution error: {}", msg),
            StoreError::Validation(msg) => write!(f, "Validation error: {}", msg),
            StoreError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Configuration(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
