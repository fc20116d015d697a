#![forbid(unsafe_code)]

use nested_core::{InvariantViolation, NestedError};

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    Config(serde_json::Error),
    InvalidInput(&'static str),
    UnknownId,
    Invariant(InvariantViolation),
    Tree(NestedError),
}

impl StoreError {
    /// True when re-issuing the same call may succeed (the store was busy or locked).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Tree(err) if err.is_retryable())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::Config(err) => write!(f, "config: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownId => write!(f, "unknown id"),
            Self::Invariant(err) => write!(f, "tree invariant violated: {err}"),
            Self::Tree(err) => write!(f, "tree: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Sql(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Invariant(err) => Some(err),
            Self::Tree(err) => Some(err),
            Self::InvalidInput(_) | Self::UnknownId => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}

impl From<NestedError> for StoreError {
    fn from(value: NestedError) -> Self {
        Self::Tree(value)
    }
}

impl From<StoreError> for NestedError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Tree(err) => err,
            other => NestedError::StoreFailure(Box::new(other)),
        }
    }
}
