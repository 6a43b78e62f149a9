use std::fmt;
use thiserror::Error;

/// Whether an entry holds a plain value or a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Value,
    List,
}

impl EntryKind {
    pub fn from_list_flag(is_list: bool) -> Self {
        if is_list { Self::List } else { Self::Value }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::List => write!(f, "list"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key '{key}' holds a {actual}, expected a {expected}")]
    WrongKind {
        key: String,
        expected: EntryKind,
        actual: EntryKind,
    },

    #[error("Key '{0}' not found")]
    NotFound(String),

    #[error("Duplicate value for unique index on '{field}' in collection '{collection}'")]
    DuplicateKey { collection: String, field: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn wrong_kind(key: &str, expected: EntryKind, actual: EntryKind) -> Self {
        Self::WrongKind {
            key: key.to_string(),
            expected,
            actual,
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Backend(format!("lock poisoned: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_kind_message() {
        let err = StoreError::wrong_kind("a.b", EntryKind::Value, EntryKind::List);
        assert_eq!(err.to_string(), "Key 'a.b' holds a list, expected a value");
    }

    #[test]
    fn test_kind_from_flag() {
        assert_eq!(EntryKind::from_list_flag(true), EntryKind::List);
        assert_eq!(EntryKind::from_list_flag(false), EntryKind::Value);
    }
}
