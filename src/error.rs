//! Error handling for Patchbay
//!
//! Validation errors (`NotFound`, `Duplicate`, `IndexRange`, `EmptySelection`)
//! are raised before anything changes. Collaborator errors (`DeviceLoad`,
//! `Persistence`) abort the operation before its in-memory commit.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Patchbay operations
pub type Result<T> = std::result::Result<T, PatchbayError>;

/// The kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Bank,
    Patch,
    Param,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Bank => write!(f, "bank"),
            EntityKind::Patch => write!(f, "patch"),
            EntityKind::Param => write!(f, "param"),
        }
    }
}

/// Main error type for Patchbay operations
#[derive(Error, Debug)]
pub enum PatchbayError {
    // Validation Errors
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} already present: {id}")]
    Duplicate { kind: EntityKind, id: String },

    #[error("{kind} index {index} out of range (length {len})")]
    IndexRange {
        kind: EntityKind,
        index: usize,
        len: usize,
    },

    #[error("Operation would leave no current selection: {reason}")]
    EmptySelection { reason: String },

    // Collaborator Errors
    #[error("Device failed to load patch {patch}: {reason}")]
    DeviceLoad { patch: String, reason: String },

    #[error("Persistence failed: {reason}")]
    Persistence {
        reason: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl PatchbayError {
    pub(crate) fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        PatchbayError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: EntityKind, id: impl ToString) -> Self {
        PatchbayError::Duplicate {
            kind,
            id: id.to_string(),
        }
    }

    /// Persistence failure carrying the offending path and source error
    pub fn persistence_at(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let path = path.into();
        PatchbayError::Persistence {
            reason: format!("{}: {}", path.display(), source),
            path: Some(path),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            PatchbayError::NotFound { .. } => "NOT_FOUND",
            PatchbayError::Duplicate { .. } => "DUPLICATE",
            PatchbayError::IndexRange { .. } => "INDEX_RANGE",
            PatchbayError::EmptySelection { .. } => "EMPTY_SELECTION",
            PatchbayError::DeviceLoad { .. } => "DEVICE_LOAD",
            PatchbayError::Persistence { .. } => "PERSISTENCE",
            PatchbayError::Config { .. } => "CONFIG",
        }
    }

    /// Check if this error was a precondition failure raised before any mutation
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PatchbayError::NotFound { .. }
                | PatchbayError::Duplicate { .. }
                | PatchbayError::IndexRange { .. }
                | PatchbayError::EmptySelection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PatchbayError::not_found(EntityKind::Bank, "abc");
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "bank not found: abc");
    }

    #[test]
    fn test_validation_classification() {
        let range = PatchbayError::IndexRange {
            kind: EntityKind::Patch,
            index: 7,
            len: 3,
        };
        assert!(range.is_validation());

        let device = PatchbayError::DeviceLoad {
            patch: "p".to_string(),
            reason: "offline".to_string(),
        };
        assert!(!device.is_validation());
    }

    #[test]
    fn test_persistence_at_keeps_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PatchbayError::persistence_at("/tmp/banks.json", io);
        match &err {
            PatchbayError::Persistence { path, source, .. } => {
                assert_eq!(path.as_deref(), Some(std::path::Path::new("/tmp/banks.json")));
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("denied"));
    }
}
