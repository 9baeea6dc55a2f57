//! # Error Types
//!
//! Structured error types for boq_core.
//!
//! Ordinary domain conditions never produce an error: a zero dimension, a
//! material with no price or a mesh layout on a beam are all expected states
//! with defined zero/fallback behaviour, reported (when worth reporting) as
//! issue strings next to the result. `CalcError` is reserved for structural
//! failures such as a malformed price override, and for the file adapter.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::errors::{CalcError, CalcResult};
//!
//! fn check_override(material_id: &str, region: &str, price: f64) -> CalcResult<()> {
//!     if price < 0.0 {
//!         return Err(CalcError::invalid_override(
//!             material_id,
//!             region,
//!             "price must not be negative",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_override("cement", "Nairobi", -1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for boq_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for engine and adapter operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// A user price override cannot be applied
    #[error("Invalid price override for '{material_id}' in {region}: {reason}")]
    InvalidOverride {
        material_id: String,
        region: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidOverride error
    pub fn invalid_override(
        material_id: impl Into<String>,
        region: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::InvalidOverride {
            material_id: material_id.into(),
            region: region.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError from anything displayable
    pub fn serialization(reason: impl std::fmt::Display) -> Self {
        CalcError::SerializationError {
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        CalcError::serialization(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CalcError::invalid_override("cement", "Nairobi", "price must not be negative");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidOverride\""));
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_display_names_holder() {
        let error = CalcError::file_locked("q.boq", "someone (desk-1)", "2026-01-01T00:00:00Z");
        assert_eq!(
            error.to_string(),
            "File locked: 'q.boq' is locked by someone (desk-1) since 2026-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<f64>("not json").unwrap_err();
        let calc: CalcError = err.into();
        assert!(matches!(calc, CalcError::SerializationError { .. }));
    }
}
