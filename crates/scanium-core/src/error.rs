//! # Error Types
//!
//! Domain-specific error types for scanium-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  scanium-core errors (this file)                                        │
//! │  ├── CoreError        - General domain errors                           │
//! │  └── ValidationError  - Payload validation failures                     │
//! │                                                                         │
//! │  scanium-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  scanium-sync errors (separate crate)                                   │
//! │  ├── RemoteError      - Typed backend call failures                     │
//! │  └── SyncError        - Engine, config and store failures               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → SyncError               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core item-logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Item cannot be found by its local id.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// The item is tombstoned and cannot be edited.
    ///
    /// ## When This Occurs
    /// - Editing an item after the user deleted it
    /// - Deleting an item twice
    #[error("Item {0} is deleted")]
    ItemDeleted(String),

    /// A stored payload could not be decoded.
    #[error("Invalid payload for item {id}: {reason}")]
    InvalidPayload { id: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Payload validation errors.
///
/// Checked before a local write so invalid content never enters the
/// push queue.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Lower bound exceeds upper bound.
    #[error("{field} range is inverted: {low} > {high}")]
    InvalidRange { field: String, low: i64, high: i64 },

    /// Invalid format (e.g. out-of-range confidence).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
