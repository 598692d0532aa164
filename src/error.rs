use std::io;
use thiserror::Error;

/**
Result type to simplify function signatures.

This is a custom result type that uses our custom `GridFilterError` for the error type.

Functions can return `GridFilterResult<T>` and then use `?` to automatically propagate errors.
*/
pub type GridFilterResult<T> = Result<T, GridFilterError>;

/**
Custom error type for GridFilter.

This enum defines all the possible errors that can occur in the engine.

We use the `thiserror` crate to derive the `Error` trait and automatically
implement `Display` using the `#[error(...)]` attribute.
*/
#[derive(Error, Debug)]
pub enum GridFilterError {
    // Wrapper for standard IO errors.
    // The #[from] attribute automatically converts io::Error to GridFilterError::Io.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Errors encountered while parsing CSV data when loading a table.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    // Errors from serializing or deserializing persisted state.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A filter specification failed validation (empty value set, min > max, ...).
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// A preset cannot be saved with an empty name.
    #[error("Preset name must not be empty")]
    EmptyPresetName,

    /// A preset cannot be saved from an empty filter set.
    #[error("Cannot save a preset with no active filters")]
    EmptyFilterSet,

    /// The requested preset id does not exist.
    #[error("Preset not found: '{0}'")]
    PresetNotFound(String),

    /// The requested field is not part of the current column set.
    #[error("Unknown field: '{0}'")]
    UnknownField(String),

    // Failures at the key-value storage boundary (read/write/quota).
    // These are caught and logged by the StateStore; never fatal.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid value for command-line argument '{arg_name}': {reason}")]
    InvalidArgument {
        arg_name: String, // Context about *which* argument failed
        reason: String,   // The specific error reason
    },

    // A catch-all for other, less specific errors not covered by specific variants.
    // Uses a String to describe the error. Consider using this sparingly.
    #[error("Other error: {0}")]
    Other(String),
}

// Implementation of the From trait to convert a String into a GridFilterError.
// This allows us to easily convert generic error strings into our custom error type.
impl From<String> for GridFilterError {
    fn from(err: String) -> GridFilterError {
        // Prefer using specific error variants when possible, fallback to Other.
        GridFilterError::Other(err)
    }
}
