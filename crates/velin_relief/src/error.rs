//! Error types for source map handling.

/// Error raised while ingesting or encoding a source map.
#[derive(Debug, thiserror::Error)]
pub enum SourceMapError {
    /// A mapping segment contained a character outside the base64 alphabet
    /// or ended in the middle of a value.
    #[error("invalid VLQ data in segment `{segment}`")]
    InvalidVlq { segment: String },

    /// A segment had a field count other than 1, 4 or 5.
    #[error("mapping segment `{segment}` has {fields} fields, expected 1, 4 or 5")]
    InvalidSegment { segment: String, fields: usize },

    /// A segment referenced a source index that is not in `sources`.
    #[error("mapping references source #{index}, but only {len} sources are declared")]
    UnknownSource { index: i64, len: usize },

    /// A segment referenced a name index that is not in `names`.
    #[error("mapping references name #{index}, but only {len} names are declared")]
    UnknownName { index: i64, len: usize },

    /// A decoded coordinate went negative.
    #[error("mapping segment `{segment}` decodes to a negative position")]
    NegativePosition { segment: String },

    /// JSON (de)serialization failed.
    #[error("source map JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for source map operations.
pub type SourceMapResult<T> = Result<T, SourceMapError>;
