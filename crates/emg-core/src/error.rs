//! Error handling for the EMG table engine
//!
//! Every fallible operation in the workspace returns [`EmgResult`]. Variants carry
//! the structured context (column names, periods) a calling layer needs to build a
//! user-facing message; the core never formats one itself.

use thiserror::Error;

/// Result type alias for EMG table operations
pub type EmgResult<T> = Result<T, EmgError>;

/// Error type for all table, adapter and pipeline operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmgError {
    /// Source container or text stream could not be parsed at all
    #[error("Format error: {reason}")]
    Format {
        /// Description of format issue
        reason: String,
    },

    /// No usable (rectangular, numeric) columns survived adapter processing
    #[error("Schema error: {reason}")]
    Schema {
        /// Description of the schema issue
        reason: String,
    },

    /// A column pattern matched nothing
    #[error("Column(s) could not be found: {pattern}")]
    ColumnNotFound {
        /// Pattern (or exact name) that was searched for
        pattern: String,
    },

    /// A single-column lookup matched more than one column
    #[error("Multiple columns found for '{pattern}': {matches:?}")]
    AmbiguousColumn {
        /// Pattern that was searched for
        pattern: String,
        /// Every column the pattern matched
        matches: Vec<String>,
    },

    /// Merge attempted between tables sampled at different periods
    #[error("Samples collected with different period: {expected}s vs {actual}s")]
    IncompatiblePeriod {
        /// Period of the left table
        expected: f64,
        /// Period of the right table
        actual: f64,
    },

    /// Merge attempted between tables carrying the same channel set
    #[error("Cannot merge EMG data with the same channel names: {channels:?}")]
    DuplicateChannel {
        /// The shared channel names
        channels: Vec<String>,
    },

    /// Merge attempted with something that is not a signal table
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// What the operation needed
        expected: &'static str,
        /// What it was given
        found: &'static str,
    },

    /// A session handle that refers to no dataset
    #[error("Unknown dataset: {handle}")]
    UnknownDataset {
        /// The handle as given
        handle: String,
    },

    /// A column does not share the table's row count
    #[error("Column '{column}' has {actual} rows, table has {expected}")]
    LengthMismatch {
        /// Offending column
        column: String,
        /// Row count of the table
        expected: usize,
        /// Row count of the column
        actual: usize,
    },

    /// Invalid settings (filter cutoffs, windows, quantiles, periods)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited text reader/writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EmgError {
    /// Shorthand for a [`EmgError::Configuration`] error
    pub fn config(message: impl Into<String>) -> Self {
        EmgError::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a [`EmgError::ColumnNotFound`] error
    pub fn not_found(pattern: impl Into<String>) -> Self {
        EmgError::ColumnNotFound {
            pattern: pattern.into(),
        }
    }
}
