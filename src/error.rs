//! Error types for bookrec operations.
//!
//! Every stage of the pipeline either succeeds completely or returns one of
//! these errors to the caller. Nothing is retried.

use thiserror::Error;

/// Main error type for bookrec operations.
///
/// # Examples
///
/// ```
/// use bookrec::error::BookrecError;
///
/// let err = BookrecError::Dimensionality { requested: 5, max: 3 };
/// assert!(err.to_string().contains("embedding dimension"));
/// ```
#[derive(Error, Debug)]
pub enum BookrecError {
    /// Bad or empty input after filtering, or an invalid configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested embedding dimension is larger than the data supports.
    #[error("Infeasible embedding dimension: requested {requested}, max {max}")]
    Dimensionality {
        /// Requested number of components
        requested: usize,
        /// min(rows, cols) of the input matrix
        max: usize,
    },

    /// Invalid cluster count relative to the data, or clustering infeasible.
    #[error("Clustering error: {0}")]
    Clustering(String),

    /// Unknown user at recommendation time.
    #[error("User not found: {user_id}")]
    NotFound {
        /// The user that was looked up
        user_id: u64,
    },

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Model artifact written by a newer format version.
    #[error("Unsupported artifact version: found {found}, max supported {supported}")]
    UnsupportedVersion {
        /// Version found in the artifact
        found: u32,
        /// Maximum supported version
        supported: u32,
    },
}

impl From<serde_json::Error> for BookrecError {
    fn from(err: serde_json::Error) -> Self {
        BookrecError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BookrecError {
    fn from(err: toml::de::Error) -> Self {
        BookrecError::Configuration(err.to_string())
    }
}

impl BookrecError {
    /// Create a configuration error for an input that ended up empty.
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::Configuration(format!("empty input: {context}"))
    }

    /// Create a clustering error for a cluster count outside `[2, n_samples)`.
    #[must_use]
    pub fn invalid_k(k: usize, n_samples: usize) -> Self {
        Self::Clustering(format!(
            "k = {k} is invalid for {n_samples} users, expected 2 <= k < {n_samples}"
        ))
    }

    /// Create a configuration error for a model used before fitting.
    #[must_use]
    pub fn not_fitted(model: &str) -> Self {
        Self::Configuration(format!("{model} not fitted, call fit() first"))
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, BookrecError>;
