//! Error types for noteharvest.
//!
//! Library crates use [`HarvestError`] via `thiserror`.
//! The CLI wraps this with `color-eyre`, which prints the whole `source()` chain.

use std::path::PathBuf;

use crate::types::Stage;

/// Top-level error type for all noteharvest operations.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Working directory bootstrap failed (create/reset of `notes/`).
    #[error("setup failed at {path:?}")]
    Setup {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No authenticated session could be established.
    #[error("an error occurred while logging in")]
    Login {
        #[source]
        source: Box<HarvestError>,
    },

    /// The listing resolved to zero documents.
    #[error("the notes listing returned zero urls")]
    ListingEmpty,

    /// A pipeline stage failed for one document.
    #[error("{stage} stage failed for note {id}")]
    Stage {
        stage: Stage,
        id: String,
        #[source]
        source: Box<HarvestError>,
    },

    /// A structured cache record exists but could not be parsed.
    #[error("unreadable cache record at {path:?}")]
    CacheRead {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A structured cache record parsed but describes a different note.
    #[error("cache record at {path:?} belongs to note {found}, expected {expected}")]
    MisplacedRecord {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// `get` was called for a record that does not exist.
    #[error("no {stage} record cached for note {id}")]
    NotFound { stage: Stage, id: String },

    /// Browser launch, navigation, or evaluation error.
    #[error("browser error: {0}")]
    Browser(String),

    /// The source page did not contain the expected document.
    #[error("failed to fetch note {id}: {message}")]
    Fetch { id: String, message: String },

    /// No primary content could be extracted from a document.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Data validation error (bad listing url, duplicate id, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a bootstrap I/O failure.
    pub fn setup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Setup {
            path: path.into(),
            source,
        }
    }

    /// Wrap any error as a login failure.
    pub fn login(source: HarvestError) -> Self {
        Self::Login {
            source: Box::new(source),
        }
    }

    /// Wrap any error with the stage and note it occurred in.
    pub fn stage(stage: Stage, id: impl Into<String>, source: HarvestError) -> Self {
        Self::Stage {
            stage,
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// Whether a cache lookup failure should be treated as a miss.
    pub fn is_cache_miss(&self) -> bool {
        matches!(
            self,
            Self::CacheRead { .. } | Self::MisplacedRecord { .. } | Self::NotFound { .. }
        )
    }
}
