//! Error types for the review pipeline.
//!
//! Library crates use [`ReviewError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// A unit of work run by the pipeline driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Interpret,
    Sections,
    Conclusion,
    Assemble,
}

impl Stage {
    /// All stages in the order the driver runs them.
    pub const ORDER: [Stage; 5] = [
        Stage::Capture,
        Stage::Interpret,
        Stage::Sections,
        Stage::Conclusion,
        Stage::Assemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Interpret => "interpret",
            Self::Sections => "sections",
            Self::Conclusion => "conclusion",
            Self::Assemble => "assemble",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for all review pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Configuration loading or validation error (including a missing credential).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to an external collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// JSON/HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A required upstream artifact does not exist.
    #[error("required file not found: {}", path.display())]
    MissingArtifact { path: PathBuf },

    /// The completion service answered with a non-success status.
    #[error("extraction service error [{status}]: {body}")]
    ExtractionService { status: u16, body: String },

    /// The completion service answered, but not with the structure we asked for.
    #[error("malformed extraction response: {0}")]
    MalformedResponse(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input, invalid artifact content, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A pipeline stage failed; carries that stage's own diagnostic.
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<ReviewError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReviewError>;

impl ReviewError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// Attribute this error to a pipeline stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        Self::StageFailed {
            stage,
            source: Box::new(self),
        }
    }
}
