//! Unified error type for audioslicer.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in audioslicer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input was rejected before any processing started.
    #[error("{0}")]
    Validation(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "segment").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A split is already running.
    #[error("a split is already in progress")]
    Busy,

    /// The transcoding engine could not be initialised.
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    /// The segmentation command failed; the message is the engine's own.
    #[error("{0}")]
    Transcode(String),

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Archive assembly failed as a whole.
    #[error("Archive error: {0}")]
    Archive(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Busy => 409,
            Error::EngineInit(_) => 503,
            Error::Transcode(_) => 502,
            Error::Tool { .. } => 502,
            Error::Archive(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::NotFound { .. } => "not_found",
            Error::Busy => "busy",
            Error::EngineInit(_) => "engine_init_error",
            Error::Transcode(_) => "transcode_error",
            Error::Tool { .. } => "tool_error",
            Error::Archive(_) => "archive_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// The text shown to the user for a failed transcode: the engine's message
    /// verbatim, without the tool prefix.
    pub fn user_message(&self) -> String {
        match self {
            Error::Tool { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
