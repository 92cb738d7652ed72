//! Error types for watchshots.
//!
//! Library crates use [`WatchshotsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all watchshots operations.
///
/// Per-candidate failures (`Network`, `ContentType`, `Decode`, `Encode`,
/// `SizeRejected`, `Validation`, `Io`) are returned as values and tallied by
/// the batch pipeline. `Config`, `Browser` and `Io` on a source listing abort
/// the run.
#[derive(Debug, thiserror::Error)]
pub enum WatchshotsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Non-200 response, timeout, or connection failure.
    #[error("network error: {0}")]
    Network(String),

    /// Response was not an image.
    #[error("not an image ({content_type}): {url}")]
    ContentType { url: String, content_type: String },

    /// Response body could not be decoded as an image.
    #[error("decode error for {url}: {message}")]
    Decode { url: String, message: String },

    /// Normalized image could not be encoded.
    #[error("encode error for {url}: {message}")]
    Encode { url: String, message: String },

    /// Image is below the minimum dimension policy.
    #[error("image too small ({width}x{height}): {url}")]
    SizeRejected { url: String, width: u32, height: u32 },

    /// A URL list line that does not parse.
    #[error("malformed record (line {line}): {reason}: {content}")]
    MalformedRecord {
        line: usize,
        content: String,
        reason: String,
    },

    /// A sub-source listing fetch failed entirely.
    #[error("source {source_name} unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    /// The page renderer used for blog search failed.
    #[error("browser renderer error: {0}")]
    Browser(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (oversized body, bad URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WatchshotsError>;

impl WatchshotsError {
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

    /// Short, stable reason code for logs and outcome tallies.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Network(_) => "network",
            Self::ContentType { .. } => "content_type",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::SizeRejected { .. } => "size_rejected",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::Browser(_) => "browser",
            Self::Io { .. } => "io",
            Self::Validation { .. } => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = WatchshotsError::config("bad timeout");
        assert_eq!(err.to_string(), "config error: bad timeout");

        let err = WatchshotsError::SizeRejected {
            url: "https://x/y.jpg".into(),
            width: 320,
            height: 200,
        };
        assert_eq!(err.to_string(), "image too small (320x200): https://x/y.jpg");
    }

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(WatchshotsError::Network("timeout".into()).reason_code(), "network");
        let err = WatchshotsError::ContentType {
            url: "https://x".into(),
            content_type: "text/html".into(),
        };
        assert_eq!(err.reason_code(), "content_type");
        let err = WatchshotsError::MalformedRecord {
            line: 3,
            content: "a,b".into(),
            reason: "expected 4 fields".into(),
        };
        assert_eq!(err.reason_code(), "malformed_record");
    }
}
