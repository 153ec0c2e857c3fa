use std::error::Error as StdError;

use thiserror::Error;

/// Message carried by every decryption failure, whatever the cause.
pub(crate) const DECRYPTION_FAILED: &str =
    "decryption failed: malformed value, wrong master secret, or tampered-with data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee that the error is not, for
    /// example, an operator error - merely that the code cannot tell.
    Internal,

    /// The caller or operator supplied invalid input or configuration.
    User,
}

/// Condition flags for consumers that need to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The master secret is absent or empty.
    Configuration,
    /// Sealing could not complete (random source, key derivation or cipher).
    Encryption,
    /// The value could not be opened. Covers malformed input, a wrong master
    /// secret and authentication-tag mismatch without telling them apart.
    Decryption,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct CredsealError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Specific condition tag.
    pub kind: ErrorKind,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl CredsealError {
    /// Creates a new error with a category, kind and display message.
    pub fn new(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::User, ErrorKind::Configuration, msg)
    }

    pub(crate) fn encryption(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, ErrorKind::Encryption, msg)
    }

    /// The one decryption error. Never carries a source, so nothing about
    /// the underlying cause reaches whoever supplied the blob.
    pub(crate) fn decryption() -> Self {
        Self::new(ErrorCategory::User, ErrorKind::Decryption, DECRYPTION_FAILED)
    }

    pub(crate) fn io(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::with_source(category, ErrorKind::Io, msg, source)
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Whether repeating the same call can succeed.
    ///
    /// Only encryption failures qualify: a retry draws fresh randomness.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Encryption
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CredsealError>;
