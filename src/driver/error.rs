//! Driver-level errors.

use thiserror::Error;

/// Broad classification of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Connectivity loss or failure to open.
    Connection,
    /// Constraint violation (unique, foreign key, not null, check).
    Constraint,
    /// Command timeout.
    Timeout,
    /// The engine rejected the command text.
    Syntax,
    /// Anything else.
    Other,
}

/// An error raised by the underlying driver.
///
/// These are passed through to the caller unwrapped; the core never
/// retries them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    kind: DriverErrorKind,
    message: String,
}

impl DriverError {
    /// Creates an error of the given kind.
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`DriverErrorKind::Connection`] error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Connection, message)
    }

    /// Shorthand for a [`DriverErrorKind::Constraint`] error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Constraint, message)
    }

    /// Shorthand for a [`DriverErrorKind::Other`] error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Other, message)
    }

    /// The error classification.
    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    /// The driver's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
