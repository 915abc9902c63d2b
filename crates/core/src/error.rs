//! Portal error model.

use thiserror::Error;

/// Result type used across the portal crates.
pub type PortalResult<T> = Result<T, PortalError>;

/// Portal-level error.
///
/// Keep this focused on deterministic failures such as malformed
/// identifiers. Transport and storage failures have their own error types at
/// the boundary that owns them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// An identifier was invalid (e.g. empty or parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl PortalError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
