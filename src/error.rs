//! Error types.

use thiserror::Error;

/// Result alias for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Errors returned by resolver operations.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A required argument was absent (e.g. no server on a lifetime append).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// No entry matched a remove request.
    #[error("no matching resolver entry")]
    NotFound,

    /// Allocation failed while creating an entry; nothing was changed.
    #[error("out of memory")]
    OutOfMemory,

    /// Writing the resolver configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The DNS proxy collaborator reported a failure.
    #[error("dns proxy: {0}")]
    DnsProxy(String),
}

impl ResolverError {
    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied)
    }
}

impl From<std::collections::TryReserveError> for ResolverError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
