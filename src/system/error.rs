//! Error types for the process provider
//!
//! Every provider operation reports one of these variants. The watchdog
//! matches on them to tell a vanished process apart from a systemic failure.

use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The OS process table could not be listed
    #[error("failed to enumerate processes: {message}")]
    Enumeration { message: String },

    /// Every permission level was refused
    #[error("access denied to process {pid}: {message}")]
    AccessDenied { pid: u32, message: String },

    /// The process exited before it could be queried or terminated
    #[error("process {pid} not found")]
    ProcessNotFound { pid: u32 },

    /// CPU-time retrieval failed for another reason
    #[error("failed to query CPU time of process {pid}: {message}")]
    Query { pid: u32, message: String },

    /// Termination failed for another reason
    #[error("failed to terminate process {pid}: {message}")]
    Termination { pid: u32, message: String },
}

impl ProviderError {
    /// Shorthand for an enumeration failure with any displayable cause
    pub fn enumeration(cause: impl std::fmt::Display) -> Self {
        ProviderError::Enumeration {
            message: cause.to_string(),
        }
    }

    /// Returns true when the error only means the process is already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::ProcessNotFound { .. })
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
