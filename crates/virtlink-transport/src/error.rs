// ============================================
// File: crates/virtlink-transport/src/error.rs
// ============================================
//! # Transport Error Types

use thiserror::Error;

use virtlink_common::error::CommonError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport and virtual interface error types.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Reading from the virtual interface failed.
    #[error("Interface read failed: {reason}")]
    TunReadFailed {
        /// Underlying failure description.
        reason: String,
    },

    /// Writing to the virtual interface failed.
    #[error("Interface write failed: {reason}")]
    TunWriteFailed {
        /// Underlying failure description.
        reason: String,
    },

    /// Receiving from the secure transport failed.
    #[error("Transport receive failed: {reason}")]
    ReceiveFailed {
        /// Underlying failure description.
        reason: String,
    },

    /// Sending over the secure transport failed.
    #[error("Transport send to {dest} failed: {reason}")]
    SendFailed {
        /// Destination label (peer identifier or remote endpoint).
        dest: String,
        /// Underlying failure description.
        reason: String,
    },

    /// The resource has been closed; no further I/O is possible.
    #[error("Transport is closed")]
    Closed,

    /// Interface or transport configuration was rejected.
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig {
        /// Name of the rejected field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An error bubbled up from the common layer.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// I/O error from the operating system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Creates a `TunReadFailed` error.
    pub fn tun_read(reason: impl Into<String>) -> Self {
        Self::TunReadFailed {
            reason: reason.into(),
        }
    }

    /// Creates a `TunWriteFailed` error.
    pub fn tun_write(reason: impl Into<String>) -> Self {
        Self::TunWriteFailed {
            reason: reason.into(),
        }
    }

    /// Creates a `ReceiveFailed` error.
    pub fn recv_failed(reason: impl Into<String>) -> Self {
        Self::ReceiveFailed {
            reason: reason.into(),
        }
    }

    /// Creates a `SendFailed` error.
    pub fn send_failed(dest: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            dest: dest.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for per-packet failures the forwarding loops may
    /// log and survive. Everything else terminates the owning loop.
    #[must_use]
    pub const fn is_advisory(&self) -> bool {
        matches!(self, Self::SendFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::send_failed("vaddr:7", "peer unreachable");
        assert!(err.to_string().contains("vaddr:7"));
        assert!(err.to_string().contains("peer unreachable"));
    }

    #[test]
    fn test_error_classification() {
        assert!(TransportError::send_failed("vaddr:1", "x").is_advisory());
        assert!(!TransportError::recv_failed("x").is_advisory());
        assert!(!TransportError::Closed.is_advisory());
    }
}
