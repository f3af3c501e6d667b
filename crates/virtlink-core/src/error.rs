// ============================================
// File: crates/virtlink-core/src/error.rs
// ============================================
//! # Engine Error Types
//!
//! Two severities flow through the engine. *Fatal* errors terminate the
//! owning loop and surface through [`CoreError::Terminated`], which embeds
//! the terminal outcome of both flows so a caller can see which side
//! failed even if the other completed cleanly. *Advisory* errors are
//! logged at the drop site and never escape `run()`.

use std::fmt;

use thiserror::Error;

use virtlink_common::error::CommonError;
use virtlink_transport::error::TransportError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// FlowOutcome
// ============================================

/// Terminal outcome of one forwarding flow: a success placeholder or the
/// error that ended it.
#[derive(Debug)]
pub struct FlowOutcome(Option<Box<CoreError>>);

impl FlowOutcome {
    /// The flow completed without error.
    #[must_use]
    pub const fn completed() -> Self {
        Self(None)
    }

    /// The flow terminated with `error`.
    #[must_use]
    pub fn failed(error: CoreError) -> Self {
        Self(Some(Box::new(error)))
    }

    /// Returns the terminal error, if the flow failed.
    #[must_use]
    pub fn error(&self) -> Option<&CoreError> {
        self.0.as_deref()
    }

    /// Returns `true` if the flow failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Display for FlowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(e) => write!(f, "{e}"),
            None => write!(f, "completed"),
        }
    }
}

impl From<CoreError> for FlowOutcome {
    fn from(error: CoreError) -> Self {
        Self::failed(error)
    }
}

// ============================================
// CoreError
// ============================================

/// Engine error types.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A datagram did not carry a parseable IPv4 header.
    #[error("Invalid packet: {reason}")]
    InvalidPacket {
        /// Why the packet was rejected.
        reason: String,
    },

    /// Both forwarding flows have terminated; `run()` is over.
    #[error("forwarding terminated (peer flow: {peer_flow}; local flow: {local_flow})")]
    Terminated {
        /// Terminal outcome of the background (peer-side) flow.
        peer_flow: FlowOutcome,
        /// Terminal outcome of the foreground (local-side) flow.
        local_flow: FlowOutcome,
    },

    /// Invariant violation inside the engine.
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },

    /// An error bubbled up from the common layer.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// An error bubbled up from the transport layer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O error from the operating system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Creates an `InvalidPacket` error.
    pub fn invalid_packet(reason: impl Into<String>) -> Self {
        Self::InvalidPacket {
            reason: reason.into(),
        }
    }

    /// Creates a `Terminated` error from the two flows' terminal errors.
    #[must_use]
    pub fn terminated(peer: CoreError, local: CoreError) -> Self {
        Self::Terminated {
            peer_flow: FlowOutcome::failed(peer),
            local_flow: FlowOutcome::failed(local),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for per-packet conditions the forwarding loops log
    /// and survive: malformed headers and per-peer send failures.
    #[must_use]
    pub const fn is_advisory(&self) -> bool {
        match self {
            Self::InvalidPacket { .. } => true,
            Self::Transport(e) => e.is_advisory(),
            _ => false,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_outcome_display() {
        assert_eq!(FlowOutcome::completed().to_string(), "completed");

        let failed = FlowOutcome::failed(CoreError::invalid_packet("too short"));
        assert!(failed.to_string().contains("too short"));
        assert!(failed.is_failed());
    }

    #[test]
    fn test_terminated_names_both_flows() {
        let err = CoreError::terminated(
            TransportError::recv_failed("socket gone").into(),
            TransportError::tun_read("device gone").into(),
        );

        let text = err.to_string();
        assert!(text.contains("socket gone"));
        assert!(text.contains("device gone"));
    }

    #[test]
    fn test_terminated_with_placeholder() {
        let err = CoreError::Terminated {
            peer_flow: FlowOutcome::failed(TransportError::Closed.into()),
            local_flow: FlowOutcome::completed(),
        };

        assert!(err.to_string().contains("completed"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::invalid_packet("x").is_advisory());
        assert!(CoreError::from(TransportError::send_failed("vaddr:1", "x")).is_advisory());
        assert!(!CoreError::from(TransportError::recv_failed("x")).is_advisory());
    }
}
