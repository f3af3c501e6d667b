// ============================================
// File: crates/virtlink-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! Error types shared by every virtlink crate. Higher layers wrap these
//! via `#[from]` conversions.

use std::net::IpAddr;

use thiserror::Error;

/// Result type for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors shared across virtlink crates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// An address was not a well-formed 4-byte IPv4 address.
    #[error("Invalid IPv4 address: {addr} ({reason})")]
    InvalidAddress {
        /// The offending address.
        addr: IpAddr,
        /// Why it was rejected.
        reason: String,
    },

    /// A caller-supplied value failed validation.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the rejected field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl CommonError {
    /// Creates an `InvalidAddress` error.
    pub fn invalid_address(addr: IpAddr, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            addr,
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidValue` error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_display() {
        let addr: IpAddr = "fe80::1".parse().unwrap();
        let err = CommonError::invalid_address(addr, "expected IPv4");

        assert!(err.to_string().contains("fe80::1"));
        assert!(err.to_string().contains("expected IPv4"));
    }

    #[test]
    fn test_invalid_value_display() {
        let err = CommonError::invalid_value("mtu", "must be at least 576");
        assert!(err.to_string().contains("mtu"));
    }
}
