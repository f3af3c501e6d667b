// ============================================
// File: crates/virtlink-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifier types used throughout virtlink, keeping the
//! transport-level peer address distinct from tunnel IPv4 addresses at the
//! type level.
//!
//! ## Main Functionality
//! - `VirtualAddr`: transport-level peer identifier (16-bit)
//!
//! ## ⚠️ Important Note for Next Developer
//! - `VirtualAddr` identifies a peer inside the secure transport's address
//!   space. It is NOT the peer's tunnel IPv4 address; the route table maps
//!   between the two.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================
// VirtualAddr
// ============================================

/// Transport-level peer identifier.
///
/// Every peer of the secure transport is addressed by a short integer,
/// assigned out-of-band in the peer roster. The switch learns which
/// `VirtualAddr` sits behind which tunnel IPv4 address by observing the
/// source addresses of forwarded traffic.
///
/// # Example
/// ```
/// use virtlink_common::VirtualAddr;
///
/// let vaddr = VirtualAddr::new(7);
/// assert_eq!(vaddr.value(), 7);
/// assert_eq!(vaddr.to_string(), "vaddr:7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VirtualAddr(u16);

impl VirtualAddr {
    /// Creates a new `VirtualAddr` from its raw value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the raw 16-bit value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for VirtualAddr {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<VirtualAddr> for u16 {
    fn from(vaddr: VirtualAddr) -> Self {
        vaddr.0
    }
}

impl fmt::Display for VirtualAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vaddr:{}", self.0)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_addr_roundtrip() {
        let vaddr = VirtualAddr::new(1001);
        assert_eq!(vaddr.value(), 1001);
        assert_eq!(u16::from(vaddr), 1001);
        assert_eq!(VirtualAddr::from(1001), vaddr);
    }

    #[test]
    fn test_virtual_addr_display() {
        assert_eq!(VirtualAddr::new(7).to_string(), "vaddr:7");
    }

    #[test]
    fn test_virtual_addr_as_map_key() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(VirtualAddr::new(1), "first");
        map.insert(VirtualAddr::new(2), "second");

        assert_eq!(map.get(&VirtualAddr::new(1)), Some(&"first"));
        assert_eq!(map.get(&VirtualAddr::new(3)), None);
    }
}
