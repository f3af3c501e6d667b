// ============================================
// File: crates/virtlink-core/src/packet.rs
// ============================================
//! # IPv4 Header Inspection
//!
//! ## Creation Reason
//! The engine makes every forwarding decision from two fields of the IPv4
//! header: source and destination address. This module extracts them
//! without copying or re-serializing the datagram.
//!
//! ## Main Functionality
//! - `Ipv4Header`: parsed view of the fixed header fields
//!
//! ## ⚠️ Important Note for Next Developer
//! - The payload past the header is opaque to the engine and is forwarded
//!   byte-identical
//! - Only IPv4 is understood; anything else is an advisory drop at the
//!   call sites

use std::net::Ipv4Addr;

use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Minimum IPv4 header size.
pub const IPV4_HEADER_LEN: usize = 20;

/// Offset of the source IP in the IPv4 header.
const IPV4_SRC_OFFSET: usize = 12;

/// Offset of the destination IP in the IPv4 header.
const IPV4_DST_OFFSET: usize = 16;

// ============================================
// Ipv4Header
// ============================================

/// The IPv4 header fields the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Source address.
    pub source: Ipv4Addr,
    /// Destination address.
    pub destination: Ipv4Addr,
    /// Total datagram length from the header.
    pub total_len: u16,
}

impl Ipv4Header {
    /// Parses the fixed IPv4 header at the start of `packet`.
    ///
    /// # Errors
    /// Returns `InvalidPacket` if the buffer is shorter than 20 bytes or
    /// does not carry IP version 4.
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < IPV4_HEADER_LEN {
            return Err(CoreError::invalid_packet(format!(
                "{} bytes is too short for an IPv4 header",
                packet.len()
            )));
        }

        let version = packet[0] >> 4;
        if version != 4 {
            return Err(CoreError::invalid_packet(format!(
                "expected IPv4, got version {version}"
            )));
        }

        let mut src = [0u8; 4];
        src.copy_from_slice(&packet[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4]);
        let mut dst = [0u8; 4];
        dst.copy_from_slice(&packet[IPV4_DST_OFFSET..IPV4_DST_OFFSET + 4]);

        Ok(Self {
            source: Ipv4Addr::from(src),
            destination: Ipv4Addr::from(dst),
            total_len: u16::from_be_bytes([packet[2], packet[3]]),
        })
    }
}

// ============================================
// Test Support
// ============================================

/// Builds a minimal 20-byte IPv4 datagram for tests.
#[cfg(test)]
pub(crate) fn build_ipv4_packet(src: Ipv4Addr, dst: Ipv4Addr) -> Vec<u8> {
    let mut packet = vec![0u8; IPV4_HEADER_LEN];
    packet[0] = 0x45; // Version 4, IHL 5
    packet[2] = 0x00;
    packet[3] = 0x14; // Total length = 20
    packet[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4].copy_from_slice(&src.octets());
    packet[IPV4_DST_OFFSET..IPV4_DST_OFFSET + 4].copy_from_slice(&dst.octets());
    packet
}

// ============================================
// Tests
// ============================================
