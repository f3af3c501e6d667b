// ============================================
// File: crates/virtlink-core/src/setup.rs
// ============================================
//! # Interface Bootstrap
//!
//! ## Creation Reason
//! Computes the tunnel MTU from the physical link MTU and assembles the
//! `TunConfig` the driver collaborator needs to create and address the
//! virtual interface. Runs once, before the first packet exchange.
//!
//! ## Main Functionality
//! - `tunnel_mtu`: link MTU minus the full encapsulation overhead
//! - `tun_config_for`: validated `TunConfig` for a tunnel CIDR
//!
//! ## Encapsulation Overhead
//! ```text
//! ┌──────────┬─────────┬──────────────────┬───────────────┬─────────┐
//! │ IPv4 (20)│ UDP (8) │ transport (40)   │ data hdr (12) │ payload │
//! └──────────┴─────────┴──────────────────┴───────────────┴─────────┘
//! ```

use ipnet::Ipv4Net;

use virtlink_common::error::CommonError;
use virtlink_transport::traits::TunConfig;
use virtlink_transport::{DATA_HEADER_LEN, HEADER_LEN};

use crate::error::Result;
use crate::packet::IPV4_HEADER_LEN;

/// UDP header size.
const UDP_HEADER_LEN: usize = 8;

/// Bytes of every physical-link datagram consumed by encapsulation.
pub const TUNNEL_OVERHEAD: usize = IPV4_HEADER_LEN + UDP_HEADER_LEN + HEADER_LEN + DATA_HEADER_LEN;

/// Computes the tunnel MTU for a given physical link MTU.
///
/// # Errors
/// Returns error if the link MTU is too small to carry any payload after
/// encapsulation.
pub fn tunnel_mtu(link_mtu: u16) -> Result<u16> {
    let overhead = u16::try_from(TUNNEL_OVERHEAD)
        .map_err(|_| CommonError::invalid_value("overhead", "encapsulation overhead overflow"))?;

    link_mtu
        .checked_sub(overhead)
        .filter(|mtu| *mtu >= 576)
        .ok_or_else(|| {
            CommonError::invalid_value(
                "link_mtu",
                format!("{link_mtu} bytes cannot carry a {TUNNEL_OVERHEAD}-byte encapsulation"),
            )
            .into()
        })
}

/// Builds the interface configuration for a tunnel CIDR, with the MTU
/// already reduced by the encapsulation overhead.
///
/// # Errors
/// Returns error if the link MTU is too small or the resulting
/// configuration fails validation.
pub fn tun_config_for(name: &str, tunnel: Ipv4Net, link_mtu: u16) -> Result<TunConfig> {
    let config = TunConfig::new(name)
        .with_address(tunnel.addr())
        .with_netmask(tunnel.netmask())
        .with_mtu(tunnel_mtu(link_mtu)?);

    config.validate()?;
    Ok(config)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_tunnel_mtu_standard_link() {
        // 1500 - (20 + 8 + 40 + 12) = 1420
        assert_eq!(tunnel_mtu(1500).unwrap(), 1420);
    }

    #[test]
    fn test_tunnel_mtu_too_small() {
        assert!(tunnel_mtu(600).is_err());
        assert!(tunnel_mtu(80).is_err());
    }

    #[test]
    fn test_tun_config_for() {
        let tunnel: Ipv4Net = "10.0.0.2/24".parse().unwrap();
        let config = tun_config_for("utun3", tunnel, 1500).unwrap();

        assert_eq!(config.name, "utun3");
        assert_eq!(config.address, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(config.netmask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(config.mtu, 1420);
    }

    #[test]
    fn test_tun_config_for_rejects_tiny_link() {
        let tunnel: Ipv4Net = "10.0.0.2/24".parse().unwrap();
        assert!(tun_config_for("utun3", tunnel, 200).is_err());
    }
}
