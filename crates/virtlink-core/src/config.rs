// ============================================
// File: crates/virtlink-core/src/config.rs
// ============================================
//! # Engine Configuration
//!
//! ## Creation Reason
//! Carries the caller-resolved parameters the switch and client need:
//! tunnel CIDR, peer tunnel address, link MTU. Parsing and persistence
//! happen outside the engine; these structs arrive validated and stay
//! immutable for the component's lifetime.
//!
//! ## Main Functionality
//! - `SwitchConfig`: hub-side switch parameters
//! - `ClientConfig`: point-to-point bridge parameters
//!
//! ## ⚠️ Important Note for Next Developer
//! - The tunnel CIDR carries two facts at once: its address is the
//!   component's own tunnel IP, its network is the admissible subnet
//! - Always call `validate()` before constructing a component

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use virtlink_common::error::CommonError;

use crate::error::Result;

/// Default physical link MTU when the caller does not override it.
const fn default_link_mtu() -> u16 {
    1500
}

// ============================================
// SwitchConfig
// ============================================

/// Configuration for a [`crate::VnetSwitch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Tunnel CIDR: the switch's own tunnel address plus the admissible
    /// subnet (e.g. `10.0.0.1/24`).
    pub tunnel: Ipv4Net,

    /// MTU of the physical link the transport runs over.
    #[serde(default = "default_link_mtu")]
    pub link_mtu: u16,
}

impl SwitchConfig {
    /// Creates a switch configuration with the default link MTU.
    #[must_use]
    pub fn new(tunnel: Ipv4Net) -> Self {
        Self {
            tunnel,
            link_mtu: default_link_mtu(),
        }
    }

    /// Returns the switch's own tunnel address.
    #[must_use]
    pub fn self_ip(&self) -> Ipv4Addr {
        self.tunnel.addr()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if the tunnel CIDR or link MTU is unusable.
    pub fn validate(&self) -> Result<()> {
        validate_tunnel(&self.tunnel)?;
        validate_link_mtu(self.link_mtu)?;
        Ok(())
    }
}

// ============================================
// ClientConfig
// ============================================

/// Configuration for a [`crate::VnetClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Tunnel CIDR: the client's own tunnel address plus the tunnel
    /// subnet (e.g. `10.0.0.2/24`).
    pub tunnel: Ipv4Net,

    /// The hub peer's tunnel address (e.g. `10.0.0.1`).
    pub peer: Ipv4Addr,

    /// When `true`, the peer is installed as the system default gateway.
    #[serde(default)]
    pub peer_gateway: bool,

    /// MTU of the physical link the transport runs over.
    #[serde(default = "default_link_mtu")]
    pub link_mtu: u16,
}

impl ClientConfig {
    /// Creates a client configuration with defaults.
    #[must_use]
    pub fn new(tunnel: Ipv4Net, peer: Ipv4Addr) -> Self {
        Self {
            tunnel,
            peer,
            peer_gateway: false,
            link_mtu: default_link_mtu(),
        }
    }

    /// Enables installing the peer as default gateway.
    #[must_use]
    pub const fn with_peer_gateway(mut self, peer_gateway: bool) -> Self {
        self.peer_gateway = peer_gateway;
        self
    }

    /// Returns the client's own tunnel address.
    #[must_use]
    pub fn self_ip(&self) -> Ipv4Addr {
        self.tunnel.addr()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if the tunnel CIDR, peer address or link MTU is
    /// unusable.
    pub fn validate(&self) -> Result<()> {
        validate_tunnel(&self.tunnel)?;
        validate_link_mtu(self.link_mtu)?;

        if self.peer == self.tunnel.addr() {
            return Err(CommonError::invalid_value(
                "peer",
                "peer address equals the local tunnel address",
            )
            .into());
        }
        if !self.tunnel.contains(&self.peer) {
            return Err(CommonError::invalid_value(
                "peer",
                format!("{} is outside the tunnel subnet {}", self.peer, self.tunnel),
            )
            .into());
        }

        Ok(())
    }
}

// ============================================
// Shared Validation
// ============================================

fn validate_tunnel(tunnel: &Ipv4Net) -> Result<()> {
    if tunnel.prefix_len() > 30 {
        return Err(CommonError::invalid_value(
            "tunnel",
            format!("/{} leaves no room for peers", tunnel.prefix_len()),
        )
        .into());
    }
    if tunnel.addr() == tunnel.network() {
        return Err(CommonError::invalid_value(
            "tunnel",
            "tunnel address is the network address; pick a host address",
        )
        .into());
    }
    Ok(())
}

fn validate_link_mtu(link_mtu: u16) -> Result<()> {
    if link_mtu < 576 {
        return Err(CommonError::invalid_value(
            "link_mtu",
            "link MTU must be at least 576 bytes",
        )
        .into());
    }
    Ok(())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_config_valid() {
        let config = SwitchConfig::new("10.0.0.1/24".parse().unwrap());

        assert!(config.validate().is_ok());
        assert_eq!(config.self_ip(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(config.link_mtu, 1500);
    }

    #[test]
    fn test_switch_config_rejects_network_address() {
        let config = SwitchConfig::new("10.0.0.0/24".parse().unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_switch_config_rejects_tiny_subnet() {
        let config = SwitchConfig::new("10.0.0.1/31".parse().unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_switch_config_rejects_small_link_mtu() {
        let mut config = SwitchConfig::new("10.0.0.1/24".parse().unwrap());
        config.link_mtu = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_config_valid() {
        let config = ClientConfig::new(
            "10.0.0.2/24".parse().unwrap(),
            Ipv4Addr::new(10, 0, 0, 1),
        )
        .with_peer_gateway(true);

        assert!(config.validate().is_ok());
        assert_eq!(config.self_ip(), Ipv4Addr::new(10, 0, 0, 2));
        assert!(config.peer_gateway);
    }

    #[test]
    fn test_client_config_rejects_foreign_peer() {
        let config = ClientConfig::new(
            "10.0.0.2/24".parse().unwrap(),
            Ipv4Addr::new(192, 168, 1, 1),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_config_rejects_self_peer() {
        let config = ClientConfig::new(
            "10.0.0.2/24".parse().unwrap(),
            Ipv4Addr::new(10, 0, 0, 2),
        );
        assert!(config.validate().is_err());
    }
}
