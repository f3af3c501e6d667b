// ============================================
// File: crates/virtlink-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Defines the abstract interfaces between the forwarding engine and its
//! collaborators, enabling mock implementations for testing and keeping
//! platform- and protocol-specific code out of the engine.
//!
//! ## Main Functionality
//! - `TunDevice`: virtual network interface read/write interface
//! - `PeerConnection`: secure transport, client role (single remote peer)
//! - `PeerListener`: secure transport, server role (multiplexed peers)
//! - `TunConfig`: interface creation parameters
//!
//! ## Design Philosophy
//! - Traits enable mock implementations for testing
//! - Async-first design with `async_trait`
//! - Every receive/read call yields exactly one complete datagram
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync for use in async contexts
//! - Buffer management is the caller's responsibility
//! - `close()` must unblock any pending receive with `TransportError::Closed`

use std::net::Ipv4Addr;

use async_trait::async_trait;

use virtlink_common::VirtualAddr;

use crate::error::Result;

// ============================================
// TunDevice Trait
// ============================================

/// Abstract interface for a virtual network interface.
///
/// # Data Format
/// Data read from and written to the device is raw IPv4 packets (no
/// Ethernet headers). The device is created, addressed and MTU-sized by
/// the driver collaborator before it is handed to the engine.
///
/// # Exclusive Ownership
/// Each device handle is owned by exactly one switch or client instance
/// for its lifetime.
#[async_trait]
pub trait TunDevice: Send + Sync {
    /// Reads one IP packet from the device.
    ///
    /// # Returns
    /// Number of bytes read into `buf`.
    ///
    /// # Errors
    /// Returns error if the read fails or the device is closed.
    async fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Writes one IP packet to the device, verbatim.
    ///
    /// # Returns
    /// Number of bytes written.
    ///
    /// # Errors
    /// Returns error if the write fails or the device is closed.
    async fn write(&self, buf: &[u8]) -> Result<usize>;

    /// Closes the device. Pending reads fail with `Closed`.
    ///
    /// # Errors
    /// Returns error if the device cannot be released cleanly.
    async fn close(&self) -> Result<()>;

    /// Installs `peer` as the system default gateway through this device.
    ///
    /// # Errors
    /// Returns error if the routing change is rejected.
    async fn set_default_gateway(&self, peer: Ipv4Addr) -> Result<()>;

    /// Returns the device name (e.g. "utun3").
    fn name(&self) -> &str;

    /// Returns the MTU applied to the device.
    fn mtu(&self) -> u16;

    /// Returns the tunnel IPv4 address assigned to the device.
    fn ip_addr(&self) -> Ipv4Addr;
}

// ============================================
// PeerConnection Trait (client role)
// ============================================

/// Secure transport, client role: one encrypted connection to one remote
/// peer. Payloads are handed over already decrypted; the engine never sees
/// ciphertext.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Sends one datagram to the remote peer.
    ///
    /// # Errors
    /// Returns error if the send fails or the connection is closed.
    async fn send(&self, buf: &[u8]) -> Result<()>;

    /// Receives one complete decrypted datagram.
    ///
    /// # Errors
    /// Returns error if the receive fails or the connection is closed.
    async fn recv(&self) -> Result<Vec<u8>>;

    /// Closes the connection. Pending receives fail with `Closed`.
    ///
    /// # Errors
    /// Returns error if the connection cannot be released cleanly.
    async fn close(&self) -> Result<()>;

    /// Returns a human-readable label for the remote peer.
    fn remote_label(&self) -> String;
}

// ============================================
// PeerListener Trait (server role)
// ============================================

/// Secure transport, server role: a multiplexed listener over a roster of
/// peers, each identified by a [`VirtualAddr`].
#[async_trait]
pub trait PeerListener: Send + Sync {
    /// Receives one complete decrypted datagram and the peer it came from.
    ///
    /// # Errors
    /// Returns error if the receive fails or the listener is closed.
    async fn recv_from(&self) -> Result<(Vec<u8>, VirtualAddr)>;

    /// Sends one datagram to the given peer.
    ///
    /// # Errors
    /// Returns error if the send fails or the listener is closed.
    async fn send_to(&self, buf: &[u8], vaddr: VirtualAddr) -> Result<()>;

    /// Closes the listener. Pending receives fail with `Closed`.
    ///
    /// # Errors
    /// Returns error if the listener cannot be released cleanly.
    async fn close(&self) -> Result<()>;
}

// ============================================
// TunConfig
// ============================================

/// Configuration for virtual interface creation.
///
/// Built by the interface bootstrap and handed to the driver collaborator
/// before the first packet exchange.
///
/// # Example
/// ```
/// use virtlink_transport::traits::TunConfig;
/// use std::net::Ipv4Addr;
///
/// let config = TunConfig::new("utun3")
///     .with_address(Ipv4Addr::new(10, 0, 0, 2))
///     .with_netmask(Ipv4Addr::new(255, 255, 255, 0))
///     .with_mtu(1420);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunConfig {
    /// Device name (e.g. "tun0", "utun3").
    pub name: String,
    /// Tunnel IPv4 address to assign to the device.
    pub address: Ipv4Addr,
    /// Network mask of the tunnel subnet.
    pub netmask: Ipv4Addr,
    /// MTU size.
    pub mtu: u16,
}

impl TunConfig {
    /// Creates a new TUN configuration with defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: Ipv4Addr::new(10, 0, 0, 1),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            mtu: 1420,
        }
    }

    /// Sets the tunnel address.
    #[must_use]
    pub const fn with_address(mut self, address: Ipv4Addr) -> Self {
        self.address = address;
        self
    }

    /// Sets the network mask.
    #[must_use]
    pub const fn with_netmask(mut self, netmask: Ipv4Addr) -> Self {
        self.netmask = netmask;
        self
    }

    /// Sets the MTU.
    #[must_use]
    pub const fn with_mtu(mut self, mtu: u16) -> Self {
        self.mtu = mtu;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        use crate::error::TransportError;

        if self.name.is_empty() {
            return Err(TransportError::invalid_config(
                "name",
                "device name cannot be empty",
            ));
        }

        if self.name.len() > 15 {
            return Err(TransportError::invalid_config(
                "name",
                "device name cannot exceed 15 characters",
            ));
        }

        if self.mtu < 576 {
            return Err(TransportError::invalid_config(
                "mtu",
                "MTU must be at least 576 bytes",
            ));
        }

        if self.mtu > 9000 {
            return Err(TransportError::invalid_config(
                "mtu",
                "MTU cannot exceed 9000 bytes",
            ));
        }

        Ok(())
    }
}

impl Default for TunConfig {
    fn default() -> Self {
        Self::new("virtlink0")
    }
}

// ============================================
// Tests
// ============================================
