// ============================================
// File: crates/virtlink-transport/src/lib.rs
// ============================================
//! # Virtlink Transport - I/O Abstraction Layer
//!
//! ## Creation Reason
//! Defines the capability traits the forwarding engine consumes: the
//! virtual network interface and the two roles of the secure datagram
//! transport. The concrete drivers (tun/utun ioctls, the encrypted UDP
//! protocol) live outside this repository; the engine only ever talks to
//! these traits.
//!
//! ## Main Functionality
//! - [`traits`]: `TunDevice`, `PeerConnection`, `PeerListener`, `TunConfig`
//! - [`mock`]: in-memory implementations for tests
//! - [`error`]: transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               virtlink-core                         │
//! │                    │                                │
//! │                    ▼                                │
//! │             virtlink-transport  ◄── You are here    │
//! │                    │                                │
//! │                    ▼                                │
//! │             virtlink-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every receive/read yields exactly one complete datagram
//! - Always use the traits for testability
//! - The mock implementations are for tests only

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod mock;
pub mod traits;

// Re-export primary types
pub use error::{Result, TransportError};
pub use mock::{MockConnection, MockListener, MockTun};
pub use traits::{PeerConnection, PeerListener, TunConfig, TunDevice};

/// Per-datagram envelope overhead of the secure transport, in bytes.
///
/// Covers the peer identifier, packet counter and authentication tag the
/// transport prepends to every datagram.
pub const HEADER_LEN: usize = 40;

/// Additional data-message header overhead of the secure transport, in bytes.
pub const DATA_HEADER_LEN: usize = 12;
