// ============================================
// File: crates/virtlink-core/src/lib.rs
// ============================================
//! # Virtlink Core - Packet-Switching Engine
//!
//! ## Creation Reason
//! Implements the forwarding engine of the virtlink virtual private
//! network: the hub-side dynamic switch (route table + two forwarding
//! loops) and the point-to-point client bridge. Encryption, device
//! drivers and configuration persistence are collaborators behind the
//! `virtlink-transport` traits.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`routing`]: concurrency-safe IPv4 → peer route table
//! - [`switch`]: hub-side switch ([`VnetSwitch`])
//! - [`client`]: point-to-point bridge ([`VnetClient`])
//! - [`packet`]: IPv4 header inspection
//! - [`setup`]: interface bootstrap (tunnel MTU, `TunConfig`)
//! - [`config`]: validated, caller-supplied configuration
//! - [`error`]: engine error types
//!
//! ## Data Flow
//! ```text
//! Switch:  tun ──► parse ──► route lookup ──► listener.send_to
//!          listener.recv_from ──► parse ──► admission ──► learn
//!                   ──► (local deliver | forward to peer)
//!
//! Client:  tun ──► conn.send          conn.recv ──► tun
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Two flows per duplex bridge, never more: one foreground loop plus
//!   one background task. The only cross-flow state is the route table
//!   (switch) and the one-shot terminal rendezvous.
//! - Packets are forwarded byte-identical; the engine never re-serializes
//!   a datagram.
//! - Termination is always driven by an I/O failure on one of the flows;
//!   there is no external cancellation mechanism.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod packet;
pub mod routing;
pub mod setup;
pub mod switch;

// Re-export primary types
pub use client::VnetClient;
pub use config::{ClientConfig, SwitchConfig};
pub use error::{CoreError, FlowOutcome, Result};
pub use routing::RouteTable;
pub use switch::VnetSwitch;
