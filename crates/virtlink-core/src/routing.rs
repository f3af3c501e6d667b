// ============================================
// File: crates/virtlink-core/src/routing.rs
// ============================================
//! # Route Table
//!
//! ## Creation Reason
//! Maps tunnel IPv4 addresses to transport-level peer identifiers so the
//! switch can resolve the next hop for every forwarded packet. Entries
//! are learned from the source addresses of admitted inbound traffic,
//! never configured statically.
//!
//! ## Main Functionality
//! - `RouteTable`: IPv4 → `VirtualAddr` mapping
//! - `set_destination` / `get_destination`: validated public operations
//! - Fast typed lookups using `DashMap`
//!
//! ## Route Table Structure
//! ```text
//! ┌─────────────────┬───────────────────────────────────┐
//! │  Tunnel IPv4    │          VirtualAddr              │
//! ├─────────────────┼───────────────────────────────────┤
//! │  10.0.0.2       │  vaddr:1001                       │
//! │  10.0.0.3       │  vaddr:1002                       │
//! └─────────────────┴───────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Thread-safe via DashMap: any number of concurrent readers, last
//!   completed write wins, readers never observe a partial write
//! - No eviction and no capacity bound: growth is bounded only by the
//!   number of distinct source addresses ever observed, which is
//!   acceptable for small peer rosters only
//! - There is deliberately no default-route fallback: an unresolved
//!   destination stays unresolved

use std::net::{IpAddr, Ipv4Addr};

use dashmap::DashMap;
use tracing::debug;

use virtlink_common::{error::CommonError, VirtualAddr};

use crate::error::Result;

/// Concurrency-safe mapping from tunnel IPv4 address to peer identifier.
pub struct RouteTable {
    routes: DashMap<Ipv4Addr, VirtualAddr>,
}

impl RouteTable {
    /// Creates an empty route table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }

    /// Unconditionally inserts or overwrites the mapping for `ip`,
    /// returning the previous entry. Last writer wins.
    ///
    /// # Errors
    /// Rejects anything that is not a well-formed 4-byte IPv4 address;
    /// malformed input is never truncated or aliased into a key.
    pub fn set_destination(&self, ip: IpAddr, vaddr: VirtualAddr) -> Result<Option<VirtualAddr>> {
        let ip = require_ipv4(ip)?;
        Ok(self.learn(ip, vaddr))
    }

    /// Returns the mapping for `ip`, or `None` when no entry exists.
    ///
    /// # Errors
    /// Rejects anything that is not a well-formed 4-byte IPv4 address.
    pub fn get_destination(&self, ip: IpAddr) -> Result<Option<VirtualAddr>> {
        let ip = require_ipv4(ip)?;
        Ok(self.lookup(ip))
    }

    /// Typed fast path for the forwarding loops: insert or overwrite,
    /// returning the previous entry.
    pub(crate) fn learn(&self, ip: Ipv4Addr, vaddr: VirtualAddr) -> Option<VirtualAddr> {
        let previous = self.routes.insert(ip, vaddr);

        match previous {
            Some(old) if old != vaddr => {
                debug!(ip = %ip, old = %old, new = %vaddr, "Route replaced");
            }
            Some(_) => {}
            None => {
                debug!(ip = %ip, vaddr = %vaddr, "Route learned");
            }
        }

        previous
    }

    /// Typed fast path for the forwarding loops: lookup without copying.
    pub(crate) fn lookup(&self, ip: Ipv4Addr) -> Option<VirtualAddr> {
        self.routes.get(&ip).map(|r| *r.value())
    }

    /// Checks if a route exists for the given address.
    #[must_use]
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.routes.contains_key(&ip)
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if there are no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Rejects non-IPv4 input before it can reach the table.
fn require_ipv4(ip: IpAddr) -> Result<Ipv4Addr> {
    match ip {
        IpAddr::V4(v4) => Ok(v4),
        IpAddr::V6(_) => Err(CommonError::invalid_address(
            ip,
            "route table keys must be 4-byte IPv4 addresses",
        )
        .into()),
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.len())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
