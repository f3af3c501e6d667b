// ============================================
// File: crates/virtlink-core/src/client.rs
// ============================================
//! # Point-to-Point Client Bridge
//!
//! ## Creation Reason
//! The spoke end of the virtual network: owns one virtual interface and
//! one transport connection and shuttles datagrams between them verbatim.
//! There is no routing table; everything goes to the single remote peer.
//!
//! ## Packet Processing
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Background: conn.recv ──► tun.write       [both fatal]     │
//! │  Foreground: tun.read  ──► conn.send       [both fatal]     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A background failure closes the interface so the foreground read
//!   fails promptly instead of hanging on a dead bridge
//! - Teardown closes the connection exactly once, then blocks on the
//!   background flow's one-shot terminal outcome
//! - The status line is presentation only; it must never affect control
//!   flow

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{error, info, warn};

use virtlink_transport::traits::{PeerConnection, TunDevice};

use crate::config::ClientConfig;
use crate::error::{CoreError, Result};

// ============================================
// VnetClient
// ============================================

/// Point-to-point bridge between one interface and one remote peer.
pub struct VnetClient {
    /// The client's own tunnel address.
    self_ip: Ipv4Addr,
    /// Virtual interface, exclusively owned.
    tun: Arc<dyn TunDevice>,
    /// Transport connection, exclusively owned.
    conn: Arc<dyn PeerConnection>,
}

impl VnetClient {
    /// Creates a new client bridge over an opened interface and
    /// connection. When the configuration asks for it, the remote peer is
    /// installed as the system default gateway.
    ///
    /// # Errors
    /// Returns error if the configuration fails validation or the
    /// default-gateway change is rejected.
    pub async fn new(
        config: &ClientConfig,
        tun: Arc<dyn TunDevice>,
        conn: Arc<dyn PeerConnection>,
    ) -> Result<Self> {
        config.validate()?;

        if config.peer_gateway {
            tun.set_default_gateway(config.peer).await?;
            info!(peer = %config.peer, "Peer installed as default gateway");
        }

        Ok(Self {
            self_ip: config.self_ip(),
            tun,
            conn,
        })
    }

    /// Returns a one-line connection summary for display purposes.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!(
            "connected ({}), tun: {}, inet {}, mtu: {}",
            self.conn.remote_label(),
            self.tun.name(),
            self.tun.ip_addr(),
            self.tun.mtu(),
        )
    }

    /// Runs both bridge flows until a fatal error occurs.
    ///
    /// # Errors
    /// Always returns [`CoreError::Terminated`] embedding both flows'
    /// terminal outcomes.
    pub async fn run(&self) -> Result<()> {
        info!(self_ip = %self.self_ip, status = %self.status_line(), "Client bridge started");

        let (terminal_tx, terminal_rx) = oneshot::channel::<CoreError>();

        {
            let tun = Arc::clone(&self.tun);
            let conn = Arc::clone(&self.conn);

            tokio::spawn(async move {
                let terminal = transport_to_interface(&tun, &conn).await;
                let _ = terminal_tx.send(terminal);
            });
        }

        let local_err = self.interface_to_transport().await;

        // Close the connection exactly once; a blocked receive on the
        // background flow fails with Closed.
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "Connection close failed");
        }

        let peer_err = terminal_rx.await.unwrap_or_else(|_| {
            CoreError::internal("peer flow ended without reporting a terminal outcome")
        });

        error!(
            peer_flow = %peer_err,
            local_flow = %local_err,
            "Client bridge terminated"
        );

        Err(CoreError::terminated(peer_err, local_err))
    }

    /// Foreground flow: interface → transport, verbatim.
    ///
    /// Returns the fatal error that ended the loop.
    async fn interface_to_transport(&self) -> CoreError {
        let mut buf = vec![0u8; usize::from(self.tun.mtu())];

        loop {
            let n = match self.tun.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    error!(error = %e, "Interface read failed");
                    return e.into();
                }
            };

            if let Err(e) = self.conn.send(&buf[..n]).await {
                error!(error = %e, "Peer send failed");
                return e.into();
            }
        }
    }
}

impl std::fmt::Debug for VnetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VnetClient")
            .field("self_ip", &self.self_ip)
            .field("remote", &self.conn.remote_label())
            .field("tun", &self.tun.name())
            .finish()
    }
}

// ============================================
// Background Flow
// ============================================

/// Background flow: transport → interface, verbatim. On failure the
/// interface is closed so the foreground read fails promptly.
///
/// Returns the fatal error that ended the loop.
async fn transport_to_interface(
    tun: &Arc<dyn TunDevice>,
    conn: &Arc<dyn PeerConnection>,
) -> CoreError {
    loop {
        let payload = match conn.recv().await {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Peer receive failed");
                if let Err(close_err) = tun.close().await {
                    warn!(error = %close_err, "Interface close failed");
                }
                return e.into();
            }
        };

        if let Err(e) = tun.write(&payload).await {
            error!(error = %e, "Interface write failed");
            if let Err(close_err) = tun.close().await {
                warn!(error = %close_err, "Interface close failed");
            }
            return e.into();
        }
    }
}

// ============================================
// Tests
// ============================================
