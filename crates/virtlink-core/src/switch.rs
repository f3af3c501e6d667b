// ============================================
// File: crates/virtlink-core/src/switch.rs
// ============================================
//! # Hub-Side Switch
//!
//! ## Creation Reason
//! The hub end of the virtual network: owns one virtual interface and one
//! transport listener, learns which peer sits behind which tunnel address
//! and forwards every packet to exactly one place.
//!
//! ## Main Functionality
//! - `VnetSwitch`: route table + two forwarding loops
//!
//! ## Packet Processing
//!
//! ### Peer → local (background flow)
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. Receive (payload, source peer) from listener  [fatal]   │
//! │  2. Parse IPv4 header                          [advisory]   │
//! │  3. Admission: source inside tunnel subnet?    [advisory]   │
//! │  4. Learn: source IP → source peer                          │
//! │  5. Destination unroutable or self → write to tun [fatal]   │
//! │     otherwise → forward to resolved peer       [advisory]   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Local → peer (foreground flow)
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. Read one datagram from tun                    [fatal]   │
//! │  2. Parse IPv4 header                          [advisory]   │
//! │  3. Route lookup; no route → drop              [advisory]   │
//! │  4. Send to resolved peer                      [advisory]   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Forwarding is strictly unicast-to-known-peer: no flooding, no
//!   buffering of undeliverable traffic
//! - The admission check is what stops a peer from injecting traffic
//!   under a spoofed or foreign source address; it must run before the
//!   route table is touched
//! - A blocked send stalls that loop's subsequent packets (head-of-line
//!   blocking); there is no per-destination queueing

use std::net::Ipv4Addr;
use std::sync::Arc;

use ipnet::Ipv4Net;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use virtlink_transport::traits::{PeerListener, TunDevice};

use crate::config::SwitchConfig;
use crate::error::{CoreError, Result};
use crate::packet::Ipv4Header;
use crate::routing::RouteTable;

// ============================================
// VnetSwitch
// ============================================

/// Hub-side dynamic switch.
///
/// # Lifecycle
/// 1. Collaborators open the interface and listener and build the config
/// 2. Create with [`VnetSwitch::new`]; the route table starts empty
/// 3. [`VnetSwitch::run`] blocks until a fatal I/O error on either flow
///
/// # Shared State
/// The route table is the only object mutated by both flows.
pub struct VnetSwitch {
    /// The switch's own tunnel address.
    self_ip: Ipv4Addr,
    /// Admissible subnet for inbound peer traffic.
    network: Ipv4Net,
    /// Virtual interface, exclusively owned.
    tun: Arc<dyn TunDevice>,
    /// Transport listener, exclusively owned.
    listener: Arc<dyn PeerListener>,
    /// Learned routes, discarded with the switch.
    routes: Arc<RouteTable>,
}

impl VnetSwitch {
    /// Creates a new switch over an opened interface and listener.
    ///
    /// # Errors
    /// Returns error if the configuration fails validation.
    pub fn new(
        config: &SwitchConfig,
        tun: Arc<dyn TunDevice>,
        listener: Arc<dyn PeerListener>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            self_ip: config.self_ip(),
            network: config.tunnel,
            tun,
            listener,
            routes: Arc::new(RouteTable::new()),
        })
    }

    /// Returns the switch's route table.
    #[must_use]
    pub fn route_table(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes)
    }

    /// Runs both forwarding flows until a fatal error occurs.
    ///
    /// The background flow receives from peers; the foreground flow reads
    /// the interface. When the foreground flow breaks, the listener is
    /// closed exactly once (which also unblocks the background receive)
    /// and the background flow's terminal error is collected through the
    /// one-shot rendezvous.
    ///
    /// # Errors
    /// Always returns [`CoreError::Terminated`] embedding both flows'
    /// terminal errors.
    pub async fn run(&self) -> Result<()> {
        info!(
            self_ip = %self.self_ip,
            network = %self.network,
            tun = self.tun.name(),
            mtu = self.tun.mtu(),
            "Switch forwarding started"
        );

        let (terminal_tx, terminal_rx) = oneshot::channel::<CoreError>();

        {
            let tun = Arc::clone(&self.tun);
            let listener = Arc::clone(&self.listener);
            let routes = Arc::clone(&self.routes);
            let self_ip = self.self_ip;
            let network = self.network;

            tokio::spawn(async move {
                let terminal = peer_to_local(&tun, &listener, &routes, self_ip, network).await;
                // Receiver only disappears if run() was dropped mid-teardown.
                let _ = terminal_tx.send(terminal);
            });
        }

        let local_err = self.local_to_peer().await;

        // Close the listener exactly once; a blocked peer receive fails
        // with Closed and ends the background flow.
        if let Err(e) = self.listener.close().await {
            warn!(error = %e, "Listener close failed");
        }

        let peer_err = terminal_rx.await.unwrap_or_else(|_| {
            CoreError::internal("peer flow ended without reporting a terminal outcome")
        });

        error!(
            peer_flow = %peer_err,
            local_flow = %local_err,
            "Switch forwarding terminated"
        );

        Err(CoreError::terminated(peer_err, local_err))
    }

    /// Foreground flow: interface → parse → route lookup → transport.
    ///
    /// Returns the fatal error that ended the loop.
    async fn local_to_peer(&self) -> CoreError {
        let mut buf = vec![0u8; usize::from(self.tun.mtu())];

        loop {
            let n = match self.tun.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    error!(error = %e, "Interface read failed");
                    return e.into();
                }
            };
            let datagram = &buf[..n];

            let header = match Ipv4Header::parse(datagram) {
                Ok(h) => h,
                Err(e) => {
                    debug!(error = %e, "Unparseable interface packet - drop");
                    continue;
                }
            };

            let Some(next_hop) = self.routes.lookup(header.destination) else {
                debug!(destination = %header.destination, "No route - drop");
                continue;
            };

            if let Err(e) = self.listener.send_to(datagram, next_hop).await {
                warn!(peer = %next_hop, error = %e, "Peer send failed - drop");
                continue;
            }
        }
    }
}

impl std::fmt::Debug for VnetSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VnetSwitch")
            .field("self_ip", &self.self_ip)
            .field("network", &self.network)
            .field("routes", &self.routes.len())
            .finish()
    }
}

// ============================================
// Background Flow
// ============================================

/// Background flow: transport → parse → admission → learn → deliver or
/// forward.
///
/// Returns the fatal error that ended the loop.
async fn peer_to_local(
    tun: &Arc<dyn TunDevice>,
    listener: &Arc<dyn PeerListener>,
    routes: &Arc<RouteTable>,
    self_ip: Ipv4Addr,
    network: Ipv4Net,
) -> CoreError {
    loop {
        let (payload, source_peer) = match listener.recv_from().await {
            Ok(received) => received,
            Err(e) => {
                error!(error = %e, "Peer receive failed");
                return e.into();
            }
        };

        let header = match Ipv4Header::parse(&payload) {
            Ok(h) => h,
            Err(e) => {
                debug!(peer = %source_peer, error = %e, "Unparseable peer packet - drop");
                continue;
            }
        };

        // Admission control: a source outside the tunnel subnet neither
        // learns a route nor reaches the interface or another peer.
        if !network.contains(&header.source) {
            warn!(
                source = %header.source,
                peer = %source_peer,
                "Source outside tunnel subnet - drop"
            );
            continue;
        }

        routes.learn(header.source, source_peer);

        match routes.lookup(header.destination) {
            Some(next_hop) if header.destination != self_ip => {
                if let Err(e) = listener.send_to(&payload, next_hop).await {
                    warn!(peer = %next_hop, error = %e, "Peer forward failed - drop");
                    continue;
                }
            }
            // Unroutable or addressed to the switch itself: deliver
            // verbatim to the local interface.
            _ => {
                if let Err(e) = tun.write(&payload).await {
                    error!(error = %e, "Interface write failed");
                    return e.into();
                }
            }
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use virtlink_common::VirtualAddr;
    use virtlink_transport::mock::{MockListener, MockTun};
    use virtlink_transport::traits::TunConfig;

    use crate::packet::build_ipv4_packet;

    const SELF_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    fn fixture() -> (Arc<VnetSwitch>, Arc<MockTun>, Arc<MockListener>) {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let config = SwitchConfig::new("10.0.0.1/24".parse().unwrap());
        let tun = Arc::new(MockTun::new(
            TunConfig::new("mock0").with_address(SELF_IP).with_mtu(1420),
        ));
        let listener = Arc::new(MockListener::new());
        let switch = Arc::new(
            VnetSwitch::new(
                &config,
                Arc::clone(&tun) as Arc<dyn TunDevice>,
                Arc::clone(&listener) as Arc<dyn PeerListener>,
            )
            .unwrap(),
        );
        (switch, tun, listener)
    }

    fn spawn_run(switch: &Arc<VnetSwitch>) -> tokio::task::JoinHandle<Result<()>> {
        let switch = Arc::clone(switch);
        tokio::spawn(async move { switch.run().await })
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within 1s");
    }

    /// Ends `run` by closing the interface and returns the terminal error.
    async fn shut_down(
        tun: &MockTun,
        handle: tokio::task::JoinHandle<Result<()>>,
    ) -> CoreError {
        tun.close().await.unwrap();
        handle.await.unwrap().unwrap_err()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SwitchConfig::new("10.0.0.0/24".parse().unwrap());
        let tun = Arc::new(MockTun::default());
        let listener = Arc::new(MockListener::new());

        assert!(VnetSwitch::new(&config, tun, listener).is_err());
    }

    #[tokio::test]
    async fn test_peer_packet_to_self_is_delivered_and_learned() {
        let (switch, tun, listener) = fixture();
        let handle = spawn_run(&switch);

        let packet = build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP);
        listener.inject_datagram(packet.clone(), VirtualAddr::new(5));

        wait_until(|| tun.written_count() == 1).await;
        assert_eq!(tun.take_written_packets(), vec![packet]);

        // Route learning derives the peer from the observed source.
        assert_eq!(
            switch
                .route_table()
                .get_destination("10.0.0.9".parse().unwrap())
                .unwrap(),
            Some(VirtualAddr::new(5))
        );

        let err = shut_down(&tun, handle).await;
        assert!(matches!(err, CoreError::Terminated { .. }));
    }

    #[tokio::test]
    async fn test_peer_packet_is_forwarded_to_learned_peer() {
        let (switch, tun, listener) = fixture();
        let handle = spawn_run(&switch);

        // Peer 5 announces itself as 10.0.0.9 by sending to the switch.
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP),
            VirtualAddr::new(5),
        );
        wait_until(|| tun.written_count() == 1).await;

        // Peer 6 now sends to 10.0.0.9; the switch must forward, not
        // deliver locally.
        let transit = build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 8), Ipv4Addr::new(10, 0, 0, 9));
        listener.inject_datagram(transit.clone(), VirtualAddr::new(6));

        wait_until(|| listener.sent_count() == 1).await;
        assert_eq!(listener.take_sent(), vec![(transit, VirtualAddr::new(5))]);
        assert_eq!(tun.written_count(), 1);

        shut_down(&tun, handle).await;
    }

    #[tokio::test]
    async fn test_foreign_source_never_learns_or_delivers() {
        let (switch, tun, listener) = fixture();
        let handle = spawn_run(&switch);

        // Outside the 10.0.0.0/24 subnet: dropped before learning.
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(192, 168, 1, 1), SELF_IP),
            VirtualAddr::new(9),
        );
        // Marker packet so we can observe the foreign one was processed.
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP),
            VirtualAddr::new(5),
        );

        wait_until(|| tun.written_count() == 1).await;
        let delivered = tun.take_written_packets();
        assert_eq!(delivered.len(), 1, "foreign packet must not be delivered");

        assert_eq!(
            switch
                .route_table()
                .get_destination("192.168.1.1".parse().unwrap())
                .unwrap(),
            None
        );
        assert_eq!(listener.sent_count(), 0);

        shut_down(&tun, handle).await;
    }

    #[tokio::test]
    async fn test_self_addressed_packet_bypasses_routes() {
        let (switch, tun, listener) = fixture();

        // Pre-seed a route for the switch's own address; delivery to self
        // must still reach the interface.
        switch
            .route_table()
            .set_destination(SELF_IP.into(), VirtualAddr::new(40))
            .unwrap();

        let handle = spawn_run(&switch);
        let packet = build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP);
        listener.inject_datagram(packet.clone(), VirtualAddr::new(5));

        wait_until(|| tun.written_count() == 1).await;
        assert_eq!(tun.take_written_packets(), vec![packet]);
        assert_eq!(listener.sent_count(), 0);

        shut_down(&tun, handle).await;
    }

    #[tokio::test]
    async fn test_unroutable_peer_packet_is_delivered_locally() {
        let (switch, tun, listener) = fixture();
        let handle = spawn_run(&switch);

        // In-subnet destination with no learned route: falls through to
        // the interface instead of propagating an error.
        let packet = build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), Ipv4Addr::new(10, 0, 0, 50));
        listener.inject_datagram(packet.clone(), VirtualAddr::new(5));

        wait_until(|| tun.written_count() == 1).await;
        assert_eq!(tun.take_written_packets(), vec![packet]);

        shut_down(&tun, handle).await;
    }

    #[tokio::test]
    async fn test_local_packet_forwarded_over_learned_route() {
        let (switch, tun, listener) = fixture();
        let handle = spawn_run(&switch);

        // Learn 10.0.0.9 → peer 5 first.
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP),
            VirtualAddr::new(5),
        );
        wait_until(|| tun.written_count() == 1).await;

        // The interface now produces a packet for 10.0.0.9.
        let outbound = build_ipv4_packet(SELF_IP, Ipv4Addr::new(10, 0, 0, 9));
        tun.inject_packet(outbound.clone());

        wait_until(|| listener.sent_count() == 1).await;
        assert_eq!(listener.take_sent(), vec![(outbound, VirtualAddr::new(5))]);

        shut_down(&tun, handle).await;
    }

    #[tokio::test]
    async fn test_local_packet_without_route_is_dropped() {
        let (switch, tun, listener) = fixture();
        let handle = spawn_run(&switch);

        tun.inject_packet(build_ipv4_packet(SELF_IP, Ipv4Addr::new(10, 0, 0, 77)));

        // Marker through the other flow to confirm processing progressed.
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP),
            VirtualAddr::new(5),
        );
        wait_until(|| tun.written_count() == 1).await;

        assert_eq!(listener.sent_count(), 0);

        // The drop was advisory: run only terminates on the fatal close.
        let err = shut_down(&tun, handle).await;
        assert!(matches!(err, CoreError::Terminated { .. }));
    }

    #[tokio::test]
    async fn test_malformed_peer_packet_is_advisory() {
        let (switch, tun, listener) = fixture();
        let handle = spawn_run(&switch);

        listener.inject_datagram(vec![0xff, 0x00, 0x01], VirtualAddr::new(5));
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP),
            VirtualAddr::new(5),
        );

        wait_until(|| tun.written_count() == 1).await;
        assert!(switch.route_table().len() == 1);

        shut_down(&tun, handle).await;
    }

    #[tokio::test]
    async fn test_peer_send_failure_keeps_flows_running() {
        let (switch, tun, listener) = fixture();
        let handle = spawn_run(&switch);

        // Learn a route, then make every send fail.
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP),
            VirtualAddr::new(5),
        );
        wait_until(|| tun.written_count() == 1).await;
        listener.fail_sends(true);

        // Forwarding attempt fails; the flow must survive it.
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 8), Ipv4Addr::new(10, 0, 0, 9)),
            VirtualAddr::new(6),
        );
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 7), SELF_IP),
            VirtualAddr::new(8),
        );

        wait_until(|| tun.written_count() == 2).await;
        assert_eq!(listener.sent_count(), 0);

        shut_down(&tun, handle).await;
    }

    #[tokio::test]
    async fn test_interface_write_failure_surfaces_through_run() {
        let (switch, tun, listener) = fixture();

        // A closed interface makes the delivery write fail.
        tun.close().await.unwrap();
        listener.inject_datagram(
            build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 9), SELF_IP),
            VirtualAddr::new(5),
        );

        let err = spawn_run(&switch).await.unwrap().unwrap_err();
        assert!(matches!(err, CoreError::Terminated { .. }));
        assert!(
            err.to_string().contains("Interface write failed"),
            "error must reference the write failure: {err}"
        );
    }

    #[tokio::test]
    async fn test_run_reports_both_flows() {
        let (switch, tun, _listener) = fixture();
        let handle = spawn_run(&switch);

        let err = shut_down(&tun, handle).await;
        let CoreError::Terminated {
            peer_flow,
            local_flow,
        } = err
        else {
            panic!("expected Terminated, got {err}");
        };

        assert!(local_flow.is_failed(), "interface read must have failed");
        assert!(peer_flow.is_failed(), "listener close must end the receive");
    }
}
