// ============================================
// File: crates/virtlink-transport/src/mock.rs
// ============================================
//! # Mock Transport Implementations
//!
//! ## Creation Reason
//! Provides in-memory stand-ins for the virtual interface and both secure
//! transport roles, so the forwarding engine can be tested without network
//! devices, sockets or root privileges.
//!
//! ## Main Functionality
//! - `MockTun`: in-memory TUN device (inject reads, capture writes)
//! - `MockConnection`: client-role transport over in-memory queues
//! - `MockListener`: server-role transport over in-memory queues
//!
//! ## Usage in Tests
//! ```
//! use virtlink_transport::mock::MockTun;
//! use virtlink_transport::traits::{TunConfig, TunDevice};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tun = MockTun::new(TunConfig::new("mock0"));
//! tun.inject_packet(b"test packet".to_vec());
//!
//! let mut buf = [0u8; 1500];
//! let len = tun.read(&mut buf).await.unwrap();
//! assert_eq!(&buf[..len], b"test packet");
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Testing only - do not use in production
//! - `close()` drains nothing: already queued inbound datagrams are still
//!   delivered before receives start failing, mirroring a socket with
//!   buffered data
//! - Queues are bounded to prevent memory issues

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use virtlink_common::VirtualAddr;

use crate::error::{Result, TransportError};
use crate::traits::{PeerConnection, PeerListener, TunConfig, TunDevice};

// ============================================
// Constants
// ============================================

/// Maximum number of packets to queue.
const MAX_QUEUE_SIZE: usize = 1000;

// ============================================
// MockTun
// ============================================

/// Mock virtual interface for testing.
///
/// # Features
/// - Inject packets to be returned by `read()`
/// - Capture packets passed to `write()` for verification
/// - Closable: a closed device fails reads and writes, unblocking a
///   reader waiting on an empty queue
pub struct MockTun {
    /// Device configuration.
    config: TunConfig,
    /// Packets waiting to be read (injected for testing).
    read_queue: Mutex<VecDeque<Vec<u8>>>,
    /// Packets that have been written (captured for verification).
    write_queue: Mutex<VecDeque<Vec<u8>>>,
    /// Whether the device has been closed.
    closed: AtomicBool,
    /// Peer installed as default gateway, if any.
    default_gateway: Mutex<Option<Ipv4Addr>>,
    /// Notify when new packets are available or the device closes.
    read_notify: Notify,
}

impl MockTun {
    /// Creates a new mock device.
    #[must_use]
    pub fn new(config: TunConfig) -> Self {
        Self {
            config,
            read_queue: Mutex::new(VecDeque::with_capacity(100)),
            write_queue: Mutex::new(VecDeque::with_capacity(100)),
            closed: AtomicBool::new(false),
            default_gateway: Mutex::new(None),
            read_notify: Notify::new(),
        }
    }

    /// Injects a packet to be returned by a subsequent `read()` call.
    ///
    /// # Panics
    /// Panics if the queue is full (> `MAX_QUEUE_SIZE` packets).
    pub fn inject_packet(&self, packet: Vec<u8>) {
        let mut queue = self.read_queue.lock();
        assert!(queue.len() < MAX_QUEUE_SIZE, "MockTun read queue overflow");
        queue.push_back(packet);
        drop(queue);
        self.read_notify.notify_one();
    }

    /// Takes all packets that have been written to the device,
    /// clearing the capture queue.
    #[must_use]
    pub fn take_written_packets(&self) -> Vec<Vec<u8>> {
        self.write_queue.lock().drain(..).collect()
    }

    /// Returns the number of packets that have been written.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.write_queue.lock().len()
    }

    /// Returns the peer installed as default gateway, if any.
    #[must_use]
    pub fn default_gateway(&self) -> Option<Ipv4Addr> {
        *self.default_gateway.lock()
    }

    /// Returns `true` once the device has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl TunDevice for MockTun {
    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            {
                let mut queue = self.read_queue.lock();
                if let Some(packet) = queue.pop_front() {
                    let len = packet.len().min(buf.len());
                    buf[..len].copy_from_slice(&packet[..len]);
                    return Ok(len);
                }
            }
            if self.is_closed() {
                return Err(TransportError::tun_read("device closed"));
            }

            // Wait for a packet to be injected or the device to close
            self.read_notify.notified().await;
        }
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(TransportError::tun_write("device closed"));
        }
        let mut queue = self.write_queue.lock();
        if queue.len() >= MAX_QUEUE_SIZE {
            return Err(TransportError::tun_write("write queue full"));
        }
        queue.push_back(buf.to_vec());
        Ok(buf.len())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.read_notify.notify_one();
        Ok(())
    }

    async fn set_default_gateway(&self, peer: Ipv4Addr) -> Result<()> {
        *self.default_gateway.lock() = Some(peer);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn mtu(&self) -> u16 {
        self.config.mtu
    }

    fn ip_addr(&self) -> Ipv4Addr {
        self.config.address
    }
}

impl std::fmt::Debug for MockTun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTun")
            .field("name", &self.config.name)
            .field("address", &self.config.address)
            .field("mtu", &self.config.mtu)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Default for MockTun {
    fn default() -> Self {
        Self::new(TunConfig::default())
    }
}

// ============================================
// MockConnection
// ============================================

/// Mock client-role transport connection.
pub struct MockConnection {
    /// Remote peer label reported by `remote_label()`.
    label: String,
    /// Datagrams waiting to be received (injected for testing).
    inbound: Mutex<VecDeque<Vec<u8>>>,
    /// Datagrams that have been sent (captured for verification).
    outbound: Mutex<Vec<Vec<u8>>>,
    /// Whether the connection has been closed.
    closed: AtomicBool,
    /// When set, `send()` fails with `SendFailed`.
    fail_sends: AtomicBool,
    /// Notify when inbound datagrams arrive or the connection closes.
    recv_notify: Notify,
}

impl MockConnection {
    /// Creates a new mock connection.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inbound: Mutex::new(VecDeque::with_capacity(100)),
            outbound: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            recv_notify: Notify::new(),
        }
    }

    /// Injects a datagram to be returned by a subsequent `recv()` call.
    ///
    /// # Panics
    /// Panics if the queue is full (> `MAX_QUEUE_SIZE` datagrams).
    pub fn inject_datagram(&self, datagram: Vec<u8>) {
        let mut queue = self.inbound.lock();
        assert!(
            queue.len() < MAX_QUEUE_SIZE,
            "MockConnection inbound queue overflow"
        );
        queue.push_back(datagram);
        drop(queue);
        self.recv_notify.notify_one();
    }

    /// Takes all datagrams that have been sent, clearing the capture.
    #[must_use]
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.outbound.lock())
    }

    /// Makes subsequent `send()` calls fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }

    /// Returns `true` once the connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl PeerConnection for MockConnection {
    async fn send(&self, buf: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(TransportError::send_failed(&self.label, "injected failure"));
        }
        self.outbound.lock().push(buf.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>> {
        loop {
            {
                let mut queue = self.inbound.lock();
                if let Some(datagram) = queue.pop_front() {
                    return Ok(datagram);
                }
            }
            if self.is_closed() {
                return Err(TransportError::Closed);
            }

            self.recv_notify.notified().await;
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.recv_notify.notify_one();
        Ok(())
    }

    fn remote_label(&self) -> String {
        self.label.clone()
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================
// MockListener
// ============================================

/// Mock server-role transport listener.
pub struct MockListener {
    /// `(datagram, source peer)` pairs waiting to be received.
    inbound: Mutex<VecDeque<(Vec<u8>, VirtualAddr)>>,
    /// `(datagram, destination peer)` pairs that have been sent.
    outbound: Mutex<Vec<(Vec<u8>, VirtualAddr)>>,
    /// Whether the listener has been closed.
    closed: AtomicBool,
    /// When set, `send_to()` fails with `SendFailed`.
    fail_sends: AtomicBool,
    /// Notify when inbound datagrams arrive or the listener closes.
    recv_notify: Notify,
}

impl MockListener {
    /// Creates a new mock listener.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::with_capacity(100)),
            outbound: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            recv_notify: Notify::new(),
        }
    }

    /// Injects a datagram as if received from `source`.
    ///
    /// # Panics
    /// Panics if the queue is full (> `MAX_QUEUE_SIZE` datagrams).
    pub fn inject_datagram(&self, datagram: Vec<u8>, source: VirtualAddr) {
        let mut queue = self.inbound.lock();
        assert!(
            queue.len() < MAX_QUEUE_SIZE,
            "MockListener inbound queue overflow"
        );
        queue.push_back((datagram, source));
        drop(queue);
        self.recv_notify.notify_one();
    }

    /// Takes all `(datagram, destination)` pairs that have been sent.
    #[must_use]
    pub fn take_sent(&self) -> Vec<(Vec<u8>, VirtualAddr)> {
        std::mem::take(&mut *self.outbound.lock())
    }

    /// Returns the number of datagrams sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.outbound.lock().len()
    }

    /// Makes subsequent `send_to()` calls fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }

    /// Returns `true` once the listener has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl PeerListener for MockListener {
    async fn recv_from(&self) -> Result<(Vec<u8>, VirtualAddr)> {
        loop {
            {
                let mut queue = self.inbound.lock();
                if let Some(entry) = queue.pop_front() {
                    return Ok(entry);
                }
            }
            if self.is_closed() {
                return Err(TransportError::Closed);
            }

            self.recv_notify.notified().await;
        }
    }

    async fn send_to(&self, buf: &[u8], vaddr: VirtualAddr) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(TransportError::send_failed(
                vaddr.to_string(),
                "injected failure",
            ));
        }
        self.outbound.lock().push((buf.to_vec(), vaddr));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.recv_notify.notify_one();
        Ok(())
    }
}

impl Default for MockListener {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockListener")
            .field("closed", &self.is_closed())
            .field("sent", &self.sent_count())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_tun_inject_read() {
        let tun = MockTun::new(TunConfig::new("mock0"));
        tun.inject_packet(b"test packet".to_vec());

        let mut buf = [0u8; 100];
        let len = tun.read(&mut buf).await.unwrap();

        assert_eq!(&buf[..len], b"test packet");
    }

    #[tokio::test]
    async fn test_mock_tun_write_capture() {
        let tun = MockTun::new(TunConfig::new("mock0"));

        tun.write(b"packet 1").await.unwrap();
        tun.write(b"packet 2").await.unwrap();
        assert_eq!(tun.written_count(), 2);

        let captured = tun.take_written_packets();
        assert_eq!(captured[0], b"packet 1");
        assert_eq!(captured[1], b"packet 2");
        assert_eq!(tun.written_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_tun_close_unblocks_reader() {
        let tun = std::sync::Arc::new(MockTun::new(TunConfig::new("mock0")));

        let reader = {
            let tun = std::sync::Arc::clone(&tun);
            tokio::spawn(async move {
                let mut buf = [0u8; 100];
                tun.read(&mut buf).await
            })
        };

        // Give the reader a chance to park on the empty queue
        tokio::task::yield_now().await;
        tun.close().await.unwrap();

        let result = reader.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_tun_write_after_close() {
        let tun = MockTun::new(TunConfig::new("mock0"));
        tun.close().await.unwrap();

        assert!(tun.write(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_tun_queued_packets_survive_close() {
        let tun = MockTun::new(TunConfig::new("mock0"));
        tun.inject_packet(b"buffered".to_vec());
        tun.close().await.unwrap();

        let mut buf = [0u8; 100];
        let len = tun.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"buffered");

        assert!(tun.read(&mut buf).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_tun_default_gateway() {
        let tun = MockTun::new(TunConfig::new("mock0"));
        assert_eq!(tun.default_gateway(), None);

        let peer = Ipv4Addr::new(10, 0, 0, 1);
        tun.set_default_gateway(peer).await.unwrap();
        assert_eq!(tun.default_gateway(), Some(peer));
    }

    #[tokio::test]
    async fn test_mock_connection_roundtrip() {
        let conn = MockConnection::new("hub.example:7000");

        conn.inject_datagram(b"inbound".to_vec());
        assert_eq!(conn.recv().await.unwrap(), b"inbound");

        conn.send(b"outbound").await.unwrap();
        assert_eq!(conn.take_sent(), vec![b"outbound".to_vec()]);
        assert_eq!(conn.remote_label(), "hub.example:7000");
    }

    #[tokio::test]
    async fn test_mock_connection_close_fails_recv() {
        let conn = MockConnection::new("hub");
        conn.close().await.unwrap();

        assert!(matches!(conn.recv().await, Err(TransportError::Closed)));
        assert!(matches!(conn.send(b"x").await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_mock_connection_send_failure_injection() {
        let conn = MockConnection::new("hub");
        conn.fail_sends(true);

        assert!(matches!(
            conn.send(b"x").await,
            Err(TransportError::SendFailed { .. })
        ));

        conn.fail_sends(false);
        assert!(conn.send(b"x").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_listener_roundtrip() {
        let listener = MockListener::new();
        let peer = VirtualAddr::new(7);

        listener.inject_datagram(b"from peer".to_vec(), peer);
        let (datagram, source) = listener.recv_from().await.unwrap();
        assert_eq!(datagram, b"from peer");
        assert_eq!(source, peer);

        listener.send_to(b"to peer", peer).await.unwrap();
        assert_eq!(listener.take_sent(), vec![(b"to peer".to_vec(), peer)]);
    }

    #[tokio::test]
    async fn test_mock_listener_close_fails_recv() {
        let listener = MockListener::new();
        listener.close().await.unwrap();

        assert!(matches!(
            listener.recv_from().await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_mock_listener_queued_datagrams_survive_close() {
        let listener = MockListener::new();
        listener.inject_datagram(b"buffered".to_vec(), VirtualAddr::new(3));
        listener.close().await.unwrap();

        let (datagram, source) = listener.recv_from().await.unwrap();
        assert_eq!(datagram, b"buffered");
        assert_eq!(source, VirtualAddr::new(3));

        assert!(listener.recv_from().await.is_err());
    }
}
