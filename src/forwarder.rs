//! The forwarding core: owns the UDP socket and the pending-request table,
//! and drives the single event loop described in the module overview.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::codec::{parse_header, parse_questions, synthesize_refusal};
use crate::config::ConfigFile;
use crate::error::ConfigError;
use crate::pending::{PendingTable, REQUEST_TTL_MS};
use crate::policy::{is_allowed, Blacklist};

/// Maximum size of an inbound UDP datagram this forwarder will read.
pub const UDP_BUFFER_SIZE: usize = 512;
/// Sweep cadence: bounds how stale an expired entry can get before removal.
pub const SWEEP_INTERVAL_MS: u64 = 100;

/// The forwarding core. One bound socket, one upstream address, one pending
/// table — no locks, no shared state across tasks (§5).
pub struct Forwarder {
    socket: UdpSocket,
    upstream: SocketAddr,
    blacklist: Blacklist,
    refuse_rcode: crate::enums::Rcode,
    pending: PendingTable,
}

impl Forwarder {
    pub async fn bind(config: &ConfigFile) -> Result<Self, ConfigError> {
        let listen_address = config.listen_address()?;
        let socket = UdpSocket::bind(listen_address)
            .await
            .map_err(|source| ConfigError::Bind {
                addr: listen_address,
                source,
            })?;
        info!(%listen_address, upstream = %config.upstream_address(), "forwarder bound");
        Ok(Self {
            socket,
            upstream: config.upstream_address(),
            blacklist: config.blacklist(),
            refuse_rcode: config.refuse_rcode(),
            pending: PendingTable::new(),
        })
    }

    /// Runs the event loop until `shutdown` resolves. Mirrors §4.3's ranked
    /// event sources: socket readability first, then the sweep tick.
    pub async fn run(mut self, shutdown: impl std::future::Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut sweep_tick = interval(Duration::from_millis(SWEEP_INTERVAL_MS));
        let mut buf = [0u8; UDP_BUFFER_SIZE];

        loop {
            tokio::select! {
                recv = self.socket.recv_from(&mut buf) => {
                    match recv {
                        Ok((len, sender)) => self.handle_packet(&buf[..len], sender).await,
                        Err(error) => {
                            // transient per §4.3; a hard socket failure would
                            // surface again on the next iteration and this
                            // loop has no way to distinguish the two here.
                            warn!(%error, "recv_from failed");
                        }
                    }
                }
                _ = sweep_tick.tick() => {
                    self.pending.sweep(Instant::now());
                }
                _ = &mut shutdown => {
                    info!("shutdown requested, stopping forwarder");
                    break;
                }
            }
        }
    }

    async fn handle_packet(&mut self, packet: &[u8], sender: SocketAddr) {
        let header = match parse_header(packet) {
            Ok(header) => header,
            Err(error) => {
                debug!(%error, len = packet.len(), "dropping packet with unparseable header");
                return;
            }
        };

        if header.is_response() {
            self.handle_upstream_reply(header.id, packet, sender).await;
        } else {
            self.handle_client_query(header.id, header.qd_count, packet, sender)
                .await;
        }
    }

    async fn handle_client_query(
        &mut self,
        id: u16,
        qd_count: u16,
        packet: &[u8],
        client_addr: SocketAddr,
    ) {
        let names = match parse_questions(packet, qd_count) {
            Ok((names, _)) => names,
            Err(error) => {
                // a wire-parse fault, not a policy decision: drop silently,
                // never respond (§7).
                debug!(%error, id, "dropping query with unparseable question section");
                return;
            }
        };

        if is_allowed(&names, &self.blacklist) {
            let now = Instant::now();
            let ttl = Duration::from_millis(REQUEST_TTL_MS);
            if !self.pending.try_insert(id, client_addr, now, ttl) {
                debug!(id, "duplicate id already pending, refusing to forward duplicate");
                return;
            }
            if let Err(error) = self.socket.send_to(packet, self.upstream).await {
                warn!(%error, id, "send_to upstream failed, dropping query");
                self.pending.remove(id);
            }
        } else {
            let reply = synthesize_refusal(id, self.refuse_rcode);
            if let Err(error) = self.socket.send_to(&reply, client_addr).await {
                warn!(%error, id, "send_to client failed while refusing query");
            }
        }
    }

    async fn handle_upstream_reply(&mut self, id: u16, packet: &[u8], sender: SocketAddr) {
        if sender != self.upstream {
            debug!(%sender, expected = %self.upstream, "dropping reply from unauthorized sender");
            return;
        }

        let Some(entry) = self.pending.remove(id) else {
            debug!(id, "dropping reply with no matching pending entry");
            return;
        };

        if let Err(error) = self.socket.send_to(packet, entry.client_addr).await {
            warn!(%error, id, client = %entry.client_addr, "send_to client failed while relaying reply");
        }
    }
}
