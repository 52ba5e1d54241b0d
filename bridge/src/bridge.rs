use std::{
    io::ErrorKind,
    net::{SocketAddr, UdpSocket},
    time::{Duration, Instant},
};

use log::warn;

use manifold_core::{resolved_channel, Manager};

use crate::{
    error::BridgeError,
    peer::PeerTable,
    wire::{ByteReader, ByteWriter, Record, Wire},
};

/// Default UDP port bridges listen on when none is configured.
pub const DEFAULT_BRIDGE_PORT: u16 = 64000;

/// Hard ceiling for one outgoing datagram. Multiple serialized records
/// share a datagram up to this size; no record is ever split across two.
pub const DATAGRAM_BUDGET: usize = 8192;

/// Contains Config properties which will be used by a Bridge
#[derive(Clone)]
pub struct BridgeConfig {
    /// Address the bridge socket binds to. Use port 0 for an ephemeral
    /// port (tests, multiple bridges per host).
    pub bind_addr: SocketAddr,
    /// Maximum size of one outgoing datagram.
    pub datagram_budget: usize,
    /// How long a learned peer may stay idle before it is expired.
    /// Seeded peers never expire.
    pub peer_ttl: Duration,
    /// Peers known ahead of time; these are pinned in the peer table.
    pub peers: Vec<SocketAddr>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_BRIDGE_PORT)),
            datagram_budget: DATAGRAM_BUDGET,
            peer_ttl: Duration::from_secs(300),
            peers: Vec::new(),
        }
    }
}

/// Relays events between managers over UDP.
///
/// Outbound: [`flush`](Self::flush) wraps the manager's queue drain,
/// serializing every locally originated entry and batching records into
/// budget-capped datagrams fanned out to every known peer. Inbound:
/// [`poll`](Self::poll) drains the socket once, turning received records
/// back into immediately dispatched local events stamped with their
/// origin. Events delivered by `poll` bypass the queue, so they are
/// never re-broadcast by a later `flush`; a fully connected mesh cannot
/// produce a broadcast storm.
pub struct Bridge {
    socket: UdpSocket,
    local_addr: SocketAddr,
    peers: PeerTable,
    budget: usize,
    recv_buf: Vec<u8>,
}

impl Bridge {
    /// Binds the bridge socket and seeds the peer table.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Bind`]/[`BridgeError::Configure`] when the socket
    /// cannot be created or switched to non-blocking mode.
    pub fn bind(config: BridgeConfig) -> Result<Self, BridgeError> {
        let socket = UdpSocket::bind(config.bind_addr).map_err(|error| BridgeError::Bind {
            addr: config.bind_addr.to_string(),
            message: error.to_string(),
        })?;
        socket
            .set_nonblocking(true)
            .map_err(|error| BridgeError::Configure {
                message: error.to_string(),
            })?;
        let local_addr = socket.local_addr().map_err(|error| BridgeError::Configure {
            message: error.to_string(),
        })?;

        let mut peers = PeerTable::new(config.peer_ttl);
        for addr in &config.peers {
            peers.seed(*addr);
        }

        Ok(Self {
            socket,
            local_addr,
            peers,
            budget: config.datagram_budget,
            recv_buf: vec![0; 65536],
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Pins an additional peer at runtime.
    pub fn add_peer(&mut self, addr: SocketAddr) {
        self.peers.seed(addr);
    }

    /// Drains the manager's queue, fanning every locally originated
    /// entry out to the peer mesh alongside its local dispatch.
    ///
    /// Records are packed until the next one would not fit, at which
    /// point the buffer is sent as one datagram per peer first and a new
    /// buffer starts. A single record exceeding the whole budget drops
    /// that event only (logged); the flush continues. Returns the number
    /// of entries dispatched locally.
    pub fn flush(&mut self, manager: &mut Manager) -> usize {
        if self.peers.is_empty() {
            // no mesh: nothing to serialize
            return manager.flush();
        }

        let budget = self.budget;
        let local_addr = self.local_addr;
        let mut buffer: Vec<u8> = Vec::with_capacity(budget);
        let mut datagrams: Vec<Vec<u8>> = Vec::new();

        let dispatched = manager.flush_with(|event| {
            let record = Record {
                channel: resolved_channel(event),
                source: event.source().unwrap_or(local_addr),
                event: event.clone(),
            };
            let mut writer = ByteWriter::new();
            record.ser(&mut writer);
            if writer.len() > budget {
                warn!(
                    "bridge: {}",
                    BridgeError::OversizeEvent {
                        size: writer.len(),
                        budget,
                    }
                );
                return;
            }
            if buffer.len() + writer.len() > budget {
                datagrams.push(std::mem::take(&mut buffer));
            }
            buffer.extend_from_slice(writer.as_slice());
        });

        if !buffer.is_empty() {
            datagrams.push(buffer);
        }

        let peer_addrs = self.peers.addrs();
        for datagram in &datagrams {
            for addr in &peer_addrs {
                if let Err(error) = self.socket.send_to(datagram, addr) {
                    warn!("bridge: send to {} failed: {}", addr, error);
                }
            }
        }

        dispatched
    }

    /// One non-blocking receive pass: parses every datagram queued on
    /// the socket, learns peers from datagram origins, and dispatches
    /// each record locally with its origin as the event source.
    ///
    /// Malformed datagrams and unhandled channels are logged and
    /// skipped; a peer cannot crash this reactor. Returns the number of
    /// records delivered.
    pub fn poll(&mut self, manager: &mut Manager) -> usize {
        let mut delivered = 0;

        loop {
            match self.socket.recv_from(&mut self.recv_buf) {
                Ok((length, origin)) => {
                    let now = Instant::now();
                    self.peers.mark_seen(origin, now);

                    let mut reader = ByteReader::new(&self.recv_buf[..length]);
                    while !reader.is_empty() {
                        match Record::de(&mut reader) {
                            Ok(record) => {
                                match manager.deliver_remote(
                                    record.event,
                                    record.channel.clone(),
                                    record.source,
                                ) {
                                    Ok(_) => delivered += 1,
                                    Err(error) => {
                                        warn!(
                                            "bridge: dropping remote event on `{}`: {}",
                                            record.channel, error
                                        );
                                    }
                                }
                            }
                            Err(error) => {
                                warn!(
                                    "bridge: dropping malformed datagram from {}: {}",
                                    origin, error
                                );
                                break;
                            }
                        }
                    }
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => break,
                Err(error) => {
                    warn!("bridge: receive failed: {}", error);
                    break;
                }
            }
        }

        self.peers.prune(Instant::now());
        delivered
    }
}
