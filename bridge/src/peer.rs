use std::{collections::HashMap, net::SocketAddr, time::Duration, time::Instant};

use log::trace;

#[derive(Debug, Clone, Copy)]
struct PeerRecord {
    last_seen: Instant,
    pinned: bool,
}

/// The set of remote reactors this bridge fans events out to.
///
/// Peers arrive two ways: seeded from configuration (pinned, never
/// expired, since losing a configured mesh member would partition the
/// mesh permanently) or learned from the origin address of an incoming
/// datagram. Learned peers are stamped on every datagram and expired
/// once idle past the table's TTL.
pub struct PeerTable {
    peers: HashMap<SocketAddr, PeerRecord>,
    ttl: Duration,
}

impl PeerTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            peers: HashMap::new(),
            ttl,
        }
    }

    /// Adds a configured peer that never expires.
    pub fn seed(&mut self, addr: SocketAddr) {
        let now = Instant::now();
        self.peers
            .entry(addr)
            .and_modify(|record| record.pinned = true)
            .or_insert(PeerRecord {
                last_seen: now,
                pinned: true,
            });
    }

    /// Records traffic from `addr`, learning it when new.
    pub fn mark_seen(&mut self, addr: SocketAddr, now: Instant) {
        self.peers
            .entry(addr)
            .and_modify(|record| record.last_seen = now)
            .or_insert(PeerRecord {
                last_seen: now,
                pinned: false,
            });
    }

    /// Drops learned peers idle past the TTL. Returns how many went.
    pub fn prune(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.peers.len();
        self.peers.retain(|addr, record| {
            let keep = record.pinned || now.duration_since(record.last_seen) <= ttl;
            if !keep {
                trace!("expiring idle bridge peer {}", addr);
            }
            keep
        });
        before - self.peers.len()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers.contains_key(addr)
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.peers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
