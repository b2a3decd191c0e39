//! The pending-request table: tracks queries forwarded upstream until their
//! reply is relayed back to the client, or until they expire.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Default lifetime of a pending entry (§3).
pub const REQUEST_TTL_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    pub client_addr: SocketAddr,
    expires_at: Instant,
}

/// Maps transaction id to the client awaiting its reply.
///
/// Id collisions are resolved by **refusing the duplicate** (policy (a) of
/// §4.3): if a second query arrives with an id already pending, the new
/// query's forward is not tracked and its client will never see a reply
/// relayed back, but the original pending entry is left untouched. This is
/// the deterministic option the spec recommends over silently overwriting
/// the first client's entry.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<u16, PendingEntry>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a new pending entry for `id`, expiring `ttl` from `now`.
    /// Returns `false` without modifying the table if `id` is already
    /// pending.
    pub fn try_insert(&mut self, id: u16, client_addr: SocketAddr, now: Instant, ttl: Duration) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(
            id,
            PendingEntry {
                client_addr,
                expires_at: now + ttl,
            },
        );
        true
    }

    /// Removes and returns the pending entry for `id`, if any.
    pub fn remove(&mut self, id: u16) -> Option<PendingEntry> {
        self.entries.remove(&id)
    }

    /// Removes every entry whose deadline has passed as of `now`. Idempotent:
    /// when nothing is expired, the underlying map is left untouched (no
    /// reallocation).
    pub fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}
