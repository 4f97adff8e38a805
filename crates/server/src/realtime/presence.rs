//! In-memory presence state: which connection is viewing which list.
//!
//! One process-wide registry, injected through `AppState` rather than
//! reached as a global. Two maps - room membership and the reverse
//! connection index - live behind a single mutex so a partial update can
//! never be observed: a connection is either fully in one room or in none.
//!
//! Every operation is pure bookkeeping plus an atomic snapshot of the
//! senders it affects; no I/O happens under the lock, so unrelated rooms
//! never serialize behind a slow database call. Operations on unknown
//! connections are no-ops - presence bookkeeping must never crash the
//! transport layer.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::mpsc;

use pantry_core::{ConnectionId, ListId, UserId};

use super::protocol::{ActiveUser, ServerEvent};

/// Outbound channel for one connection's events. The WebSocket task drains
/// the receiving end; a closed channel just means the peer is gone.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// What a leave removed, so the caller can notify the right room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub user_id: UserId,
    pub user_name: String,
    pub list_id: ListId,
}

/// Atomic snapshot of everything a join affected, taken under one lock.
pub struct JoinOutcome {
    /// The room this connection was in before, if any (auto-leave).
    pub previous: Option<Departure>,
    /// Remaining members of the previous room, to be told `UserLeft`.
    /// Empty when the connection re-joined the same list.
    pub departed_room: Vec<EventSender>,
    /// Other members of the joined room, to be told `UserJoined`.
    pub peers: Vec<EventSender>,
    /// The joiner's own channel, for its `ActiveUsers` snapshot.
    pub joiner: EventSender,
    /// Distinct users now in the room, including the joiner.
    pub snapshot: Vec<ActiveUser>,
    /// True when the connection was already in this exact room; callers
    /// should resend the snapshot but skip the `UserJoined` announcement.
    pub rejoined: bool,
    pub user_id: UserId,
    pub user_name: String,
}

/// Atomic snapshot of a leave or disconnect.
pub struct LeaveOutcome {
    pub departure: Departure,
    /// Members still in the departed room.
    pub remaining: Vec<EventSender>,
}

struct ConnectionState {
    user_id: UserId,
    user_name: String,
    joined_list: Option<ListId>,
    sender: EventSender,
}

#[derive(Default)]
struct Inner {
    /// list -> connections currently joined.
    rooms: HashMap<ListId, HashSet<ConnectionId>>,
    /// connection -> its state; `joined_list` is the exact inverse of `rooms`.
    connections: HashMap<ConnectionId, ConnectionState>,
}

impl Inner {
    /// Remove `conn_id` from the room it is joined to, if any.
    fn detach(&mut self, conn_id: ConnectionId) -> Option<Departure> {
        let conn = self.connections.get_mut(&conn_id)?;
        let list_id = conn.joined_list.take()?;
        let departure = Departure {
            user_id: conn.user_id,
            user_name: conn.user_name.clone(),
            list_id,
        };

        if let Some(members) = self.rooms.get_mut(&list_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.rooms.remove(&list_id);
            }
        }

        Some(departure)
    }

    fn room_senders(&self, list_id: ListId, skip: Option<ConnectionId>) -> Vec<EventSender> {
        self.rooms
            .get(&list_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|id| Some(**id) != skip)
                    .filter_map(|id| self.connections.get(id))
                    .map(|c| c.sender.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn active_users(&self, list_id: ListId) -> Vec<ActiveUser> {
        let Some(members) = self.rooms.get(&list_id) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut users: Vec<ActiveUser> = members
            .iter()
            .filter_map(|id| self.connections.get(id))
            .filter(|c| seen.insert(c.user_id))
            .map(|c| ActiveUser {
                user_id: c.user_id,
                user_name: c.user_name.clone(),
            })
            .collect();

        // Stable order for clients and tests; membership sets are unordered.
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        users
    }
}

/// Process-wide registry of live connections and room membership.
pub struct PresenceRegistry {
    inner: Mutex<Inner>,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned presence lock means a panic mid-bookkeeping; the maps
        // are updated in a single step each, so the state is still coherent.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a freshly accepted connection (authenticated, not yet in
    /// any room). Replaces any stale entry under the same id.
    pub fn register(
        &self,
        conn_id: ConnectionId,
        user_id: UserId,
        user_name: String,
        sender: EventSender,
    ) {
        let mut inner = self.lock();
        inner.detach(conn_id);
        inner.connections.insert(
            conn_id,
            ConnectionState {
                user_id,
                user_name,
                joined_list: None,
                sender,
            },
        );
    }

    /// Join `conn_id` to `list_id`'s room, first detaching it from any room
    /// it is already in - a connection is never in two rooms at once.
    ///
    /// Returns `None` (no-op) for an unregistered connection.
    pub fn join(&self, conn_id: ConnectionId, list_id: ListId) -> Option<JoinOutcome> {
        let mut inner = self.lock();
        inner.connections.get(&conn_id)?;

        let previous = inner.detach(conn_id);
        let rejoined = previous.as_ref().is_some_and(|d| d.list_id == list_id);

        let conn = inner.connections.get_mut(&conn_id)?;
        conn.joined_list = Some(list_id);
        let user_id = conn.user_id;
        let user_name = conn.user_name.clone();
        let joiner = conn.sender.clone();
        inner.rooms.entry(list_id).or_default().insert(conn_id);

        let departed_room = match &previous {
            Some(d) if !rejoined => inner.room_senders(d.list_id, None),
            _ => Vec::new(),
        };

        Some(JoinOutcome {
            departed_room,
            peers: inner.room_senders(list_id, Some(conn_id)),
            joiner,
            snapshot: inner.active_users(list_id),
            previous,
            rejoined,
            user_id,
            user_name,
        })
    }

    /// Remove `conn_id` from its current room, keeping the connection
    /// registered. No-op (`None`) if it isn't joined anywhere.
    pub fn leave(&self, conn_id: ConnectionId) -> Option<LeaveOutcome> {
        let mut inner = self.lock();
        let departure = inner.detach(conn_id)?;
        let remaining = inner.room_senders(departure.list_id, None);
        Some(LeaveOutcome {
            departure,
            remaining,
        })
    }

    /// Transport-level disconnect: same cleanup as [`leave`](Self::leave),
    /// plus dropping the connection entirely. Idempotent - a second call
    /// (or a racing explicit leave) finds nothing and is a no-op.
    pub fn remove(&self, conn_id: ConnectionId) -> Option<LeaveOutcome> {
        let mut inner = self.lock();
        let departure = inner.detach(conn_id);
        inner.connections.remove(&conn_id);
        let departure = departure?;
        let remaining = inner.room_senders(departure.list_id, None);
        Some(LeaveOutcome {
            departure,
            remaining,
        })
    }

    /// Distinct users currently in a list's room.
    #[must_use]
    pub fn active_users(&self, list_id: ListId) -> Vec<ActiveUser> {
        self.lock().active_users(list_id)
    }

    /// Cloned senders for every member of a room. Snapshot is atomic with
    /// respect to joins and leaves.
    #[must_use]
    pub fn room_senders(&self, list_id: ListId) -> Vec<EventSender> {
        self.lock().room_senders(list_id, None)
    }

    /// The list a connection is currently joined to, if any.
    #[must_use]
    pub fn joined_list(&self, conn_id: ConnectionId) -> Option<ListId> {
        self.lock()
            .connections
            .get(&conn_id)
            .and_then(|c| c.joined_list)
    }

    /// Number of live registered connections (joined or not).
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Check that room membership is exactly the inverse of the
    /// per-connection `joined_list` index. Test support.
    #[doc(hidden)]
    pub fn check_invariants(&self) -> Result<(), String> {
        let inner = self.lock();

        for (conn_id, conn) in &inner.connections {
            match conn.joined_list {
                Some(list_id) => {
                    let in_room = inner
                        .rooms
                        .get(&list_id)
                        .is_some_and(|m| m.contains(conn_id));
                    if !in_room {
                        return Err(format!("{conn_id} claims {list_id} but room disagrees"));
                    }
                }
                None => {
                    if inner.rooms.values().any(|m| m.contains(conn_id)) {
                        return Err(format!("{conn_id} is in a room but claims none"));
                    }
                }
            }
        }

        for (list_id, members) in &inner.rooms {
            if members.is_empty() {
                return Err(format!("empty room {list_id} was not pruned"));
            }
            for conn_id in members {
                let claimed = inner
                    .connections
                    .get(conn_id)
                    .and_then(|c| c.joined_list);
                if claimed != Some(*list_id) {
                    return Err(format!("room {list_id} holds {conn_id}, index disagrees"));
                }
            }
            // A connection in two rooms would show up here as an index
            // mismatch for one of them, so the single-room invariant is
            // covered by the checks above.
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (EventSender, mpsc::UnboundedReceiver<ServerEvent>) {
        mpsc::unbounded_channel()
    }

    fn registered(
        registry: &PresenceRegistry,
        user_id: UserId,
        name: &str,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = ConnectionId::generate();
        let (tx, rx) = channel();
        registry.register(conn_id, user_id, name.to_owned(), tx);
        (conn_id, rx)
    }

    #[test]
    fn test_join_then_snapshot_contains_joiner() {
        let registry = PresenceRegistry::new();
        let user = UserId::generate();
        let list = ListId::generate();
        let (conn, _rx) = registered(&registry, user, "Ada");

        let outcome = registry.join(conn, list).expect("registered connection");
        assert!(outcome.previous.is_none());
        assert!(outcome.peers.is_empty());
        assert_eq!(outcome.snapshot.len(), 1);
        assert_eq!(outcome.snapshot[0].user_id, user);
        registry.check_invariants().expect("invariants");
    }

    #[test]
    fn test_join_on_unknown_connection_is_a_noop() {
        let registry = PresenceRegistry::new();
        assert!(registry.join(ConnectionId::generate(), ListId::generate()).is_none());
        assert!(registry.leave(ConnectionId::generate()).is_none());
        assert!(registry.remove(ConnectionId::generate()).is_none());
    }

    #[test]
    fn test_second_join_auto_leaves_the_first_room() {
        let registry = PresenceRegistry::new();
        let user = UserId::generate();
        let (list_a, list_b) = (ListId::generate(), ListId::generate());
        let (conn, _rx) = registered(&registry, user, "Ada");

        registry.join(conn, list_a).expect("first join");
        let outcome = registry.join(conn, list_b).expect("second join");

        let previous = outcome.previous.expect("must have left list_a");
        assert_eq!(previous.list_id, list_a);
        assert!(!outcome.rejoined);
        assert!(registry.active_users(list_a).is_empty());
        assert_eq!(registry.active_users(list_b).len(), 1);
        assert_eq!(registry.joined_list(conn), Some(list_b));
        registry.check_invariants().expect("invariants");
    }

    #[test]
    fn test_rejoining_the_same_room_is_flagged() {
        let registry = PresenceRegistry::new();
        let (conn, _rx) = registered(&registry, UserId::generate(), "Ada");
        let list = ListId::generate();

        registry.join(conn, list).expect("first join");
        let outcome = registry.join(conn, list).expect("rejoin");

        assert!(outcome.rejoined);
        assert!(outcome.departed_room.is_empty());
        assert_eq!(registry.active_users(list).len(), 1);
        registry.check_invariants().expect("invariants");
    }

    #[test]
    fn test_active_users_deduplicates_multiple_tabs() {
        let registry = PresenceRegistry::new();
        let user = UserId::generate();
        let list = ListId::generate();
        let (tab1, _rx1) = registered(&registry, user, "Ada");
        let (tab2, _rx2) = registered(&registry, user, "Ada");

        registry.join(tab1, list).expect("tab1");
        registry.join(tab2, list).expect("tab2");

        let users = registry.active_users(list);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, user);

        // Closing one tab keeps the user present through the other.
        registry.remove(tab1).expect("tab1 was joined");
        assert_eq!(registry.active_users(list).len(), 1);
        registry.check_invariants().expect("invariants");
    }

    #[test]
    fn test_leave_keeps_the_connection_registered() {
        let registry = PresenceRegistry::new();
        let (conn, _rx) = registered(&registry, UserId::generate(), "Ada");
        let list = ListId::generate();

        registry.join(conn, list).expect("join");
        let outcome = registry.leave(conn).expect("leave");
        assert_eq!(outcome.departure.list_id, list);

        // Not in a room, but can join again without re-registering.
        assert!(registry.leave(conn).is_none());
        assert!(registry.join(conn, list).is_some());
        registry.check_invariants().expect("invariants");
    }

    #[test]
    fn test_disconnect_after_leave_is_idempotent() {
        let registry = PresenceRegistry::new();
        let (conn, _rx) = registered(&registry, UserId::generate(), "Ada");
        let list = ListId::generate();

        registry.join(conn, list).expect("join");
        assert!(registry.leave(conn).is_some());
        // The racing disconnect finds no room membership: no second UserLeft.
        assert!(registry.remove(conn).is_none());
        assert_eq!(registry.connection_count(), 0);
        registry.check_invariants().expect("invariants");
    }

    #[test]
    fn test_randomized_sequences_preserve_invariants() {
        use rand::Rng;

        let registry = PresenceRegistry::new();
        let mut rng = rand::rng();

        let lists: Vec<ListId> = (0..4).map(|_| ListId::generate()).collect();
        let users: Vec<UserId> = (0..3).map(|_| UserId::generate()).collect();
        let mut conns: Vec<ConnectionId> = Vec::new();
        let mut rxs = Vec::new();

        for step in 0..500 {
            match rng.random_range(0..4_u8) {
                0 => {
                    let user = users[rng.random_range(0..users.len())];
                    let conn = ConnectionId::generate();
                    let (tx, rx) = channel();
                    registry.register(conn, user, format!("user-{user}"), tx);
                    conns.push(conn);
                    rxs.push(rx);
                }
                1 if !conns.is_empty() => {
                    let conn = conns[rng.random_range(0..conns.len())];
                    let list = lists[rng.random_range(0..lists.len())];
                    registry.join(conn, list);
                }
                2 if !conns.is_empty() => {
                    let conn = conns[rng.random_range(0..conns.len())];
                    registry.leave(conn);
                }
                3 if !conns.is_empty() => {
                    let idx = rng.random_range(0..conns.len());
                    let conn = conns.swap_remove(idx);
                    registry.remove(conn);
                }
                _ => {}
            }

            registry
                .check_invariants()
                .unwrap_or_else(|msg| panic!("step {step}: {msg}"));
        }
    }
}
