//! Live collaboration: presence tracking and event fan-out.
//!
//! A client opens one WebSocket, authenticated before upgrade. It can then
//! join a single list "room" at a time; everyone in a room sees presence
//! changes and item mutations as they happen. Delivery is best-effort and
//! non-durable - a client that missed events re-fetches list state after
//! reconnecting.
//!
//! - [`protocol`] - Wire messages in both directions
//! - [`presence`] - Who is in which room right now (the one piece of shared
//!   mutable state, guarded by a single mutex)
//! - [`broadcast`] - Fire-and-forget fan-out of mutation events to a room
//! - [`hub`] - Per-connection session coordination (join/leave/disconnect)

pub mod broadcast;
pub mod hub;
pub mod presence;
pub mod protocol;

pub use broadcast::Broadcaster;
pub use presence::PresenceRegistry;
pub use protocol::{ActiveUser, ClientMessage, ServerEvent};
