//! Fire-and-forget fan-out of events to a list's room.
//!
//! No delivery confirmation, no retry, no persistence of missed events - a
//! disconnected client simply misses events until it rejoins and re-fetches
//! current state. A write failure to one stale connection never blocks or
//! fails delivery to the rest of the room, and never fails the originating
//! mutation.

use std::sync::Arc;

use pantry_core::ListId;

use super::presence::{EventSender, PresenceRegistry};
use super::protocol::ServerEvent;

/// Fans events out to whichever connections the presence registry currently
/// has in a room. Cheap to clone; shares the registry.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<PresenceRegistry>,
}

impl Broadcaster {
    #[must_use]
    pub fn new(registry: Arc<PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `event` to every connection currently in `list_id`'s room,
    /// the originator's own connections included.
    pub fn broadcast(&self, list_id: ListId, event: &ServerEvent) {
        Self::fan_out(&self.registry.room_senders(list_id), event);
    }

    pub(crate) fn fan_out(senders: &[EventSender], event: &ServerEvent) {
        for sender in senders {
            if sender.send(event.clone()).is_err() {
                // Receiver task already gone; its disconnect cleanup will
                // drop the registration shortly.
                tracing::debug!("skipping broadcast to closed connection");
            }
        }
    }
}
