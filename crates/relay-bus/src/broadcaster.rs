//! Fan-out of stamped envelopes to every open session.

use std::sync::Arc;

use relay_types::{Envelope, OutboundFrame};
use tracing::{debug, warn};

use crate::registry::{ConnectionRegistry, Delivery};

/// Delivers one outbound frame to every open session in the registry.
///
/// There is no per-client filtering: every open session receives every
/// broadcast. The frame is serialised once and the same `Arc<str>` is shared
/// by all session queues.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Push `envelope` under `outbound` to all open sessions.
    ///
    /// Delivery is best-effort and isolated per session: a session whose
    /// writer is gone is removed from the registry, a session whose queue is
    /// full misses this frame. Neither affects the other recipients.
    pub async fn broadcast(&self, outbound: &str, envelope: Envelope) {
        let frame = OutboundFrame::new(outbound, envelope);
        let json: Arc<str> = match serde_json::to_string(&frame) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(event = outbound, error = %e, "failed to serialize outbound frame");
                return;
            }
        };

        let sessions = self.registry.snapshot().await;
        let mut delivered = 0usize;
        let mut closed = Vec::new();

        for session in &sessions {
            if !session.is_open() {
                continue;
            }
            match session.deliver(Arc::clone(&json)) {
                Delivery::Queued => delivered += 1,
                Delivery::Dropped => {
                    warn!(
                        session = %session.id(),
                        event = outbound,
                        total_drops = session.dropped(),
                        "session queue full, frame dropped"
                    );
                }
                Delivery::Closed => closed.push(session.id()),
            }
        }

        for id in &closed {
            self.registry.remove(id).await;
        }

        debug!(
            event = outbound,
            recipients = sessions.len(),
            delivered,
            removed = closed.len(),
            "broadcast event"
        );
    }
}
