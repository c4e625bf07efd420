//! [`Hub`] – single dispatch entry point shared by all transport endpoints.

use std::sync::Arc;

use relay_types::InboundFrame;
use tracing::{debug, info};

use crate::broadcaster::Broadcaster;
use crate::registry::{ConnectionRegistry, SessionId};
use crate::router::{Route, RouteTable};

/// What [`Hub::dispatch`] did with an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Log-only route; receipt recorded, nothing sent.
    Logged,
    /// Stamped and fanned out under `outbound`.
    Broadcast { outbound: String },
    /// No route for the event name; dropped.
    Unmapped,
}

/// Router + broadcaster pair over one shared [`ConnectionRegistry`].
///
/// # Example
///
/// ```rust
/// use relay_bus::{Hub, RouteTable};
///
/// let hub = Hub::new(RouteTable::default());
/// assert!(hub.registry().is_empty());
/// ```
#[derive(Debug)]
pub struct Hub {
    routes: RouteTable,
    broadcaster: Broadcaster,
}

impl Hub {
    /// Create a hub with a fresh, empty registry.
    pub fn new(routes: RouteTable) -> Self {
        Self::with_registry(routes, Arc::new(ConnectionRegistry::new()))
    }

    pub fn with_registry(routes: RouteTable, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            routes,
            broadcaster: Broadcaster::new(registry),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.broadcaster.registry()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Route one inbound frame received on session `from` and broadcast the
    /// result if the event name has a forwarding route.
    ///
    /// Frames from one session must be dispatched in receipt order; the
    /// transport endpoint awaits each call before reading the next frame.
    pub async fn dispatch(&self, from: SessionId, frame: InboundFrame) -> Dispatch {
        let (event, payload) = frame.into_parts();
        let summary = payload.to_string();

        if let Some((outbound, envelope)) = self.routes.route(&event, payload) {
            info!(session = %from, outbound = %outbound, "{event}: {summary}");
            self.broadcaster.broadcast(&outbound, envelope).await;
            return Dispatch::Broadcast { outbound };
        }

        match self.routes.resolve(&event) {
            Some(Route::LogOnly) => {
                info!(session = %from, "received {event}: {summary}");
                Dispatch::Logged
            }
            _ => {
                debug!(session = %from, event = %event, "no route for inbound event");
                Dispatch::Unmapped
            }
        }
    }
}
