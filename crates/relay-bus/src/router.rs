//! Inbound → outbound event routing.
//!
//! The route table is built once at startup and consulted for every inbound
//! frame. Each inbound name maps to at most one [`Route`]:
//!
//! | Inbound | Route |
//! |---|---|
//! | `message` | [`Route::LogOnly`] |
//! | `from_browser` | [`Route::Forward`] → `feedback` |
//! | `from_serial_monitor` | [`Route::Forward`] → `update` |
//!
//! Names missing from the table are accepted and dropped.

use std::collections::HashMap;

use relay_types::{Envelope, Payload, FEEDBACK, FROM_BROWSER, FROM_SERIAL_MONITOR, MESSAGE, UPDATE};

use crate::timestamp;

/// What happens to an inbound event with a known name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Record receipt; never broadcast.
    LogOnly,
    /// Stamp the payload and broadcast it under the given outbound name.
    Forward(String),
}

/// Static mapping from inbound event name to [`Route`].
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    /// A table with no entries; every inbound name is unmapped.
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Add or replace a forwarding route (builder-style).
    pub fn with_forward(mut self, inbound: impl Into<String>, outbound: impl Into<String>) -> Self {
        self.insert(inbound, Route::Forward(outbound.into()));
        self
    }

    /// Add or replace a log-only route (builder-style).
    pub fn with_log_only(mut self, inbound: impl Into<String>) -> Self {
        self.insert(inbound, Route::LogOnly);
        self
    }

    /// Install `route` for `inbound`, returning the entry it replaced.
    pub fn insert(&mut self, inbound: impl Into<String>, route: Route) -> Option<Route> {
        self.routes.insert(inbound.into(), route)
    }

    /// Look up the table entry for `event_name`.
    pub fn resolve(&self, event_name: &str) -> Option<&Route> {
        self.routes.get(event_name)
    }

    /// Resolve `event_name` and, for a forwarding route, wrap `payload` in a
    /// freshly stamped [`Envelope`].
    ///
    /// Returns `None` for log-only and unmapped names. The payload is never
    /// inspected.
    pub fn route(&self, event_name: &str, payload: Payload) -> Option<(String, Envelope)> {
        match self.resolve(event_name)? {
            Route::LogOnly => None,
            Route::Forward(outbound) => Some((
                outbound.clone(),
                Envelope {
                    timestamp: timestamp::now(),
                    data: payload.into_value(),
                },
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::empty()
            .with_log_only(MESSAGE)
            .with_forward(FROM_BROWSER, FEEDBACK)
            .with_forward(FROM_SERIAL_MONITOR, UPDATE)
    }
}
