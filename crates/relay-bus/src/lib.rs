//! `relay-bus` – The Broadcaster Core
//!
//! Accepts named inbound events, stamps them with the server-local time, and
//! fans the resulting envelope out to every connected session without caring
//! what the payload means.
//!
//! # Modules
//!
//! - [`timestamp`] – second-resolution, host-local receive timestamps.
//! - [`router`] – explicit inbound → outbound [`Route`] table.
//! - [`registry`] – concurrency-safe set of live [`Session`]s.
//! - [`broadcaster`] – best-effort fan-out over a registry snapshot.
//! - [`hub`] – dispatch entry point used by every transport endpoint.

pub mod broadcaster;
pub mod hub;
pub mod registry;
pub mod router;
pub mod timestamp;

pub use broadcaster::Broadcaster;
pub use hub::{Dispatch, Hub};
pub use registry::{ConnectionRegistry, Delivery, Session, SessionId, SessionState};
pub use router::{Route, RouteTable};
