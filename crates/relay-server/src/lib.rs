//! `relay-server` – The Transport Endpoint
//!
//! Boots a lightweight HTTP + WebSocket listener that:
//!
//! 1. **Serves** the two static pages (the game menu at `/` and the Pong
//!    page at `/pong`) to plain HTTP requests.
//!
//! 2. **Accepts** one WebSocket per client. Each connection becomes a
//!    [`Session`] in the shared [`ConnectionRegistry`] and every text frame it
//!    sends is handed to the [`Hub`] in receipt order:
//!    - `"message"` → logged only.
//!    - `"from_browser"` → stamped and broadcast as `"feedback"`.
//!    - `"from_serial_monitor"` → stamped and broadcast as `"update"`.
//!
//! 3. **Feeds** serial-monitor output into a running relay through
//!    [`SerialFeeder`], a WebSocket client that turns each line it reads into
//!    a `"from_serial_monitor"` frame.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relay_bus::{Hub, RouteTable};
//! use relay_server::RelayServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let hub = Arc::new(Hub::new(RouteTable::default()));
//!     RelayServer::new(hub)
//!         .with_port(5000)
//!         .run()
//!         .await
//!         .expect("relay server failed");
//! }
//! ```
//!
//! [`Session`]: relay_bus::Session
//! [`ConnectionRegistry`]: relay_bus::ConnectionRegistry
//! [`Hub`]: relay_bus::Hub

pub mod feeder;
pub mod pages;
pub mod server;

pub use feeder::SerialFeeder;
pub use server::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SESSION_QUEUE, RelayServer};
