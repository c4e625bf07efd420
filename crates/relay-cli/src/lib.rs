//! `relay-cli` – process bootstrap shared by the `pong-relay` and
//! `serial-feeder` binaries.
//!
//! - [`config`] – TOML configuration vault with `local` / `prod` listen
//!   addresses and extra routes.
//! - [`telemetry`] – `tracing` subscriber and optional OTLP span export.

pub mod config;
pub mod telemetry;
