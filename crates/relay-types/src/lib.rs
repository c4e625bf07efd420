use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Free-form text sent by a browser; logged, never broadcast.
pub const MESSAGE: &str = "message";
/// Structured input from the browser page.
pub const FROM_BROWSER: &str = "from_browser";
/// Structured input from the serial-monitor feeder.
pub const FROM_SERIAL_MONITOR: &str = "from_serial_monitor";
/// Outbound echo of [`FROM_BROWSER`] traffic.
pub const FEEDBACK: &str = "feedback";
/// Outbound echo of [`FROM_SERIAL_MONITOR`] traffic.
pub const UPDATE: &str = "update";

/// Timestamped wrapper around a broadcast payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Server-local receive time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    /// The inbound payload, untouched.
    pub data: Value,
}

/// Inbound payload as seen at the protocol boundary.
///
/// The `message` handler historically receives a plain string while every
/// other handler receives structured data, so the two shapes are kept apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    /// Convert into the JSON value carried by an [`Envelope`].
    pub fn into_value(self) -> Value {
        match self {
            Payload::Text(text) => Value::String(text),
            Payload::Json(value) => value,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => f.write_str(text),
            Payload::Json(value) => write!(f, "{value}"),
        }
    }
}

/// One named event received from a client: `{"event": .., "data": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl InboundFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Decode a WebSocket text frame.
    ///
    /// Anything that is not a JSON event object is an unnamed send and is
    /// delivered to the [`MESSAGE`] handler with the raw text as payload.
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text)
            .unwrap_or_else(|_| Self::new(MESSAGE, Value::String(text.to_string())))
    }

    /// Split into the event name and its boundary [`Payload`].
    pub fn into_parts(self) -> (String, Payload) {
        let payload = match self.data {
            Value::String(text) if self.event == MESSAGE => Payload::Text(text),
            other => Payload::Json(other),
        };
        (self.event, payload)
    }
}

/// One named event pushed to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub event: String,
    pub data: Envelope,
}

impl OutboundFrame {
    pub fn new(event: impl Into<String>, data: Envelope) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Errors raised by the relay's transport and bootstrap layers.
///
/// Steady-state routing never fails; these cover the edges where the relay
/// touches sockets, files, and remote endpoints.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Bind Error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("WebSocket Handshake Error from {peer}: {details}")]
    Handshake { peer: String, details: String },

    #[error("Connect Error to {url}: {details}")]
    Connect { url: String, details: String },

    #[error("Transport I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}
