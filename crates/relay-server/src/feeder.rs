//! Serial-monitor feeder.
//!
//! [`SerialFeeder`] is the hardware-side producer: it reads newline-delimited
//! records from a serial device (or any other line source), wraps each one in
//! a `"from_serial_monitor"` frame, and sends it to a running relay over a
//! WebSocket. The relay stamps it and broadcasts it to every page as
//! `"update"`.

use futures_util::{SinkExt, StreamExt};
use relay_types::{FROM_SERIAL_MONITOR, InboundFrame, RelayError};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

/// WebSocket client forwarding serial lines to a relay.
pub struct SerialFeeder {
    url: String,
}

impl SerialFeeder {
    /// `url` is the relay's WebSocket endpoint, e.g. `"ws://127.0.0.1:5000/"`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect to the relay and forward every line of `input` until it ends.
    ///
    /// Returns the number of frames sent.
    ///
    /// # Errors
    ///
    /// [`RelayError::Connect`] if the relay is unreachable or drops the
    /// connection, [`RelayError::Io`] if reading `input` fails.
    pub async fn run<R>(&self, input: R) -> Result<usize, RelayError>
    where
        R: AsyncBufRead + Unpin,
    {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| self.connect_error(e))?;
        info!(url = %self.url, "feeder connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        // The relay broadcasts back to the feeder too; keep reading so the
        // socket never backs up.
        let drain = tokio::spawn(async move { while let Some(Ok(_)) = ws_rx.next().await {} });

        let mut lines = input.lines();
        let mut sent = 0usize;
        while let Some(line) = lines.next_line().await? {
            let Some(frame) = frame_for_line(&line) else {
                continue;
            };
            let text = serde_json::to_string(&frame)
                .map_err(|e| RelayError::Serialization(e.to_string()))?;
            ws_tx
                .send(Message::Text(text.into()))
                .await
                .map_err(|e| self.connect_error(e))?;
            sent += 1;
            debug!(sent, "forwarded serial line");
        }

        let _ = ws_tx.close().await;
        drain.abort();
        info!(url = %self.url, sent, "serial input ended");
        Ok(sent)
    }

    fn connect_error(&self, e: impl std::fmt::Display) -> RelayError {
        RelayError::Connect {
            url: self.url.clone(),
            details: e.to_string(),
        }
    }
}

/// Build the frame for one serial line.
///
/// JSON lines are forwarded as structured data; anything else is forwarded as
/// a JSON string with only the line terminator removed. Blank lines yield
/// `None`.
pub fn frame_for_line(line: &str) -> Option<InboundFrame> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let data = serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()));
    Some(InboundFrame::new(FROM_SERIAL_MONITOR, data))
}
