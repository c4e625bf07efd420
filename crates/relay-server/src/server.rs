//! [`RelayServer`] – HTTP + WebSocket listener for the relay.
//!
//! Listens on `127.0.0.1:5000` by default (configurable via
//! [`RelayServer::with_host`] / [`RelayServer::with_port`]).
//!
//! * Regular HTTP requests → the static page for the path, or `404`.
//! * WebSocket upgrades → one transport endpoint bridged to the [`Hub`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relay_bus::{Hub, Session};
use relay_types::{InboundFrame, RelayError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, instrument, warn};

use crate::pages;

/// Default listen host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port for the HTTP/WebSocket listener.
pub const DEFAULT_PORT: u16 = 5000;

/// Default number of outbound frames buffered per session.
pub const DEFAULT_SESSION_QUEUE: usize = 256;

/// How long a closing session may spend finishing the close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// RelayServer
// ---------------------------------------------------------------------------

/// Lightweight HTTP + WebSocket server that serves the static pages and turns
/// every WebSocket into a relay session.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use relay_bus::{Hub, RouteTable};
/// use relay_server::RelayServer;
///
/// #[tokio::main]
/// async fn main() {
///     let hub = Arc::new(Hub::new(RouteTable::default()));
///     RelayServer::new(hub)
///         .with_host("0.0.0.0")
///         .run()
///         .await
///         .expect("relay server failed");
/// }
/// ```
pub struct RelayServer {
    hub: Arc<Hub>,
    host: String,
    port: u16,
    session_queue: usize,
}

impl RelayServer {
    /// Create a server backed by `hub` on [`DEFAULT_HOST`]:[`DEFAULT_PORT`].
    pub fn new(hub: Arc<Hub>) -> Self {
        Self {
            hub,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            session_queue: DEFAULT_SESSION_QUEUE,
        }
    }

    /// Override the listening host (builder-style).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the listening port (builder-style).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the per-session outbound buffer (builder-style).
    pub fn with_session_queue(mut self, frames: usize) -> Self {
        self.session_queue = frames;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn session_queue(&self) -> usize {
        self.session_queue
    }

    /// `host:port` this server binds to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Bind`] if the TCP listener cannot bind.
    pub async fn bind(&self) -> Result<TcpListener, RelayError> {
        let addr = self.addr();
        match TcpListener::bind(addr.as_str()).await {
            Ok(listener) => Ok(listener),
            Err(source) => Err(RelayError::Bind { addr, source }),
        }
    }

    /// Bind and serve until the task is cancelled.
    pub async fn run(self) -> Result<(), RelayError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound `listener`.
    ///
    /// Each accepted connection runs on its own task, so a slow or stalled
    /// client never holds up the others.
    pub async fn serve(self, listener: TcpListener) -> Result<(), RelayError> {
        let local = listener.local_addr()?;
        info!(addr = %local, "Relay listening on http://{local}");

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let hub = Arc::clone(&self.hub);
                    let queue = self.session_queue;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, hub, queue).await {
                            warn!(%peer, error = %e, "client error");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept error");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<Hub>,
    queue: usize,
) -> Result<(), RelayError> {
    // `peek` leaves the request in the socket so the WebSocket handshaker
    // still sees the full upgrade request.
    let mut buf = [0u8; 1024];
    let n = stream.peek(&mut buf).await?;

    if is_websocket_upgrade(&String::from_utf8_lossy(&buf[..n])) {
        handle_ws(stream, peer, hub, queue).await
    } else {
        serve_page(stream, peer).await
    }
}

pub(crate) fn is_websocket_upgrade(request_head: &str) -> bool {
    request_head.lines().any(|line| {
        let line = line.to_ascii_lowercase();
        line.starts_with("upgrade:") && line.contains("websocket")
    })
}

// ---------------------------------------------------------------------------
// Plain HTTP: static pages
// ---------------------------------------------------------------------------

async fn serve_page(mut stream: TcpStream, peer: SocketAddr) -> Result<(), RelayError> {
    let mut buf = [0u8; 2048];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let response = match request_line(&request) {
        Some(("GET", path)) => match pages::page_for(path) {
            Some(body) => http_response("200 OK", "text/html; charset=utf-8", body),
            None => http_response("404 Not Found", "text/plain; charset=utf-8", "Not Found"),
        },
        Some(_) => http_response(
            "405 Method Not Allowed",
            "text/plain; charset=utf-8",
            "Method Not Allowed",
        ),
        None => http_response("400 Bad Request", "text/plain; charset=utf-8", "Bad Request"),
    };

    debug!(%peer, request = request.lines().next().unwrap_or(""), "http request");
    stream.write_all(response.as_bytes()).await?;
    let _ = stream.shutdown().await;
    Ok(())
}

/// Method and path of an HTTP request head.
pub(crate) fn request_line(request: &str) -> Option<(&str, &str)> {
    let mut parts = request.lines().next()?.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    Some((method, path))
}

pub(crate) fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
}

// ---------------------------------------------------------------------------
// WebSocket: one transport endpoint per connection
// ---------------------------------------------------------------------------

#[instrument(name = "session", skip_all, fields(peer = %peer))]
async fn handle_ws(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<Hub>,
    queue: usize,
) -> Result<(), RelayError> {
    let ws_stream = accept_async(stream).await.map_err(|e| RelayError::Handshake {
        peer: peer.to_string(),
        details: e.to_string(),
    })?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (session, mut outbound) = Session::new(peer.to_string(), queue);
    let registry = Arc::clone(hub.registry());
    registry.add(Arc::clone(&session)).await;

    // ── Downstream: session queue → socket ──────────────────────────────────
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    if ws_tx.send(Message::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                _ = &mut stop_rx => break,
            }
        }
        // Sends our Close frame, or flushes the reply to the peer's.
        let _ = ws_tx.close().await;
    });

    // ── Upstream: socket → hub, in receipt order ────────────────────────────
    let writer_running = loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        hub.dispatch(session.id(), InboundFrame::parse(text.as_str())).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break true,
                    Some(Err(e)) => {
                        debug!(session = %session.id(), error = %e, "read error");
                        break true;
                    }
                    _ => {}
                }
            }
            _ = &mut writer => {
                debug!(session = %session.id(), "writer stopped");
                break false;
            }
        }
    };

    registry.remove(&session.id()).await;
    if writer_running {
        let _ = stop_tx.send(());
        if timeout(CLOSE_GRACE, &mut writer).await.is_err() {
            debug!(session = %session.id(), "close handshake timed out");
            writer.abort();
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
