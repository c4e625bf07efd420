//! Live session tracking.
//!
//! Every transport endpoint owns one [`Session`] for the lifetime of its
//! connection. The [`ConnectionRegistry`] is the single place that knows which
//! sessions are currently open; it is mutated concurrently by every endpoint
//! and read by every broadcast.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque session identifier. Every new connection gets a fresh one.
pub type SessionId = Uuid;

/// Lifecycle of a session: `Connecting -> Open -> Closed`.
///
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Open = 1,
    Closed = 2,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionState::Connecting,
            1 => SessionState::Open,
            _ => SessionState::Closed,
        }
    }
}

/// Result of handing one frame to one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame queued for the session's writer.
    Queued,
    /// Session queue was full; this frame was dropped for this session only.
    Dropped,
    /// The session's writer is gone.
    Closed,
}

/// One live transport connection.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer: String,
    state: AtomicU8,
    dropped: AtomicU64,
    tx: mpsc::Sender<Arc<str>>,
}

impl Session {
    /// Create a session in the `Connecting` state.
    ///
    /// The returned receiver is the session's outbound queue; the transport
    /// writer drains it onto the socket. `capacity` bounds the number of
    /// frames buffered for a slow client (minimum 1).
    pub fn new(peer: impl Into<String>, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let session = Self {
            id: Uuid::new_v4(),
            peer: peer.into(),
            state: AtomicU8::new(SessionState::Connecting as u8),
            dropped: AtomicU64::new(0),
            tx,
        };
        (Arc::new(session), rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Remote address (or another human-readable label) of the peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Frames dropped so far because the session queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// `Connecting -> Open`. Returns `false` if the session was not connecting.
    fn open(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to the terminal `Closed` state.
    pub fn close(&self) {
        self.state.store(SessionState::Closed as u8, Ordering::Release);
    }

    /// Queue `frame` for this session without waiting.
    pub fn deliver(&self, frame: Arc<str>) -> Delivery {
        match self.tx.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close();
                Delivery::Closed
            }
        }
    }
}

/// Concurrency-safe set of open sessions.
///
/// Only [`add`](Self::add), [`remove`](Self::remove) and
/// [`snapshot`](Self::snapshot) touch membership. The write lock is held only
/// for the map update itself, so a broadcast iterating a snapshot never blocks
/// connects or disconnects.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    active: AtomicUsize,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected session and mark it open.
    ///
    /// A session that already closed (its peer vanished during the handshake)
    /// is not registered.
    pub async fn add(&self, session: Arc<Session>) {
        if !session.open() {
            debug!(session = %session.id(), state = ?session.state(), "not registering session");
            return;
        }
        let mut sessions = self.sessions.write().await;
        if sessions.insert(session.id(), Arc::clone(&session)).is_none() {
            self.active.fetch_add(1, Ordering::Relaxed);
        }
        info!(
            session = %session.id(),
            peer = %session.peer(),
            sessions = sessions.len(),
            "Session connected"
        );
    }

    /// Deregister a session and mark it closed. No-op when absent.
    pub async fn remove(&self, id: &SessionId) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.remove(id) {
            session.close();
            self.active.fetch_sub(1, Ordering::Relaxed);
            info!(
                session = %id,
                peer = %session.peer(),
                sessions = sessions.len(),
                dropped = session.dropped(),
                "Session disconnected"
            );
        }
    }

    /// Point-in-time view of the open sessions.
    ///
    /// Sessions may close while the caller is still using the returned list;
    /// check [`Session::is_open`] or handle [`Delivery::Closed`].
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| s.is_open()).cloned().collect()
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Number of registered sessions (lock-free).
    pub fn len(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session(peer: &str) -> (Arc<Session>, mpsc::Receiver<Arc<str>>) {
        Session::new(peer, 8)
    }

    #[test]
    fn new_session_is_connecting() {
        let (session, _rx) = make_session("a");
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.is_open());
        assert_eq!(session.peer(), "a");
    }

    #[test]
    fn new_sessions_get_distinct_ids() {
        let (a, _rx_a) = make_session("a");
        let (b, _rx_b) = make_session("b");
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn add_opens_and_registers() {
        let registry = ConnectionRegistry::new();
        let (session, _rx) = make_session("a");
        registry.add(Arc::clone(&session)).await;

        assert!(session.is_open());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&session.id()).await);
    }

    #[tokio::test]
    async fn remove_closes_and_deregisters() {
        let registry = ConnectionRegistry::new();
        let (session, _rx) = make_session("a");
        registry.add(Arc::clone(&session)).await;
        registry.remove(&session.id()).await;

        assert_eq!(session.state(), SessionState::Closed);
        assert!(registry.is_empty());
        assert!(!registry.contains(&session.id()).await);
    }

    #[tokio::test]
    async fn remove_absent_session_is_noop() {
        let registry = ConnectionRegistry::new();
        let (kept, _rx) = make_session("kept");
        registry.add(Arc::clone(&kept)).await;

        registry.remove(&Uuid::new_v4()).await;
        registry.remove(&kept.id()).await;
        registry.remove(&kept.id()).await;

        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn closed_session_is_not_reopened() {
        let registry = ConnectionRegistry::new();
        let (session, _rx) = make_session("a");
        session.close();
        registry.add(Arc::clone(&session)).await;

        assert_eq!(session.state(), SessionState::Closed);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_point_in_time() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = make_session("a");
        let (b, _rx_b) = make_session("b");
        registry.add(Arc::clone(&a)).await;
        registry.add(Arc::clone(&b)).await;

        let snapshot = registry.snapshot().await;
        registry.remove(&b.id()).await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.snapshot().await.len(), 1);
        // The stale entry in the old snapshot reflects the closure.
        let stale = snapshot.iter().find(|s| s.id() == b.id()).unwrap();
        assert!(!stale.is_open());
    }

    #[test]
    fn deliver_reports_full_queue() {
        let (session, _rx) = Session::new("slow", 1);
        assert_eq!(session.deliver(Arc::from("one")), Delivery::Queued);
        assert_eq!(session.deliver(Arc::from("two")), Delivery::Dropped);
        assert_eq!(session.dropped(), 1);
    }

    #[test]
    fn deliver_reports_closed_writer() {
        let (session, rx) = make_session("gone");
        drop(rx);
        assert_eq!(session.deliver(Arc::from("frame")), Delivery::Closed);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn concurrent_add_and_remove_keep_membership_consistent() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();
        let mut receivers = Vec::new();

        for i in 0..32 {
            let (session, rx) = make_session(&format!("peer-{i}"));
            receivers.push(rx);
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.add(Arc::clone(&session)).await;
                if i % 2 == 0 {
                    registry.remove(&session.id()).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len(), 16);
        assert_eq!(registry.snapshot().await.len(), 16);
    }
}
