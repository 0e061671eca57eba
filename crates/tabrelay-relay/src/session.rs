//! The single dispatcher connection held by the relay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One accepted dispatcher connection.
///
/// The socket task owns the actual WebSocket; the session only holds the
/// outbound queue feeding it plus liveness bookkeeping.
pub struct RelaySession {
    generation: u64,
    outbound: mpsc::Sender<String>,
    open: AtomicBool,
    connected_at: Instant,
    last_heartbeat: Mutex<Option<Instant>>,
    shutdown: CancellationToken,
}

impl RelaySession {
    pub(crate) fn new(generation: u64, outbound: mpsc::Sender<String>) -> Self {
        Self {
            generation,
            outbound,
            open: AtomicBool::new(true),
            connected_at: Instant::now(),
            last_heartbeat: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Monotonic number identifying this connection.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the connection can still carry commands.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    /// Record a heartbeat from the dispatcher.
    pub fn touch(&self) {
        *self.last_heartbeat.lock() = Some(Instant::now());
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    pub fn last_heartbeat_age(&self) -> Option<Duration> {
        self.last_heartbeat.lock().map(|at| at.elapsed())
    }

    /// Time since the dispatcher was last heard from (heartbeat or connect).
    pub fn silence(&self) -> Duration {
        self.last_heartbeat_age().unwrap_or_else(|| self.connected_for())
    }

    /// Queue a text frame for the socket task.
    pub(crate) async fn transmit(&self, frame: String) -> Result<(), mpsc::error::SendError<String>> {
        self.outbound.send(frame).await
    }

    /// Mark the session dead and ask its socket task to close.
    pub(crate) fn invalidate(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
    }

    /// Resolves once the session has been invalidated.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }
}

impl std::fmt::Debug for RelaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySession")
            .field("generation", &self.generation)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_tracking() {
        let (tx, _rx) = mpsc::channel(4);
        let session = RelaySession::new(1, tx);
        assert!(session.last_heartbeat_age().is_none());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(session.silence(), Duration::from_secs(30));

        session.touch();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(session.last_heartbeat_age(), Some(Duration::from_secs(2)));
        assert_eq!(session.silence(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_invalidate_closes() {
        let (tx, _rx) = mpsc::channel(4);
        let session = RelaySession::new(1, tx);
        assert!(session.is_open());

        session.invalidate();
        assert!(!session.is_open());
        session.closed().await;
    }

    #[tokio::test]
    async fn test_dropped_receiver_means_closed() {
        let (tx, rx) = mpsc::channel(4);
        let session = RelaySession::new(1, tx);
        drop(rx);
        assert!(!session.is_open());
        assert!(session.transmit("x".to_string()).await.is_err());
    }
}
