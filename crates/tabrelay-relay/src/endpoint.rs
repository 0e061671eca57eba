//! Relay endpoint: request/response correlation over the dispatcher connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tabrelay_config::RelayConfig;
use tabrelay_protocols::{Command, CommandAction, CommandSink, InboundFrame, RelayError, RelayResponse};

use crate::pending::PendingTable;
use crate::session::RelaySession;

/// Capacity of a session's outbound frame queue.
const OUTBOUND_QUEUE: usize = 64;

/// Snapshot of the relay's connection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayStatus {
    pub connected: bool,
    pub generation: Option<u64>,
    pub connected_for_ms: Option<u64>,
    pub last_heartbeat_age_ms: Option<u64>,
    pub stale: bool,
    pub pending: usize,
}

/// Host side of the relay.
///
/// Holds at most one live [`RelaySession`]; a new connection replaces (and
/// closes) the previous one. Pending requests are independent of the session
/// they were sent on: they settle through a matching response or their own
/// timeout, never through connection loss.
pub struct RelayEndpoint {
    config: RelayConfig,
    current: RwLock<Option<Arc<RelaySession>>>,
    pending: PendingTable,
    generation: AtomicU64,
}

impl RelayEndpoint {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            pending: PendingTable::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Install a new connection, superseding any existing one.
    ///
    /// `outbound` is drained by the socket task that owns the connection.
    pub fn attach(&self, outbound: mpsc::Sender<String>) -> Arc<RelaySession> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Arc::new(RelaySession::new(generation, outbound));

        let previous = self.current.write().replace(session.clone());
        if let Some(old) = previous {
            info!(
                old = old.generation(),
                new = generation,
                pending = self.pending.len(),
                "Dispatcher reconnected, superseding previous connection"
            );
            old.invalidate();
        } else {
            info!(generation, "Dispatcher connected");
        }

        session
    }

    /// Create the outbound queue for a new connection and attach it.
    pub fn open_session(&self) -> (Arc<RelaySession>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        (self.attach(tx), rx)
    }

    /// Forget a closed connection.
    ///
    /// Only clears the slot if `session` is still the current one, so a late
    /// close of a superseded connection never drops its replacement.
    pub fn detach(&self, session: &RelaySession) {
        session.invalidate();
        let mut current = self.current.write();
        let is_current = current
            .as_ref()
            .is_some_and(|s| s.generation() == session.generation());
        if is_current {
            *current = None;
            info!(
                generation = session.generation(),
                pending = self.pending.len(),
                "Dispatcher disconnected"
            );
        } else {
            debug!(generation = session.generation(), "Superseded connection closed");
        }
    }

    /// The current connection, if it is still open.
    pub fn live_session(&self) -> Option<Arc<RelaySession>> {
        self.current.read().as_ref().filter(|s| s.is_open()).cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.live_session().is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Handle one text frame received on `session`.
    ///
    /// Heartbeats only refresh liveness. Responses settle the matching
    /// pending request; unknown ids are discarded. Undecodable frames are
    /// dropped without affecting the connection. Frames still in flight on a
    /// superseded connection are ignored.
    pub fn route_frame(&self, session: &RelaySession, text: &str) {
        if !session.is_open() {
            debug!(generation = session.generation(), "Ignoring frame from closed connection");
            return;
        }
        match InboundFrame::decode(text) {
            Ok(InboundFrame::Heartbeat) => {
                debug!(generation = session.generation(), "Heartbeat");
                session.touch();
            }
            Ok(InboundFrame::Response(response)) => {
                let id = response.id.clone();
                if !self.pending.resolve(response) {
                    debug!(%id, "Discarding response with no pending request");
                }
            }
            Err(e) => {
                warn!(generation = session.generation(), "Dropping malformed relay frame: {}", e);
            }
        }
    }

    /// Wait until a connection is live, polling at the configured interval.
    async fn wait_for_session(&self) -> Result<(), RelayError> {
        let limit = self.config.connect_attempts;
        let mut attempts = 0;
        loop {
            if self.is_connected() {
                return Ok(());
            }
            if attempts >= limit {
                warn!(attempts, "Giving up waiting for dispatcher connection");
                return Err(RelayError::ExtensionUnavailable { attempts });
            }
            attempts += 1;
            info!(
                "Waiting for dispatcher connection... (attempt {}/{})",
                attempts, limit
            );
            tokio::time::sleep(self.config.connect_poll_interval()).await;
        }
    }

    /// Send a command to the dispatcher and wait for its response.
    pub async fn send(&self, action: CommandAction) -> Result<RelayResponse, RelayError> {
        self.wait_for_session().await?;

        let id = Uuid::new_v4().to_string();
        let command = Command::new(id.clone(), action);
        let frame = command.encode()?;
        let mut rx = self.pending.register(&id);

        // The connection may have dropped since the wait loop saw it.
        let Some(session) = self.live_session() else {
            self.pending.expire(&id);
            return Err(RelayError::Disconnected);
        };
        self.warn_if_stale(&session);

        debug!(%id, action = command.action.name(), generation = session.generation(), "Relay → command");

        // The deadline covers queueing as well, so a socket that stops
        // draining cannot hold the caller past the request timeout.
        let timeout = self.config.request_timeout();
        let deadline = Instant::now() + timeout;
        let outcome = tokio::time::timeout_at(deadline, exchange(&session, frame, &mut rx)).await;
        match outcome {
            Ok(Ok(response)) => {
                debug!(%id, error = response.is_error(), "Relay ← response");
                Ok(response)
            }
            Ok(Err(e)) => {
                self.pending.expire(&id);
                Err(e)
            }
            Err(_) => {
                if self.pending.expire(&id) {
                    warn!(%id, "Request timed out after {}ms", timeout.as_millis());
                    Err(RelayError::RequestTimedOut { id, timeout })
                } else {
                    // Settled between the deadline and the expiry.
                    rx.await.map_err(|_| RelayError::Disconnected)
                }
            }
        }
    }

    fn warn_if_stale(&self, session: &RelaySession) {
        let silence = session.silence();
        if silence >= self.config.stale_after() {
            warn!(
                generation = session.generation(),
                silent_ms = silence.as_millis() as u64,
                "Dispatcher heartbeat overdue; sending anyway"
            );
        }
    }

    /// Current connection status.
    pub fn status(&self) -> RelayStatus {
        let session = self.live_session();
        let as_ms = |d: Duration| d.as_millis() as u64;
        RelayStatus {
            connected: session.is_some(),
            generation: session.as_ref().map(|s| s.generation()),
            connected_for_ms: session.as_ref().map(|s| as_ms(s.connected_for())),
            last_heartbeat_age_ms: session
                .as_ref()
                .and_then(|s| s.last_heartbeat_age())
                .map(as_ms),
            stale: session
                .as_ref()
                .is_some_and(|s| s.silence() >= self.config.stale_after()),
            pending: self.pending.len(),
        }
    }
}

/// Queue `frame` on `session`, then wait for the correlated response.
async fn exchange(
    session: &RelaySession,
    frame: String,
    rx: &mut oneshot::Receiver<RelayResponse>,
) -> Result<RelayResponse, RelayError> {
    session
        .transmit(frame)
        .await
        .map_err(|_| RelayError::Disconnected)?;
    rx.await.map_err(|_| RelayError::Disconnected)
}

#[async_trait]
impl CommandSink for RelayEndpoint {
    async fn send(&self, action: CommandAction) -> Result<RelayResponse, RelayError> {
        RelayEndpoint::send(self, action).await
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
