//! Pending request table.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use tabrelay_protocols::RelayResponse;

/// An in-flight command waiting for its response.
struct PendingRequest {
    created_at: Instant,
    tx: oneshot::Sender<RelayResponse>,
}

/// Commands awaiting a response, keyed by command id.
///
/// Every settle path (`resolve`, `expire`) removes the entry under the lock
/// and consumes its sender, so an entry settles at most once.
#[derive(Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<String, PendingRequest>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command id and return the receiver its response is delivered to.
    ///
    /// Re-registering a live id replaces the previous entry, whose receiver
    /// then observes a closed channel.
    pub fn register(&self, id: &str) -> oneshot::Receiver<RelayResponse> {
        let (tx, rx) = oneshot::channel();
        self.entries.lock().insert(
            id.to_string(),
            PendingRequest {
                created_at: Instant::now(),
                tx,
            },
        );
        rx
    }

    /// Deliver a response to its pending request.
    ///
    /// Returns `false` when no request with that id is pending (late or
    /// duplicate response); the response is dropped.
    pub fn resolve(&self, response: RelayResponse) -> bool {
        let entry = self.entries.lock().remove(&response.id);
        match entry {
            Some(pending) => {
                tracing::trace!(
                    id = %response.id,
                    elapsed_ms = pending.created_at.elapsed().as_millis() as u64,
                    "Resolving pending request"
                );
                // The waiter may have given up already; that is not an error.
                let _ = pending.tx.send(response);
                true
            }
            None => false,
        }
    }

    /// Remove a request without resolving it. Returns `false` if it had
    /// already been settled.
    pub fn expire(&self, id: &str) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_delivers_and_removes() {
        let table = PendingTable::new();
        let rx = table.register("a");
        assert!(table.contains("a"));

        assert!(table.resolve(RelayResponse::success("a", json!(1))));
        assert!(table.is_empty());
        assert_eq!(rx.await.unwrap().result, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_resolve_twice_only_first_wins() {
        let table = PendingTable::new();
        let rx = table.register("a");

        assert!(table.resolve(RelayResponse::success("a", json!("first"))));
        assert!(!table.resolve(RelayResponse::success("a", json!("second"))));
        assert_eq!(rx.await.unwrap().result, Some(json!("first")));
    }

    #[test]
    fn test_unknown_id_is_discarded() {
        let table = PendingTable::new();
        let _rx = table.register("a");
        assert!(!table.resolve(RelayResponse::success("zzz", json!(null))));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_expire_then_late_response() {
        let table = PendingTable::new();
        let rx = table.register("a");

        assert!(table.expire("a"));
        assert!(!table.expire("a"));
        assert!(!table.resolve(RelayResponse::success("a", json!("late"))));
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_resolve_after_waiter_dropped() {
        let table = PendingTable::new();
        drop(table.register("a"));
        assert!(table.resolve(RelayResponse::failure("a", "boom")));
        assert!(table.is_empty());
    }
}
