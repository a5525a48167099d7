//! In-flight computation map — per-fingerprint call collapsing.
//!
//! Concurrent `compose` calls sharing a fingerprint must collapse to a
//! single computation. The work is read-only and safely shareable, so this
//! is future/promise deduplication via `tokio::sync::watch`, not a lock
//! around the work: the first caller becomes the leader, everyone else
//! subscribes to the same channel, and all waiters receive the identical
//! result.

use std::collections::HashMap;
use std::sync::Arc;

use storyloom_core::error::ComposeError;
use storyloom_core::request::ContextResult;
use tokio::sync::{Mutex, watch};

pub type Outcome = Result<Arc<ContextResult>, ComposeError>;

type Slot = watch::Receiver<Option<Outcome>>;

/// Role of a caller that joined a flight.
pub enum Flight {
    /// First caller for this key: runs the computation and must call
    /// [`FlightMap::complete`] exactly once.
    Leader {
        tx: watch::Sender<Option<Outcome>>,
        rx: Slot,
    },
    /// Another caller is already computing; wait on the receiver.
    Follower(Slot),
}

/// Map of in-flight computations keyed by request fingerprint.
#[derive(Default)]
pub struct FlightMap {
    inner: Mutex<HashMap<String, Slot>>,
}

impl FlightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the flight for `key`, becoming leader if none exists.
    ///
    /// A flight whose leader died without publishing (sender gone, no value)
    /// is treated as stale and replaced rather than followed forever.
    pub async fn join(&self, key: &str) -> Flight {
        let mut map = self.inner.lock().await;
        if let Some(rx) = map.get(key) {
            let alive = rx.has_changed().is_ok() || rx.borrow().is_some();
            if alive {
                return Flight::Follower(rx.clone());
            }
            map.remove(key);
        }
        let (tx, rx) = watch::channel(None);
        map.insert(key.to_string(), rx.clone());
        Flight::Leader { tx, rx }
    }

    /// Publish the leader's outcome and retire the flight.
    pub async fn complete(&self, key: &str, tx: watch::Sender<Option<Outcome>>, outcome: Outcome) {
        self.inner.lock().await.remove(key);
        // Late subscribers cloned the receiver before removal and still see
        // the value; send errors only if every waiter is gone, which is fine.
        let _ = tx.send(Some(outcome));
    }

    /// Number of computations currently in flight.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Wait for a flight's outcome.
    pub async fn wait(mut rx: Slot) -> Outcome {
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Leader dropped without publishing (e.g. panicked task).
                let last = rx.borrow().clone();
                return last.unwrap_or_else(|| {
                    Err(ComposeError::UpstreamUnavailable(
                        "in-flight composition aborted".into(),
                    ))
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_core::request::{AssemblyStats, PromptObject};

    fn result() -> Arc<ContextResult> {
        Arc::new(ContextResult {
            prompt: PromptObject {
                system: "s".into(),
                instructions: "i".into(),
                scene_context: vec![],
                canon_facts: vec![],
                style_guidelines: vec![],
                guardrails: vec![],
            },
            redactions: vec![],
            token_estimate: 1,
            stats: AssemblyStats {
                budget: 100,
                sections: vec![],
                drops: vec![],
            },
        })
    }

    #[tokio::test]
    async fn first_joiner_leads_second_follows() {
        let map = FlightMap::new();
        let first = map.join("fp").await;
        assert!(matches!(first, Flight::Leader { .. }));
        let second = map.join("fp").await;
        assert!(matches!(second, Flight::Follower(_)));
        assert_eq!(map.len().await, 1);
    }

    #[tokio::test]
    async fn followers_receive_the_leaders_outcome() {
        let map = Arc::new(FlightMap::new());
        let Flight::Leader { tx, rx: leader_rx } = map.join("fp").await else {
            panic!("expected leader");
        };
        let Flight::Follower(follower_rx) = map.join("fp").await else {
            panic!("expected follower");
        };

        let value = result();
        map.complete("fp", tx, Ok(Arc::clone(&value))).await;

        let a = FlightMap::wait(leader_rx).await.unwrap();
        let b = FlightMap::wait(follower_rx).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &value));
        assert_eq!(map.len().await, 0);
    }

    #[tokio::test]
    async fn completed_key_can_fly_again() {
        let map = FlightMap::new();
        let Flight::Leader { tx, rx } = map.join("fp").await else {
            panic!("expected leader");
        };
        map.complete("fp", tx, Ok(result())).await;
        let _ = FlightMap::wait(rx).await;

        assert!(matches!(map.join("fp").await, Flight::Leader { .. }));
    }

    #[tokio::test]
    async fn dropped_leader_yields_an_error_not_a_hang() {
        let map = FlightMap::new();
        let Flight::Leader { tx, rx } = map.join("fp").await else {
            panic!("expected leader");
        };
        drop(tx);

        let err = FlightMap::wait(rx).await.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_UNAVAILABLE");
    }
}
