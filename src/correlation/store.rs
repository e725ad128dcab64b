//! In-memory correlation store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{promise, CorrelationStore, Leg, LegOutcome, PendingKind, Promise, Reply, ResultHandle};
use crate::error::{BridgeError, Result};

struct PendingEntry {
    kind: PendingKind,
    promise: Promise,
    created_at: Instant,
}

/// Legs received so far for one two-source request.
#[derive(Debug, Default)]
struct JoinState {
    leg_a: Option<String>,
    leg_b: Option<String>,
}

impl JoinState {
    fn slot(&mut self, leg: Leg) -> &mut Option<String> {
        match leg {
            Leg::A => &mut self.leg_a,
            Leg::B => &mut self.leg_b,
        }
    }
}

struct Join {
    registered_at: Instant,
    /// Created on the first leg's arrival.
    state: Option<JoinState>,
}

#[derive(Default)]
struct Tables {
    pending: HashMap<String, PendingEntry>,
    joins: HashMap<String, Join>,
}

/// [`CorrelationStore`] backed by hash maps behind one mutex.
///
/// Pending and join tables share the lock so completing a join (store leg,
/// remove join, remove pending) is a single atomic update.
#[derive(Default)]
pub struct InMemoryCorrelationStore {
    tables: Mutex<Tables>,
}

impl InMemoryCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CorrelationStore for InMemoryCorrelationStore {
    fn register_pending(&self, id: &str, kind: PendingKind) -> Result<ResultHandle> {
        let mut tables = self.lock();
        if tables.pending.contains_key(id) {
            return Err(BridgeError::DuplicateCorrelation(id.to_string()));
        }
        let (promise, handle) = promise(id);
        tables.pending.insert(
            id.to_string(),
            PendingEntry {
                kind,
                promise,
                created_at: Instant::now(),
            },
        );
        debug!(component = "correlation", id, ?kind, "Pending request registered");
        Ok(handle)
    }

    fn resolve(&self, id: &str, reply: Reply) -> bool {
        let entry = {
            let mut tables = self.lock();
            match tables.pending.get(id).map(|e| e.kind) {
                Some(PendingKind::Single) => tables.pending.remove(id),
                Some(PendingKind::Join) => {
                    warn!(
                        component = "correlation",
                        id, "Direct reply for a joined request ignored"
                    );
                    return false;
                }
                None => return false,
            }
        };

        match entry {
            Some(entry) => {
                entry.promise.resolve(reply);
                debug!(component = "correlation", id, "Pending request resolved");
                true
            }
            None => false,
        }
    }

    fn register_join(&self, base_id: &str) {
        self.lock()
            .joins
            .entry(base_id.to_string())
            .or_insert_with(|| Join {
                registered_at: Instant::now(),
                state: None,
            });
    }

    fn submit_leg(&self, base_id: &str, leg: Leg, payload: String) -> LegOutcome {
        let completed = {
            let mut tables = self.lock();
            let Some(join) = tables.joins.get_mut(base_id) else {
                return LegOutcome::Unknown;
            };

            let state = join.state.get_or_insert_with(JoinState::default);
            let slot = state.slot(leg);
            if slot.is_some() {
                warn!(
                    component = "correlation",
                    base_id,
                    ?leg,
                    "Duplicate leg ignored"
                );
                return LegOutcome::Duplicate;
            }
            *slot = Some(payload);

            match (state.leg_a.take(), state.leg_b.take()) {
                (Some(primary), Some(secondary)) => {
                    tables.joins.remove(base_id);
                    let entry = tables.pending.remove(base_id);
                    Some((entry, primary, secondary))
                }
                (a, b) => {
                    state.leg_a = a;
                    state.leg_b = b;
                    None
                }
            }
        };

        match completed {
            None => {
                debug!(component = "correlation", base_id, ?leg, "Leg stored");
                LegOutcome::Stored
            }
            Some((entry, primary, secondary)) => {
                match entry {
                    Some(entry) => {
                        entry.promise.resolve(Reply::Combined { primary, secondary });
                        debug!(component = "correlation", base_id, "Legs joined");
                    }
                    None => {
                        warn!(
                            component = "correlation",
                            base_id, "Legs joined but no caller is pending"
                        );
                    }
                }
                LegOutcome::Joined
            }
        }
    }

    fn discard(&self, id: &str) -> bool {
        let mut tables = self.lock();
        let pending = tables.pending.remove(id).is_some();
        let join = tables.joins.remove(id).is_some();
        pending || join
    }

    fn sweep_older_than(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut tables = self.lock();
        let before = tables.pending.len() + tables.joins.len();

        tables
            .pending
            .retain(|_, e| now.duration_since(e.created_at) < ttl);
        tables
            .joins
            .retain(|_, j| now.duration_since(j.registered_at) < ttl);

        let evicted = before - (tables.pending.len() + tables.joins.len());
        if evicted > 0 {
            info!(component = "correlation", evicted, "Swept stale correlation entries");
        }
        evicted
    }

    fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn join_count(&self) -> usize {
        self.lock().joins.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let store = InMemoryCorrelationStore::new();
        let mut handle = store
            .register_pending("search_1", PendingKind::Single)
            .unwrap();
        assert_eq!(store.pending_count(), 1);

        assert!(store.resolve("search_1", Reply::Payload("{\"title\":\"x\"}".into())));
        assert_eq!(store.pending_count(), 0);
        let reply = handle.wait(Duration::from_millis(50)).await.unwrap();
        assert_eq!(reply.payload(), Some("{\"title\":\"x\"}"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let store = InMemoryCorrelationStore::new();
        store.register_pending("id", PendingKind::Single).unwrap();
        let err = store
            .register_pending("id", PendingKind::Single)
            .unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateCorrelation(_)));
    }

    #[tokio::test]
    async fn test_resolve_twice_is_noop() {
        let store = InMemoryCorrelationStore::new();
        let mut handle = store.register_pending("id", PendingKind::Single).unwrap();

        assert!(store.resolve("id", Reply::Payload("first".into())));
        assert!(!store.resolve("id", Reply::Payload("second".into())));

        let reply = handle.wait(Duration::from_millis(50)).await.unwrap();
        assert_eq!(reply.payload(), Some("first"));
    }

    #[test]
    fn test_resolve_unknown_creates_nothing() {
        let store = InMemoryCorrelationStore::new();
        assert!(!store.resolve("nonexistent", Reply::Payload("v".into())));
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.join_count(), 0);
    }

    #[test]
    fn test_resolve_join_kind_directly_refused() {
        let store = InMemoryCorrelationStore::new();
        let handle = store.register_pending("both", PendingKind::Join).unwrap();
        store.register_join("both");
        assert!(!store.resolve("both", Reply::Payload("[]".into())));
        assert_eq!(store.pending_count(), 1);
        assert!(!handle.is_resolved());
    }

    async fn join_in_order(first: (Leg, &str), second: (Leg, &str)) -> Reply {
        let store = InMemoryCorrelationStore::new();
        let mut handle = store.register_pending("base", PendingKind::Join).unwrap();
        store.register_join("base");

        assert_eq!(
            store.submit_leg("base", first.0, first.1.to_string()),
            LegOutcome::Stored
        );
        assert!(!handle.is_resolved());
        assert_eq!(
            store.submit_leg("base", second.0, second.1.to_string()),
            LegOutcome::Joined
        );
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.join_count(), 0);
        handle.wait(Duration::from_millis(50)).await.unwrap()
    }

    #[tokio::test]
    async fn test_join_is_commutative() {
        let ab = join_in_order((Leg::A, "[x]"), (Leg::B, "[y]")).await;
        let ba = join_in_order((Leg::B, "[y]"), (Leg::A, "[x]")).await;
        let expected = Reply::Combined {
            primary: "[x]".into(),
            secondary: "[y]".into(),
        };
        assert_eq!(ab, expected);
        assert_eq!(ba, expected);
    }

    #[test]
    fn test_leg_for_unknown_join_dropped() {
        let store = InMemoryCorrelationStore::new();
        assert_eq!(
            store.submit_leg("ghost", Leg::A, "[]".into()),
            LegOutcome::Unknown
        );
        assert_eq!(store.join_count(), 0);
    }

    #[test]
    fn test_duplicate_leg_ignored() {
        let store = InMemoryCorrelationStore::new();
        let handle = store.register_pending("base", PendingKind::Join).unwrap();
        store.register_join("base");

        assert_eq!(store.submit_leg("base", Leg::A, "[1]".into()), LegOutcome::Stored);
        assert_eq!(
            store.submit_leg("base", Leg::A, "[2]".into()),
            LegOutcome::Duplicate
        );
        assert_eq!(store.submit_leg("base", Leg::B, "[3]".into()), LegOutcome::Joined);
        assert_eq!(
            handle.try_get(),
            Some(Reply::Combined {
                primary: "[1]".into(),
                secondary: "[3]".into()
            })
        );
    }

    #[test]
    fn test_single_leg_never_resolves() {
        let store = InMemoryCorrelationStore::new();
        let handle = store.register_pending("base", PendingKind::Join).unwrap();
        store.register_join("base");
        store.submit_leg("base", Leg::B, "[]".into());
        assert!(!handle.is_resolved());
        assert_eq!(store.pending_count(), 1);
        assert_eq!(store.join_count(), 1);
    }

    #[test]
    fn test_sweep_removes_only_stale_entries() {
        let store = InMemoryCorrelationStore::new();
        store.register_pending("old", PendingKind::Single).unwrap();
        store.register_pending("both", PendingKind::Join).unwrap();
        store.register_join("both");
        std::thread::sleep(Duration::from_millis(30));
        store.register_pending("fresh", PendingKind::Single).unwrap();

        assert_eq!(store.sweep_older_than(Duration::from_millis(20)), 3);
        assert_eq!(store.pending_count(), 1);
        assert_eq!(store.join_count(), 0);
        assert!(store.resolve("fresh", Reply::Payload("ok".into())));
        assert!(!store.resolve("old", Reply::Payload("late".into())));
    }

    #[tokio::test]
    async fn test_swept_handle_reports_closed() {
        let store = InMemoryCorrelationStore::new();
        let mut handle = store.register_pending("gone", PendingKind::Single).unwrap();
        store.sweep_older_than(Duration::ZERO);
        let err = handle.wait(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, BridgeError::GatewayClosed));
    }

    #[test]
    fn test_discard_removes_both_tables() {
        let store = InMemoryCorrelationStore::new();
        let handle = store.register_pending("both", PendingKind::Join).unwrap();
        store.register_join("both");
        assert!(store.discard("both"));
        assert!(!store.discard("both"));
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.join_count(), 0);
        assert_eq!(store.submit_leg("both", Leg::A, "[]".into()), LegOutcome::Unknown);
        assert!(!handle.is_resolved());
    }

    #[test]
    fn test_concurrent_registration_and_resolution() {
        let store = Arc::new(InMemoryCorrelationStore::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let id = format!("t{}_{}", t, i);
                        let handle = store.register_pending(&id, PendingKind::Single).unwrap();
                        assert!(store.resolve(&id, Reply::Payload(id.clone())));
                        assert_eq!(handle.try_get(), Some(Reply::Payload(id)));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(store.pending_count(), 0);
    }
}
