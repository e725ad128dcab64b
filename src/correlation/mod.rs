//! Correlation engine
//!
//! Turns fire-and-forget messages into awaitable results. Every outstanding
//! request owns a correlation id; the [`CorrelationStore`] maps that id to a
//! write-once [`Promise`] whose [`ResultHandle`] the caller waits on.
//!
//! Two-source requests travel as two *legs* whose ids are derived from one base
//! id. The store keeps the first leg to arrive until the second shows up, then
//! resolves the base id with a [`Reply::Combined`].
//!
//! The wire form of a leg id (`<base>_LEGA` / `<base>_LEGB`) is private to the
//! gateway and this module; callers only ever see base ids.

pub mod promise;
pub mod store;

pub use promise::{promise, Promise, ResultHandle};
pub use store::InMemoryCorrelationStore;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bus::NOT_FOUND;
use crate::error::Result;

const LEG_A_SUFFIX: &str = "_LEGA";
const LEG_B_SUFFIX: &str = "_LEGB";

/// One half of a two-source request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    /// Answer from the primary source.
    A,
    /// Answer from the secondary source.
    B,
}

impl Leg {
    fn suffix(self) -> &'static str {
        match self {
            Leg::A => LEG_A_SUFFIX,
            Leg::B => LEG_B_SUFFIX,
        }
    }

    /// The opposite leg.
    pub fn other(self) -> Leg {
        match self {
            Leg::A => Leg::B,
            Leg::B => Leg::A,
        }
    }
}

/// Parsed shape of a correlation id seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CorrelationId {
    /// A request answered by exactly one reply.
    Single(String),
    /// One leg of a two-source request.
    Leg { base: String, leg: Leg },
}

impl CorrelationId {
    /// Generates a fresh base id of the form `<kind>_<uuid>`.
    ///
    /// # Example
    /// ```
    /// use gamestore_bridge::correlation::CorrelationId;
    ///
    /// let a = CorrelationId::fresh("search");
    /// let b = CorrelationId::fresh("search");
    /// assert!(a.starts_with("search_"));
    /// assert_ne!(a, b);
    /// ```
    pub fn fresh(kind: &str) -> String {
        format!("{}_{}", kind, Uuid::new_v4().simple())
    }

    /// Wire id of `leg` for the base id `base`.
    pub fn leg_id(base: &str, leg: Leg) -> String {
        format!("{}{}", base, leg.suffix())
    }

    /// Classifies a wire id.
    ///
    /// # Example
    /// ```
    /// use gamestore_bridge::correlation::{CorrelationId, Leg};
    ///
    /// assert_eq!(
    ///     CorrelationId::parse("listBoth_1_LEGB"),
    ///     CorrelationId::Leg { base: "listBoth_1".into(), leg: Leg::B }
    /// );
    /// assert_eq!(
    ///     CorrelationId::parse("search_1"),
    ///     CorrelationId::Single("search_1".into())
    /// );
    /// ```
    pub fn parse(wire: &str) -> Self {
        for leg in [Leg::A, Leg::B] {
            if let Some(base) = wire.strip_suffix(leg.suffix()) {
                if !base.is_empty() {
                    return CorrelationId::Leg {
                        base: base.to_string(),
                        leg,
                    };
                }
            }
        }
        CorrelationId::Single(wire.to_string())
    }

    /// Wire form of this id.
    pub fn to_wire(&self) -> String {
        match self {
            CorrelationId::Single(id) => id.clone(),
            CorrelationId::Leg { base, leg } => Self::leg_id(base, *leg),
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Value a request resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    /// Content of a single INFORM: a record, a record array, or [`NOT_FOUND`].
    Payload(String),
    /// Both legs of a two-source request.
    Combined { primary: String, secondary: String },
}

impl Reply {
    /// Checks whether this is the not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Reply::Payload(p) if p == NOT_FOUND)
    }

    /// Single payload, if this is not a combined reply.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Reply::Payload(p) => Some(p),
            Reply::Combined { .. } => None,
        }
    }
}

/// How a pending entry may be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    /// Resolved directly by one reply.
    Single,
    /// Resolved only by the join of two legs.
    Join,
}

/// Result of handing a leg to the join engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegOutcome {
    /// Leg stored; waiting for the other one.
    Stored,
    /// Both legs present; the base request was resolved.
    Joined,
    /// This leg had already arrived; the new value was ignored.
    Duplicate,
    /// No join is registered for the base id.
    Unknown,
}

/// Shared table of outstanding requests.
///
/// Implementations synchronize internally; every method is safe to call from
/// the gateway agent and from caller threads at the same time.
pub trait CorrelationStore: Send + Sync {
    /// Opens a pending entry for `id` and returns the caller's handle.
    ///
    /// # Errors
    /// `BridgeError::DuplicateCorrelation` if `id` is already pending.
    fn register_pending(&self, id: &str, kind: PendingKind) -> Result<ResultHandle>;

    /// Resolves a [`PendingKind::Single`] entry and removes it.
    ///
    /// Returns `false`, without side effects, if `id` is unknown, already
    /// resolved, or only resolvable through a join.
    fn resolve(&self, id: &str, reply: Reply) -> bool;

    /// Declares that legs for `base_id` may arrive.
    fn register_join(&self, base_id: &str);

    /// Stores one leg; joins and resolves `base_id` once both legs are present.
    fn submit_leg(&self, base_id: &str, leg: Leg, payload: String) -> LegOutcome;

    /// Removes the pending and join entries for `id` without resolving them.
    ///
    /// Waiting handles observe the drop as `BridgeError::GatewayClosed`.
    fn discard(&self, id: &str) -> bool;

    /// Drops pending and join entries older than `ttl`. Returns how many went.
    fn sweep_older_than(&self, ttl: Duration) -> usize;

    /// Number of pending entries.
    fn pending_count(&self) -> usize;

    /// Number of registered joins (with or without a stored leg).
    fn join_count(&self) -> usize;
}
