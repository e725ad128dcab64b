//! Gateway agent
//!
//! The gateway is the only agent external callers talk to, and they never talk
//! to it through the bus. A [`GatewayHandle`] registers a pending entry and
//! pushes a submission onto an MPSC queue; the gateway agent drains that queue
//! from an ingress ticker and turns each submission into one or two REQUESTs.
//!
//! Replies come back as INFORMs and are routed by a single demux behavior:
//!
//! ```text
//! in_reply_to = "<base>_LEGA" / "<base>_LEGB"  ->  CorrelationStore::submit_leg
//! in_reply_to = anything else                  ->  CorrelationStore::resolve
//! ```
//!
//! A third ticker sweeps correlation entries whose caller gave up long ago.

pub mod request;

pub use request::{
    is_reserved_title, GatewayRequest, Source, LIST_ALL_PRIMARY, LIST_ALL_SECONDARY,
};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentContext, Behavior};
use crate::bus::{AgentRef, Message, MessageBus, MessageTemplate, Performative};
use crate::config::GatewayConfig;
use crate::correlation::{CorrelationId, CorrelationStore, Leg, LegOutcome, Reply, ResultHandle};
use crate::error::{BridgeError, Result};
use crate::log_component;
use request::Submission;

/// Where the gateway sends each kind of request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRoutes {
    /// Agent answering searches and primary listings.
    pub primary: AgentRef,
    /// Agent answering secondary listings.
    pub secondary: AgentRef,
}

/// Timing knobs for the gateway's tickers.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub poll_interval: Duration,
    /// `None` disables the sweep ticker.
    pub pending_ttl: Option<Duration>,
    pub sweep_interval: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&GatewayConfig::default())
    }
}

impl From<&GatewayConfig> for GatewaySettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            pending_ttl: (config.pending_ttl_secs > 0)
                .then(|| Duration::from_secs(config.pending_ttl_secs)),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }
}

/// Thread-safe entry point for external callers.
///
/// Cheap to clone; every clone feeds the same gateway.
#[derive(Clone)]
pub struct GatewayHandle {
    store: Arc<dyn CorrelationStore>,
    tx: mpsc::UnboundedSender<Submission>,
}

impl GatewayHandle {
    /// Registers `request` and queues it for the gateway agent.
    ///
    /// Returns immediately with a handle the caller can wait on.
    ///
    /// # Errors
    /// - `BridgeError::InvalidRequest` if the title is a listing sentinel
    /// - `BridgeError::GatewayClosed` if the gateway agent is gone
    /// - `BridgeError::DuplicateCorrelation` if id generation ever collides
    pub fn submit(&self, request: GatewayRequest) -> Result<ResultHandle> {
        request.validate()?;
        if self.tx.is_closed() {
            return Err(BridgeError::GatewayClosed);
        }

        let id = CorrelationId::fresh(request.id_kind());
        let handle = self.store.register_pending(&id, request.pending_kind())?;
        if matches!(
            request,
            GatewayRequest::ListAll {
                source: Source::Both
            }
        ) {
            self.store.register_join(&id);
        }

        debug!(component = "gateway", id = %id, ?request, "Request submitted");
        if self
            .tx
            .send(Submission {
                id: id.clone(),
                request,
            })
            .is_err()
        {
            self.store.discard(&id);
            return Err(BridgeError::GatewayClosed);
        }
        Ok(handle)
    }

    /// The correlation store shared with the gateway agent.
    pub fn store(&self) -> &Arc<dyn CorrelationStore> {
        &self.store
    }

    /// Whether the gateway agent still accepts submissions.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl std::fmt::Debug for GatewayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayHandle")
            .field("pending", &self.store.pending_count())
            .field("open", &self.is_open())
            .finish()
    }
}

/// Builds the gateway agent and the handle feeding it.
///
/// The agent carries three behaviors: the ingress ticker, the INFORM demux and,
/// when `settings.pending_ttl` is set, the sweep ticker. Dropping the agent
/// closes the handle.
pub fn build(
    name: impl Into<AgentRef>,
    bus: &MessageBus,
    store: Arc<dyn CorrelationStore>,
    routes: GatewayRoutes,
    settings: &GatewaySettings,
) -> Result<(Agent, GatewayHandle)> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Submission>();
    let mut agent = Agent::new(name, bus)?;
    let (primary, secondary) = (routes.primary.clone(), routes.secondary.clone());

    agent.add_behavior(Behavior::ticker(
        "ingress",
        settings.poll_interval,
        move |ctx| {
            loop {
                match rx.try_recv() {
                    Ok(submission) => dispatch(ctx, &routes, submission),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
            Ok(())
        },
    ));

    let demux_store = Arc::clone(&store);
    agent.add_behavior(Behavior::cyclic(
        "demux",
        MessageTemplate::performative(Performative::Inform),
        move |_ctx, msg| {
            demux(demux_store.as_ref(), msg);
            Ok(())
        },
    ));

    if let Some(ttl) = settings.pending_ttl {
        let sweep_store = Arc::clone(&store);
        agent.add_behavior(Behavior::ticker(
            "sweep",
            settings.sweep_interval,
            move |_ctx| {
                sweep_store.sweep_older_than(ttl);
                Ok(())
            },
        ));
    }

    info!(
        component = "gateway",
        agent = %agent.name(),
        primary = %primary,
        secondary = %secondary,
        sweep = settings.pending_ttl.is_some(),
        "Gateway agent built"
    );
    Ok((agent, GatewayHandle { store, tx }))
}

/// Turns one submission into the REQUEST(s) it stands for.
fn dispatch(ctx: &mut AgentContext<'_>, routes: &GatewayRoutes, submission: Submission) {
    let Submission { id, request } = submission;
    let me = ctx.name().clone();

    let outgoing = match request {
        GatewayRequest::SearchByTitle { title } => vec![Message::request(me)
            .to(routes.primary.clone())
            .with_content(title)
            .with_reply_with(id.as_str())],
        GatewayRequest::ListAll {
            source: Source::Primary,
        } => vec![Message::request(me)
            .to(routes.primary.clone())
            .with_content(LIST_ALL_PRIMARY)
            .with_reply_with(id.as_str())],
        GatewayRequest::ListAll {
            source: Source::Secondary,
        } => vec![Message::request(me)
            .to(routes.secondary.clone())
            .with_content(LIST_ALL_SECONDARY)
            .with_reply_with(id.as_str())],
        GatewayRequest::ListAll {
            source: Source::Both,
        } => vec![
            Message::request(me.clone())
                .to(routes.primary.clone())
                .with_content(LIST_ALL_PRIMARY)
                .with_reply_with(CorrelationId::leg_id(&id, Leg::A)),
            Message::request(me)
                .to(routes.secondary.clone())
                .with_content(LIST_ALL_SECONDARY)
                .with_reply_with(CorrelationId::leg_id(&id, Leg::B)),
        ],
    };

    for msg in outgoing {
        let target = msg.receivers.first().cloned();
        if ctx.send(msg) == 0 {
            log_component!(
                warn,
                "gateway",
                "No provider reachable, request will time out",
                id = id.as_str(),
            );
        } else if let Some(target) = target {
            debug!(component = "gateway", id = %id, to = %target, "Request dispatched");
        }
    }
}

/// Routes one INFORM to the correlation store.
fn demux(store: &dyn CorrelationStore, msg: Message) {
    let wire = match msg.in_reply_to.as_deref() {
        Some(wire) if !wire.is_empty() => wire.to_string(),
        _ => {
            warn!(
                component = "gateway",
                from = %msg.sender,
                "Dropping INFORM without a correlation id"
            );
            return;
        }
    };

    match CorrelationId::parse(&wire) {
        CorrelationId::Leg { base, leg } => match store.submit_leg(&base, leg, msg.content) {
            LegOutcome::Unknown => {
                warn!(
                    component = "gateway",
                    id = %wire,
                    from = %msg.sender,
                    "Dropping leg for unknown request"
                );
            }
            outcome => {
                debug!(component = "gateway", id = %wire, ?outcome, "Leg routed");
            }
        },
        CorrelationId::Single(id) => {
            if !store.resolve(&id, Reply::Payload(msg.content)) {
                warn!(
                    component = "gateway",
                    id = %id,
                    from = %msg.sender,
                    "Dropping reply for unknown correlation id"
                );
            }
        }
    }
}
