//! Behaviors: the units of cooperative work an agent runs.
//!
//! A [`Behavior`] is a tagged union over four kinds, all driven by the same
//! scheduler loop one step at a time:
//!
//! | Kind | Runs when | Finishes |
//! |------|-----------|----------|
//! | cyclic | a message matches its template | never |
//! | ticker | its wall-clock interval elapses | never |
//! | one-shot | immediately, or once a message matches | after one run |
//! | multi-step | every turn; its [`Conversation`] decides | when the conversation says so |

use std::fmt;
use std::time::{Duration, Instant};

use crate::bus::{Message, MessageTemplate};
use crate::error::Result;

use super::AgentContext;

/// What a single step accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Work was done; keep the behavior scheduled.
    Progressed,
    /// Nothing to do this turn; keep the behavior scheduled.
    Idle,
    /// The behavior finished and must be removed.
    Done,
}

/// Handler invoked by a cyclic behavior for each matching message.
pub type MessageHandler = Box<dyn FnMut(&mut AgentContext<'_>, Message) -> Result<()> + Send>;

/// Handler invoked by a ticker behavior on each tick.
pub type TickHandler = Box<dyn FnMut(&mut AgentContext<'_>) -> Result<()> + Send>;

/// Action run exactly once by a one-shot behavior.
pub type OneShotAction =
    Box<dyn FnOnce(&mut AgentContext<'_>, Option<Message>) -> Result<()> + Send>;

/// A hand-rolled coroutine: a state machine advanced one step per scheduler turn.
///
/// Implementations must never block. Waiting for a reply is expressed by
/// returning [`StepOutcome::Idle`] and trying again next turn.
pub trait Conversation: Send {
    fn step(&mut self, ctx: &mut AgentContext<'_>) -> Result<StepOutcome>;
}

pub(crate) enum BehaviorKind {
    Cyclic {
        template: MessageTemplate,
        handler: MessageHandler,
    },
    Ticker {
        interval: Duration,
        next_fire: Instant,
        on_tick: TickHandler,
    },
    OneShot {
        template: Option<MessageTemplate>,
        action: Option<OneShotAction>,
    },
    MultiStep {
        conversation: Box<dyn Conversation>,
    },
}

/// A named unit of cooperative work attached to an agent.
pub struct Behavior {
    name: String,
    pub(crate) kind: BehaviorKind,
}

impl Behavior {
    /// Repeats forever, handling one message matching `template` per step.
    pub fn cyclic<F>(name: impl Into<String>, template: MessageTemplate, handler: F) -> Self
    where
        F: FnMut(&mut AgentContext<'_>, Message) -> Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind: BehaviorKind::Cyclic {
                template,
                handler: Box::new(handler),
            },
        }
    }

    /// Fires every `interval`, regardless of mailbox state.
    ///
    /// The first tick fires one interval after the behavior is created.
    pub fn ticker<F>(name: impl Into<String>, interval: Duration, on_tick: F) -> Self
    where
        F: FnMut(&mut AgentContext<'_>) -> Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind: BehaviorKind::Ticker {
                interval,
                next_fire: Instant::now() + interval,
                on_tick: Box::new(on_tick),
            },
        }
    }

    /// Runs `action` once on the next turn.
    pub fn one_shot<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(&mut AgentContext<'_>, Option<Message>) -> Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind: BehaviorKind::OneShot {
                template: None,
                action: Some(Box::new(action)),
            },
        }
    }

    /// Runs `action` once, with the first message matching `template`.
    pub fn one_shot_on<F>(name: impl Into<String>, template: MessageTemplate, action: F) -> Self
    where
        F: FnOnce(&mut AgentContext<'_>, Option<Message>) -> Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind: BehaviorKind::OneShot {
                template: Some(template),
                action: Some(Box::new(action)),
            },
        }
    }

    /// Advances `conversation` one step per turn until it reports done.
    pub fn multi_step(name: impl Into<String>, conversation: impl Conversation + 'static) -> Self {
        Self {
            name: name.into(),
            kind: BehaviorKind::MultiStep {
                conversation: Box::new(conversation),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short label of the behavior kind, for diagnostics.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            BehaviorKind::Cyclic { .. } => "cyclic",
            BehaviorKind::Ticker { .. } => "ticker",
            BehaviorKind::OneShot { .. } => "one-shot",
            BehaviorKind::MultiStep { .. } => "multi-step",
        }
    }

    /// Whether the behavior keeps serving after one of its steps panicked.
    ///
    /// Cyclic and ticker behaviors hold no per-step state: the message was
    /// already taken and the next tick already scheduled. One-shots and
    /// conversations are left mid-state and are dropped.
    pub fn survives_panic(&self) -> bool {
        matches!(
            self.kind,
            BehaviorKind::Cyclic { .. } | BehaviorKind::Ticker { .. }
        )
    }

    /// Next wall-clock instant this behavior wants to run without a message.
    ///
    /// Only tickers have one.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.kind {
            BehaviorKind::Ticker { next_fire, .. } => Some(next_fire),
            _ => None,
        }
    }

    /// Runs one step.
    pub fn step(&mut self, ctx: &mut AgentContext<'_>, now: Instant) -> Result<StepOutcome> {
        match &mut self.kind {
            BehaviorKind::Cyclic { template, handler } => match ctx.receive(template) {
                Some(msg) => {
                    handler(ctx, msg)?;
                    Ok(StepOutcome::Progressed)
                }
                None => Ok(StepOutcome::Idle),
            },
            BehaviorKind::Ticker {
                interval,
                next_fire,
                on_tick,
            } => {
                if now < *next_fire {
                    return Ok(StepOutcome::Idle);
                }
                // Reschedule before running so a failing tick still keeps its cadence.
                *next_fire = now + *interval;
                on_tick(ctx)?;
                Ok(StepOutcome::Progressed)
            }
            BehaviorKind::OneShot { template, action } => {
                let msg = match template {
                    Some(template) => match ctx.receive(template) {
                        Some(msg) => Some(msg),
                        None => return Ok(StepOutcome::Idle),
                    },
                    None => None,
                };
                match action.take() {
                    Some(action) => {
                        action(ctx, msg)?;
                        Ok(StepOutcome::Done)
                    }
                    None => Ok(StepOutcome::Done),
                }
            }
            BehaviorKind::MultiStep { conversation } => conversation.step(ctx),
        }
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("name", &self.name)
            .field("kind", &self.kind_label())
            .finish()
    }
}
