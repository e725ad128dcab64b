//! Agent module - cooperative actors owning a mailbox and a behavior list
//!
//! An [`Agent`] never shares its mailbox or behaviors with anyone: other agents
//! reach it only by sending messages through the [`MessageBus`]. Behaviors see
//! the world through an [`AgentContext`] handed to each step.
//!
//! The [`Scheduler`] gives every agent its own run-loop task. Within an agent,
//! behaviors take turns and never run concurrently, so agent-local state needs
//! no locking.

pub mod behavior;
pub mod scheduler;

pub use behavior::{Behavior, Conversation, StepOutcome};
pub use scheduler::{Scheduler, SchedulerHandle};

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use crate::bus::{AgentRef, Mailbox, Message, MessageBus, MessageTemplate};
use crate::error::Result;
use crate::log_component;

/// View of the running agent handed to each behavior step.
pub struct AgentContext<'a> {
    name: &'a AgentRef,
    mailbox: &'a Mailbox,
    bus: &'a MessageBus,
    spawned: &'a mut Vec<Behavior>,
}

impl<'a> AgentContext<'a> {
    pub(crate) fn new(
        name: &'a AgentRef,
        mailbox: &'a Mailbox,
        bus: &'a MessageBus,
        spawned: &'a mut Vec<Behavior>,
    ) -> Self {
        Self {
            name,
            mailbox,
            bus,
            spawned,
        }
    }

    /// Name of the agent running this step.
    pub fn name(&self) -> &AgentRef {
        self.name
    }

    /// Pops the oldest message in this agent's mailbox matching `template`.
    pub fn receive(&self, template: &MessageTemplate) -> Option<Message> {
        self.mailbox.receive(template)
    }

    /// Sends `msg` to its receivers. Returns the number of mailboxes reached.
    pub fn send(&self, msg: Message) -> usize {
        self.bus.send(msg)
    }

    /// Schedules a new behavior on this agent, starting next turn.
    pub fn add_behavior(&mut self, behavior: Behavior) {
        debug!(
            agent = %self.name,
            behavior = behavior.name(),
            kind = behavior.kind_label(),
            "Behavior added"
        );
        self.spawned.push(behavior);
    }
}

/// An independently scheduled actor.
pub struct Agent {
    name: AgentRef,
    mailbox: Arc<Mailbox>,
    bus: MessageBus,
    behaviors: Vec<Behavior>,
}

impl Agent {
    /// Creates an agent and registers its mailbox on `bus`.
    ///
    /// # Errors
    /// Returns `BridgeError::Config` if the name is already taken.
    pub fn new(name: impl Into<AgentRef>, bus: &MessageBus) -> Result<Self> {
        let name = name.into();
        let mailbox = bus.register(name.clone())?;
        Ok(Self {
            name,
            mailbox,
            bus: bus.clone(),
            behaviors: Vec::new(),
        })
    }

    /// Appends a behavior (builder pattern).
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn add_behavior(&mut self, behavior: Behavior) {
        self.behaviors.push(behavior);
    }

    pub fn name(&self) -> &AgentRef {
        &self.name
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    /// Number of live behaviors.
    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Earliest ticker deadline among the live behaviors.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.behaviors
            .iter()
            .filter_map(Behavior::next_deadline)
            .min()
    }

    /// Gives every behavior one step, in order, and returns whether any of them
    /// did work.
    ///
    /// Finished behaviors are dropped. A step that returns an error is logged
    /// and the behavior stays scheduled. A step that panics is logged; cyclic
    /// and ticker behaviors stay scheduled, one-shots and conversations are
    /// removed (see [`Behavior::survives_panic`]). Either way the remaining
    /// behaviors still get their turn.
    pub fn run_pass(&mut self, now: Instant) -> bool {
        let mut progressed = false;
        let mut spawned = Vec::new();
        let current = std::mem::take(&mut self.behaviors);
        let mut kept = Vec::with_capacity(current.len());

        for mut behavior in current {
            let outcome = {
                let mut ctx =
                    AgentContext::new(&self.name, &self.mailbox, &self.bus, &mut spawned);
                catch_unwind(AssertUnwindSafe(|| behavior.step(&mut ctx, now)))
            };

            match outcome {
                Ok(Ok(StepOutcome::Progressed)) => {
                    progressed = true;
                    kept.push(behavior);
                }
                Ok(Ok(StepOutcome::Idle)) => kept.push(behavior),
                Ok(Ok(StepOutcome::Done)) => {
                    progressed = true;
                    debug!(
                        agent = %self.name,
                        behavior = behavior.name(),
                        "Behavior finished"
                    );
                }
                Ok(Err(e)) => {
                    progressed = true;
                    let reason = e.to_string();
                    log_component!(
                        error,
                        "scheduler",
                        "Behavior step failed",
                        agent = self.name.name(),
                        behavior = behavior.name(),
                        error = reason.as_str(),
                    );
                    kept.push(behavior);
                }
                Err(payload) => {
                    progressed = true;
                    let keep = behavior.survives_panic();
                    error!(
                        component = "scheduler",
                        agent = %self.name,
                        behavior = behavior.name(),
                        panic = %panic_message(payload.as_ref()),
                        kept = keep,
                        "Behavior step panicked"
                    );
                    if keep {
                        kept.push(behavior);
                    }
                }
            }
        }

        kept.extend(spawned);
        self.behaviors = kept;
        progressed
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("behaviors", &self.behaviors)
            .field("queued", &self.mailbox.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Performative;
    use crate::error::BridgeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_agent_registers_mailbox() {
        let bus = MessageBus::new();
        let agent = Agent::new("gamestop", &bus).unwrap();
        assert_eq!(agent.name().name(), "gamestop");
        assert!(bus.mailbox(&AgentRef::from("gamestop")).is_some());
        assert!(Agent::new("gamestop", &bus).is_err());
    }

    #[test]
    fn test_run_pass_reports_idle() {
        let bus = MessageBus::new();
        let mut agent = Agent::new("idle", &bus)
            .unwrap()
            .with_behavior(Behavior::cyclic("any", MessageTemplate::Any, |_, _| Ok(())));
        assert!(!agent.run_pass(Instant::now()));
        assert_eq!(agent.behavior_count(), 1);
    }

    #[test]
    fn test_error_keeps_behavior_and_others_run() {
        let bus = MessageBus::new();
        let handled = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&handled);
        let mut agent = Agent::new("a", &bus)
            .unwrap()
            .with_behavior(Behavior::cyclic(
                "failing",
                MessageTemplate::performative(Performative::Request),
                |_, _| Err(BridgeError::Behavior("backend down".into())),
            ))
            .with_behavior(Behavior::cyclic(
                "healthy",
                MessageTemplate::performative(Performative::Inform),
                move |_, _| {
                    h.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            ));

        bus.send(Message::request("x").to("a"));
        bus.send(Message::inform("x").to("a"));
        assert!(agent.run_pass(Instant::now()));
        assert_eq!(agent.behavior_count(), 2);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_removes_only_faulty_behavior() {
        let bus = MessageBus::new();
        let handled = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&handled);
        let mut agent = Agent::new("a", &bus)
            .unwrap()
            .with_behavior(Behavior::one_shot("explodes", |_, _| panic!("bad state")))
            .with_behavior(Behavior::cyclic("healthy", MessageTemplate::Any, move |_, _| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));

        bus.send(Message::inform("x").to("a"));
        assert!(agent.run_pass(Instant::now()));
        assert_eq!(agent.behavior_count(), 1);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cyclic_server_survives_panicking_message() {
        let bus = MessageBus::new();
        let handled = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&handled);
        let mut agent = Agent::new("gamestop", &bus).unwrap().with_behavior(
            Behavior::cyclic("search-server", MessageTemplate::Any, move |_, msg| {
                if msg.content == "poison" {
                    panic!("catalog blew up");
                }
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        bus.send(Message::request("x").to("gamestop").with_content("poison"));
        bus.send(Message::request("x").to("gamestop").with_content("Elden Ring"));

        assert!(agent.run_pass(Instant::now()));
        assert_eq!(agent.behavior_count(), 1);
        assert_eq!(handled.load(Ordering::SeqCst), 0);

        assert!(agent.run_pass(Instant::now()));
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert!(agent.mailbox().is_empty());
    }

    #[test]
    fn test_ticker_survives_panic_and_keeps_cadence() {
        let bus = MessageBus::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&ticks);
        let interval = std::time::Duration::from_secs(10);
        let mut agent = Agent::new("a", &bus)
            .unwrap()
            .with_behavior(Behavior::ticker("sweep", interval, move |_| {
                if t.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first tick fails");
                }
                Ok(())
            }));

        let first = Instant::now() + interval;
        assert!(agent.run_pass(first));
        assert_eq!(agent.behavior_count(), 1);
        // Rescheduled before the panic, so no immediate retry.
        assert!(!agent.run_pass(first));
        assert!(agent.run_pass(first + interval));
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_spawned_behavior_runs_next_pass() {
        let bus = MessageBus::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&runs);
        let mut agent = Agent::new("a", &bus)
            .unwrap()
            .with_behavior(Behavior::one_shot("spawner", move |ctx, _| {
                let r = Arc::clone(&r);
                ctx.add_behavior(Behavior::one_shot("child", move |_, _| {
                    r.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }));
                Ok(())
            }));

        assert!(agent.run_pass(Instant::now()));
        assert_eq!(agent.behavior_count(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(agent.run_pass(Instant::now()));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(agent.behavior_count(), 0);
    }

    #[test]
    fn test_context_send_reaches_peer() {
        let bus = MessageBus::new();
        let peer = bus.register("peer").unwrap();
        let mut agent = Agent::new("a", &bus)
            .unwrap()
            .with_behavior(Behavior::one_shot("hello", |ctx, _| {
                let from = ctx.name().clone();
                assert_eq!(ctx.send(Message::request(from).to("peer")), 1);
                Ok(())
            }));
        agent.run_pass(Instant::now());
        assert_eq!(peer.len(), 1);
    }

    #[test]
    fn test_next_deadline_tracks_tickers() {
        let bus = MessageBus::new();
        let agent = Agent::new("a", &bus)
            .unwrap()
            .with_behavior(Behavior::ticker(
                "slow",
                std::time::Duration::from_secs(10),
                |_| Ok(()),
            ))
            .with_behavior(Behavior::ticker(
                "fast",
                std::time::Duration::from_millis(10),
                |_| Ok(()),
            ));
        let deadline = agent.next_deadline().unwrap();
        assert!(deadline <= Instant::now() + std::time::Duration::from_millis(10));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
