//! Per-agent cooperative run-loops.
//!
//! [`Scheduler::run`] spawns one Tokio task per registered agent. Each task
//! repeatedly gives every behavior one step; when a whole pass finds no work it
//! parks on the agent's mailbox until a message arrives, the next ticker is
//! due, or the idle timeout elapses. Agents never block each other.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Agent;
use crate::bus::AgentRef;

/// Default upper bound on how long an idle agent sleeps between passes.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(50);

/// Collects agents and starts their run-loops.
pub struct Scheduler {
    agents: Vec<Agent>,
    idle_wait: Duration,
}

impl Scheduler {
    /// Creates a scheduler with the default idle wait.
    pub fn new() -> Self {
        Self::with_idle_wait(DEFAULT_IDLE_WAIT)
    }

    /// Creates a scheduler whose idle agents re-check at least every `idle_wait`.
    pub fn with_idle_wait(idle_wait: Duration) -> Self {
        Self {
            agents: Vec::new(),
            idle_wait: idle_wait.max(Duration::from_millis(1)),
        }
    }

    /// Adds an agent to be started by [`run`](Self::run).
    pub fn register(&mut self, agent: Agent) {
        debug!(agent = %agent.name(), behaviors = agent.behavior_count(), "Agent registered");
        self.agents.push(agent);
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Starts one run-loop task per agent.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let idle_wait = self.idle_wait;

        let tasks = self
            .agents
            .into_iter()
            .map(|agent| {
                let name = agent.name().clone();
                let rx = shutdown_rx.clone();
                let handle = tokio::spawn(drive(agent, idle_wait, rx));
                (name, handle)
            })
            .collect::<Vec<_>>();

        info!(agents = tasks.len(), "Scheduler started");
        SchedulerHandle { shutdown_tx, tasks }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the running agents.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(AgentRef, JoinHandle<()>)>,
}

impl SchedulerHandle {
    /// Names of the running agents.
    pub fn agent_names(&self) -> Vec<AgentRef> {
        self.tasks.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Stops every run-loop and waits for them to exit.
    ///
    /// Behaviors parked mid-conversation are dropped.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                warn!(agent = %name, error = %e, "Agent task ended abnormally");
            }
        }
        info!("Scheduler stopped");
    }
}

async fn drive(mut agent: Agent, idle_wait: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    debug!(agent = %agent.name(), "Agent loop started");
    let mailbox = std::sync::Arc::clone(agent.mailbox());

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let now = Instant::now();
        if agent.run_pass(now) {
            tokio::task::yield_now().await;
            continue;
        }

        let wait = agent
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .map_or(idle_wait, |until_tick| until_tick.min(idle_wait));

        tokio::select! {
            _ = mailbox.wait(wait) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!(agent = %agent.name(), "Agent loop stopped");
}
