//! Ask-a-peer sub-conversation.
//!
//! Opened by a provider whose own catalog missed. The conversation asks the
//! peer provider the same question under a derived correlation id, waits for
//! the peer's answer without blocking its agent, and forwards that answer to
//! the original requester under the original id. It forwards exactly once and
//! never retries or times out; a silent peer surfaces only as the caller's
//! timeout.

use tracing::{debug, info, warn};

use crate::agent::{AgentContext, Conversation, StepOutcome};
use crate::bus::{AgentRef, Message, MessageTemplate, Performative};
use crate::error::Result;

/// Prefix of the correlation id used towards the peer.
pub const PEER_ID_PREFIX: &str = "dist_";

/// Correlation id for the peer request derived from `original`.
pub fn peer_request_id(original: &Message) -> String {
    format!(
        "{}{}",
        PEER_ID_PREFIX,
        original.reply_with.as_deref().unwrap_or_default()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Init,
    Waiting,
    Done,
}

/// Two-state machine: `Init` sends the peer request, `Waiting` polls for the
/// peer's reply.
#[derive(Debug)]
pub struct AskPeer {
    original: Message,
    peer: AgentRef,
    peer_id: String,
    awaiting: MessageTemplate,
    state: State,
}

impl AskPeer {
    pub fn new(original: Message, peer: AgentRef) -> Self {
        let peer_id = peer_request_id(&original);
        let awaiting = MessageTemplate::in_reply_to(peer_id.as_str());
        Self {
            original,
            peer,
            peer_id,
            awaiting,
            state: State::Init,
        }
    }

    /// Correlation id used towards the peer.
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn is_waiting(&self) -> bool {
        self.state == State::Waiting
    }
}

impl Conversation for AskPeer {
    fn step(&mut self, ctx: &mut AgentContext<'_>) -> Result<StepOutcome> {
        match self.state {
            State::Init => {
                let request = Message::request(ctx.name().clone())
                    .to(self.peer.clone())
                    .with_content(self.original.content.as_str())
                    .with_reply_with(self.peer_id.as_str());
                if ctx.send(request) == 0 {
                    warn!(
                        component = "provider",
                        agent = %ctx.name(),
                        peer = %self.peer,
                        "Peer unreachable, request will time out"
                    );
                }
                info!(
                    component = "provider",
                    agent = %ctx.name(),
                    peer = %self.peer,
                    peer_id = %self.peer_id,
                    "Local miss, asking peer"
                );
                self.state = State::Waiting;
                Ok(StepOutcome::Progressed)
            }
            State::Waiting => {
                let Some(answer) = ctx.receive(&self.awaiting) else {
                    return Ok(StepOutcome::Idle);
                };
                let found = !answer.is_not_found();
                let forward = self
                    .original
                    .create_reply(ctx.name().clone(), Performative::Inform)
                    .with_content(answer.content);
                ctx.send(forward);
                debug!(
                    component = "provider",
                    agent = %ctx.name(),
                    peer_id = %self.peer_id,
                    found,
                    "Peer answer forwarded"
                );
                self.state = State::Done;
                Ok(StepOutcome::Done)
            }
            State::Done => Ok(StepOutcome::Done),
        }
    }
}
