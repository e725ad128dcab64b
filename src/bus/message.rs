//! Message types for the agent message bus
//!
//! This module defines the addressed envelope exchanged between agents and the
//! [`MessageTemplate`] predicates behaviors use to pick messages out of a mailbox.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved payload meaning "no record matched".
///
/// The protocol has no error performative, so providers encode both misses and
/// internal failures with this sentinel.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Communicative act carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Performative {
    /// Ask the receiver to perform a lookup.
    Request,
    /// Answer to an earlier request.
    Inform,
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Performative::Request => write!(f, "REQUEST"),
            Performative::Inform => write!(f, "INFORM"),
        }
    }
}

/// Local name of an agent registered on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentRef(String);

impl AgentRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AgentRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// An addressed, performative-tagged envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// What the sender wants from the receivers
    pub performative: Performative,
    /// Agent that sent the message
    pub sender: AgentRef,
    /// Agents the message is delivered to (duplicates are ignored)
    pub receivers: Vec<AgentRef>,
    /// Opaque payload: a title, a list sentinel, or serialized records
    pub content: String,
    /// Correlation id set by the sender of a REQUEST
    pub reply_with: Option<String>,
    /// Correlation id echoed by the sender of an INFORM
    pub in_reply_to: Option<String>,
}

impl Message {
    /// Creates a message with no receivers, content or correlation ids.
    ///
    /// # Example
    /// ```
    /// use gamestore_bridge::bus::{Message, Performative};
    ///
    /// let msg = Message::new(Performative::Request, "apigateway")
    ///     .to("gamestop")
    ///     .with_content("Elden Ring")
    ///     .with_reply_with("search_1");
    /// assert_eq!(msg.receivers.len(), 1);
    /// assert_eq!(msg.reply_with.as_deref(), Some("search_1"));
    /// ```
    pub fn new(performative: Performative, sender: impl Into<AgentRef>) -> Self {
        Self {
            performative,
            sender: sender.into(),
            receivers: Vec::new(),
            content: String::new(),
            reply_with: None,
            in_reply_to: None,
        }
    }

    /// Shorthand for a REQUEST from `sender`.
    pub fn request(sender: impl Into<AgentRef>) -> Self {
        Self::new(Performative::Request, sender)
    }

    /// Shorthand for an INFORM from `sender`.
    pub fn inform(sender: impl Into<AgentRef>) -> Self {
        Self::new(Performative::Inform, sender)
    }

    /// Adds a receiver (builder pattern). Adding the same agent twice is a no-op.
    pub fn to(mut self, receiver: impl Into<AgentRef>) -> Self {
        let receiver = receiver.into();
        if !self.receivers.contains(&receiver) {
            self.receivers.push(receiver);
        }
        self
    }

    /// Sets the payload (builder pattern).
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Sets the correlation id a reply must echo (builder pattern).
    pub fn with_reply_with(mut self, id: impl Into<String>) -> Self {
        self.reply_with = Some(id.into());
        self
    }

    /// Sets the correlation id this message answers (builder pattern).
    pub fn with_in_reply_to(mut self, id: impl Into<String>) -> Self {
        self.in_reply_to = Some(id.into());
        self
    }

    /// Builds the skeleton of a reply: addressed back to the sender and echoing
    /// this message's `reply_with` as `in_reply_to`.
    ///
    /// `from` becomes the reply's sender; content is left empty.
    ///
    /// # Example
    /// ```
    /// use gamestore_bridge::bus::{Message, Performative};
    ///
    /// let request = Message::request("apigateway")
    ///     .to("gamestop")
    ///     .with_reply_with("search_7");
    /// let reply = request.create_reply("gamestop", Performative::Inform);
    /// assert_eq!(reply.receivers[0].name(), "apigateway");
    /// assert_eq!(reply.in_reply_to.as_deref(), Some("search_7"));
    /// ```
    pub fn create_reply(&self, from: impl Into<AgentRef>, performative: Performative) -> Self {
        Self {
            performative,
            sender: from.into(),
            receivers: vec![self.sender.clone()],
            content: String::new(),
            reply_with: None,
            in_reply_to: self.reply_with.clone(),
        }
    }

    /// Checks whether the payload is the [`NOT_FOUND`] sentinel.
    pub fn is_not_found(&self) -> bool {
        self.content == NOT_FOUND
    }
}

/// Predicate over messages, composed from equality tests with `and` / `not`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTemplate {
    /// Matches every message.
    Any,
    /// Performative equality
    Performative(Performative),
    /// Exact content equality
    Content(String),
    /// `in_reply_to` equality
    InReplyTo(String),
    /// Both templates must match
    And(Box<MessageTemplate>, Box<MessageTemplate>),
    /// The template must not match
    Not(Box<MessageTemplate>),
}

impl MessageTemplate {
    pub fn performative(performative: Performative) -> Self {
        Self::Performative(performative)
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self::Content(content.into())
    }

    pub fn in_reply_to(id: impl Into<String>) -> Self {
        Self::InReplyTo(id.into())
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: MessageTemplate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Negation of `template`.
    pub fn not(template: MessageTemplate) -> Self {
        Self::Not(Box::new(template))
    }

    /// Evaluates the predicate against `msg`.
    pub fn matches(&self, msg: &Message) -> bool {
        match self {
            MessageTemplate::Any => true,
            MessageTemplate::Performative(p) => msg.performative == *p,
            MessageTemplate::Content(c) => msg.content == *c,
            MessageTemplate::InReplyTo(id) => msg.in_reply_to.as_deref() == Some(id.as_str()),
            MessageTemplate::And(a, b) => a.matches(msg) && b.matches(msg),
            MessageTemplate::Not(t) => !t.matches(msg),
        }
    }
}
