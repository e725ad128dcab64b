//! Message Bus Module
//!
//! This module provides the addressed mailbox infrastructure agents talk through.
//! Every agent owns one [`Mailbox`]; the [`MessageBus`] is the directory that maps
//! agent names to mailboxes and delivers a message to each of its receivers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  send   ┌─────────────┐  push   ┌─────────────┐
//! │   Gateway   │────────>│  MessageBus │────────>│  Mailbox    │
//! │   (agent)   │         │ (directory) │         │ (gamestop)  │
//! └─────────────┘         └─────────────┘         └─────────────┘
//!                                                        │ receive(template)
//!                                                        ▼
//!                                                 ┌─────────────┐
//!                                                 │  Behaviors  │
//!                                                 └─────────────┘
//! ```
//!
//! Mailboxes are not strictly FIFO: [`Mailbox::receive`] pops the *oldest
//! message matching a template* and leaves everything else in place, so
//! ordering only holds among messages matching the same template.
//!
//! # Example
//!
//! ```
//! use gamestore_bridge::bus::{Message, MessageBus, MessageTemplate, Performative};
//!
//! let bus = MessageBus::new();
//! let mailbox = bus.register("gamestop").unwrap();
//!
//! bus.send(Message::request("apigateway").to("gamestop").with_content("Elden Ring"));
//!
//! let template = MessageTemplate::performative(Performative::Request);
//! let received = mailbox.receive(&template).unwrap();
//! assert_eq!(received.content, "Elden Ring");
//! ```

pub mod message;

pub use message::{AgentRef, Message, MessageTemplate, Performative, NOT_FOUND};

use crate::error::{BridgeError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{trace, warn};

/// Per-agent inbound queue.
///
/// Any number of producers may [`push`](Mailbox::push); the owning agent is the
/// single consumer.
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<Message>>,
    notify: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and wakes the owning agent if it is idle.
    pub fn push(&self, msg: Message) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(msg);
        self.notify.notify_one();
    }

    /// Pops the oldest message matching `template`, if any.
    ///
    /// Never blocks. Non-matching messages stay queued in their original order.
    pub fn receive(&self, template: &MessageTemplate) -> Option<Message> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let index = queue.iter().position(|msg| template.matches(msg))?;
        queue.remove(index)
    }

    /// Waits until a new message is pushed or `timeout` elapses.
    ///
    /// Returns `true` if woken by a push. A push that happened while nobody was
    /// waiting is remembered, so the next call returns immediately.
    pub async fn wait(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.notify.notified())
            .await
            .is_ok()
    }

    /// Number of undelivered messages.
    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Directory of agent mailboxes.
///
/// Cloning shares the same directory, so every agent context can hold its own
/// handle for sending.
#[derive(Debug, Clone, Default)]
pub struct MessageBus {
    mailboxes: Arc<RwLock<HashMap<AgentRef, Arc<Mailbox>>>>,
}

impl MessageBus {
    /// Creates an empty bus.
    ///
    /// # Example
    /// ```
    /// use gamestore_bridge::bus::MessageBus;
    ///
    /// let bus = MessageBus::new();
    /// assert_eq!(bus.agent_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mailbox for `name` and returns it.
    ///
    /// # Errors
    /// Returns `BridgeError::Config` if an agent with that name is already registered.
    pub fn register(&self, name: impl Into<AgentRef>) -> Result<Arc<Mailbox>> {
        let name = name.into();
        let mut mailboxes = self
            .mailboxes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if mailboxes.contains_key(&name) {
            return Err(BridgeError::Config(format!(
                "agent '{}' is already registered",
                name
            )));
        }
        let mailbox = Arc::new(Mailbox::new());
        mailboxes.insert(name, Arc::clone(&mailbox));
        Ok(mailbox)
    }

    /// Removes `name` from the directory. Messages sent to it afterwards are dropped.
    pub fn deregister(&self, name: &AgentRef) -> bool {
        self.mailboxes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Looks up the mailbox registered for `name`.
    pub fn mailbox(&self, name: &AgentRef) -> Option<Arc<Mailbox>> {
        self.mailboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Delivers `msg` to every receiver and returns how many mailboxes got it.
    ///
    /// Receivers with no registered mailbox are skipped with a warning; sending
    /// never fails the caller.
    pub fn send(&self, msg: Message) -> usize {
        let targets: Vec<(AgentRef, Option<Arc<Mailbox>>)> = {
            let mailboxes = self
                .mailboxes
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            msg.receivers
                .iter()
                .map(|r| (r.clone(), mailboxes.get(r).cloned()))
                .collect()
        };

        let mut delivered = 0;
        for (receiver, mailbox) in targets {
            match mailbox {
                Some(mailbox) => {
                    trace!(
                        from = %msg.sender,
                        to = %receiver,
                        performative = %msg.performative,
                        "Delivering message"
                    );
                    mailbox.push(msg.clone());
                    delivered += 1;
                }
                None => {
                    warn!(
                        from = %msg.sender,
                        to = %receiver,
                        "Dropping message for unknown agent"
                    );
                }
            }
        }
        delivered
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.mailboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_send() {
        let bus = MessageBus::new();
        let mailbox = bus.register("gamestop").unwrap();

        let delivered = bus.send(Message::request("apigateway").to("gamestop"));
        assert_eq!(delivered, 1);
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let bus = MessageBus::new();
        bus.register("gamestop").unwrap();
        let result = bus.register("gamestop");
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_send_to_unknown_agent_is_dropped() {
        let bus = MessageBus::new();
        let delivered = bus.send(Message::request("apigateway").to("nobody"));
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_send_to_multiple_receivers() {
        let bus = MessageBus::new();
        let a = bus.register("a").unwrap();
        let b = bus.register("b").unwrap();

        let delivered = bus.send(Message::inform("x").to("a").to("b").to("ghost"));
        assert_eq!(delivered, 2);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_deregister() {
        let bus = MessageBus::new();
        bus.register("gamestop").unwrap();
        assert!(bus.deregister(&AgentRef::from("gamestop")));
        assert!(!bus.deregister(&AgentRef::from("gamestop")));
        assert_eq!(bus.send(Message::request("x").to("gamestop")), 0);
    }

    #[test]
    fn test_clone_shares_directory() {
        let bus1 = MessageBus::new();
        let bus2 = bus1.clone();
        let mailbox = bus1.register("gamestop").unwrap();
        bus2.send(Message::request("x").to("gamestop"));
        assert_eq!(mailbox.len(), 1);
        assert_eq!(bus2.agent_count(), 1);
    }

    #[test]
    fn test_receive_skips_non_matching() {
        let mailbox = Mailbox::new();
        mailbox.push(Message::request("gw").with_content("first request"));
        mailbox.push(Message::inform("d").with_in_reply_to("dist_1"));
        mailbox.push(Message::request("gw").with_content("second request"));

        let informs = MessageTemplate::performative(Performative::Inform);
        let got = mailbox.receive(&informs).unwrap();
        assert_eq!(got.in_reply_to.as_deref(), Some("dist_1"));
        assert!(mailbox.receive(&informs).is_none());

        // Non-matching messages stay in arrival order.
        let requests = MessageTemplate::performative(Performative::Request);
        assert_eq!(mailbox.receive(&requests).unwrap().content, "first request");
        assert_eq!(mailbox.receive(&requests).unwrap().content, "second request");
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_receive_fifo_within_template() {
        let mailbox = Mailbox::new();
        for i in 0..5 {
            mailbox.push(Message::inform("p").with_content(format!("reply {}", i)));
        }
        let any = MessageTemplate::Any;
        for i in 0..5 {
            assert_eq!(mailbox.receive(&any).unwrap().content, format!("reply {}", i));
        }
        assert!(mailbox.receive(&any).is_none());
    }

    #[tokio::test]
    async fn test_wait_returns_after_push() {
        let mailbox = Arc::new(Mailbox::new());
        let producer = Arc::clone(&mailbox);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.push(Message::inform("p"));
        });

        assert!(mailbox.wait(Duration::from_secs(5)).await);
        handle.await.unwrap();
        assert_eq!(mailbox.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_remembers_earlier_push() {
        let mailbox = Mailbox::new();
        mailbox.push(Message::inform("p"));
        assert!(mailbox.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_wait_times_out_when_idle() {
        let mailbox = Mailbox::new();
        assert!(!mailbox.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_concurrent_producers() {
        let bus = MessageBus::new();
        let mailbox = bus.register("gateway").unwrap();
        let mut handles = vec![];

        for agent in ["gamestop", "distributor", "other"] {
            let bus = bus.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    bus.send(
                        Message::inform(agent)
                            .to("gateway")
                            .with_content(format!("{}:{}", agent, i)),
                    );
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(mailbox.len(), 30);
    }
}
