//! Write-once, read-many result container.
//!
//! A [`Promise`] is the writing half, owned by the correlation store; a
//! [`ResultHandle`] is the reading half, handed to the caller. Handles can be
//! cloned and each clone observes the same value.

use std::time::Duration;

use tokio::sync::watch;

use super::Reply;
use crate::error::{BridgeError, Result};

/// Creates a linked promise/handle pair for request `id`.
pub fn promise(id: impl Into<String>) -> (Promise, ResultHandle) {
    let id = id.into();
    let (tx, rx) = watch::channel(None);
    (
        Promise {
            id: id.clone(),
            tx,
        },
        ResultHandle { id, rx },
    )
}

/// Writing half. Consumed by [`resolve`](Promise::resolve), so it can only be
/// resolved once.
#[derive(Debug)]
pub struct Promise {
    id: String,
    tx: watch::Sender<Option<Reply>>,
}

impl Promise {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Publishes `reply` to every handle, including ones created later.
    pub fn resolve(self, reply: Reply) {
        self.tx.send_replace(Some(reply));
    }
}

/// Reading half given to the caller.
#[derive(Debug, Clone)]
pub struct ResultHandle {
    id: String,
    rx: watch::Receiver<Option<Reply>>,
}

impl ResultHandle {
    /// Correlation id of the request this handle belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The value, if already resolved. Never blocks.
    pub fn try_get(&self) -> Option<Reply> {
        self.rx.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Waits for the value, giving up after `timeout`.
    ///
    /// # Errors
    /// - `BridgeError::Timeout` if the deadline passes first
    /// - `BridgeError::GatewayClosed` if the promise was dropped unresolved
    pub async fn wait(&mut self, timeout: Duration) -> Result<Reply> {
        let outcome = tokio::time::timeout(timeout, self.rx.wait_for(Option::is_some)).await;
        match outcome {
            Ok(Ok(value)) => value.clone().ok_or(BridgeError::GatewayClosed),
            Ok(Err(_)) => Err(BridgeError::GatewayClosed),
            Err(_) => Err(BridgeError::Timeout {
                id: self.id.clone(),
                after: timeout,
            }),
        }
    }

    /// Blocking form of [`wait`](Self::wait) for callers on plain OS threads.
    ///
    /// Drives the wait on a private current-thread runtime, so it needs no
    /// ambient Tokio context. Same errors as [`wait`](Self::wait), plus
    /// `BridgeError::Io` if that runtime cannot be created.
    ///
    /// # Panics
    /// When called from inside an async context; use [`wait`](Self::wait) there.
    pub fn wait_blocking(&mut self, timeout: Duration) -> Result<Reply> {
        if let Some(reply) = self.try_get() {
            return Ok(reply);
        }
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        rt.block_on(self.wait(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_then_wait() {
        let (p, mut h) = promise("search_1");
        assert_eq!(p.id(), "search_1");
        assert!(!h.is_resolved());

        p.resolve(Reply::Payload("{}".into()));
        let reply = h.wait(Duration::from_millis(100)).await.unwrap();
        assert_eq!(reply, Reply::Payload("{}".into()));
        assert!(h.is_resolved());
    }

    #[tokio::test]
    async fn test_wait_then_resolve_from_other_task() {
        let (p, mut h) = promise("search_2");
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            p.resolve(Reply::Payload("late".into()));
        });
        let reply = h.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(reply.payload(), Some("late"));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let (_p, mut h) = promise("search_3");
        let err = h.wait(Duration::from_millis(20)).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("search_3"));
    }

    #[tokio::test]
    async fn test_dropped_promise_reports_closed() {
        let (p, mut h) = promise("search_4");
        drop(p);
        let err = h.wait(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, BridgeError::GatewayClosed));
    }

    #[tokio::test]
    async fn test_clones_observe_same_value() {
        let (p, h1) = promise("search_5");
        let mut h2 = h1.clone();
        p.resolve(Reply::Payload("shared".into()));
        assert_eq!(h1.try_get(), Some(Reply::Payload("shared".into())));
        assert_eq!(
            h2.wait(Duration::from_millis(10)).await.unwrap(),
            Reply::Payload("shared".into())
        );
    }

    #[test]
    fn test_wait_blocking_from_plain_thread() {
        let (p, mut h) = promise("listPrimary_1");
        let waiter = std::thread::spawn(move || h.wait_blocking(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));
        p.resolve(Reply::Payload("[]".into()));
        assert_eq!(waiter.join().unwrap().unwrap(), Reply::Payload("[]".into()));
    }

    #[test]
    fn test_wait_blocking_errors_match_async_wait() {
        let (_p, mut h) = promise("search_slow");
        let err = h.wait_blocking(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { ref id, .. } if id == "search_slow"));

        let (p, mut h) = promise("search_gone");
        drop(p);
        assert!(matches!(
            h.wait_blocking(Duration::from_secs(1)),
            Err(BridgeError::GatewayClosed)
        ));
    }

    #[test]
    fn test_resolve_without_readers_is_kept() {
        let (p, h) = promise("search_6");
        let late = h.clone();
        drop(h);
        p.resolve(Reply::Payload("kept".into()));
        assert_eq!(late.try_get(), Some(Reply::Payload("kept".into())));
    }
}
