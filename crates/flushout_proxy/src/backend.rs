//! Transport abstraction between sync clients and the master.

use crate::error::{ProxyError, ProxyResult};
use async_trait::async_trait;
use flushout_document::Schema;
use flushout_master::{Interceptor, Master, NoInterceptor};
use flushout_protocol::{transfer, ApplyResult, CompletionBatch, Snapshot};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A backend carries requests from a sync client to the master.
///
/// Implementations handle the network layer (HTTP, WebSocket, in-process
/// for tests) and must hand back values that share nothing with the
/// master's own state.
#[async_trait]
pub trait Backend<S: Schema>: Send + Sync {
    /// Fetches the master's latest snapshot.
    async fn latest_snapshot(&self) -> ProxyResult<Snapshot<S>>;

    /// Delivers a batch to the master and returns its answer.
    async fn send_flush(&self, batch: &CompletionBatch) -> ProxyResult<ApplyResult>;
}

/// An in-process backend that talks to a shared [`Master`].
///
/// Every request and response is copied through the CBOR codec, so the
/// client only ever sees what would have crossed a real wire. Failures can
/// be injected to exercise retry and recovery paths.
pub struct LoopbackBackend<S: Schema, I = NoInterceptor> {
    master: Arc<Master<S, I>>,
    online: AtomicBool,
    failures: AtomicU32,
}

impl<S: Schema, I: Interceptor<S>> LoopbackBackend<S, I> {
    /// Creates a backend connected to `master`.
    pub fn new(master: Arc<Master<S, I>>) -> Self {
        Self {
            master,
            online: AtomicBool::new(true),
            failures: AtomicU32::new(0),
        }
    }

    /// Returns the master this backend talks to.
    pub fn master(&self) -> &Arc<Master<S, I>> {
        &self.master
    }

    /// Makes the next `count` requests fail with a retryable error before
    /// they reach the master.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Sets whether the master is reachable. While offline every request
    /// fails with a non-retryable error.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check_link(&self) -> ProxyResult<()> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(ProxyError::transport_fatal("master unreachable"));
        }
        let dropped = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            debug!("loopback request dropped");
            return Err(ProxyError::transport_retryable("connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl<S, I> Backend<S> for LoopbackBackend<S, I>
where
    S: Schema,
    I: Interceptor<S> + 'static,
{
    async fn latest_snapshot(&self) -> ProxyResult<Snapshot<S>> {
        self.check_link()?;
        Ok(transfer(&self.master.snapshot())?)
    }

    async fn send_flush(&self, batch: &CompletionBatch) -> ProxyResult<ApplyResult> {
        self.check_link()?;
        let received = transfer(batch)?;
        let result = self.master.apply(&received);
        Ok(transfer(&result)?)
    }
}

#[async_trait]
impl<S: Schema, B: Backend<S> + 'static> Backend<S> for Arc<B> {
    async fn latest_snapshot(&self) -> ProxyResult<Snapshot<S>> {
        (**self).latest_snapshot().await
    }

    async fn send_flush(&self, batch: &CompletionBatch) -> ProxyResult<ApplyResult> {
        (**self).send_flush(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flushout_document::{props, Document, Untyped};
    use flushout_protocol::Command;

    fn backend() -> LoopbackBackend<Untyped> {
        let document = Document::empty().with_collection("todos").unwrap();
        LoopbackBackend::new(Arc::new(Master::new(Snapshot::new(0, document))))
    }

    #[tokio::test]
    async fn loopback_round_trip() {
        let backend = backend();
        let batch = CompletionBatch::new(
            0,
            vec![Command::create(["todos", "x1"], props([("text", "a")]))],
        );

        let result = backend.send_flush(&batch).await.unwrap();
        assert!(result.is_success());

        let snapshot = backend.latest_snapshot().await.unwrap();
        assert_eq!(snapshot.command_count, 1);
        assert_eq!(snapshot, backend.master().snapshot());
    }

    #[tokio::test]
    async fn injected_failures_are_retryable() {
        let backend = backend();
        backend.fail_next(2);

        for _ in 0..2 {
            let err = backend.latest_snapshot().await.unwrap_err();
            assert!(err.is_retryable());
        }
        assert!(backend.latest_snapshot().await.is_ok());
    }

    #[tokio::test]
    async fn dropped_flush_never_reaches_master() {
        let backend = backend();
        backend.fail_next(1);
        let batch = CompletionBatch::new(
            0,
            vec![Command::create(["todos", "x1"], props([("text", "a")]))],
        );

        assert!(backend.send_flush(&batch).await.is_err());
        assert_eq!(backend.master().command_count(), 0);
    }

    #[tokio::test]
    async fn offline_is_fatal() {
        let backend = backend();
        backend.set_online(false);

        let err = backend.latest_snapshot().await.unwrap_err();
        assert!(!err.is_retryable());

        backend.set_online(true);
        assert!(backend.latest_snapshot().await.is_ok());
    }
}
