//! Sync client: a proxy paired with a backend.

use crate::backend::Backend;
use crate::config::{ClientConfig, RetryConfig};
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::{FlushOutcome, Proxy};
use flushout_document::{Document, EntityId, Path, Props, Schema};
use flushout_protocol::{Command, ErrorInfo};
use std::future::Future;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Result of a [`SyncClient::flush`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    /// Commands sent in the batch.
    pub sent: usize,
    /// How the proxy reconciled the master's answer.
    pub outcome: FlushOutcome,
    /// Error reported by the master, if the batch was rejected.
    pub error: Option<ErrorInfo>,
    /// Whether the proxy was rebuilt from a fresh snapshot.
    pub resynced: bool,
    /// Attempts needed to deliver the batch.
    pub attempts: u32,
    /// Master command count after the flush.
    pub command_count: u64,
}

/// Drives a [`Proxy`] against a [`Backend`].
///
/// The client fetches the initial snapshot, forwards local commands to
/// the proxy and runs the flush cycle. When a flush reports remapped ids
/// or an error, the proxy is discarded and rebuilt from the master's
/// latest snapshot; commands not yet flushed at that point are lost.
///
/// Retries only cover transport failures. A backend that can lose a
/// response after the master committed the batch must not report that
/// failure as retryable, or the batch is applied twice.
pub struct SyncClient<S: Schema, B: Backend<S>> {
    backend: B,
    config: ClientConfig,
    proxy: Option<Proxy<S>>,
    schema: PhantomData<S>,
}

impl<S: Schema, B: Backend<S>> SyncClient<S, B> {
    /// Creates a client that is not connected yet.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ClientConfig::default())
    }

    /// Creates a client with explicit configuration.
    pub fn with_config(backend: B, config: ClientConfig) -> Self {
        Self {
            backend,
            config,
            proxy: None,
            schema: PhantomData,
        }
    }

    /// Fetches the master's snapshot and builds the proxy from it.
    pub async fn connect(&mut self) -> ProxyResult<()> {
        self.resync().await
    }

    /// Replaces the proxy with one built from the latest snapshot.
    pub async fn resync(&mut self) -> ProxyResult<()> {
        let backend = &self.backend;
        let (snapshot, _) =
            with_retry(&self.config.retry, "snapshot", move || backend.latest_snapshot()).await?;

        if let Some(old) = &self.proxy {
            if old.unflushed_count() > 0 {
                warn!(
                    dropped = old.unflushed_count(),
                    "resync discards unflushed commands"
                );
            }
        }
        info!(command_count = snapshot.command_count, "proxy rebuilt from snapshot");
        self.proxy = Some(Proxy::new(snapshot));
        Ok(())
    }

    /// Returns true once a snapshot has been loaded.
    pub fn is_connected(&self) -> bool {
        self.proxy.is_some()
    }

    /// Returns the proxy.
    pub fn proxy(&self) -> ProxyResult<&Proxy<S>> {
        self.proxy.as_ref().ok_or(ProxyError::NotConnected)
    }

    /// Returns the local document.
    pub fn document(&self) -> ProxyResult<&Document<S>> {
        Ok(self.proxy()?.document())
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Applies a command to the local proxy.
    pub fn apply(&mut self, command: Command) -> ProxyResult<Path> {
        self.proxy_mut()?.apply(command)
    }

    /// Creates an entry in `collection` under a generated id.
    pub fn create(&mut self, collection: impl Into<Path>, props: Props) -> ProxyResult<EntityId> {
        self.proxy_mut()?.create(collection, props)
    }

    /// Sends the unflushed commands to the master and reconciles the answer.
    ///
    /// A batch left in flight by a failed earlier call is resent as is.
    /// If delivery fails, the batch stays in flight and the error is
    /// returned; the log is untouched.
    pub async fn flush(&mut self) -> ProxyResult<FlushReport> {
        let batch = {
            let proxy = self.proxy_mut()?;
            match proxy.in_flight() {
                Some(batch) => batch.clone(),
                None => proxy.begin_flush()?,
            }
        };

        let backend = &self.backend;
        let sent = &batch;
        let (result, attempts) =
            with_retry(&self.config.retry, "flush", move || backend.send_flush(sent)).await?;

        let outcome = self.proxy_mut()?.end_flush(&result.sync);

        let mut report = FlushReport {
            sent: batch.len(),
            outcome,
            error: result.error,
            resynced: false,
            attempts,
            command_count: result.sync.command_count,
        };

        if self.config.auto_resync && (outcome.needs_resync() || report.error.is_some()) {
            info!(
                ids_changed = outcome.ids_changed,
                error = ?outcome.error,
                "flush requires resync"
            );
            self.resync().await?;
            report.resynced = true;
        }

        debug!(
            sent = report.sent,
            attempts = report.attempts,
            command_count = report.command_count,
            "flush finished"
        );
        Ok(report)
    }

    fn proxy_mut(&mut self) -> ProxyResult<&mut Proxy<S>> {
        self.proxy.as_mut().ok_or(ProxyError::NotConnected)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error or
/// runs out of attempts. Returns the value and the attempts used.
async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    operation: &str,
    mut call: F,
) -> ProxyResult<(T, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProxyResult<T>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
        }

        match call().await {
            Ok(value) => return Ok((value, attempt + 1)),
            Err(err) if err.is_retryable() && attempt + 1 < retry.max_attempts => {
                warn!(operation, attempt, error = %err, "retrying after transport error");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LoopbackBackend;
    use flushout_document::{props, Untyped};
    use flushout_master::Master;
    use flushout_protocol::Snapshot;
    use std::sync::Arc;
    use std::time::Duration;

    type TestClient = SyncClient<Untyped, Arc<LoopbackBackend<Untyped>>>;

    fn quick_retry(attempts: u32) -> ClientConfig {
        ClientConfig::new().with_retry(
            RetryConfig::new(attempts)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        )
    }

    fn backend_with(document: Document<Untyped>) -> Arc<LoopbackBackend<Untyped>> {
        Arc::new(LoopbackBackend::new(Arc::new(Master::new(Snapshot::new(
            0, document,
        )))))
    }

    fn shared_backend() -> Arc<LoopbackBackend<Untyped>> {
        backend_with(Document::empty().with_collection("todos").unwrap())
    }

    #[tokio::test]
    async fn not_connected_until_snapshot_loaded() {
        let mut client = TestClient::new(shared_backend());

        assert!(!client.is_connected());
        assert_eq!(
            client.create("todos", props([("text", "a")])).unwrap_err(),
            ProxyError::NotConnected
        );
        assert!(matches!(client.flush().await, Err(ProxyError::NotConnected)));
    }

    #[tokio::test]
    async fn flush_delivers_commands() {
        let backend = shared_backend();
        let mut client = TestClient::new(Arc::clone(&backend));
        client.connect().await.unwrap();

        client.create("todos", props([("text", "a")])).unwrap();
        client.create("todos", props([("text", "b")])).unwrap();
        let report = client.flush().await.unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.attempts, 1);
        assert!(!report.resynced);
        assert_eq!(report.command_count, 2);
        assert_eq!(backend.master().command_count(), 2);
        assert_eq!(client.proxy().unwrap().unflushed_count(), 0);
    }

    #[tokio::test]
    async fn flush_retries_transient_failures() {
        let backend = shared_backend();
        let mut client = TestClient::with_config(Arc::clone(&backend), quick_retry(3));
        client.connect().await.unwrap();
        client.create("todos", props([("text", "a")])).unwrap();

        backend.fail_next(2);
        let report = client.flush().await.unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(backend.master().command_count(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_keep_batch_in_flight() {
        let backend = shared_backend();
        let mut client = TestClient::with_config(Arc::clone(&backend), quick_retry(2));
        client.connect().await.unwrap();
        client.create("todos", props([("text", "a")])).unwrap();

        backend.fail_next(2);
        let err = client.flush().await.unwrap_err();
        assert!(err.is_retryable());

        let proxy = client.proxy().unwrap();
        assert!(proxy.is_flushing());
        assert_eq!(proxy.unflushed_count(), 1);
        assert_eq!(backend.master().command_count(), 0);

        // Resent unchanged
        let report = client.flush().await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(backend.master().command_count(), 1);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let backend = shared_backend();
        let mut client = TestClient::with_config(Arc::clone(&backend), quick_retry(5));
        client.connect().await.unwrap();
        client.create("todos", props([("text", "a")])).unwrap();

        backend.set_online(false);
        let err = client.flush().await.unwrap_err();

        assert!(matches!(err, ProxyError::Transport { retryable: false, .. }));
    }

    fn seeded_backend() -> Arc<LoopbackBackend<Untyped>> {
        let mut document = Document::empty().with_collection("todos").unwrap();
        document
            .create_entry(&Path::from(["todos", "x1"]), props([("text", "a")]))
            .unwrap();
        backend_with(document)
    }

    #[tokio::test]
    async fn rejected_batch_triggers_resync() {
        let backend = seeded_backend();
        let mut editor = TestClient::new(Arc::clone(&backend));
        let mut remover = TestClient::new(Arc::clone(&backend));
        editor.connect().await.unwrap();
        remover.connect().await.unwrap();

        remover.apply(Command::delete(["todos", "x1"])).unwrap();
        remover.flush().await.unwrap();

        editor
            .apply(Command::update(["todos", "x1"], props([("text", "b")])))
            .unwrap();
        let report = editor.flush().await.unwrap();

        assert_eq!(
            report.error.as_ref().map(|e| e.kind),
            Some(flushout_protocol::ErrorKind::InvalidCommand)
        );
        assert!(report.resynced);
        assert_eq!(report.command_count, 1);
        assert!(!editor
            .document()
            .unwrap()
            .contains_entry(&Path::from(["todos", "x1"])));
        assert_eq!(editor.proxy().unwrap().unflushed_count(), 0);
    }

    #[tokio::test]
    async fn rejected_batch_kept_without_auto_resync() {
        let backend = seeded_backend();
        let config = ClientConfig::new().with_auto_resync(false);
        let mut editor = TestClient::with_config(Arc::clone(&backend), config);
        let mut remover = TestClient::new(Arc::clone(&backend));
        editor.connect().await.unwrap();
        remover.connect().await.unwrap();

        remover.apply(Command::delete(["todos", "x1"])).unwrap();
        remover.flush().await.unwrap();
        editor
            .apply(Command::update(["todos", "x1"], props([("text", "b")])))
            .unwrap();

        let report = editor.flush().await.unwrap();

        assert!(report.outcome.needs_resync());
        assert!(!report.resynced);
        assert_eq!(editor.proxy().unwrap().unflushed_count(), 1);
    }
}
