//! The optimistic client replica.

use crate::error::{ProxyError, ProxyResult};
use flushout_document::{Document, EntityId, Path, Props, Schema};
use flushout_protocol::{Command, CommandLog, CompletionBatch, ErrorKind, Snapshot, SyncInfo};
use tracing::{debug, warn};

/// What a finished flush means for the proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    /// The master moved at least one of this proxy's new entries.
    pub ids_changed: bool,
    /// The flush failed; the log still holds the batch's commands.
    pub error: Option<ErrorKind>,
    /// Commands dropped from the log.
    pub acknowledged: usize,
}

impl FlushOutcome {
    /// Returns true if the proxy should be rebuilt from a fresh snapshot.
    pub fn needs_resync(&self) -> bool {
        self.ids_changed || self.error.is_some()
    }

    fn failed(kind: ErrorKind) -> Self {
        Self {
            ids_changed: false,
            error: Some(kind),
            acknowledged: 0,
        }
    }
}

/// A client replica that applies commands locally and flushes them to the
/// master in batches.
///
/// Local commands take effect immediately and are logged until the master
/// acknowledges them. At most one batch is in flight at a time; commands
/// applied meanwhile stay in the log for the next flush.
///
/// # Example
///
/// ```
/// use flushout_document::{props, Document, Untyped};
/// use flushout_protocol::Snapshot;
/// use flushout_proxy::Proxy;
///
/// let document = Document::<Untyped>::empty().with_collection("todos").unwrap();
/// let mut proxy = Proxy::new(Snapshot::new(0, document));
///
/// let id = proxy.create("todos", props([("text", "buy milk")])).unwrap();
/// assert_eq!(proxy.unflushed_count(), 1);
///
/// let batch = proxy.begin_flush().unwrap();
/// assert_eq!(batch.commands.len(), 1);
/// # let _ = id;
/// ```
#[derive(Debug, Clone)]
pub struct Proxy<S: Schema> {
    document: Document<S>,
    log: CommandLog,
    command_count: u64,
    synced_command_count: u64,
    in_flight: Option<CompletionBatch>,
}

impl<S: Schema> Proxy<S> {
    /// Creates a proxy from a master snapshot.
    pub fn new(snapshot: Snapshot<S>) -> Self {
        Self {
            document: snapshot.document,
            log: CommandLog::starting_after(snapshot.command_count),
            command_count: snapshot.command_count,
            synced_command_count: snapshot.command_count,
            in_flight: None,
        }
    }

    /// Applies a command locally and logs it.
    ///
    /// A Create built with [`Command::create_in`] gets a generated id
    /// appended to its path. Returns the path the command was logged under.
    /// On error neither the document nor the log changes.
    pub fn apply(&mut self, command: Command) -> ProxyResult<Path> {
        command.validate()?;

        let command = command.with_id(EntityId::generate());

        command.apply_to(&mut self.document)?;

        let path = command.path().clone();
        self.log.append(command);
        self.command_count += 1;
        Ok(path)
    }

    /// Creates an entry in `collection` under a generated id.
    pub fn create(&mut self, collection: impl Into<Path>, props: Props) -> ProxyResult<EntityId> {
        let id = EntityId::generate();
        self.apply(Command::create_in(collection, props).with_id(id.as_str()))?;
        Ok(id)
    }

    /// Packs the unflushed commands into a batch.
    ///
    /// The log is left intact until [`end_flush`](Self::end_flush). Fails
    /// with [`ProxyError::FlushInProgress`] while a batch is in flight.
    pub fn begin_flush(&mut self) -> ProxyResult<CompletionBatch> {
        if self.in_flight.is_some() {
            return Err(ProxyError::FlushInProgress);
        }

        let batch = CompletionBatch::new(self.synced_command_count, self.log.to_batch());
        debug!(
            commands = batch.len(),
            base_command_count = batch.base_command_count,
            "flush started"
        );
        self.in_flight = Some(batch.clone());
        Ok(batch)
    }

    /// Returns the batch currently in flight, if any.
    pub fn in_flight(&self) -> Option<&CompletionBatch> {
        self.in_flight.as_ref()
    }

    /// Releases the in-flight guard without touching the log.
    ///
    /// The batch's commands are sent again with the next flush.
    pub fn abort_flush(&mut self) {
        if self.in_flight.take().is_some() {
            debug!("flush aborted");
        }
    }

    /// Reconciles the proxy with the master's answer to the in-flight batch.
    ///
    /// Calling this without a batch in flight (for example a second time
    /// with the same `sync`) does nothing.
    pub fn end_flush(&mut self, sync: &SyncInfo) -> FlushOutcome {
        let Some(batch) = self.in_flight.take() else {
            return FlushOutcome::default();
        };

        if let Some(kind) = sync.rejected {
            warn!(error = %kind, commands = batch.len(), "flush rejected by master");
            return FlushOutcome::failed(kind);
        }

        let sent = batch.len() as u64;
        if sync.applied_count != sent
            || sync.command_count < batch.base_command_count + sync.applied_count
        {
            warn!(
                sent,
                applied = sync.applied_count,
                command_count = sync.command_count,
                base_command_count = batch.base_command_count,
                "flush answer does not match batch"
            );
            return FlushOutcome::failed(ErrorKind::ProtocolMismatch);
        }

        let acknowledged = self.log.acknowledge(batch.len());

        for remap in &sync.id_remaps {
            let rekeyed = self
                .document
                .rekey_entry(&remap.collection, &remap.old_id, &remap.new_id);
            if let Err(err) = rekeyed {
                debug!(error = %err, "remapped entry no longer present locally");
            }
            self.log
                .rewrite_entity(&remap.collection, &remap.old_id, &remap.new_id);
        }

        for over in &sync.overrides {
            if self.document.contains_entry(&over.path) {
                if let Err(err) = self.document.update_entry(&over.path, over.props.clone()) {
                    debug!(error = %err, path = %over.path, "override not merged");
                }
            }
        }

        self.synced_command_count = sync.command_count;
        debug!(
            acknowledged,
            remaps = sync.id_remaps.len(),
            overrides = sync.overrides.len(),
            command_count = sync.command_count,
            "flush completed"
        );

        FlushOutcome {
            ids_changed: sync.ids_changed(),
            error: None,
            acknowledged,
        }
    }

    /// Returns the local document.
    pub fn document(&self) -> &Document<S> {
        &self.document
    }

    /// Returns the number of commands ever issued locally, counting from
    /// the snapshot the proxy was built from.
    pub fn command_count(&self) -> u64 {
        self.command_count
    }

    /// Returns the master command count at the last successful flush.
    pub fn synced_command_count(&self) -> u64 {
        self.synced_command_count
    }

    /// Returns the number of commands not yet acknowledged by the master.
    pub fn unflushed_count(&self) -> usize {
        self.log.len()
    }

    /// Returns the unacknowledged commands, oldest first.
    pub fn unflushed(&self) -> impl Iterator<Item = &Command> {
        self.log.commands()
    }

    /// Returns true while a batch is in flight.
    pub fn is_flushing(&self) -> bool {
        self.in_flight.is_some()
    }
}
