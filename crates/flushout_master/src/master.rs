//! The authoritative replica.

use crate::config::{MasterConfig, StaleBatchPolicy};
use crate::error::{MasterError, MasterResult};
use crate::interceptor::{Interceptor, NoInterceptor};
use flushout_document::{Document, DocumentError, EntityId, Path, Schema};
use flushout_protocol::{
    ApplyResult, Command, CommandAction, CompletionBatch, FieldOverride, IdRemap, Snapshot,
    SyncInfo,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Committed master state. Document and counter always change together.
struct MasterState<S: Schema> {
    document: Document<S>,
    command_count: u64,
}

/// The single authoritative replica.
///
/// The master accepts batches of commands from proxies and commits each
/// batch atomically. Batches are applied one at a time; snapshots taken
/// concurrently see either the state before a batch or the state after
/// it, never anything in between.
///
/// # Example
///
/// ```
/// use flushout_document::{props, Document, Untyped};
/// use flushout_master::Master;
/// use flushout_protocol::{Command, CompletionBatch, Snapshot};
///
/// let document = Document::<Untyped>::empty().with_collection("todos").unwrap();
/// let master = Master::new(Snapshot::new(0, document));
///
/// let batch = CompletionBatch::new(0, vec![
///     Command::create(["todos", "x1"], props([("text", "buy milk")])),
/// ]);
/// let result = master.apply(&batch);
///
/// assert!(result.is_success());
/// assert_eq!(master.command_count(), 1);
/// ```
pub struct Master<S: Schema, I = NoInterceptor> {
    state: RwLock<MasterState<S>>,
    apply_lock: Mutex<()>,
    interceptor: I,
    config: MasterConfig,
}

impl<S: Schema> Master<S> {
    /// Creates a master from an initial snapshot.
    pub fn new(snapshot: Snapshot<S>) -> Self {
        Self::with_config(snapshot, NoInterceptor, MasterConfig::default())
    }
}

impl<S: Schema, I: Interceptor<S>> Master<S, I> {
    /// Creates a master that runs `interceptor` on every Create and Update.
    pub fn with_interceptor(snapshot: Snapshot<S>, interceptor: I) -> Self {
        Self::with_config(snapshot, interceptor, MasterConfig::default())
    }

    /// Creates a master with an interceptor and explicit configuration.
    pub fn with_config(snapshot: Snapshot<S>, interceptor: I, config: MasterConfig) -> Self {
        Self {
            state: RwLock::new(MasterState {
                document: snapshot.document,
                command_count: snapshot.command_count,
            }),
            apply_lock: Mutex::new(()),
            interceptor,
            config,
        }
    }

    /// Returns a copy of the committed state.
    pub fn snapshot(&self) -> Snapshot<S> {
        let state = self.state.read();
        Snapshot::new(state.command_count, state.document.clone())
    }

    /// Returns the number of commands committed so far.
    pub fn command_count(&self) -> u64 {
        self.state.read().command_count
    }

    /// Returns a copy of the committed document.
    pub fn document(&self) -> Document<S> {
        self.state.read().document.clone()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Applies a batch and reports the outcome in wire form.
    ///
    /// A rejected batch leaves the master untouched; the result then
    /// carries the error and the unchanged command count.
    pub fn apply(&self, batch: &CompletionBatch) -> ApplyResult {
        match self.try_apply(batch) {
            Ok(sync) => ApplyResult::success(sync),
            Err(err) => {
                let command_count = self.command_count();
                warn!(
                    error = %err,
                    commands = batch.len(),
                    command_count,
                    "batch rejected"
                );
                ApplyResult::rejected(command_count, err.to_error_info())
            }
        }
    }

    /// Applies a batch atomically.
    ///
    /// Commands run in order against a working copy of the document. A
    /// Create whose id is already taken is moved to a fresh id and the move
    /// is reported in [`SyncInfo::id_remaps`]; later commands of the same
    /// batch addressing the old id follow it. Any other failure discards
    /// the working copy.
    pub fn try_apply(&self, batch: &CompletionBatch) -> MasterResult<SyncInfo> {
        let _apply = self.apply_lock.lock();

        let (mut working, base_count) = {
            let state = self.state.read();
            (state.document.clone(), state.command_count)
        };

        self.check_batch(batch, base_count)?;

        let mut sync = SyncInfo::default();
        for (index, command) in batch.commands.iter().enumerate() {
            self.apply_command(&mut working, index, command, &mut sync)?;
        }

        let applied = batch.len() as u64;
        let command_count = {
            let mut state = self.state.write();
            state.document = working;
            state.command_count += applied;
            state.command_count
        };

        sync.command_count = command_count;
        sync.applied_count = applied;

        info!(
            applied,
            command_count,
            remaps = sync.id_remaps.len(),
            overrides = sync.overrides.len(),
            "batch committed"
        );
        Ok(sync)
    }

    fn check_batch(&self, batch: &CompletionBatch, command_count: u64) -> MasterResult<()> {
        if batch.len() > self.config.max_batch_commands {
            return Err(MasterError::BatchTooLarge {
                size: batch.len(),
                max: self.config.max_batch_commands,
            });
        }

        if self.config.stale_batch_policy == StaleBatchPolicy::Reject
            && batch.base_command_count != command_count
        {
            return Err(MasterError::StaleBatch {
                expected: command_count,
                actual: batch.base_command_count,
            });
        }

        Ok(())
    }

    fn apply_command(
        &self,
        working: &mut Document<S>,
        index: usize,
        command: &Command,
        sync: &mut SyncInfo,
    ) -> MasterResult<()> {
        command
            .validate()
            .map_err(|source| MasterError::MalformedCommand { index, source })?;

        let mut command = redirect(command, &sync.id_remaps);
        if command.generates_id() {
            let id = fresh_id(working, command.path());
            command = command.with_id(id);
        }

        let injected = match command.action() {
            CommandAction::Delete => None,
            _ => self.interceptor.intercept(working, &command),
        };
        let effective = match &injected {
            Some(props) => command.with_overrides(props),
            None => command,
        };

        let committed_path = match effective.apply_to(working) {
            Ok(()) => effective.path().clone(),
            Err(err) if err.is_duplicate_id() && effective.action() == CommandAction::Create => {
                self.remap_create(working, index, &effective, sync)?
            }
            Err(source) => {
                return Err(MasterError::InvalidCommand {
                    index,
                    command: effective.to_string(),
                    source,
                })
            }
        };

        if let Some(props) = injected {
            sync.overrides.push(FieldOverride {
                path: committed_path,
                props,
            });
        }
        Ok(())
    }

    fn remap_create(
        &self,
        working: &mut Document<S>,
        index: usize,
        command: &Command,
        sync: &mut SyncInfo,
    ) -> MasterResult<Path> {
        let invalid = |source: DocumentError| MasterError::InvalidCommand {
            index,
            command: command.to_string(),
            source,
        };

        let path = command.path();
        let (collection, old_id) = match (path.parent(), path.last()) {
            (Some(collection), Some(old_id)) => (collection, old_id.to_string()),
            _ => return Err(invalid(DocumentError::entry_not_found(path))),
        };

        let new_id = fresh_id(working, &collection);
        let new_path = collection.child(new_id.as_str());
        command
            .with_path(new_path.clone())
            .apply_to(working)
            .map_err(invalid)?;

        debug!(
            index,
            collection = %collection,
            old_id = %old_id,
            new_id = %new_id,
            "id collision remapped"
        );
        sync.id_remaps.push(IdRemap {
            collection,
            old_id,
            new_id: new_id.into_string(),
        });
        Ok(new_path)
    }
}

/// Rewrites `command` through the remaps made earlier in the batch.
fn redirect(command: &Command, remaps: &[IdRemap]) -> Command {
    let mut path = command.path().clone();
    for remap in remaps {
        if path.starts_with(&remap.collection.child(remap.old_id.as_str())) {
            path = path.with_segment(remap.collection.len(), remap.new_id.as_str());
        }
    }
    if &path == command.path() {
        command.clone()
    } else {
        command.with_path(path)
    }
}

/// Generates an id not yet used in `collection`.
fn fresh_id<S: Schema>(document: &Document<S>, collection: &Path) -> EntityId {
    loop {
        let id = EntityId::generate();
        if document.get(&collection.child(id.as_str())).is_none() {
            return id;
        }
    }
}
