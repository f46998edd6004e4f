//! Protocol messages exchanged between proxies and the master.
//!
//! All messages are plain records (primitives, arrays and string-keyed
//! maps) so they survive any lossless encoding.

use crate::command::Command;
use flushout_document::{Document, Path, Props, Schema};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A consistent point-in-time copy of master state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Snapshot<S: Schema> {
    /// Commands the master has applied up to and including this snapshot.
    pub command_count: u64,
    /// The document.
    pub document: Document<S>,
}

impl<S: Schema> Snapshot<S> {
    /// Creates a snapshot.
    pub fn new(command_count: u64, document: Document<S>) -> Self {
        Self {
            command_count,
            document,
        }
    }
}

impl<S: Schema> Default for Snapshot<S> {
    fn default() -> Self {
        Self::new(0, Document::empty())
    }
}

/// A proxy's unflushed commands, sent to the master in one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionBatch {
    /// Master command count the proxy last synchronized against.
    pub base_command_count: u64,
    /// Commands in issue order.
    pub commands: Vec<Command>,
}

impl CompletionBatch {
    /// Creates a batch.
    pub fn new(base_command_count: u64, commands: Vec<Command>) -> Self {
        Self {
            base_command_count,
            commands,
        }
    }

    /// Returns the number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if the batch carries no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A Create whose id collided on the master and was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdRemap {
    /// Collection holding the entry.
    pub collection: Path,
    /// Id the client generated.
    pub old_id: String,
    /// Id the master committed the entry under.
    pub new_id: String,
}

/// Field values the master's interceptor injected into a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOverride {
    /// Committed entry path (after any remap).
    pub path: Path,
    /// Field values as committed.
    pub props: Props,
}

/// Classification of a rejected batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// A command could not be applied; nothing in the batch was committed.
    InvalidCommand,
    /// The batch exceeded the master's size limit.
    BatchTooLarge,
    /// The batch was built against an outdated command count.
    StaleBatch,
    /// The sync info does not match the batch that was sent.
    ProtocolMismatch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidCommand => "invalid command",
            ErrorKind::BatchTooLarge => "batch too large",
            ErrorKind::StaleBatch => "stale batch",
            ErrorKind::ProtocolMismatch => "protocol mismatch",
        };
        f.write_str(name)
    }
}

/// What a proxy needs to reconcile after a flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInfo {
    /// Master command count after the batch.
    pub command_count: u64,
    /// Commands of the batch that were committed.
    pub applied_count: u64,
    /// Set when the batch was rejected as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected: Option<ErrorKind>,
    /// Creates moved to a fresh id because of a collision.
    #[serde(default)]
    pub id_remaps: Vec<IdRemap>,
    /// Values injected by the master's interceptor.
    #[serde(default)]
    pub overrides: Vec<FieldOverride>,
}

impl SyncInfo {
    /// Returns true if any id was remapped.
    pub fn ids_changed(&self) -> bool {
        !self.id_remaps.is_empty()
    }
}

/// Details of a rejected batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Index of the failing command within the batch, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_index: Option<usize>,
}

/// The master's answer to a [`CompletionBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// Reconciliation data for the proxy.
    pub sync: SyncInfo,
    /// Present when the batch was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ApplyResult {
    /// Creates a successful result.
    pub fn success(sync: SyncInfo) -> Self {
        Self { sync, error: None }
    }

    /// Creates a rejection that leaves the master at `command_count`.
    pub fn rejected(command_count: u64, error: ErrorInfo) -> Self {
        Self {
            sync: SyncInfo {
                command_count,
                rejected: Some(error.kind),
                ..SyncInfo::default()
            },
            error: Some(error),
        }
    }

    /// Returns true if the batch was committed.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flushout_document::{props, Untyped};

    #[test]
    fn rejected_result_carries_kind_in_sync() {
        let result = ApplyResult::rejected(
            7,
            ErrorInfo {
                kind: ErrorKind::InvalidCommand,
                message: "entry not found: todos/x1".into(),
                command_index: Some(1),
            },
        );

        assert!(!result.is_success());
        assert_eq!(result.sync.command_count, 7);
        assert_eq!(result.sync.applied_count, 0);
        assert_eq!(result.sync.rejected, Some(ErrorKind::InvalidCommand));
    }

    #[test]
    fn sync_info_ids_changed() {
        let mut sync = SyncInfo::default();
        assert!(!sync.ids_changed());

        sync.id_remaps.push(IdRemap {
            collection: Path::from("todos"),
            old_id: "x1".into(),
            new_id: "y2".into(),
        });
        assert!(sync.ids_changed());
    }

    #[test]
    fn wire_objects_are_plain_json() {
        let result = ApplyResult::success(SyncInfo {
            command_count: 3,
            applied_count: 1,
            rejected: None,
            id_remaps: vec![],
            overrides: vec![FieldOverride {
                path: Path::from(["todos", "x1"]),
                props: props([("createdAt", 1_000i64)]),
            }],
        });

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sync": {
                    "commandCount": 3,
                    "appliedCount": 1,
                    "idRemaps": [],
                    "overrides": [{"path": ["todos", "x1"], "props": {"createdAt": 1000}}]
                }
            })
        );
    }

    #[test]
    fn default_snapshot_is_empty() {
        let snapshot = Snapshot::<Untyped>::default();
        assert_eq!(snapshot.command_count, 0);
        assert!(snapshot.document.root().is_empty());
    }
}
