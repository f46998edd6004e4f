//! Local command log for a client replica.

use crate::command::Command;
use flushout_document::Path;
use std::collections::VecDeque;

/// An entry in the command log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Position in the replica's local command counter.
    pub sequence: u64,
    /// The command.
    pub command: Command,
}

/// Ordered log of commands not yet acknowledged by the master.
///
/// # Invariants
///
/// - Entries are in issue order with strictly increasing sequence numbers
/// - Entries are appended only by local mutations
/// - Entries leave the log only from the front, when acknowledged
#[derive(Debug, Clone)]
pub struct CommandLog {
    entries: VecDeque<LogEntry>,
    next_sequence: u64,
}

impl CommandLog {
    /// Creates an empty log whose first entry gets sequence 1.
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// Creates an empty log continuing after `count` already-issued commands.
    pub fn starting_after(count: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            next_sequence: count + 1,
        }
    }

    /// Appends a command and returns its sequence number.
    pub fn append(&mut self, command: Command) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push_back(LogEntry { sequence, command });
        sequence
    }

    /// Iterates over the logged commands, oldest first.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.entries.iter().map(|e| &e.command)
    }

    /// Iterates over the log entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Returns clones of every logged command, oldest first.
    pub fn to_batch(&self) -> Vec<Command> {
        self.commands().cloned().collect()
    }

    /// Drops the oldest `count` commands and returns how many were removed.
    pub fn acknowledge(&mut self, count: usize) -> usize {
        let removed = count.min(self.entries.len());
        self.entries.drain(..removed);
        removed
    }

    /// Redirects every queued command whose path runs through
    /// `collection/old_id` to `collection/new_id`.
    ///
    /// Returns the number of rewritten commands.
    pub fn rewrite_entity(&mut self, collection: &Path, old_id: &str, new_id: &str) -> usize {
        let old_prefix = collection.child(old_id);
        let index = collection.len();
        let mut rewritten = 0;

        for entry in &mut self.entries {
            if entry.command.path().starts_with(&old_prefix) {
                let path = entry.command.path().with_segment(index, new_id);
                entry.command = entry.command.with_path(path);
                rewritten += 1;
            }
        }
        rewritten
    }

    /// Returns the sequence number the next entry will get.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Returns the number of logged commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new()
    }
}
