//! Test fixtures for the todo-list document.
//!
//! The todo list is the canonical example document: a single `todos`
//! collection whose entries carry a `text` and a server-assigned
//! `createdAt` timestamp.

use flushout_document::{props, Document, Path, Props, Schema};
use flushout_protocol::{Command, CommandAction, CompletionBatch, Snapshot};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the todo collection.
pub const TODOS: &str = "todos";

/// Field the server stamps on every new todo.
pub const CREATED_AT: &str = "createdAt";

/// Schema of the todo-list document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoList;

impl Schema for TodoList {
    fn collections() -> Vec<Path> {
        vec![Path::from(TODOS)]
    }
}

/// A single todo entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoEntry {
    /// The todo text.
    pub text: String,
    /// Server-side creation time in milliseconds, absent until flushed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl TodoEntry {
    /// Creates an unflushed entry.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: None,
        }
    }
}

/// Returns the path of the todo collection.
pub fn todos_path() -> Path {
    Path::from(TODOS)
}

/// Returns the path of the todo `id`.
pub fn todo_path(id: &str) -> Path {
    todos_path().child(id)
}

/// Returns an empty todo-list snapshot at command count zero.
pub fn empty_todo_snapshot() -> Snapshot<TodoList> {
    Snapshot::new(0, Document::empty())
}

/// A Create for the todo `id`.
pub fn create_todo(id: &str, text: &str) -> Command {
    Command::create(todo_path(id), props([("text", text)]))
}

/// A Create against the todo collection; the issuer picks the id.
pub fn create_todo_anywhere(text: &str) -> Command {
    Command::create_in(todos_path(), props([("text", text)]))
}

/// An Update of the text of todo `id`.
pub fn edit_todo(id: &str, text: &str) -> Command {
    Command::update(todo_path(id), props([("text", text)]))
}

/// A Delete of todo `id`.
pub fn delete_todo(id: &str) -> Command {
    Command::delete(todo_path(id))
}

/// Wraps `commands` in a batch built against `base`.
pub fn batch(base: u64, commands: Vec<Command>) -> CompletionBatch {
    CompletionBatch::new(base, commands)
}

/// Reads every todo of `document`, sorted by creation time.
///
/// Unflushed todos sort last.
pub fn sorted_todos(document: &Document<TodoList>) -> Vec<(String, TodoEntry)> {
    let mut todos: Vec<(String, TodoEntry)> = document
        .entries_as::<TodoEntry>(&todos_path())
        .map(|entries| {
            entries
                .into_iter()
                .map(|(id, entry)| (id.into_string(), entry))
                .collect()
        })
        .unwrap_or_default();
    todos.sort_by_key(|(_, entry)| (entry.created_at.is_none(), entry.created_at));
    todos
}

/// Milliseconds since the Unix epoch.
pub fn system_clock() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// A clock that returns `start`, `start + 1`, ... on successive calls.
pub fn sequential_clock(start: i64) -> impl Fn() -> i64 + Send + Sync + Clone {
    let next = Arc::new(AtomicI64::new(start));
    move || next.fetch_add(1, Ordering::SeqCst)
}

/// An interceptor that stamps `createdAt` on every Create with `clock()`.
///
/// Whatever the client put in `createdAt` is overwritten.
pub fn stamp_created_at<C>(
    clock: C,
) -> impl Fn(&Document<TodoList>, &Command) -> Option<Props> + Send + Sync
where
    C: Fn() -> i64 + Send + Sync,
{
    move |_document: &Document<TodoList>, command: &Command| {
        (command.action() == CommandAction::Create).then(|| props([(CREATED_AT, clock())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flushout_document::Value;

    #[test]
    fn empty_snapshot_has_todo_collection() {
        let snapshot = empty_todo_snapshot();
        assert_eq!(snapshot.command_count, 0);
        assert!(snapshot.document.is_collection(&todos_path()));
    }

    #[test]
    fn sorted_todos_puts_unflushed_last() {
        let mut doc = Document::<TodoList>::empty();
        doc.create_entry(&todo_path("a"), props([("text", "unflushed")]))
            .unwrap();
        doc.create_entry(
            &todo_path("b"),
            props([("text", Value::from("late")), (CREATED_AT, Value::from(20i64))]),
        )
        .unwrap();
        doc.create_entry(
            &todo_path("c"),
            props([("text", Value::from("early")), (CREATED_AT, Value::from(10i64))]),
        )
        .unwrap();

        let ids: Vec<String> = sorted_todos(&doc).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn sequential_clock_counts_up() {
        let clock = sequential_clock(100);
        assert_eq!(clock(), 100);
        assert_eq!(clock(), 101);
    }

    #[test]
    fn stamp_only_on_create() {
        let interceptor = stamp_created_at(|| 5);
        let doc = Document::<TodoList>::empty();

        assert_eq!(
            interceptor(&doc, &create_todo("x1", "a")),
            Some(props([(CREATED_AT, 5i64)]))
        );
        assert_eq!(interceptor(&doc, &edit_todo("x1", "b")), None);
        assert_eq!(interceptor(&doc, &delete_todo("x1")), None);
    }
}
