//! Property-based test generators using proptest.
//!
//! Command strategies draw ids from a small pool so that generated
//! sequences hit collisions, updates of missing entries and repeated
//! deletes often enough to matter.

use crate::fixtures::{todo_path, todos_path};
use flushout_document::{Props, Value};
use flushout_protocol::Command;
use proptest::prelude::*;

/// Ids used by generated todo commands.
pub const ID_POOL: &[&str] = &["x1", "x2", "x3", "x4"];

/// Strategy for picking an id from [`ID_POOL`].
pub fn pooled_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(ID_POOL).prop_map(str::to_string)
}

/// Strategy for generating field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9]{0,11}").expect("Invalid regex")
}

/// Strategy for generating field values, nested up to three levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[ -~]{0,16}".prop_map(Value::Text),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4).prop_map(Value::Map),
        ]
    })
}

/// Strategy for generating property sets.
pub fn props_strategy() -> impl Strategy<Value = Props> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(), 0..5)
}

/// Strategy for generating a single todo command over [`ID_POOL`].
pub fn todo_command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => (pooled_id_strategy(), props_strategy())
            .prop_map(|(id, props)| Command::create(todo_path(&id), props)),
        1 => props_strategy().prop_map(|props| Command::create_in(todos_path(), props)),
        3 => (pooled_id_strategy(), props_strategy())
            .prop_map(|(id, props)| Command::update(todo_path(&id), props)),
        2 => pooled_id_strategy().prop_map(|id| Command::delete(todo_path(&id))),
    ]
}

/// Strategy for generating a sequence of todo commands.
pub fn command_sequence_strategy(
    min_commands: usize,
    max_commands: usize,
) -> impl Strategy<Value = Vec<Command>> {
    prop::collection::vec(todo_command_strategy(), min_commands..max_commands)
}

/// Strategy for generating a sequence of batches.
pub fn batch_sequence_strategy(
    max_batches: usize,
    max_commands: usize,
) -> impl Strategy<Value = Vec<Vec<Command>>> {
    prop::collection::vec(command_sequence_strategy(0, max_commands), 1..max_batches)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
