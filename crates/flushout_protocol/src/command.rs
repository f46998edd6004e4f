//! Commands: the unit of replication.

use crate::error::{ProtocolError, ProtocolResult};
use flushout_document::{Document, DocumentError, DocumentResult, Path, Props, Schema};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation a command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandAction {
    /// Create a new entry.
    Create,
    /// Shallow-merge props into an existing entry.
    Update,
    /// Remove an existing entry.
    Delete,
}

impl CommandAction {
    /// Returns the lowercase name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandAction::Create => "create",
            CommandAction::Update => "update",
            CommandAction::Delete => "delete",
        }
    }
}

impl fmt::Display for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable instruction targeting a path in a document.
///
/// A command is pure data: it holds no reference into any document and
/// can be copied freely between replicas.
///
/// # Fields
///
/// - `action`: Create, Update or Delete
/// - `path`: the entry's path, or the collection's path for a Create
///   built with [`Command::create_in`]
/// - `props`: the property set, present exactly for Create and Update
/// - `generate_id`: set while a Create still lacks its id; the replica
///   applying it appends a generated one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    action: CommandAction,
    path: Path,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    props: Option<Props>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    generate_id: bool,
}

impl Command {
    /// Creates a Create command.
    pub fn create(path: impl Into<Path>, props: Props) -> Self {
        Self {
            action: CommandAction::Create,
            path: path.into(),
            props: Some(props),
            generate_id: false,
        }
    }

    /// Creates a Create command for a new entry in `collection` whose id
    /// is picked by the replica that applies it.
    pub fn create_in(collection: impl Into<Path>, props: Props) -> Self {
        Self {
            action: CommandAction::Create,
            path: collection.into(),
            props: Some(props),
            generate_id: true,
        }
    }

    /// Creates an Update command.
    pub fn update(path: impl Into<Path>, props: Props) -> Self {
        Self {
            action: CommandAction::Update,
            path: path.into(),
            props: Some(props),
            generate_id: false,
        }
    }

    /// Creates a Delete command.
    pub fn delete(path: impl Into<Path>) -> Self {
        Self {
            action: CommandAction::Delete,
            path: path.into(),
            props: None,
            generate_id: false,
        }
    }

    /// Returns the action.
    pub fn action(&self) -> CommandAction {
        self.action
    }

    /// Returns the target path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the property set, if any.
    pub fn props(&self) -> Option<&Props> {
        self.props.as_ref()
    }

    /// Returns true while the command still waits for a generated id.
    pub fn generates_id(&self) -> bool {
        self.generate_id
    }

    /// Returns a copy of this command addressed at `path`.
    #[must_use]
    pub fn with_path(&self, path: Path) -> Self {
        Self {
            path,
            ..self.clone()
        }
    }

    /// Returns a copy with `id` appended to the collection path.
    ///
    /// Commands that already carry their id are returned unchanged.
    #[must_use]
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        if !self.generate_id {
            return self.clone();
        }
        Self {
            path: self.path.child(id),
            generate_id: false,
            ..self.clone()
        }
    }

    /// Returns a copy with `overrides` merged over the client props.
    ///
    /// Override values win over the command's own values for the same
    /// field. Delete commands carry no props and are returned unchanged.
    #[must_use]
    pub fn with_overrides(&self, overrides: &Props) -> Self {
        if self.action == CommandAction::Delete {
            return self.clone();
        }
        let mut props = self.props.clone().unwrap_or_default();
        props.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            props: Some(props),
            ..self.clone()
        }
    }

    /// Checks the rules every command on the wire must satisfy.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.path.is_empty() {
            return Err(ProtocolError::invalid_message(format!(
                "{} command with empty path",
                self.action
            )));
        }
        match (self.action, &self.props) {
            (CommandAction::Delete, Some(_)) => {
                return Err(ProtocolError::invalid_message(format!(
                    "delete command for {} carries props",
                    self.path
                )))
            }
            (CommandAction::Create | CommandAction::Update, None) => {
                return Err(ProtocolError::invalid_message(format!(
                    "{} command for {} carries no props",
                    self.action, self.path
                )))
            }
            _ => {}
        }
        if self.generate_id && self.action != CommandAction::Create {
            return Err(ProtocolError::invalid_message(format!(
                "{} command for {} asks for a generated id",
                self.action, self.path
            )));
        }
        Ok(())
    }

    /// Applies this command to `document`.
    ///
    /// A Create still waiting for its id is refused; resolve it with
    /// [`with_id`](Self::with_id) first.
    pub fn apply_to<S: Schema>(&self, document: &mut Document<S>) -> DocumentResult<()> {
        if self.generate_id {
            return Err(DocumentError::InvalidPath {
                message: format!("create in {} has no id yet", self.path),
            });
        }
        let props = self.props.clone().unwrap_or_default();
        match self.action {
            CommandAction::Create => document.create_entry(&self.path, props),
            CommandAction::Update => document.update_entry(&self.path, props),
            CommandAction::Delete => document.delete_entry(&self.path),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.path)
    }
}
