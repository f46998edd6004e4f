//! Keyed-tree documents.

use crate::error::{DocumentError, DocumentResult};
use crate::id::EntityId;
use crate::path::Path;
use crate::schema::{Schema, Untyped};
use crate::value::{from_props, Props};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Node {
    /// A mapping from key to child node.
    Collection(BTreeMap<String, Node>),
    /// A leaf record of field values.
    Entry(Props),
}

impl Node {
    /// Returns the record if this node is an entry.
    pub fn as_entry(&self) -> Option<&Props> {
        match self {
            Node::Entry(props) => Some(props),
            Node::Collection(_) => None,
        }
    }

    /// Returns the children if this node is a collection.
    pub fn as_collection(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Collection(children) => Some(children),
            Node::Entry(_) => None,
        }
    }
}

/// A replicated document.
///
/// The root is a collection. Collections nest; entries are leaves holding
/// a [`Props`] record. Every mutation is all-or-nothing: all checks run
/// before the single write, so a failed call leaves the document as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Document<S: Schema = Untyped> {
    root: BTreeMap<String, Node>,
    #[serde(skip)]
    schema: PhantomData<S>,
}

impl<S: Schema> Document<S> {
    /// Creates an empty document holding the schema's collections.
    pub fn empty() -> Self {
        let mut root = BTreeMap::new();
        for path in S::collections() {
            graft_collection(&mut root, path.segments());
        }
        Self::from_root(root)
    }

    /// Creates a document from an existing root collection.
    pub fn from_root(root: BTreeMap<String, Node>) -> Self {
        Self {
            root,
            schema: PhantomData,
        }
    }

    /// Returns the root collection.
    pub fn root(&self) -> &BTreeMap<String, Node> {
        &self.root
    }

    /// Adds a (possibly nested) collection, creating missing parents.
    ///
    /// Existing collections along the way are kept. Fails with
    /// `PathNotFound` if an entry occupies one of the segments.
    pub fn add_collection(&mut self, path: &Path) -> DocumentResult<()> {
        let mut current = &self.root;
        for segment in path.segments() {
            match current.get(segment) {
                Some(Node::Collection(children)) => current = children,
                Some(Node::Entry(_)) => return Err(DocumentError::path_not_found(path)),
                None => break,
            }
        }
        graft_collection(&mut self.root, path.segments());
        Ok(())
    }

    /// Builder form of [`add_collection`](Self::add_collection).
    pub fn with_collection(mut self, path: impl Into<Path>) -> DocumentResult<Self> {
        self.add_collection(&path.into())?;
        Ok(self)
    }

    /// Creates a new entry at `path`.
    pub fn create_entry(&mut self, path: &Path, props: Props) -> DocumentResult<()> {
        let (parent, id) = split_entry_path(path)?;
        let collection = self
            .collection_mut(&parent)
            .ok_or_else(|| DocumentError::path_not_found(path))?;

        if collection.contains_key(&id) {
            return Err(DocumentError::duplicate_id(path));
        }

        collection.insert(id, Node::Entry(props));
        Ok(())
    }

    /// Shallow-merges `props` into the entry at `path`.
    pub fn update_entry(&mut self, path: &Path, props: Props) -> DocumentResult<()> {
        let (parent, id) = split_entry_path(path)?;
        let collection = self
            .collection_mut(&parent)
            .ok_or_else(|| DocumentError::path_not_found(path))?;

        match collection.get_mut(&id) {
            Some(Node::Entry(record)) => {
                record.extend(props);
                Ok(())
            }
            _ => Err(DocumentError::entry_not_found(path)),
        }
    }

    /// Removes the entry at `path`.
    pub fn delete_entry(&mut self, path: &Path) -> DocumentResult<()> {
        let (parent, id) = split_entry_path(path)?;
        let collection = self
            .collection_mut(&parent)
            .ok_or_else(|| DocumentError::path_not_found(path))?;

        match collection.get(&id) {
            Some(Node::Entry(_)) => {
                collection.remove(&id);
                Ok(())
            }
            _ => Err(DocumentError::entry_not_found(path)),
        }
    }

    /// Moves the entry `old` of `collection` to the key `new`.
    pub fn rekey_entry(&mut self, collection: &Path, old: &str, new: &str) -> DocumentResult<()> {
        let children = self
            .collection_mut(collection)
            .ok_or_else(|| DocumentError::path_not_found(collection))?;

        if children.contains_key(new) {
            return Err(DocumentError::duplicate_id(&collection.child(new)));
        }
        match children.remove(old) {
            Some(node @ Node::Entry(_)) => {
                children.insert(new.to_string(), node);
                Ok(())
            }
            Some(node) => {
                children.insert(old.to_string(), node);
                Err(DocumentError::entry_not_found(&collection.child(old)))
            }
            None => Err(DocumentError::entry_not_found(&collection.child(old))),
        }
    }

    /// Returns the node at `path`. The root itself is not a node.
    pub fn get(&self, path: &Path) -> Option<&Node> {
        let parent = path.parent()?;
        let id = path.last()?;
        self.collection(&parent)?.get(id)
    }

    /// Returns the record of the entry at `path`.
    pub fn entry(&self, path: &Path) -> Option<&Props> {
        self.get(path).and_then(Node::as_entry)
    }

    /// Returns true if `path` resolves to a collection. The root path always does.
    pub fn is_collection(&self, path: &Path) -> bool {
        self.collection(path).is_some()
    }

    /// Returns true if `path` resolves to an entry.
    pub fn contains_entry(&self, path: &Path) -> bool {
        self.entry(path).is_some()
    }

    /// Iterates over the entries directly inside the collection at `path`.
    pub fn entries(&self, path: &Path) -> DocumentResult<impl Iterator<Item = (&str, &Props)> + '_> {
        let children = self
            .collection(path)
            .ok_or_else(|| DocumentError::path_not_found(path))?;
        Ok(children
            .iter()
            .filter_map(|(id, node)| node.as_entry().map(|props| (id.as_str(), props))))
    }

    /// Reads the entry at `path` as a typed value.
    pub fn entry_as<T: DeserializeOwned>(&self, path: &Path) -> DocumentResult<T> {
        let props = self
            .entry(path)
            .ok_or_else(|| DocumentError::entry_not_found(path))?;
        from_props(props)
    }

    /// Reads every entry of the collection at `path` as typed values.
    pub fn entries_as<T: DeserializeOwned>(&self, path: &Path) -> DocumentResult<Vec<(EntityId, T)>> {
        self.entries(path)?
            .map(|(id, props)| Ok((EntityId::from(id), from_props(props)?)))
            .collect()
    }

    fn collection(&self, path: &Path) -> Option<&BTreeMap<String, Node>> {
        let mut current = &self.root;
        for segment in path.segments() {
            match current.get(segment) {
                Some(Node::Collection(children)) => current = children,
                _ => return None,
            }
        }
        Some(current)
    }

    fn collection_mut(&mut self, path: &Path) -> Option<&mut BTreeMap<String, Node>> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            match current.get_mut(segment) {
                Some(Node::Collection(children)) => current = children,
                _ => return None,
            }
        }
        Some(current)
    }
}

impl<S: Schema> Default for Document<S> {
    fn default() -> Self {
        Self::empty()
    }
}

fn split_entry_path(path: &Path) -> DocumentResult<(Path, String)> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(id)) => Ok((parent, id.to_string())),
        _ => Err(DocumentError::InvalidPath {
            message: "entry path must not be empty".into(),
        }),
    }
}

/// Inserts collections along `segments`, stopping at the first entry.
fn graft_collection(root: &mut BTreeMap<String, Node>, segments: &[String]) {
    let mut current = root;
    for segment in segments {
        let node = current
            .entry(segment.clone())
            .or_insert_with(|| Node::Collection(BTreeMap::new()));
        match node {
            Node::Collection(children) => current = children,
            Node::Entry(_) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{props, Value};

    fn todos() -> Document {
        Document::empty().with_collection("todos").unwrap()
    }

    #[test]
    fn create_then_read() {
        let mut doc = todos();
        let path = Path::from(["todos", "x1"]);
        doc.create_entry(&path, props([("text", "buy milk")])).unwrap();

        assert_eq!(
            doc.entry(&path).and_then(|p| p.get("text")),
            Some(&Value::from("buy milk"))
        );
        assert!(doc.contains_entry(&path));
        assert!(!doc.is_collection(&path));
    }

    #[test]
    fn create_duplicate_id() {
        let mut doc = todos();
        let path = Path::from(["todos", "x1"]);
        doc.create_entry(&path, props([("text", "a")])).unwrap();

        let err = doc.create_entry(&path, props([("text", "b")])).unwrap_err();
        assert!(err.is_duplicate_id());
        assert_eq!(
            doc.entry(&path).and_then(|p| p.get("text")),
            Some(&Value::from("a"))
        );
    }

    #[test]
    fn create_under_missing_collection() {
        let mut doc = todos();
        let err = doc
            .create_entry(&Path::from(["notes", "n1"]), Props::new())
            .unwrap_err();
        assert!(matches!(err, DocumentError::PathNotFound { .. }));
    }

    #[test]
    fn create_under_entry_is_path_not_found() {
        let mut doc = todos();
        doc.create_entry(&Path::from(["todos", "x1"]), Props::new())
            .unwrap();
        let err = doc
            .create_entry(&Path::from(["todos", "x1", "child"]), Props::new())
            .unwrap_err();
        assert!(matches!(err, DocumentError::PathNotFound { .. }));
    }

    #[test]
    fn update_merges_shallowly() {
        let mut doc = todos();
        let path = Path::from(["todos", "x1"]);
        doc.create_entry(&path, props([("text", Value::from("a")), ("done", Value::Bool(false))]))
            .unwrap();

        doc.update_entry(&path, props([("done", true)])).unwrap();

        let record = doc.entry(&path).unwrap();
        assert_eq!(record.get("text"), Some(&Value::from("a")));
        assert_eq!(record.get("done"), Some(&Value::Bool(true)));
    }

    #[test]
    fn update_and_delete_missing_entry() {
        let mut doc = todos();
        let path = Path::from(["todos", "nope"]);
        assert!(matches!(
            doc.update_entry(&path, Props::new()),
            Err(DocumentError::EntryNotFound { .. })
        ));
        assert!(matches!(
            doc.delete_entry(&path),
            Err(DocumentError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn delete_refuses_collections() {
        let mut doc = todos();
        let err = doc.delete_entry(&Path::from("todos")).unwrap_err();
        assert!(matches!(err, DocumentError::EntryNotFound { .. }));
        assert!(doc.is_collection(&Path::from("todos")));
    }

    #[test]
    fn empty_path_is_invalid() {
        let mut doc = todos();
        let err = doc.create_entry(&Path::root(), Props::new()).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidPath { .. }));
    }

    #[test]
    fn rekey_moves_entry() {
        let mut doc = todos();
        let collection = Path::from("todos");
        doc.create_entry(&collection.child("x1"), props([("text", "a")]))
            .unwrap();

        doc.rekey_entry(&collection, "x1", "y2").unwrap();

        assert!(!doc.contains_entry(&collection.child("x1")));
        assert!(doc.contains_entry(&collection.child("y2")));
    }

    #[test]
    fn rekey_onto_existing_id_fails() {
        let mut doc = todos();
        let collection = Path::from("todos");
        doc.create_entry(&collection.child("x1"), Props::new()).unwrap();
        doc.create_entry(&collection.child("y2"), Props::new()).unwrap();

        assert!(doc.rekey_entry(&collection, "x1", "y2").is_err());
        assert!(doc.contains_entry(&collection.child("x1")));
    }

    #[test]
    fn nested_collections() {
        let mut doc = Document::<Untyped>::empty()
            .with_collection(["boards", "b1", "cards"])
            .unwrap();
        let card = Path::from(["boards", "b1", "cards", "c1"]);
        doc.create_entry(&card, props([("title", "hello")])).unwrap();

        assert!(doc.is_collection(&Path::from(["boards", "b1"])));
        assert_eq!(doc.entries(&Path::from(["boards", "b1", "cards"])).unwrap().count(), 1);
    }

    #[test]
    fn add_collection_through_entry_fails() {
        let mut doc = todos();
        doc.create_entry(&Path::from(["todos", "x1"]), Props::new())
            .unwrap();
        assert!(doc.add_collection(&Path::from(["todos", "x1", "sub"])).is_err());
    }

    #[test]
    fn entries_as_typed() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Todo {
            text: String,
        }

        let mut doc = todos();
        doc.create_entry(&Path::from(["todos", "a"]), props([("text", "one")]))
            .unwrap();
        doc.create_entry(&Path::from(["todos", "b"]), props([("text", "two")]))
            .unwrap();

        let typed: Vec<(EntityId, Todo)> = doc.entries_as(&Path::from("todos")).unwrap();
        assert_eq!(typed.len(), 2);
        assert_eq!(typed[0].0, EntityId::from("a"));
        assert_eq!(typed[1].1.text, "two");
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let mut doc = todos();
        doc.create_entry(
            &Path::from(["todos", "x1"]),
            props([("text", Value::from("buy milk")), ("createdAt", Value::from(1_700_000_000_000i64))]),
        )
        .unwrap();

        let json = serde_json::to_string(&doc).unwrap();
        let copy: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(copy, doc);
    }
}
