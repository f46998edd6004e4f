//! # Flushout Document
//!
//! Generic keyed-tree document model shared by Flushout replicas.
//!
//! This crate provides:
//! - `Document<S>`: a tree of collections and entries, tagged by schema
//! - `Value` / `Props`: field values and property sets
//! - `Path`: addresses into the tree
//! - `EntityId`: randomly generated entry ids
//!
//! ## Mutation contract
//!
//! - `create_entry` fails with `DuplicateId` if the id is taken
//! - `update_entry` shallow-merges into an existing entry
//! - `delete_entry` removes an existing entry
//! - Every call is all-or-nothing
//!
//! ```
//! use flushout_document::{props, Document, Path};
//!
//! let mut doc = Document::empty().with_collection("todos").unwrap();
//! let path = Path::from(["todos", "x1"]);
//! doc.create_entry(&path, props([("text", "buy milk")])).unwrap();
//! assert!(doc.contains_entry(&path));
//! # let _: &flushout_document::Document = &doc;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod document;
mod error;
mod id;
mod path;
mod schema;
mod value;

pub use document::{Document, Node};
pub use error::{DocumentError, DocumentResult};
pub use id::EntityId;
pub use path::Path;
pub use schema::{Schema, Untyped};
pub use value::{from_props, props, to_props, Props, Value};
