//! Schema markers for typed documents.

use crate::path::Path;
use std::fmt;

/// Describes the shape of a document.
///
/// A schema is a zero-sized marker type. It tags [`Document`](crate::Document)
/// and the snapshots built from it, so a replica of one schema cannot be fed a
/// snapshot of another. The collections it lists exist in every empty
/// document of that schema.
///
/// # Example
///
/// ```
/// use flushout_document::{Document, Path, Schema};
///
/// #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// struct Notes;
///
/// impl Schema for Notes {
///     fn collections() -> Vec<Path> {
///         vec![Path::from("notes")]
///     }
/// }
///
/// let doc = Document::<Notes>::empty();
/// assert!(doc.is_collection(&Path::from("notes")));
/// ```
pub trait Schema: Clone + Copy + Default + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Collections present in an empty document.
    fn collections() -> Vec<Path>;
}

/// Schema-less documents.
///
/// An empty untyped document is a bare root collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Untyped;

impl Schema for Untyped {
    fn collections() -> Vec<Path> {
        Vec::new()
    }
}
