use std::collections::BTreeMap;

use crate::{index::Index, Document};

/// A collection is a named, ordered sequence of documents held in memory.
///
/// Documents are kept in insertion order under an internal sequence number;
/// iteration, `update_one` and `delete_one` all follow that order. Every
/// collection carries the implicit `_id_` index, and further indexes can be
/// added with [`Collection::create_index`].
///
/// Reads borrow the collection shared and mutations borrow it exclusively, so
/// a [`crate::Cursor`] can never observe a half-applied update.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tome::Collection;
///
/// let mut books = Collection::new("books");
/// books
///     .insert_many(vec![
///         json!({"title": "The Hobbit", "genre": "Fantasy", "price": 10.99}),
///         json!({"title": "1984", "genre": "Dystopian", "price": 9.99}),
///     ])
///     .unwrap();
///
/// let fantasy = books.find(&json!({"genre": "Fantasy"})).unwrap().to_vec();
/// assert_eq!(fantasy.len(), 1);
/// assert_eq!(fantasy[0].get("title"), Some(&json!("The Hobbit")));
/// ```
#[derive(Debug, Clone)]
#[allow(
    clippy::field_scoped_visibility_modifiers,
    reason = "fields need to be pub(crate) for internal access"
)]
pub struct Collection {
    /// The collection name.
    pub(crate) name:      String,
    /// Documents keyed by insertion sequence number.
    pub(crate) documents: BTreeMap<u64, Document>,
    /// Sequence number handed to the next inserted document.
    pub(crate) next_seq:  u64,
    /// Indexes, the `_id_` index first.
    pub(crate) indexes:   Vec<Index>,
}

impl Collection {
    /// Creates an empty collection with only the `_id_` index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:      name.into(),
            documents: BTreeMap::new(),
            next_seq:  0,
            indexes:   vec![Index::id_index()],
        }
    }

    /// Returns the name of the collection.
    pub fn name(&self) -> &str { &self.name }

    /// Returns the number of documents in the collection.
    pub fn len(&self) -> usize { self.documents.len() }

    /// Returns `true` if the collection holds no documents.
    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    /// Iterates over every document in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> { self.documents.values() }

    /// Appends a document under the next sequence number and files it in
    /// every index.
    pub(crate) fn commit(&mut self, doc: Document) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        for index in &mut self.indexes {
            index.insert(seq, &doc);
        }
        self.documents.insert(seq, doc);
    }

    /// Replaces the document stored under `seq`, keeping indexes current.
    pub(crate) fn replace(&mut self, seq: u64, doc: Document) {
        if let Some(old) = self.documents.get(&seq) {
            for index in &mut self.indexes {
                index.remove(seq, old);
                index.insert(seq, &doc);
            }
        }
        self.documents.insert(seq, doc);
    }

    /// Removes the document stored under `seq` from storage and indexes.
    pub(crate) fn remove(&mut self, seq: u64) -> Option<Document> {
        let doc = self.documents.remove(&seq)?;
        for index in &mut self.indexes {
            index.remove(seq, &doc);
        }
        Some(doc)
    }
}
