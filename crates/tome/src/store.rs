use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::{Collection, Result, TomeError};

/// A named set of collections held in memory.
///
/// ```rust
/// use serde_json::json;
/// use tome::{Store, TomeError};
///
/// let mut store = Store::new();
/// store.collection_mut("books").unwrap().insert_one(json!({"title": "1984"})).unwrap();
///
/// assert_eq!(store.collection("books").unwrap().len(), 1);
/// assert!(matches!(store.collection("films"), Err(TomeError::CollectionNotFound { .. })));
/// assert_eq!(store.collection_names(), vec!["books"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Store {
    collections: BTreeMap<String, Collection>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self { Self::default() }

    /// Returns an existing collection.
    pub fn collection(&self, name: &str) -> Result<&Collection> {
        trace!("Accessing collection: {}", name);
        self.collections.get(name).ok_or_else(|| {
            TomeError::CollectionNotFound {
                name: name.to_owned(),
            }
        })
    }

    /// Returns a collection for writing, creating it on first use.
    pub fn collection_mut(&mut self, name: &str) -> Result<&mut Collection> {
        trace!("Accessing collection for writing: {}", name);
        validate_collection_name(name)?;
        Ok(self.collections.entry(name.to_owned()).or_insert_with(|| {
            debug!("Creating collection {}", name);
            Collection::new(name)
        }))
    }

    /// Drops a collection, returning whether it existed.
    pub fn drop_collection(&mut self, name: &str) -> bool {
        trace!("Dropping collection: {}", name);
        let existed = self.collections.remove(name).is_some();
        debug!("Collection {} dropped: {}", name, existed);
        existed
    }

    /// Names of all collections, sorted.
    pub fn collection_names(&self) -> Vec<&str> { self.collections.keys().map(String::as_str).collect() }
}

/// Checks that a collection name is usable.
///
/// - Must not be empty
/// - Must not contain `$` or control characters
/// - Must not start or end with a dot
/// - Must not start with the reserved `system.` prefix
pub fn validate_collection_name(name: &str) -> Result<()> {
    debug!("Validating collection name: {}", name);
    let valid = !name.is_empty() &&
        !name.starts_with('.') &&
        !name.ends_with('.') &&
        !name.starts_with("system.") &&
        !name.chars().any(|ch| ch == '$' || ch.is_control());
    if valid {
        Ok(())
    }
    else {
        debug!("Collection name {:?} rejected", name);
        Err(TomeError::InvalidCollectionName {
            name: name.to_owned(),
        })
    }
}
