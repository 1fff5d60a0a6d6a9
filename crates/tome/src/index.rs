//! Secondary indexes.
//!
//! An index maps the canonical value of its leading field to the sequence
//! numbers of the documents holding it. Only equality lookups on the leading
//! field use it; every candidate is still checked against the full filter, so
//! an index changes lookup cost and never results.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::{
    comparison::canonical_key,
    document::ID_FIELD,
    query::{parse_sort, SortOrder},
    Document,
    Result,
};

/// Name of the index every collection has on `_id`.
pub const ID_INDEX_NAME: &str = "_id_";

/// Description of an index: its name and key fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    /// Index name, derived from the keys (`author_1_published_year_-1`)
    pub name: String,
    /// Key fields with their direction, leading field first
    pub keys: Vec<(String, SortOrder)>,
}

impl IndexSpec {
    /// Parses a key specification such as `{"author": 1, "published_year": -1}`.
    pub fn from_json(keys: &Value) -> Result<Self> {
        let keys = parse_sort(keys)?;
        Ok(Self::from_keys(keys))
    }

    /// Builds a spec from key fields, deriving the conventional name.
    pub fn from_keys(keys: Vec<(String, SortOrder)>) -> Self {
        let name = keys
            .iter()
            .map(|&(ref field, order)| format!("{}_{}", field, order.as_i8()))
            .collect::<Vec<_>>()
            .join("_");
        Self {
            name,
            keys,
        }
    }

    /// The field lookups are keyed on.
    pub fn leading_field(&self) -> &str { self.keys.first().map_or(ID_FIELD, |&(ref f, _)| f.as_str()) }
}

/// An index together with its entries.
#[derive(Debug, Clone)]
pub(crate) struct Index {
    /// What the index covers
    spec:    IndexSpec,
    /// Canonical leading-field value to document sequence numbers
    entries: HashMap<String, BTreeSet<u64>>,
}

impl Index {
    /// Creates an empty index.
    pub(crate) fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            entries: HashMap::new(),
        }
    }

    /// The implicit `_id` index.
    pub(crate) fn id_index() -> Self {
        Self::new(IndexSpec {
            name: ID_INDEX_NAME.to_owned(),
            keys: vec![(ID_FIELD.to_owned(), SortOrder::Ascending)],
        })
    }

    pub(crate) const fn spec(&self) -> &IndexSpec { &self.spec }

    /// Keys a document is filed under: its leading value, plus each element
    /// when that value is an array. Documents without the field are not indexed.
    fn keys_for(&self, doc: &Document) -> Vec<String> {
        let Some(value) = doc.get(self.spec.leading_field())
        else {
            return Vec::new();
        };
        let mut keys = vec![canonical_key(value)];
        if let Value::Array(ref items) = *value {
            keys.extend(items.iter().map(canonical_key));
        }
        keys
    }

    pub(crate) fn insert(&mut self, seq: u64, doc: &Document) {
        for key in self.keys_for(doc) {
            self.entries.entry(key).or_default().insert(seq);
        }
    }

    pub(crate) fn remove(&mut self, seq: u64, doc: &Document) {
        for key in self.keys_for(doc) {
            if let Some(seqs) = self.entries.get_mut(&key) {
                seqs.remove(&seq);
                if seqs.is_empty() {
                    self.entries.remove(&key);
                }
            }
        }
    }

    /// Sequence numbers of documents whose leading field equals `value`, in
    /// insertion order.
    pub(crate) fn lookup(&self, value: &Value) -> Vec<u64> {
        self.entries
            .get(&canonical_key(value))
            .map(|seqs| seqs.iter().copied().collect())
            .unwrap_or_default()
    }
}
