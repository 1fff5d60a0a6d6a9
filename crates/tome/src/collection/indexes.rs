use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    filtering::matches_filter,
    index::{Index, IndexSpec, ID_INDEX_NAME},
    Document,
    Filter,
    Result,
    TomeError,
};
use super::coll::Collection;

/// Documents a lookup has to examine, with their sequence numbers.
pub(crate) type Candidates<'a> = Box<dyn Iterator<Item = (u64, &'a Document)> + 'a>;

/// How a filter is resolved against a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage")]
pub enum Plan {
    /// Every document is examined
    #[serde(rename = "COLLSCAN")]
    CollectionScan,
    /// Only documents filed under the filter's equality value are examined
    #[serde(rename = "IXSCAN")]
    IndexLookup {
        /// Name of the index used
        index: String,
    },
}

/// Execution statistics of a filter, as reported by [`Collection::explain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explain {
    /// Collection the filter ran against
    pub collection:            String,
    /// Chosen plan
    pub plan:                  Plan,
    /// Number of documents the plan examined
    pub docs_examined:         usize,
    /// Number of documents matching the filter
    pub n_returned:            usize,
    /// Wall-clock time of the execution
    pub execution_time_micros: u64,
}

#[allow(clippy::multiple_inherent_impl, reason = "multiple impl blocks for Collection are intentional for organization")]
impl Collection {
    /// Creates an index on one or more fields and returns its name.
    ///
    /// The key specification uses the sort notation: `{"title": 1}` or
    /// `{"author": 1, "published_year": -1}`. Creating an index that already
    /// exists is a no-op. Indexes never change query results; equality
    /// filters on an index's leading field examine fewer documents.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::Collection;
    ///
    /// let mut books = Collection::new("books");
    /// let name = books.create_index(&json!({"author": 1, "published_year": -1})).unwrap();
    /// assert_eq!(name, "author_1_published_year_-1");
    /// assert_eq!(books.list_indexes().len(), 2);
    /// ```
    pub fn create_index(&mut self, keys: &Value) -> Result<String> {
        let spec = IndexSpec::from_json(keys)?;
        trace!("Creating index {} on collection {}", spec.name, self.name);

        if self.indexes.iter().any(|index| index.spec().name == spec.name) {
            debug!("Index {} already exists on collection {}", spec.name, self.name);
            return Ok(spec.name);
        }

        let name = spec.name.clone();
        let mut index = Index::new(spec);
        for (&seq, doc) in &self.documents {
            index.insert(seq, doc);
        }
        self.indexes.push(index);
        debug!("Index {} created over {} documents", name, self.documents.len());
        Ok(name)
    }

    /// Lists the indexes of the collection, `_id_` first.
    pub fn list_indexes(&self) -> Vec<IndexSpec> { self.indexes.iter().map(|index| index.spec().clone()).collect() }

    /// Drops the index with the given name.
    ///
    /// The `_id_` index cannot be dropped.
    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        trace!("Dropping index {} on collection {}", name, self.name);
        if name == ID_INDEX_NAME {
            return Err(TomeError::invalid_query("cannot drop the _id_ index"));
        }
        let Some(position) = self.indexes.iter().position(|index| index.spec().name == name)
        else {
            return Err(TomeError::IndexNotFound {
                name: name.to_owned(),
            });
        };
        self.indexes.remove(position);
        debug!("Index {} dropped", name);
        Ok(())
    }

    /// Reports the plan and execution statistics for a filter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::{Collection, Plan};
    ///
    /// let mut books = Collection::new("books");
    /// books.insert_many(vec![json!({"title": "1984"}), json!({"title": "Becoming"})]).unwrap();
    ///
    /// let scan = books.explain(&json!({"title": "1984"})).unwrap();
    /// assert_eq!(scan.plan, Plan::CollectionScan);
    /// assert_eq!(scan.docs_examined, 2);
    ///
    /// books.create_index(&json!({"title": 1})).unwrap();
    /// let lookup = books.explain(&json!({"title": "1984"})).unwrap();
    /// assert_eq!(lookup.docs_examined, 1);
    /// assert_eq!(lookup.n_returned, 1);
    /// ```
    pub fn explain(&self, filter: &Value) -> Result<Explain> {
        let filter = Filter::from_json(filter)?;
        let started = Instant::now();

        let (plan, candidates) = self.candidates(&filter);
        let mut docs_examined = 0usize;
        let mut n_returned = 0usize;
        for (_, doc) in candidates {
            docs_examined = docs_examined.saturating_add(1);
            if matches_filter(doc, &filter) {
                n_returned = n_returned.saturating_add(1);
            }
        }

        let explain = Explain {
            collection: self.name.clone(),
            plan,
            docs_examined,
            n_returned,
            execution_time_micros: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        };
        debug!("Explain for collection {}: {:?}", self.name, explain);
        Ok(explain)
    }

    /// Picks the first index whose leading field carries an equality value in
    /// the filter.
    fn choose_index<'f>(&self, filter: &'f Filter) -> Option<(&Index, &'f Value)> {
        self.indexes
            .iter()
            .find_map(|index| filter.equality_on(index.spec().leading_field()).map(|value| (index, value)))
    }

    /// Returns the plan for a filter and the documents it examines, in
    /// insertion order. Candidates still have to be checked against the filter.
    pub(crate) fn candidates<'a>(&'a self, filter: &Filter) -> (Plan, Candidates<'a>) {
        match self.choose_index(filter) {
            Some((index, value)) => {
                let plan = Plan::IndexLookup {
                    index: index.spec().name.clone(),
                };
                let seqs = index.lookup(value);
                trace!("Index {} yields {} candidates", index.spec().name, seqs.len());
                let docs = seqs
                    .into_iter()
                    .filter_map(move |seq| self.documents.get(&seq).map(|doc| (seq, doc)));
                (plan, Box::new(docs))
            },
            None => {
                let docs = self.documents.iter().map(|(&seq, doc)| (seq, doc));
                (Plan::CollectionScan, Box::new(docs))
            },
        }
    }

    /// Documents matching a filter, in insertion order.
    pub(crate) fn matching<'a>(&'a self, filter: &'a Filter) -> Candidates<'a> {
        let (_, candidates) = self.candidates(filter);
        Box::new(candidates.filter(move |&(_, doc)| matches_filter(doc, filter)))
    }
}
