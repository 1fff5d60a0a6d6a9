use serde_json::Value;
use tracing::{debug, trace};

use crate::{Document, Filter, Query, Result};
use super::{coll::Collection, cursor::Cursor};

#[allow(clippy::multiple_inherent_impl, reason = "multiple impl blocks for Collection are intentional for organization")]
impl Collection {
    /// Finds the documents matching a filter.
    ///
    /// The filter is parsed immediately, so a malformed filter fails here with
    /// [`crate::TomeError::InvalidQuery`]; matching happens when the returned
    /// cursor is iterated. Sort, pagination and projection are chained on the
    /// cursor.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::Collection;
    ///
    /// let mut books = Collection::new("books");
    /// books
    ///     .insert_many(vec![
    ///         json!({"title": "Becoming", "published_year": 2018}),
    ///         json!({"title": "1984", "published_year": 1949}),
    ///     ])
    ///     .unwrap();
    ///
    /// let recent = books.find(&json!({"published_year": {"$gt": 2000}})).unwrap();
    /// assert_eq!(recent.to_vec().len(), 1);
    /// assert!(books.find(&json!({"published_year": {"$gt": true}})).is_err());
    /// ```
    pub fn find(&self, filter: &Value) -> Result<Cursor<'_>> {
        trace!("Finding in collection {} with filter {}", self.name, filter);
        let filter = Filter::from_json(filter)?;
        Ok(self.query(Query {
            filter,
            ..Query::default()
        }))
    }

    /// Wraps a prepared [`Query`] (from [`crate::QueryBuilder`]) in a cursor.
    pub const fn query(&self, query: Query) -> Cursor<'_> { Cursor::new(self, query) }

    /// Returns the first document, in insertion order, matching a filter.
    pub fn find_one(&self, filter: &Value) -> Result<Option<Document>> {
        trace!("Finding one in collection {} with filter {}", self.name, filter);
        let filter = Filter::from_json(filter)?;
        let found = self.matching(&filter).next().map(|(_, doc)| doc.clone());
        debug!("find_one matched: {}", found.is_some());
        Ok(found)
    }

    /// Counts the documents matching a filter.
    pub fn count_documents(&self, filter: &Value) -> Result<usize> {
        let filter = Filter::from_json(filter)?;
        let count = self.matching(&filter).count();
        debug!("Counted {} documents in collection {}", count, self.name);
        Ok(count)
    }
}
