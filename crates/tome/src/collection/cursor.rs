use serde_json::Value;
use tracing::trace;

use crate::{
    projection::project_document,
    query::{parse_sort, sort_documents},
    Document,
    Projection,
    Query,
    Result,
    SortOrder,
};
use super::coll::Collection;

/// A lazily evaluated query over a collection.
///
/// Building a cursor does no work; each call to [`Cursor::iter`] re-scans the
/// collection, so a cursor can be iterated any number of times. Results are
/// filtered, then sorted, then skipped and limited, and projected last.
///
/// ```rust
/// use serde_json::json;
/// use tome::Collection;
///
/// let mut books = Collection::new("books");
/// books
///     .insert_many(vec![
///         json!({"title": "A", "price": 3}),
///         json!({"title": "B", "price": 1}),
///         json!({"title": "C", "price": 2}),
///     ])
///     .unwrap();
///
/// let cursor = books
///     .find(&json!({}))
///     .unwrap()
///     .sort(&json!({"price": 1}))
///     .unwrap()
///     .limit(2)
///     .projection(&json!({"title": 1, "_id": 0}))
///     .unwrap();
/// let titles: Vec<_> = cursor.iter().map(|doc| doc.into_value()).collect();
/// assert_eq!(titles, vec![json!({"title": "B"}), json!({"title": "C"})]);
/// ```
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    collection: &'a Collection,
    query:      Query,
}

impl<'a> Cursor<'a> {
    pub(crate) const fn new(collection: &'a Collection, query: Query) -> Self {
        Self {
            collection,
            query,
        }
    }

    /// Replaces the sort keys with a specification such as `{"price": -1}`.
    pub fn sort(mut self, spec: &Value) -> Result<Self> {
        self.query.sort = parse_sort(spec)?;
        Ok(self)
    }

    /// Appends one sort key.
    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.query.sort.push((field.to_owned(), order));
        self
    }

    /// Skips the first `n` results.
    pub const fn skip(mut self, n: usize) -> Self {
        self.query.skip = Some(n);
        self
    }

    /// Returns at most `n` results; `0` means no limit.
    pub const fn limit(mut self, n: usize) -> Self {
        self.query.limit = if n == 0 { None } else { Some(n) };
        self
    }

    /// Sets the projection, e.g. `{"title": 1, "price": 1}`.
    pub fn projection(mut self, spec: &Value) -> Result<Self> {
        self.query.projection = Some(Projection::from_json(spec)?);
        Ok(self)
    }

    /// The query this cursor runs.
    pub const fn query(&self) -> &Query { &self.query }

    /// Runs the query, yielding owned (projected) documents.
    pub fn iter(&self) -> Box<dyn Iterator<Item = Document> + '_> {
        trace!("Iterating cursor over {}: {:?}", self.collection.name(), self.query);
        let matching = self.collection.matching(&self.query.filter).map(|(_, doc)| doc);

        let ordered: Box<dyn Iterator<Item = &Document> + '_> = if self.query.sort.is_empty() {
            Box::new(matching)
        }
        else {
            let mut docs: Vec<&Document> = matching.collect();
            sort_documents(&mut docs, &self.query.sort);
            Box::new(docs.into_iter())
        };

        let paged = ordered.skip(self.query.skip.unwrap_or(0));
        let limited: Box<dyn Iterator<Item = &Document> + '_> = match self.query.limit {
            Some(n) => Box::new(paged.take(n)),
            None => Box::new(paged),
        };

        let projection = self.query.projection.as_ref();
        Box::new(limited.map(move |doc| project_document(doc, projection)))
    }

    /// Collects every result.
    pub fn to_vec(&self) -> Vec<Document> { self.iter().collect() }
}

impl<'c> IntoIterator for &'c Cursor<'_> {
    type IntoIter = Box<dyn Iterator<Item = Document> + 'c>;
    type Item = Document;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}
