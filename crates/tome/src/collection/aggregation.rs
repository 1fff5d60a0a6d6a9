use serde_json::Value;
use tracing::{debug, trace};

use crate::{Document, Pipeline, Result};
use super::coll::Collection;

#[allow(clippy::multiple_inherent_impl, reason = "multiple impl blocks for Collection are intentional for organization")]
impl Collection {
    /// Runs an aggregation pipeline over the collection.
    ///
    /// Supported stages:
    /// - `$match`: filter documents, same language as [`Collection::find`]
    /// - `$group`: partition by an `_id` expression with `$sum`, `$avg`, `$min`, `$max`, `$first`, `$last`, `$push`
    /// - `$addFields` / `$set`: add computed fields
    /// - `$project`: include or exclude fields
    /// - `$sort`, `$skip`, `$limit`
    /// - `$count`: a single document with the number of inputs
    ///
    /// The whole pipeline is parsed before any document is read, so a
    /// malformed stage fails with [`crate::TomeError::InvalidQuery`] up front.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::Collection;
    ///
    /// let mut books = Collection::new("books");
    /// books
    ///     .insert_many(vec![
    ///         json!({"genre": "Fantasy", "price": 10.0}),
    ///         json!({"genre": "Fantasy", "price": 14.0}),
    ///         json!({"genre": "Classic", "price": 8.0}),
    ///     ])
    ///     .unwrap();
    ///
    /// let by_genre = books
    ///     .aggregate(&json!([
    ///         {"$group": {"_id": "$genre", "avgPrice": {"$avg": "$price"}, "count": {"$sum": 1}}},
    ///         {"$sort": {"avgPrice": -1}}
    ///     ]))
    ///     .unwrap();
    /// assert_eq!(by_genre[0].clone().into_value(), json!({"_id": "Fantasy", "avgPrice": 12.0, "count": 2}));
    /// ```
    pub fn aggregate(&self, pipeline: &Value) -> Result<Vec<Document>> {
        trace!("Aggregating collection {} with pipeline {}", self.name, pipeline);
        let pipeline = Pipeline::from_json(pipeline)?;
        let results = self.aggregate_pipeline(&pipeline)?;
        debug!("Aggregation on collection {} produced {} documents", self.name, results.len());
        Ok(results)
    }

    /// Runs an already parsed pipeline over the collection.
    pub fn aggregate_pipeline(&self, pipeline: &Pipeline) -> Result<Vec<Document>> {
        pipeline.execute(self.documents.values().cloned())
    }
}
