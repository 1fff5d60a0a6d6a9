use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{Document, Filter, Result, Update};
use super::coll::Collection;

/// Outcome of `update_one` / `update_many`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// Documents matching the filter
    pub matched_count:  usize,
    /// Documents whose content actually changed
    pub modified_count: usize,
}

/// Outcome of `delete_one` / `delete_many`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Documents removed
    pub deleted_count: usize,
}

#[allow(clippy::multiple_inherent_impl, reason = "multiple impl blocks for Collection are intentional for organization")]
impl Collection {
    /// Inserts one document and returns its assigned `_id`.
    ///
    /// The value must be a JSON object. A caller-supplied `_id` is replaced by
    /// the freshly generated one.
    pub fn insert_one(&mut self, data: Value) -> Result<String> {
        trace!("Inserting one document into collection {}", self.name);
        let doc = Document::with_id(&cuid2::create_id(), data)?;
        let id = doc.id().unwrap_or_default().to_owned();
        self.commit(doc);
        debug!("Inserted document {} into collection {}", id, self.name);
        Ok(id)
    }

    /// Inserts documents in order and returns their assigned ids in the same
    /// order.
    ///
    /// Every value is checked before any is stored: if one is not an object,
    /// the call fails with [`crate::TomeError::InvalidDocument`] and the
    /// collection is unchanged.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::{Collection, TomeError};
    ///
    /// let mut books = Collection::new("books");
    /// let ids = books.insert_many(vec![json!({"title": "1984"}), json!({"title": "Becoming"})]).unwrap();
    /// assert_eq!(ids.len(), 2);
    ///
    /// let err = books.insert_many(vec![json!({"title": "Ok"}), json!("not a document")]).unwrap_err();
    /// assert!(matches!(err, TomeError::InvalidDocument { .. }));
    /// assert_eq!(books.len(), 2);
    /// ```
    pub fn insert_many<I>(&mut self, docs: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = Value>,
    {
        trace!("Inserting documents into collection {}", self.name);
        let docs = docs
            .into_iter()
            .map(|data| Document::with_id(&cuid2::create_id(), data))
            .collect::<Result<Vec<_>>>()?;

        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            ids.push(doc.id().unwrap_or_default().to_owned());
            self.commit(doc);
        }
        debug!("Inserted {} documents into collection {}", ids.len(), self.name);
        Ok(ids)
    }

    /// Applies an update to the first document, in insertion order, matching
    /// the filter.
    ///
    /// No match is not an error: the result reports `matched_count == 0`.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::Collection;
    ///
    /// let mut books = Collection::new("books");
    /// books.insert_one(json!({"title": "1984", "price": 9.99})).unwrap();
    ///
    /// let result = books.update_one(&json!({"title": "1984"}), &json!({"$set": {"price": 11.5}})).unwrap();
    /// assert_eq!(result.modified_count, 1);
    ///
    /// let missing = books.update_one(&json!({"title": "Dune"}), &json!({"$set": {"price": 1}})).unwrap();
    /// assert_eq!(missing.matched_count, 0);
    /// ```
    pub fn update_one(&mut self, filter: &Value, changes: &Value) -> Result<UpdateResult> {
        trace!("Updating one in collection {} with filter {}", self.name, filter);
        let filter = Filter::from_json(filter)?;
        let update = Update::from_json(changes)?;
        let target = self.matching(&filter).next().map(|(seq, _)| seq);
        self.apply_update(target.into_iter().collect(), &update)
    }

    /// Applies an update to every document matching the filter.
    ///
    /// Either every matched document is updated or, if the update fails on one
    /// of them, none is.
    pub fn update_many(&mut self, filter: &Value, changes: &Value) -> Result<UpdateResult> {
        trace!("Updating many in collection {} with filter {}", self.name, filter);
        let filter = Filter::from_json(filter)?;
        let update = Update::from_json(changes)?;
        let targets = self.matching(&filter).map(|(seq, _)| seq).collect();
        self.apply_update(targets, &update)
    }

    /// Runs an update on copies of the target documents, then stores the
    /// modified ones.
    fn apply_update(&mut self, targets: Vec<u64>, update: &Update) -> Result<UpdateResult> {
        let mut changed = Vec::new();
        for &seq in &targets {
            let Some(current) = self.documents.get(&seq)
            else {
                continue;
            };
            let mut next = current.clone();
            if update.apply(&mut next)? {
                changed.push((seq, next));
            }
        }

        let result = UpdateResult {
            matched_count:  targets.len(),
            modified_count: changed.len(),
        };
        for (seq, doc) in changed {
            self.replace(seq, doc);
        }
        debug!("Update on collection {}: {:?}", self.name, result);
        Ok(result)
    }

    /// Removes the first document, in insertion order, matching the filter.
    pub fn delete_one(&mut self, filter: &Value) -> Result<DeleteResult> {
        trace!("Deleting one in collection {} with filter {}", self.name, filter);
        let filter = Filter::from_json(filter)?;
        let target = self.matching(&filter).next().map(|(seq, _)| seq);
        Ok(self.delete_seqs(target.into_iter().collect()))
    }

    /// Removes every document matching the filter.
    pub fn delete_many(&mut self, filter: &Value) -> Result<DeleteResult> {
        trace!("Deleting many in collection {} with filter {}", self.name, filter);
        let filter = Filter::from_json(filter)?;
        let targets = self.matching(&filter).map(|(seq, _)| seq).collect();
        Ok(self.delete_seqs(targets))
    }

    fn delete_seqs(&mut self, targets: Vec<u64>) -> DeleteResult {
        let deleted_count = targets.into_iter().filter(|&seq| self.remove(seq).is_some()).count();
        debug!("Deleted {} documents from collection {}", deleted_count, self.name);
        DeleteResult {
            deleted_count,
        }
    }
}
