use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Result, TomeError};

/// Reserved field holding a document's identifier.
pub const ID_FIELD: &str = "_id";

/// Represents a document in the store.
///
/// A document is an ordered mapping from field names to JSON values. Documents
/// held by a collection always carry a string `_id`; documents produced by a
/// projection or an aggregation may not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Document {
    /// The fields of the document, in insertion order.
    fields: Map<String, Value>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self { Self::default() }

    /// Builds a stored document from caller data, putting `id` first.
    ///
    /// Fails with [`TomeError::InvalidDocument`] if `data` is not a JSON object.
    pub(crate) fn with_id(id: &str, data: Value) -> Result<Self> {
        let data = match data {
            Value::Object(data) => data,
            other => {
                return Err(TomeError::InvalidDocument {
                    reason: format!("expected an object, got {}", type_name(&other)),
                });
            },
        };

        let mut fields = Map::with_capacity(data.len().saturating_add(1));
        fields.insert(ID_FIELD.to_owned(), Value::String(id.to_owned()));
        for (key, value) in data {
            if key == ID_FIELD {
                tracing::warn!("Replacing caller supplied _id {} with {}", value, id);
                continue;
            }
            fields.insert(key, value);
        }
        Ok(Self {
            fields,
        })
    }

    /// Returns the identifier of the document, if it has a string `_id`.
    pub fn id(&self) -> Option<&str> { self.fields.get(ID_FIELD).and_then(Value::as_str) }

    /// Returns the fields of the document.
    pub const fn data(&self) -> &Map<String, Value> { &self.fields }

    /// Returns the number of top-level fields.
    pub fn len(&self) -> usize { self.fields.len() }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// Looks up a field by dotted path (`"size.h"`).
    pub fn get(&self, path: &str) -> Option<&Value> { lookup_path(&self.fields, path) }

    /// Sets a field by dotted path, creating intermediate objects as needed.
    ///
    /// Fails if an intermediate segment exists but is not an object.
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let mut current = &mut self.fields;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                current.insert(segment.to_owned(), value);
                return Ok(());
            }
            let next = current
                .entry(segment.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match *next {
                Value::Object(ref mut inner) => inner,
                Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                    return Err(TomeError::invalid_query(format!(
                        "cannot create field '{}' inside non-object '{}'",
                        path, segment
                    )));
                },
            };
        }
        Ok(())
    }

    /// Removes a field by dotted path, returning its previous value.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => self.fields.shift_remove(path),
            Some((parent, leaf)) => {
                let mut current = &mut self.fields;
                for segment in parent.split('.') {
                    current = current.get_mut(segment)?.as_object_mut()?;
                }
                current.shift_remove(leaf)
            },
        }
    }

    /// Consumes the document, returning it as a JSON object.
    pub fn into_value(self) -> Value { Value::Object(self.fields) }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self {
            fields,
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self { doc.into_value() }
}

/// Looks up a dotted path inside a JSON object.
pub(crate) fn lookup_path<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Human readable name of a JSON value's type, used in error messages.
pub(crate) const fn type_name(value: &Value) -> &'static str {
    match *value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
