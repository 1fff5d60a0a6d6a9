//! Document projection utilities.

use serde_json::{Map, Value};

use crate::{
    document::{lookup_path, type_name, ID_FIELD},
    Document,
    Result,
    TomeError,
};

/// Which fields a query returns.
///
/// `_id` is returned unless explicitly excluded, in both modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Only the listed fields (plus `_id`)
    Include {
        /// Field paths to keep
        fields:     Vec<String>,
        /// Whether `_id` is kept
        include_id: bool,
    },
    /// Everything except the listed fields
    Exclude {
        /// Field paths to drop; contains `_id` when it is excluded
        fields: Vec<String>,
    },
}

impl Projection {
    /// Parses a projection such as `{"title": 1, "price": 1, "_id": 0}`.
    ///
    /// Inclusion and exclusion cannot be mixed, except for excluding `_id`.
    pub fn from_json(spec: &Value) -> Result<Self> {
        let Some(entries) = spec.as_object()
        else {
            return Err(TomeError::invalid_query(format!(
                "projection must be an object, got {}",
                type_name(spec)
            )));
        };

        let mut included = Vec::new();
        let mut excluded = Vec::new();
        let mut include_id = true;
        for (field, flag) in entries {
            let keep = match *flag {
                Value::Bool(b) => b,
                Value::Number(ref n) if n.as_f64() == Some(1.0) => true,
                Value::Number(ref n) if n.as_f64() == Some(0.0) => false,
                Value::Null | Value::Number(_) | Value::String(_) | Value::Array(_) | Value::Object(_) => {
                    return Err(TomeError::invalid_query(format!(
                        "projection value for '{}' must be 0 or 1, got {}",
                        field, flag
                    )));
                },
            };
            if field == ID_FIELD {
                include_id = keep;
            }
            else if keep {
                included.push(field.clone());
            }
            else {
                excluded.push(field.clone());
            }
        }

        if !included.is_empty() && !excluded.is_empty() {
            return Err(TomeError::invalid_query(
                "projection cannot mix inclusion and exclusion",
            ));
        }

        for fields in [&included, &excluded] {
            if let Some((outer, inner)) = path_collision(fields) {
                return Err(TomeError::invalid_query(format!(
                    "projection paths '{}' and '{}' collide",
                    outer, inner
                )));
            }
        }

        // `{}` keeps everything, while `{_id: 1}` keeps only `_id`
        if included.is_empty() && (entries.is_empty() || !excluded.is_empty() || !include_id) {
            if !include_id {
                excluded.push(ID_FIELD.to_owned());
            }
            return Ok(Self::Exclude {
                fields: excluded,
            });
        }

        Ok(Self::Include {
            fields: included,
            include_id,
        })
    }

    /// Projects a document, returning a new document.
    pub fn apply(&self, doc: &Document) -> Document {
        match *self {
            Self::Include {
                ref fields,
                include_id,
            } => {
                let mut projected = Map::new();
                if include_id {
                    if let Some(id) = doc.data().get(ID_FIELD) {
                        projected.insert(ID_FIELD.to_owned(), id.clone());
                    }
                }
                let mut out = Document::from(projected);
                for field in fields {
                    if let Some(value) = lookup_path(doc.data(), field) {
                        // Paths never nest inside one another, so every set lands in an object.
                        let _ = out.set(field, value.clone());
                    }
                }
                out
            },
            Self::Exclude {
                ref fields,
            } => {
                let mut out = doc.clone();
                for field in fields {
                    out.remove(field);
                }
                out
            },
        }
    }
}

/// Finds two paths where one is the other or lies inside it, like `a` and `a.b`.
fn path_collision(fields: &[String]) -> Option<(&str, &str)> {
    fields.iter().find_map(|outer| {
        fields
            .iter()
            .find(|inner| {
                inner
                    .strip_prefix(outer.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
            .map(|inner| (outer.as_str(), inner.as_str()))
    })
}

/// Projects a document to include only specified fields.
pub fn project_document(doc: &Document, projection: Option<&Projection>) -> Document {
    projection.map_or_else(|| doc.clone(), |p| p.apply(doc))
}
