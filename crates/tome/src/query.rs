use std::{borrow::Borrow, cmp::Ordering};

use serde_json::{Map, Value};

use crate::{comparison::compare_values, document::type_name, projection::Projection, Document, Result, TomeError};

/// Represents a query for filtering documents in a collection.
///
/// A query consists of a filter, sort keys, skip/limit pagination and an
/// optional field projection. Sorting happens before pagination, projection last.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Filter every returned document satisfies
    pub filter:     Filter,
    /// Sort keys, most significant first
    pub sort:       Vec<(String, SortOrder)>,
    /// Number of results to skip
    pub skip:       Option<usize>,
    /// Maximum number of results
    pub limit:      Option<usize>,
    /// Fields to include or exclude in results
    pub projection: Option<Projection>,
}

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SortOrder {
    /// Ascending order
    Ascending,
    /// Descending order
    Descending,
}

impl SortOrder {
    /// Parses the `1` / `-1` notation used by sort and index specifications.
    fn from_json(field: &str, value: &Value) -> Result<Self> {
        match value.as_f64() {
            Some(n) if n == 1.0 => Ok(Self::Ascending),
            Some(n) if n == -1.0 => Ok(Self::Descending),
            _ => {
                Err(TomeError::invalid_query(format!(
                    "sort direction for '{}' must be 1 or -1, got {}",
                    field, value
                )))
            },
        }
    }

    /// The `1` / `-1` notation of this order.
    pub const fn as_i8(self) -> i8 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// Parses a sort specification such as `{"price": -1, "title": 1}`.
pub fn parse_sort(spec: &Value) -> Result<Vec<(String, SortOrder)>> {
    let Some(fields) = spec.as_object()
    else {
        return Err(TomeError::invalid_query(format!(
            "sort specification must be an object, got {}",
            type_name(spec)
        )));
    };
    if fields.is_empty() {
        return Err(TomeError::invalid_query("sort specification is empty"));
    }
    fields
        .iter()
        .map(|(field, dir)| Ok((field.clone(), SortOrder::from_json(field, dir)?)))
        .collect()
}

/// Sorts documents in place by the given keys.
///
/// The sort is stable, so documents comparing equal on every key keep their
/// relative order. Missing fields sort before present ones.
pub fn sort_documents<D: Borrow<Document>>(docs: &mut [D], keys: &[(String, SortOrder)]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        let (a, b): (&Document, &Document) = (a.borrow(), b.borrow());
        keys.iter()
            .map(|&(ref field, order)| {
                let ord = compare_values(a.get(field), b.get(field));
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// A filter condition for querying documents.
///
/// Comparison operands are restricted to numbers and strings when parsed; at
/// match time a field of a different type than the operand does not match.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Equality filter: field == value (or an array field contains value)
    Equals(String, Value),
    /// Inequality filter: field != value, also true when the field is missing
    NotEquals(String, Value),
    /// Greater than filter: field > value
    GreaterThan(String, Value),
    /// Less than filter: field < value
    LessThan(String, Value),
    /// Greater or equal filter: field >= value
    GreaterOrEqual(String, Value),
    /// Less or equal filter: field <= value
    LessOrEqual(String, Value),
    /// In filter: field value is in the provided list
    In(String, Vec<Value>),
    /// Not-in filter: field value is not in the provided list
    NotIn(String, Vec<Value>),
    /// Exists filter: field exists (or doesn't exist if false)
    Exists(String, bool),
    /// Every sub-filter matches; the empty conjunction matches everything
    And(Vec<Self>),
    /// At least one sub-filter matches
    Or(Vec<Self>),
    /// No sub-filter matches
    Nor(Vec<Self>),
}

impl Default for Filter {
    fn default() -> Self { Self::And(Vec::new()) }
}

impl Filter {
    /// A filter matching every document.
    pub const fn all() -> Self { Self::And(Vec::new()) }

    /// Parses a Mongo-style filter document.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::Filter;
    ///
    /// let filter = Filter::from_json(&json!({"in_stock": true, "published_year": {"$gt": 2010}})).unwrap();
    /// assert!(matches!(filter, Filter::And(ref clauses) if clauses.len() == 2));
    /// assert!(Filter::from_json(&json!({"price": {"$gt": true}})).is_err());
    /// ```
    pub fn from_json(value: &Value) -> Result<Self> {
        let Some(fields) = value.as_object()
        else {
            return Err(TomeError::invalid_query(format!(
                "filter must be an object, got {}",
                type_name(value)
            )));
        };

        let mut clauses = Vec::with_capacity(fields.len());
        for (key, operand) in fields {
            match key.as_str() {
                "$and" => clauses.push(Self::And(parse_clause_list(key, operand)?)),
                "$or" => clauses.push(Self::Or(parse_clause_list(key, operand)?)),
                "$nor" => clauses.push(Self::Nor(parse_clause_list(key, operand)?)),
                op if op.starts_with('$') => {
                    return Err(TomeError::invalid_query(format!("unknown top-level operator '{}'", op)));
                },
                field => parse_field_clause(field, operand, &mut clauses)?,
            }
        }

        if clauses.len() == 1 {
            if let Some(only) = clauses.pop() {
                return Ok(only);
            }
        }
        Ok(Self::And(clauses))
    }

    /// Returns the scalar operand of an equality predicate on `field` that every
    /// match must satisfy, if the filter has one.
    ///
    /// Only conjunctive positions are considered, so a lookup on the returned
    /// value is guaranteed to find every matching document.
    pub fn equality_on(&self, field: &str) -> Option<&Value> {
        match *self {
            Self::Equals(ref f, ref value) if f == field => {
                match *value {
                    Value::Bool(_) | Value::Number(_) | Value::String(_) => Some(value),
                    Value::Null | Value::Array(_) | Value::Object(_) => None,
                }
            },
            Self::And(ref clauses) => clauses.iter().find_map(|c| c.equality_on(field)),
            Self::Equals(..) |
            Self::NotEquals(..) |
            Self::GreaterThan(..) |
            Self::LessThan(..) |
            Self::GreaterOrEqual(..) |
            Self::LessOrEqual(..) |
            Self::In(..) |
            Self::NotIn(..) |
            Self::Exists(..) |
            Self::Or(_) |
            Self::Nor(_) => None,
        }
    }
}

/// Parses the operand of `$and` / `$or` / `$nor`.
fn parse_clause_list(op: &str, operand: &Value) -> Result<Vec<Filter>> {
    match *operand {
        Value::Array(ref items) if !items.is_empty() => items.iter().map(Filter::from_json).collect(),
        _ => Err(TomeError::invalid_query(format!("{} expects a non-empty array of filters", op))),
    }
}

/// Parses `field: operand`, which is either an equality or an operator object.
fn parse_field_clause(field: &str, operand: &Value, clauses: &mut Vec<Filter>) -> Result<()> {
    let operators = match *operand {
        Value::Object(ref ops) if ops.keys().any(|k| k.starts_with('$')) => ops,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) | Value::Object(_) => {
            clauses.push(Filter::Equals(field.to_owned(), operand.clone()));
            return Ok(());
        },
    };

    for (op, value) in operators {
        let filter = match op.as_str() {
            "$eq" => Filter::Equals(field.to_owned(), value.clone()),
            "$ne" => Filter::NotEquals(field.to_owned(), value.clone()),
            "$gt" => Filter::GreaterThan(field.to_owned(), comparable(field, op, value)?),
            "$gte" => Filter::GreaterOrEqual(field.to_owned(), comparable(field, op, value)?),
            "$lt" => Filter::LessThan(field.to_owned(), comparable(field, op, value)?),
            "$lte" => Filter::LessOrEqual(field.to_owned(), comparable(field, op, value)?),
            "$in" => Filter::In(field.to_owned(), value_list(field, op, value)?),
            "$nin" => Filter::NotIn(field.to_owned(), value_list(field, op, value)?),
            "$exists" => {
                let exists = match *value {
                    Value::Bool(b) => b,
                    Value::Number(ref n) if n.as_f64() == Some(1.0) => true,
                    Value::Number(ref n) if n.as_f64() == Some(0.0) => false,
                    Value::Null | Value::Number(_) | Value::String(_) | Value::Array(_) | Value::Object(_) => {
                        return Err(TomeError::invalid_query(format!(
                            "$exists on '{}' expects a boolean, got {}",
                            field, value
                        )));
                    },
                };
                Filter::Exists(field.to_owned(), exists)
            },
            other if other.starts_with('$') => {
                return Err(TomeError::invalid_query(format!(
                    "unknown operator '{}' on field '{}'",
                    other, field
                )));
            },
            other => {
                return Err(TomeError::invalid_query(format!(
                    "cannot mix operators and field '{}' in the condition on '{}'",
                    other, field
                )));
            },
        };
        clauses.push(filter);
    }
    Ok(())
}

/// Validates an ordering operand: only numbers and strings are comparable.
fn comparable(field: &str, op: &str, value: &Value) -> Result<Value> {
    match *value {
        Value::Number(_) | Value::String(_) => Ok(value.clone()),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            Err(TomeError::invalid_query(format!(
                "{} on '{}' expects a number or string, got {}",
                op,
                field,
                type_name(value)
            )))
        },
    }
}

/// Validates the list operand of `$in` / `$nin`.
fn value_list(field: &str, op: &str, value: &Value) -> Result<Vec<Value>> {
    match *value {
        Value::Array(ref items) => Ok(items.clone()),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Object(_) => {
            Err(TomeError::invalid_query(format!(
                "{} on '{}' expects an array, got {}",
                op,
                field,
                type_name(value)
            )))
        },
    }
}

/// Operator for building filters in the query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equality
    Equals,
    /// Inequality
    NotEquals,
    /// Greater than
    GreaterThan,
    /// Less than
    LessThan,
    /// Greater or equal
    GreaterOrEqual,
    /// Less or equal
    LessOrEqual,
    /// Value in list
    In,
    /// Value not in list
    NotIn,
    /// Field exists
    Exists,
}

impl Operator {
    /// The filter-language spelling of the operator.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "$eq",
            Self::NotEquals => "$ne",
            Self::GreaterThan => "$gt",
            Self::LessThan => "$lt",
            Self::GreaterOrEqual => "$gte",
            Self::LessOrEqual => "$lte",
            Self::In => "$in",
            Self::NotIn => "$nin",
            Self::Exists => "$exists",
        }
    }
}

/// Builder pattern for constructing queries.
///
/// Operands go through the same validation as the JSON filter language, so a
/// malformed condition surfaces as an error from [`QueryBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    clauses:    Vec<Value>,
    sort:       Vec<(String, SortOrder)>,
    skip:       Option<usize>,
    limit:      Option<usize>,
    projection: Option<Value>,
}

impl QueryBuilder {
    /// Creates a new empty query builder.
    pub fn new() -> Self { Self::default() }

    /// Adds a filter condition to the query.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::{Operator, QueryBuilder};
    ///
    /// let query = QueryBuilder::new()
    ///     .filter("published_year", Operator::GreaterThan, json!(2000))
    ///     .filter("genre", Operator::Equals, json!("Thriller"))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn filter(mut self, field: &str, op: Operator, value: Value) -> Self {
        let mut condition = Map::new();
        condition.insert(op.as_str().to_owned(), value);
        let mut clause = Map::new();
        clause.insert(field.to_owned(), Value::Object(condition));
        self.clauses.push(Value::Object(clause));
        self
    }

    /// Adds a raw filter document, ANDed with the other conditions.
    pub fn filter_json(mut self, filter: Value) -> Self {
        self.clauses.push(filter);
        self
    }

    /// Adds a sort key; earlier keys take precedence.
    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        self.sort.push((field.to_owned(), order));
        self
    }

    /// Sets the number of results to skip.
    pub const fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the maximum number of results to return; `0` means no limit.
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { None } else { Some(limit) };
        self
    }

    /// Restricts results to the given fields (`_id` is kept).
    pub fn projection(mut self, fields: &[&str]) -> Self {
        let spec: Map<String, Value> = fields.iter().map(|f| ((*f).to_owned(), Value::from(1))).collect();
        self.projection = Some(Value::Object(spec));
        self
    }

    /// Builds the query, validating every condition.
    pub fn build(mut self) -> Result<Query> {
        let filter = match self.clauses.len() {
            0 => Filter::all(),
            1 => Filter::from_json(&self.clauses.remove(0))?,
            _ => {
                let mut and = Map::new();
                and.insert("$and".to_owned(), Value::Array(self.clauses));
                Filter::from_json(&Value::Object(and))?
            },
        };
        let projection = self.projection.as_ref().map(Projection::from_json).transpose()?;
        Ok(Query {
            filter,
            sort: self.sort,
            skip: self.skip,
            limit: self.limit,
            projection,
        })
    }
}
