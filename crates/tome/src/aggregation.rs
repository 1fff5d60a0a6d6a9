//! Aggregation pipelines.
//!
//! A pipeline is an ordered list of stages. Each stage consumes the stream of
//! documents produced by the previous one and yields a new stream; streaming
//! stages (`$match`, `$addFields`, `$project`, `$skip`, `$limit`) stay lazy,
//! while `$group`, `$sort` and `$count` must see their whole input first.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    comparison::{canonical_key, compare_json_values},
    document::{type_name, ID_FIELD},
    expression::Expr,
    filtering::matches_filter,
    projection::Projection,
    query::{parse_sort, sort_documents, SortOrder},
    Document,
    Filter,
    Result,
    TomeError,
};

/// A fallible stream of documents flowing between stages.
pub type DocumentStream<'a> = Box<dyn Iterator<Item = Result<Document>> + 'a>;

/// Accumulator operators available inside `$group`.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Sum of numeric values; `{"$sum": 1}` counts documents
    Sum(Expr),
    /// Mean of numeric values, `null` if there are none
    Avg(Expr),
    /// Smallest non-null value
    Min(Expr),
    /// Largest non-null value
    Max(Expr),
    /// Value from the first document of the group
    First(Expr),
    /// Value from the last document of the group
    Last(Expr),
    /// All values, in input order
    Push(Expr),
}

impl Accumulator {
    fn from_json(field: &str, spec: &Value) -> Result<Self> {
        let single = spec.as_object().filter(|m| m.len() == 1).and_then(|m| m.iter().next());
        let Some((op, operand)) = single
        else {
            return Err(TomeError::invalid_query(format!(
                "group field '{}' must be a single accumulator object",
                field
            )));
        };
        let expr = Expr::from_json(operand)?;
        Ok(match op.as_str() {
            "$sum" => Self::Sum(expr),
            "$avg" => Self::Avg(expr),
            "$min" => Self::Min(expr),
            "$max" => Self::Max(expr),
            "$first" => Self::First(expr),
            "$last" => Self::Last(expr),
            "$push" => Self::Push(expr),
            other => {
                return Err(TomeError::invalid_query(format!(
                    "unknown group accumulator '{}'",
                    other
                )));
            },
        })
    }

    const fn expr(&self) -> &Expr {
        match *self {
            Self::Sum(ref e) |
            Self::Avg(ref e) |
            Self::Min(ref e) |
            Self::Max(ref e) |
            Self::First(ref e) |
            Self::Last(ref e) |
            Self::Push(ref e) => e,
        }
    }
}

/// Running state of one accumulator for one group.
#[derive(Debug, Clone)]
enum AccState {
    Sum {
        int:      i64,
        float:    f64,
        is_float: bool,
    },
    Avg {
        total: f64,
        count: u64,
    },
    Extreme(Option<Value>),
    First(Option<Value>),
    Last(Value),
    Push(Vec<Value>),
}

impl AccState {
    const fn new(acc: &Accumulator) -> Self {
        match *acc {
            Accumulator::Sum(_) => {
                Self::Sum {
                    int:      0,
                    float:    0.0,
                    is_float: false,
                }
            },
            Accumulator::Avg(_) => {
                Self::Avg {
                    total: 0.0,
                    count: 0,
                }
            },
            Accumulator::Min(_) | Accumulator::Max(_) => Self::Extreme(None),
            Accumulator::First(_) => Self::First(None),
            Accumulator::Last(_) => Self::Last(Value::Null),
            Accumulator::Push(_) => Self::Push(Vec::new()),
        }
    }

    fn update(&mut self, acc: &Accumulator, value: Value) {
        match *self {
            Self::Sum {
                ref mut int,
                ref mut float,
                ref mut is_float,
            } => {
                if let Value::Number(ref n) = value {
                    match n.as_i64() {
                        Some(i) if !*is_float => {
                            if let Some(sum) = int.checked_add(i) {
                                *int = sum;
                            }
                            else {
                                *is_float = true;
                                *float = *int as f64 + i as f64;
                            }
                        },
                        Some(_) | None => {
                            if !*is_float {
                                *is_float = true;
                                *float = *int as f64;
                            }
                            *float += n.as_f64().unwrap_or(0.0);
                        },
                    }
                }
            },
            Self::Avg {
                ref mut total,
                ref mut count,
            } => {
                if let Some(n) = value.as_f64() {
                    *total += n;
                    *count = count.saturating_add(1);
                }
            },
            Self::Extreme(ref mut current) => {
                if value.is_null() {
                    return;
                }
                let replace = current.as_ref().is_none_or(|c| {
                    let ord = compare_json_values(&value, c);
                    if matches!(*acc, Accumulator::Min(_)) {
                        ord.is_lt()
                    }
                    else {
                        ord.is_gt()
                    }
                });
                if replace {
                    *current = Some(value);
                }
            },
            Self::First(ref mut first) => {
                if first.is_none() {
                    *first = Some(value);
                }
            },
            Self::Last(ref mut last) => *last = value,
            Self::Push(ref mut values) => values.push(value),
        }
    }

    fn finish(self) -> Value {
        match self {
            Self::Sum {
                int,
                float,
                is_float,
            } => {
                if is_float {
                    Value::from(float)
                }
                else {
                    Value::from(int)
                }
            },
            Self::Avg {
                total,
                count,
            } => {
                if count == 0 {
                    Value::Null
                }
                else {
                    Value::from(total / count as f64)
                }
            },
            Self::Extreme(value) | Self::First(value) => value.unwrap_or(Value::Null),
            Self::Last(value) => value,
            Self::Push(values) => Value::Array(values),
        }
    }
}

/// A `$group` stage: a key expression and named accumulators.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Partition key; `null` puts every document in one group
    pub key:          Expr,
    /// Output fields and how they are computed
    pub accumulators: Vec<(String, Accumulator)>,
}

impl Group {
    fn from_json(spec: &Value) -> Result<Self> {
        let Some(fields) = spec.as_object()
        else {
            return Err(TomeError::invalid_query(format!(
                "$group expects an object, got {}",
                type_name(spec)
            )));
        };
        let Some(key) = fields.get(ID_FIELD)
        else {
            return Err(TomeError::invalid_query("$group requires an _id expression"));
        };
        let key = Expr::from_json(key)?;
        let mut accumulators = Vec::new();
        for (field, acc) in fields {
            if field == ID_FIELD {
                continue;
            }
            if field.contains('.') || field.starts_with('$') {
                return Err(TomeError::invalid_query(format!("invalid group output field '{}'", field)));
            }
            accumulators.push((field.clone(), Accumulator::from_json(field, acc)?));
        }
        Ok(Self {
            key,
            accumulators,
        })
    }

    /// Partitions the input, returning one document per group in order of
    /// first appearance.
    fn run(&self, input: DocumentStream<'_>) -> Result<Vec<Document>> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(Value, Vec<AccState>)> = Vec::new();

        for doc in input {
            let doc = doc?;
            let key = self.key.evaluate(&doc)?;
            let canonical = canonical_key(&key);
            let slot = match slots.get(&canonical) {
                Some(&slot) => slot,
                None => {
                    let slot = groups.len();
                    slots.insert(canonical, slot);
                    groups.push((
                        key,
                        self.accumulators
                            .iter()
                            .map(|&(_, ref acc)| AccState::new(acc))
                            .collect(),
                    ));
                    slot
                },
            };
            let Some(&mut (_, ref mut states)) = groups.get_mut(slot)
            else {
                continue;
            };
            for (state, &(_, ref acc)) in states.iter_mut().zip(&self.accumulators) {
                state.update(acc, acc.expr().evaluate(&doc)?);
            }
        }

        Ok(groups
            .into_iter()
            .map(|(key, states)| {
                let mut out = Map::new();
                out.insert(ID_FIELD.to_owned(), key);
                for (state, &(ref name, _)) in states.into_iter().zip(&self.accumulators) {
                    out.insert(name.clone(), state.finish());
                }
                Document::from(out)
            })
            .collect())
    }
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// `$match`: keep documents matching a filter
    Match(Filter),
    /// `$group`: partition and accumulate
    Group(Group),
    /// `$addFields` / `$set`: add or replace computed fields
    AddFields(Vec<(String, Expr)>),
    /// `$project`: keep or drop fields
    Project(Projection),
    /// `$sort`: order by keys, stable on ties
    Sort(Vec<(String, SortOrder)>),
    /// `$skip`: drop the first n documents
    Skip(usize),
    /// `$limit`: keep at most n documents
    Limit(usize),
    /// `$count`: replace the stream by one document holding its length
    Count(String),
}

impl Stage {
    /// Parses one stage object such as `{"$limit": 1}`.
    pub fn from_json(spec: &Value) -> Result<Self> {
        let single = spec.as_object().filter(|m| m.len() == 1).and_then(|m| m.iter().next());
        let Some((name, body)) = single
        else {
            return Err(TomeError::invalid_query(
                "each pipeline stage must be an object with exactly one field",
            ));
        };
        match name.as_str() {
            "$match" => Ok(Self::Match(Filter::from_json(body)?)),
            "$group" => Ok(Self::Group(Group::from_json(body)?)),
            "$addFields" | "$set" => {
                let Some(fields) = body.as_object().filter(|m| !m.is_empty())
                else {
                    return Err(TomeError::invalid_query(format!("{} expects a non-empty object", name)));
                };
                Ok(Self::AddFields(
                    fields
                        .iter()
                        .map(|(field, expr)| Ok((field.clone(), Expr::from_json(expr)?)))
                        .collect::<Result<_>>()?,
                ))
            },
            "$project" => Ok(Self::Project(Projection::from_json(body)?)),
            "$sort" => Ok(Self::Sort(parse_sort(body)?)),
            "$skip" => Ok(Self::Skip(count_operand(name, body, 0)?)),
            "$limit" => Ok(Self::Limit(count_operand(name, body, 1)?)),
            "$count" => {
                match body.as_str() {
                    Some(field) if !field.is_empty() && !field.starts_with('$') && !field.contains('.') => {
                        Ok(Self::Count(field.to_owned()))
                    },
                    Some(_) | None => Err(TomeError::invalid_query("$count expects a plain field name")),
                }
            },
            other => Err(TomeError::invalid_query(format!("unknown pipeline stage '{}'", other))),
        }
    }

    /// Wraps the input stream with this stage.
    pub fn apply<'a>(&'a self, input: DocumentStream<'a>) -> DocumentStream<'a> {
        match *self {
            Self::Match(ref filter) => {
                Box::new(input.filter(move |item| item.as_ref().map_or(true, |doc| matches_filter(doc, filter))))
            },
            Self::AddFields(ref fields) => {
                Box::new(input.map(move |item| {
                    let mut doc = item?;
                    // Every expression sees the incoming document
                    let values = fields
                        .iter()
                        .map(|&(_, ref expr)| expr.evaluate(&doc))
                        .collect::<Result<Vec<_>>>()?;
                    for (&(ref field, _), value) in fields.iter().zip(values) {
                        doc.set(field, value)?;
                    }
                    Ok(doc)
                }))
            },
            Self::Project(ref projection) => Box::new(input.map(move |item| item.map(|doc| projection.apply(&doc)))),
            Self::Skip(n) => {
                let mut skipped = 0usize;
                Box::new(input.filter(move |item| {
                    if item.is_err() || skipped >= n {
                        return true;
                    }
                    skipped = skipped.saturating_add(1);
                    false
                }))
            },
            Self::Limit(n) => Box::new(input.take(n)),
            Self::Group(ref group) => collected(group.run(input)),
            Self::Sort(ref keys) => {
                collected(input.collect::<Result<Vec<_>>>().map(|mut docs| {
                    sort_documents(&mut docs, keys);
                    docs
                }))
            },
            Self::Count(ref field) => {
                collected(input.collect::<Result<Vec<_>>>().map(|docs| {
                    let mut out = Map::new();
                    out.insert(field.clone(), Value::from(docs.len()));
                    vec![Document::from(out)]
                }))
            },
        }
    }
}

/// Turns the result of a blocking stage back into a stream.
fn collected<'a>(result: Result<Vec<Document>>) -> DocumentStream<'a> {
    match result {
        Ok(docs) => Box::new(docs.into_iter().map(Ok)),
        Err(e) => Box::new(std::iter::once(Err(e))),
    }
}

/// Parses the integer operand of `$skip` / `$limit`.
fn count_operand(stage: &str, body: &Value, min: u64) -> Result<usize> {
    match body.as_u64() {
        Some(n) if n >= min => usize::try_from(n).map_err(|_| TomeError::invalid_query(format!("{} is too large", stage))),
        Some(_) | None => {
            Err(TomeError::invalid_query(format!(
                "{} expects an integer of at least {}, got {}",
                stage, min, body
            )))
        },
    }
}

/// A parsed aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Parses a pipeline: a JSON array of stage objects.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tome::Pipeline;
    ///
    /// let pipeline = Pipeline::from_json(&json!([
    ///     {"$group": {"_id": "$author", "totalBooks": {"$sum": 1}}},
    ///     {"$sort": {"totalBooks": -1}},
    ///     {"$limit": 1}
    /// ]))
    /// .unwrap();
    /// assert_eq!(pipeline.stages().len(), 3);
    /// ```
    pub fn from_json(spec: &Value) -> Result<Self> {
        let Some(stages) = spec.as_array()
        else {
            return Err(TomeError::invalid_query(format!(
                "pipeline must be an array of stages, got {}",
                type_name(spec)
            )));
        };
        Ok(Self {
            stages: stages.iter().map(Stage::from_json).collect::<Result<_>>()?,
        })
    }

    /// Returns the stages in execution order.
    pub fn stages(&self) -> &[Stage] { &self.stages }

    /// Runs the pipeline over a source of documents, left to right.
    pub fn execute<'a, I>(&'a self, source: I) -> Result<Vec<Document>>
    where
        I: Iterator<Item = Document> + 'a,
    {
        let mut stream: DocumentStream<'a> = Box::new(source.map(Ok));
        for stage in &self.stages {
            trace!("Chaining pipeline stage: {:?}", stage);
            stream = stage.apply(stream);
        }
        stream.collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn docs(values: Value) -> Vec<Document> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| Document::from(v.as_object().unwrap().clone()))
            .collect()
    }

    fn run(pipeline: Value, input: Value) -> Result<Vec<Value>> {
        let pipeline = Pipeline::from_json(&pipeline)?;
        Ok(pipeline
            .execute(docs(input).into_iter())?
            .into_iter()
            .map(Document::into_value)
            .collect())
    }

    #[test]
    fn test_group_sum_avg_count() {
        let out = run(
            json!([{"$group": {"_id": "$g", "avg": {"$avg": "$p"}, "total": {"$sum": "$p"}, "count": {"$sum": 1}}}]),
            json!([{"g": "a", "p": 2}, {"g": "b", "p": 5}, {"g": "a", "p": 4}]),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                json!({"_id": "a", "avg": 3.0, "total": 6, "count": 2}),
                json!({"_id": "b", "avg": 5.0, "total": 5, "count": 1}),
            ]
        );
    }

    #[test]
    fn test_group_null_key_and_extremes() {
        let out = run(
            json!([{"$group": {
                "_id": null,
                "min": {"$min": "$p"},
                "max": {"$max": "$p"},
                "first": {"$first": "$n"},
                "last": {"$last": "$n"},
                "names": {"$push": "$n"}
            }}]),
            json!([{"n": "x", "p": 3}, {"n": "y", "p": 1}, {"n": "z"}]),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![json!({"_id": null, "min": 1, "max": 3, "first": "x", "last": "z", "names": ["x", "y", "z"]})]
        );
    }

    #[test]
    fn test_group_numeric_keys_merge() {
        let out = run(
            json!([{"$group": {"_id": "$k", "n": {"$sum": 1}}}]),
            json!([{"k": 10}, {"k": 10.0}]),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_group_large_integral_keys_merge() {
        let out = run(
            json!([{"$group": {"_id": "$k", "n": {"$sum": 1}}}]),
            json!([{"k": 10_000_000_000_000_000_i64}, {"k": 1e16}]),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.first().and_then(|g| g.get("n")), Some(&json!(2)));
    }

    #[test]
    fn test_sort_limit_skip() {
        let out = run(
            json!([{"$sort": {"p": -1}}, {"$skip": 1}, {"$limit": 1}]),
            json!([{"p": 1}, {"p": 3}, {"p": 2}]),
        )
        .unwrap();
        assert_eq!(out, vec![json!({"p": 2})]);
    }

    #[test]
    fn test_stage_order_matters() {
        let input = json!([{"p": 1}, {"p": 3}, {"p": 2}]);
        let limit_then_sort = run(json!([{"$limit": 2}, {"$sort": {"p": -1}}]), input.clone()).unwrap();
        let sort_then_limit = run(json!([{"$sort": {"p": -1}}, {"$limit": 2}]), input).unwrap();
        assert_eq!(limit_then_sort, vec![json!({"p": 3}), json!({"p": 1})]);
        assert_eq!(sort_then_limit, vec![json!({"p": 3}), json!({"p": 2})]);
    }

    #[test]
    fn test_add_fields_match_project_count() {
        let out = run(
            json!([
                {"$addFields": {"double": {"$multiply": ["$p", 2]}}},
                {"$match": {"double": {"$gt": 3}}},
                {"$project": {"double": 1, "_id": 0}}
            ]),
            json!([{"p": 1}, {"p": 2}, {"p": 3}]),
        )
        .unwrap();
        assert_eq!(out, vec![json!({"double": 4}), json!({"double": 6})]);

        let out = run(json!([{"$count": "n"}]), json!([{"p": 1}, {"p": 2}])).unwrap();
        assert_eq!(out, vec![json!({"n": 2})]);
    }

    #[test]
    fn test_expression_errors_surface() {
        let result = run(
            json!([{"$addFields": {"x": {"$add": ["$s", 1]}}}]),
            json!([{"s": "text"}]),
        );
        assert!(matches!(result, Err(TomeError::InvalidQuery { .. })));
    }

    #[test]
    fn test_rejects_malformed_pipelines() {
        for bad in [
            json!({"$limit": 1}),
            json!([{"$limit": 0}]),
            json!([{"$skip": -1}]),
            json!([{"$bogus": {}}]),
            json!([{"$sort": {"p": 1}, "$limit": 1}]),
            json!([{"$group": {"total": {"$sum": 1}}}]),
            json!([{"$group": {"_id": "$g", "total": {"$median": "$p"}}}]),
            json!([{"$group": {"_id": "$g", "total": 1}}]),
            json!([{"$count": "$n"}]),
            json!([{"$match": {"$where": "x"}}]),
        ] {
            assert!(Pipeline::from_json(&bad).is_err(), "{} should be rejected", bad);
        }
    }
}
