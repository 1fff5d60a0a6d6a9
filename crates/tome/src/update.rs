//! Update operators (`$set`, `$unset`, `$inc`, `$mul`).

use serde_json::{Number, Value};

use crate::{
    comparison::number_value,
    document::{type_name, ID_FIELD},
    Document,
    Result,
    TomeError,
};

/// A single field change.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Set a field to a value
    Set(String, Value),
    /// Remove a field
    Unset(String),
    /// Add to a numeric field; a missing field is set to the operand
    Inc(String, Number),
    /// Multiply a numeric field; a missing field is set to zero
    Mul(String, Number),
}

/// A parsed update document.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    /// Parses an update document such as `{"$set": {"price": 11.5}}`.
    ///
    /// Replacement-style documents (no operators) are rejected, as are changes
    /// to `_id`.
    pub fn from_json(spec: &Value) -> Result<Self> {
        let Some(operators) = spec.as_object()
        else {
            return Err(TomeError::invalid_query(format!(
                "update must be an object, got {}",
                type_name(spec)
            )));
        };
        if operators.is_empty() {
            return Err(TomeError::invalid_query("update document is empty"));
        }

        let mut ops = Vec::new();
        for (op, fields) in operators {
            if !op.starts_with('$') {
                return Err(TomeError::invalid_query(format!(
                    "update must use operators such as $set, found field '{}'",
                    op
                )));
            }
            let Some(fields) = fields.as_object()
            else {
                return Err(TomeError::invalid_query(format!(
                    "{} expects an object of fields, got {}",
                    op,
                    type_name(fields)
                )));
            };
            for (field, value) in fields {
                if field == ID_FIELD || field.starts_with("_id.") {
                    return Err(TomeError::invalid_query("field '_id' is immutable"));
                }
                let parsed = match op.as_str() {
                    "$set" => UpdateOp::Set(field.clone(), value.clone()),
                    "$unset" => UpdateOp::Unset(field.clone()),
                    "$inc" => UpdateOp::Inc(field.clone(), numeric_operand(op, field, value)?),
                    "$mul" => UpdateOp::Mul(field.clone(), numeric_operand(op, field, value)?),
                    other => {
                        return Err(TomeError::invalid_query(format!(
                            "unsupported update operator '{}'",
                            other
                        )));
                    },
                };
                ops.push(parsed);
            }
        }

        Ok(Self {
            ops,
        })
    }

    /// Returns the parsed operations.
    pub fn ops(&self) -> &[UpdateOp] { &self.ops }

    /// Applies the update to a document, returning whether it changed.
    ///
    /// On error the document may be partially updated; callers apply updates
    /// to a copy.
    pub fn apply(&self, doc: &mut Document) -> Result<bool> {
        let before = doc.clone();
        for op in &self.ops {
            match *op {
                UpdateOp::Set(ref field, ref value) => doc.set(field, value.clone())?,
                UpdateOp::Unset(ref field) => {
                    doc.remove(field);
                },
                UpdateOp::Inc(ref field, ref by) => {
                    let next = match doc.get(field) {
                        None => Value::Number(by.clone()),
                        Some(&Value::Number(ref current)) => arithmetic(current, by, i64::checked_add, |a, b| a + b),
                        Some(other) => return Err(non_numeric_target("$inc", field, other)),
                    };
                    doc.set(field, next)?;
                },
                UpdateOp::Mul(ref field, ref by) => {
                    let next = match doc.get(field) {
                        None => {
                            if by.is_f64() {
                                Value::from(0.0)
                            }
                            else {
                                Value::from(0)
                            }
                        },
                        Some(&Value::Number(ref current)) => arithmetic(current, by, i64::checked_mul, |a, b| a * b),
                        Some(other) => return Err(non_numeric_target("$mul", field, other)),
                    };
                    doc.set(field, next)?;
                },
            }
        }
        Ok(*doc != before)
    }
}

/// Validates the numeric operand of `$inc` / `$mul`.
fn numeric_operand(op: &str, field: &str, value: &Value) -> Result<Number> {
    match *value {
        Value::Number(ref n) => Ok(n.clone()),
        Value::Null | Value::Bool(_) | Value::String(_) | Value::Array(_) | Value::Object(_) => {
            Err(TomeError::invalid_query(format!(
                "{} on '{}' expects a number, got {}",
                op,
                field,
                type_name(value)
            )))
        },
    }
}

/// Error for `$inc` / `$mul` against an existing non-numeric field.
fn non_numeric_target(op: &str, field: &str, current: &Value) -> TomeError {
    TomeError::invalid_query(format!(
        "cannot apply {} to non-numeric field '{}' of type {}",
        op,
        field,
        type_name(current)
    ))
}

/// Combines two numbers, staying integral unless a float is involved or the
/// integer operation overflows.
fn arithmetic(a: &Number, b: &Number, int_op: fn(i64, i64) -> Option<i64>, float_op: fn(f64, f64) -> f64) -> Value {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(result) = int_op(x, y) {
            return Value::from(result);
        }
    }
    let result = float_op(a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
    if a.is_f64() || b.is_f64() {
        Number::from_f64(result).map_or(Value::Null, Value::Number)
    }
    else {
        number_value(result)
    }
}
