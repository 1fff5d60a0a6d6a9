//! Filtering utilities for document matching.

use std::cmp::Ordering;

use serde_json::Value;

use crate::{
    comparison::{compare_json_values, values_equal},
    Document,
    Filter,
};

/// Checks if a document matches all the given filters.
pub fn matches_filters(doc: &Document, filters: &[Filter]) -> bool { filters.iter().all(|f| matches_filter(doc, f)) }

/// Checks if a document matches a single filter.
pub fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    match *filter {
        Filter::Equals(ref field, ref value) => equals_field(doc, field, value),
        Filter::NotEquals(ref field, ref value) => !equals_field(doc, field, value),
        Filter::GreaterThan(ref field, ref value) => ordered(doc.get(field), value, Ordering::is_gt),
        Filter::LessThan(ref field, ref value) => ordered(doc.get(field), value, Ordering::is_lt),
        Filter::GreaterOrEqual(ref field, ref value) => ordered(doc.get(field), value, Ordering::is_ge),
        Filter::LessOrEqual(ref field, ref value) => ordered(doc.get(field), value, Ordering::is_le),
        Filter::In(ref field, ref values) => {
            doc.get(field)
                .is_some_and(|v| values.iter().any(|candidate| equals_or_contains(v, candidate)))
        },
        Filter::NotIn(ref field, ref values) => {
            !doc.get(field)
                .is_some_and(|v| values.iter().any(|candidate| equals_or_contains(v, candidate)))
        },
        Filter::Exists(ref field, exists) => doc.get(field).is_some() == exists,
        Filter::And(ref filters) => matches_filters(doc, filters),
        Filter::Or(ref filters) => filters.iter().any(|f| matches_filter(doc, f)),
        Filter::Nor(ref filters) => !filters.iter().any(|f| matches_filter(doc, f)),
    }
}

/// Field equality; a `null` operand also matches a missing field.
fn equals_field(doc: &Document, field: &str, operand: &Value) -> bool {
    doc.get(field)
        .map_or(operand.is_null(), |v| equals_or_contains(v, operand))
}

/// Equality with array fields matching when any element equals the operand.
fn equals_or_contains(field_value: &Value, operand: &Value) -> bool {
    if values_equal(field_value, operand) {
        return true;
    }
    match *field_value {
        Value::Array(ref items) => items.iter().any(|item| values_equal(item, operand)),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Object(_) => false,
    }
}

/// Applies an ordering predicate when the field and operand share a comparable
/// type; anything else does not match.
fn ordered(field_value: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    match (field_value, operand) {
        (Some(&Value::Number(_)), &Value::Number(_)) | (Some(&Value::String(_)), &Value::String(_)) => {
            field_value.is_some_and(|v| accept(compare_json_values(v, operand)))
        },
        (Some(&Value::Array(ref items)), _) => {
            items.iter().any(|item| ordered(Some(item), operand, accept))
        },
        _ => false,
    }
}
