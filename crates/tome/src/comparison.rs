//! Comparison utilities for ordering, equality and keying of JSON values.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Rank of each JSON type in the cross-type sort order.
const fn type_order(v: &Value) -> u8 {
    match *v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// The exact integer a number holds, whether stored as an integer or as an
/// integral float. Floats at or beyond `1e38` stay floats.
#[allow(
    clippy::cast_possible_truncation,
    reason = "integral floats below 1e38 convert to i128 exactly"
)]
fn exact_integer(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(i128::from(u));
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.abs() < 1.0e38).then(|| f as i128)
}

/// Compares two numbers, exactly for integers (including integral floats) and
/// through `f64` otherwise.
fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(ia), Some(ib)) = (exact_integer(a), exact_integer(b)) {
        return ia.cmp(&ib);
    }
    let fa = a.as_f64().unwrap_or(0.0);
    let fb = b.as_f64().unwrap_or(0.0);
    fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
}

/// Compares two JSON values for sorting purposes.
///
/// Values of different types order by type (null, bool, number, string, array,
/// object). Arrays compare element-wise, objects by their values in field order.
pub fn compare_json_values(a: &Value, b: &Value) -> Ordering {
    let type_a = type_order(a);
    let type_b = type_order(b);

    if type_a != type_b {
        return type_a.cmp(&type_b);
    }

    match (a, b) {
        (&Value::Bool(ba), &Value::Bool(bb)) => ba.cmp(&bb),
        (&Value::Number(ref na), &Value::Number(ref nb)) => compare_numbers(na, nb),
        (&Value::String(ref sa), &Value::String(ref sb)) => sa.cmp(sb),
        (&Value::Array(ref aa), &Value::Array(ref ab)) => {
            aa.iter()
                .zip(ab.iter())
                .map(|(x, y)| compare_json_values(x, y))
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| aa.len().cmp(&ab.len()))
        },
        (&Value::Object(ref oa), &Value::Object(ref ob)) => {
            oa.values()
                .zip(ob.values())
                .map(|(x, y)| compare_json_values(x, y))
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| oa.len().cmp(&ob.len()))
        },
        _ => Ordering::Equal,
    }
}

/// Compares two optional values for sorting purposes. Missing sorts first.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(va), Some(vb)) => compare_json_values(va, vb),
    }
}

/// Equality used by filters and grouping: numbers compare by value, so
/// `10` equals `10.0`. Everything else is structural.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (&Value::Number(ref na), &Value::Number(ref nb)) => compare_numbers(na, nb).is_eq(),
        (&Value::Array(ref aa), &Value::Array(ref ab)) => {
            aa.len() == ab.len() && aa.iter().zip(ab).all(|(x, y)| values_equal(x, y))
        },
        (&Value::Object(ref oa), &Value::Object(ref ob)) => {
            oa.len() == ob.len() &&
                oa.iter()
                    .all(|(k, v)| ob.get(k).is_some_and(|other| values_equal(v, other)))
        },
        _ => a == b,
    }
}

/// Turns an `f64` into a JSON number, preferring an integer when exact.
///
/// Non-finite results become `null`, as JSON cannot carry them.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

/// A string key that is identical for values that are [`values_equal`].
///
/// Used to bucket values in indexes and `$group` partitions.
pub fn canonical_key(value: &Value) -> String {
    match *value {
        Value::Number(ref n) => {
            match exact_integer(n) {
                Some(i) => i.to_string(),
                None => n.to_string(),
            }
        },
        Value::Array(ref items) => {
            let parts: Vec<String> = items.iter().map(canonical_key).collect();
            format!("[{}]", parts.join(","))
        },
        Value::Object(ref fields) => {
            let mut parts: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_key(v)))
                .collect();
            parts.sort();
            format!("{{{}}}", parts.join(","))
        },
        Value::Null | Value::Bool(_) | Value::String(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_compare_json_values_cross_type() {
        assert_eq!(compare_json_values(&json!(null), &json!(1)), Ordering::Less);
        assert_eq!(compare_json_values(&json!(true), &json!("string")), Ordering::Less);
        assert_eq!(compare_json_values(&json!("string"), &json!(1)), Ordering::Greater);
        assert_eq!(compare_json_values(&json!([1]), &json!("string")), Ordering::Greater);
        assert_eq!(compare_json_values(&json!({"a": 1}), &json!([1])), Ordering::Greater);
    }

    #[test]
    fn test_compare_json_values_number() {
        assert_eq!(compare_json_values(&json!(1), &json!(1)), Ordering::Equal);
        assert_eq!(compare_json_values(&json!(1), &json!(2)), Ordering::Less);
        assert_eq!(compare_json_values(&json!(1.5), &json!(1)), Ordering::Greater);
        assert_eq!(compare_json_values(&json!(10.99), &json!(9.99)), Ordering::Greater);
        assert_eq!(compare_json_values(&json!(10), &json!(10.0)), Ordering::Equal);
    }

    #[test]
    fn test_compare_json_values_string() {
        assert_eq!(compare_json_values(&json!("a"), &json!("b")), Ordering::Less);
        assert_eq!(compare_json_values(&json!("b"), &json!("a")), Ordering::Greater);
    }

    #[test]
    fn test_compare_json_values_array_elementwise() {
        assert_eq!(compare_json_values(&json!([1, 3]), &json!([2])), Ordering::Less);
        assert_eq!(compare_json_values(&json!([1]), &json!([1, 2])), Ordering::Less);
    }

    #[test]
    fn test_compare_values_none() {
        assert_eq!(compare_values(None, None), Ordering::Equal);
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(1)), None), Ordering::Greater);
    }

    #[test]
    fn test_values_equal_numeric() {
        assert!(values_equal(&json!(10), &json!(10.0)));
        assert!(!values_equal(&json!(10), &json!("10")));
        assert!(values_equal(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(1930.0), json!(1930));
        assert_eq!(number_value(11.5), json!(11.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }

    #[test]
    fn test_canonical_key_matches_values_equal() {
        assert_eq!(canonical_key(&json!(10)), canonical_key(&json!(10.0)));
        assert_ne!(canonical_key(&json!(10)), canonical_key(&json!("10")));
        assert_eq!(canonical_key(&json!({"a": 1, "b": 2})), canonical_key(&json!({"b": 2, "a": 1.0})));
    }

    #[test]
    fn test_large_integral_floats_key_as_integers() {
        let int = json!(10_000_000_000_000_000_i64);
        let float = json!(1e16);
        assert!(values_equal(&int, &float));
        assert_eq!(canonical_key(&int), canonical_key(&float));
        assert_eq!(canonical_key(&float), "10000000000000000");

        let big = Value::from(u64::MAX);
        assert_eq!(compare_json_values(&big, &Value::from(i64::MAX)), Ordering::Greater);
        assert_ne!(canonical_key(&big), canonical_key(&Value::from(i64::MAX)));
    }

    #[test]
    fn test_integers_beyond_f64_precision_compare_exactly() {
        let float = json!(9_007_199_254_740_992.0);
        let next = json!(9_007_199_254_740_993_i64);
        assert!(!values_equal(&float, &next));
        assert_eq!(compare_json_values(&float, &next), Ordering::Less);
        assert_ne!(canonical_key(&float), canonical_key(&next));
    }
}
