//! Aggregation expressions.
//!
//! Expressions compute a value from a document: field references (`"$price"`),
//! literals, nested objects and arrays, and operator calls such as
//! `{"$floor": {"$divide": ["$published_year", 10]}}`. Missing fields evaluate
//! to `null`, and `null` propagates through arithmetic and string operators.

use serde_json::{Map, Number, Value};

use crate::{
    comparison::number_value,
    document::type_name,
    Document,
    Result,
    TomeError,
};

/// Expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprOp {
    /// Sum of numbers
    Add,
    /// Difference of two numbers
    Subtract,
    /// Product of numbers
    Multiply,
    /// Quotient of two numbers
    Divide,
    /// Remainder of two numbers
    Mod,
    /// Largest integer not above a number
    Floor,
    /// Smallest integer not below a number
    Ceil,
    /// String rendering of a scalar
    ToString,
    /// Concatenation of strings
    Concat,
    /// Upper-cased string
    ToUpper,
    /// Lower-cased string
    ToLower,
}

impl ExprOp {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "$add" => Self::Add,
            "$subtract" => Self::Subtract,
            "$multiply" => Self::Multiply,
            "$divide" => Self::Divide,
            "$mod" => Self::Mod,
            "$floor" => Self::Floor,
            "$ceil" => Self::Ceil,
            "$toString" => Self::ToString,
            "$concat" => Self::Concat,
            "$toUpper" => Self::ToUpper,
            "$toLower" => Self::ToLower,
            _ => return None,
        })
    }

    /// Allowed argument counts (min, max).
    const fn arity(self) -> (usize, usize) {
        match self {
            Self::Add | Self::Multiply | Self::Concat => (1, usize::MAX),
            Self::Subtract | Self::Divide | Self::Mod => (2, 2),
            Self::Floor | Self::Ceil | Self::ToString | Self::ToUpper | Self::ToLower => (1, 1),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Add => "$add",
            Self::Subtract => "$subtract",
            Self::Multiply => "$multiply",
            Self::Divide => "$divide",
            Self::Mod => "$mod",
            Self::Floor => "$floor",
            Self::Ceil => "$ceil",
            Self::ToString => "$toString",
            Self::Concat => "$concat",
            Self::ToUpper => "$toUpper",
            Self::ToLower => "$toLower",
        }
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant
    Literal(Value),
    /// A field path, without the leading `$`
    Field(String),
    /// An object whose values are expressions
    Object(Vec<(String, Self)>),
    /// An array whose elements are expressions
    Array(Vec<Self>),
    /// An operator applied to arguments
    Call(ExprOp, Vec<Self>),
}

impl Expr {
    /// Parses an expression.
    pub fn from_json(value: &Value) -> Result<Self> {
        match *value {
            Value::String(ref s) if s.starts_with("$$") => {
                Err(TomeError::invalid_query(format!("variables are not supported: '{}'", s)))
            },
            Value::String(ref s) if s.starts_with('$') => {
                let path = s.trim_start_matches('$');
                if path.is_empty() {
                    return Err(TomeError::invalid_query("empty field path '$'"));
                }
                Ok(Self::Field(path.to_owned()))
            },
            Value::Array(ref items) => Ok(Self::Array(items.iter().map(Self::from_json).collect::<Result<_>>()?)),
            Value::Object(ref fields) => Self::from_object(fields),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(Self::Literal(value.clone())),
        }
    }

    fn from_object(fields: &Map<String, Value>) -> Result<Self> {
        let operator = fields.keys().find(|k| k.starts_with('$'));
        let Some(name) = operator
        else {
            return Ok(Self::Object(
                fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), Self::from_json(v)?)))
                    .collect::<Result<_>>()?,
            ));
        };
        if fields.len() != 1 {
            return Err(TomeError::invalid_query(format!(
                "an expression object with operator '{}' must have exactly one field",
                name
            )));
        }
        let operand = fields.get(name.as_str()).unwrap_or(&Value::Null);
        if name == "$literal" {
            return Ok(Self::Literal(operand.clone()));
        }
        let Some(op) = ExprOp::from_name(name)
        else {
            return Err(TomeError::invalid_query(format!("unknown expression operator '{}'", name)));
        };

        let args = match *operand {
            Value::Array(ref items) => items.iter().map(Self::from_json).collect::<Result<Vec<_>>>()?,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Object(_) => {
                vec![Self::from_json(operand)?]
            },
        };
        let (min, max) = op.arity();
        if args.len() < min || args.len() > max {
            return Err(TomeError::invalid_query(format!(
                "{} takes {} argument(s), got {}",
                op.name(),
                if min == max { min.to_string() } else { format!("at least {}", min) },
                args.len()
            )));
        }
        Ok(Self::Call(op, args))
    }

    /// Evaluates the expression against a document.
    pub fn evaluate(&self, doc: &Document) -> Result<Value> {
        match *self {
            Self::Literal(ref value) => Ok(value.clone()),
            Self::Field(ref path) => Ok(doc.get(path).cloned().unwrap_or(Value::Null)),
            Self::Object(ref fields) => {
                let mut out = Map::new();
                for &(ref key, ref expr) in fields {
                    out.insert(key.clone(), expr.evaluate(doc)?);
                }
                Ok(Value::Object(out))
            },
            Self::Array(ref items) => Ok(Value::Array(items.iter().map(|e| e.evaluate(doc)).collect::<Result<_>>()?)),
            Self::Call(op, ref args) => {
                let values = args.iter().map(|e| e.evaluate(doc)).collect::<Result<Vec<_>>>()?;
                call(op, &values)
            },
        }
    }
}

/// A number in the middle of arithmetic.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_value(op: ExprOp, value: &Value) -> Result<Self> {
        match *value {
            Value::Number(ref n) => Ok(n.as_i64().map_or_else(|| Self::Float(n.as_f64().unwrap_or(0.0)), Self::Int)),
            Value::Null | Value::Bool(_) | Value::String(_) | Value::Array(_) | Value::Object(_) => {
                Err(TomeError::invalid_query(format!(
                    "{} only supports numeric types, got {}",
                    op.name(),
                    type_name(value)
                )))
            },
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Int(i) => Value::from(i),
            Self::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        }
    }

    /// Applies an integer operation when both sides are integral and it does
    /// not overflow, falling back to floating point.
    fn combine(self, other: Self, int_op: fn(i64, i64) -> Option<i64>, float_op: fn(f64, f64) -> f64) -> Self {
        if let (Self::Int(a), Self::Int(b)) = (self, other) {
            if let Some(result) = int_op(a, b) {
                return Self::Int(result);
            }
        }
        Self::Float(float_op(self.as_f64(), other.as_f64()))
    }
}

/// Applies an operator to evaluated arguments; arity was checked at parse time.
fn call(op: ExprOp, args: &[Value]) -> Result<Value> {
    if args.iter().any(Value::is_null) && op != ExprOp::ToUpper && op != ExprOp::ToLower {
        return Ok(Value::Null);
    }
    match op {
        ExprOp::Add => fold_numbers(op, args, i64::checked_add, |a, b| a + b),
        ExprOp::Multiply => fold_numbers(op, args, i64::checked_mul, |a, b| a * b),
        ExprOp::Subtract => fold_numbers(op, args, i64::checked_sub, |a, b| a - b),
        ExprOp::Divide => {
            let (a, b) = binary(op, args)?;
            if b.is_zero() {
                return Err(TomeError::invalid_query("$divide by zero"));
            }
            Ok(number_value(a.as_f64() / b.as_f64()))
        },
        ExprOp::Mod => {
            let (a, b) = binary(op, args)?;
            if b.is_zero() {
                return Err(TomeError::invalid_query("$mod by zero"));
            }
            Ok(a.combine(b, i64::checked_rem, |x, y| x % y).into_value())
        },
        ExprOp::Floor | ExprOp::Ceil => {
            let n = Num::from_value(op, first(args))?;
            Ok(match n {
                Num::Int(_) => n.into_value(),
                Num::Float(f) if op == ExprOp::Floor => number_value(f.floor()),
                Num::Float(f) => number_value(f.ceil()),
            })
        },
        ExprOp::ToString => {
            match *first(args) {
                Value::String(ref s) => Ok(Value::String(s.clone())),
                Value::Number(ref n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                ref other @ (Value::Null | Value::Array(_) | Value::Object(_)) => {
                    Err(TomeError::invalid_query(format!(
                        "$toString cannot convert {}",
                        type_name(other)
                    )))
                },
            }
        },
        ExprOp::Concat => {
            let mut out = String::new();
            for value in args {
                match *value {
                    Value::String(ref s) => out.push_str(s),
                    Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                        return Err(TomeError::invalid_query(format!(
                            "$concat only supports strings, got {}",
                            type_name(value)
                        )));
                    },
                }
            }
            Ok(Value::String(out))
        },
        ExprOp::ToUpper | ExprOp::ToLower => {
            match *first(args) {
                Value::Null => Ok(Value::String(String::new())),
                Value::String(ref s) if op == ExprOp::ToUpper => Ok(Value::String(s.to_uppercase())),
                Value::String(ref s) => Ok(Value::String(s.to_lowercase())),
                ref other @ (Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_)) => {
                    Err(TomeError::invalid_query(format!(
                        "{} only supports strings, got {}",
                        op.name(),
                        type_name(other)
                    )))
                },
            }
        },
    }
}

fn first(args: &[Value]) -> &Value { args.first().unwrap_or(&Value::Null) }

fn binary(op: ExprOp, args: &[Value]) -> Result<(Num, Num)> {
    match *args {
        [ref a, ref b] => Ok((Num::from_value(op, a)?, Num::from_value(op, b)?)),
        _ => Err(TomeError::invalid_query(format!("{} takes 2 arguments", op.name()))),
    }
}

fn fold_numbers(
    op: ExprOp,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let mut numbers = args.iter().map(|v| Num::from_value(op, v));
    let Some(head) = numbers.next()
    else {
        return Ok(Value::Null);
    };
    let mut acc = head?;
    for n in numbers {
        acc = acc.combine(n?, int_op, float_op);
    }
    Ok(acc.into_value())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn eval(expr: Value, doc: Value) -> Result<Value> {
        let doc = Document::from(doc.as_object().unwrap().clone());
        Expr::from_json(&expr)?.evaluate(&doc)
    }

    #[test]
    fn test_field_and_literal() {
        assert_eq!(eval(json!("$price"), json!({"price": 9.99})).unwrap(), json!(9.99));
        assert_eq!(eval(json!("$missing"), json!({})).unwrap(), Value::Null);
        assert_eq!(eval(json!(7), json!({})).unwrap(), json!(7));
        assert_eq!(eval(json!({"$literal": "$price"}), json!({"price": 1})).unwrap(), json!("$price"));
    }

    #[test]
    fn test_decade_expression() {
        let expr = json!({
            "$concat": [
                {"$toString": {"$multiply": [{"$floor": {"$divide": ["$published_year", 10]}}, 10]}},
                "s"
            ]
        });
        assert_eq!(eval(expr.clone(), json!({"published_year": 1937})).unwrap(), json!("1930s"));
        assert_eq!(eval(expr.clone(), json!({"published_year": 2003})).unwrap(), json!("2000s"));
        assert_eq!(eval(expr, json!({})).unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval(json!({"$add": [1, 2, 3]}), json!({})).unwrap(), json!(6));
        assert_eq!(eval(json!({"$subtract": ["$a", 0.5]}), json!({"a": 2})).unwrap(), json!(1.5));
        assert_eq!(eval(json!({"$divide": [9, 3]}), json!({})).unwrap(), json!(3));
        assert_eq!(eval(json!({"$mod": [10, 4]}), json!({})).unwrap(), json!(2));
        assert_eq!(eval(json!({"$ceil": 1.2}), json!({})).unwrap(), json!(2));
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(eval(json!({"$toUpper": "$g"}), json!({"g": "Fantasy"})).unwrap(), json!("FANTASY"));
        assert_eq!(eval(json!({"$toLower": "$g"}), json!({})).unwrap(), json!(""));
        assert_eq!(eval(json!({"$toString": 11.5}), json!({})).unwrap(), json!("11.5"));
        assert_eq!(eval(json!({"$toString": true}), json!({})).unwrap(), json!("true"));
    }

    #[test]
    fn test_object_expression() {
        let value = eval(json!({"genre": "$genre", "year": "$y"}), json!({"genre": "Classic", "y": 1960})).unwrap();
        assert_eq!(value, json!({"genre": "Classic", "year": 1960}));
    }

    #[test]
    fn test_type_errors() {
        assert!(eval(json!({"$add": ["$title", 1]}), json!({"title": "1984"})).is_err());
        assert!(eval(json!({"$concat": ["a", 1]}), json!({})).is_err());
        assert!(eval(json!({"$divide": [1, 0]}), json!({})).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(Expr::from_json(&json!({"$frobnicate": 1})).is_err());
        assert!(Expr::from_json(&json!({"$divide": [1]})).is_err());
        assert!(Expr::from_json(&json!({"$floor": 1, "x": 2})).is_err());
        assert!(Expr::from_json(&json!("$$ROOT")).is_err());
        assert!(Expr::from_json(&json!("$")).is_err());
    }
}
