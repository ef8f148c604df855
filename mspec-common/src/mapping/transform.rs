//! Conversion expression evaluator
//!
//! Conversions are written in mapping documents as a chain of named
//! transforms, e.g. `scale(1/1024)` or `leading_int() | scale(1/1024)`.
//! Only the transforms in [`Transform`] exist; expressions are parsed into
//! that closed vocabulary once, at load time, and never executed as code.
//!
//! Transform names are matched ignoring case and underscores, so `to_int`
//! and `toInt` name the same transform.

use super::error::TransformError;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;
use std::num::IntErrorKind;

/// One named value transform
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Multiply a number by a constant factor, producing a float
    Scale(f64),
    /// Integer from a number (truncating) or an integer string
    ToInt,
    /// Float from a number or a numeric string
    ToFloat,
    /// Leading integer of a string with trailing units, e.g. `"16 GB"`
    LeadingInt,
    Lowercase,
    Uppercase,
    Trim,
    /// First element of a non-empty array
    First,
}

impl Transform {
    /// Build a transform from its name and numeric arguments
    pub fn from_parts(name: &str, args: &[f64]) -> Result<Self, TransformError> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let transform = match key.as_str() {
            "scale" => {
                return match args {
                    [factor] => Ok(Transform::Scale(*factor)),
                    _ => Err(TransformError::new(
                        name,
                        format!("expects exactly 1 argument, got {}", args.len()),
                    )),
                };
            }
            "toint" => Transform::ToInt,
            "tofloat" => Transform::ToFloat,
            "leadingint" => Transform::LeadingInt,
            "lowercase" => Transform::Lowercase,
            "uppercase" => Transform::Uppercase,
            "trim" => Transform::Trim,
            "first" => Transform::First,
            _ => return Err(TransformError::new(name, "unknown transform")),
        };

        if !args.is_empty() {
            return Err(TransformError::new(
                name,
                format!("expects no arguments, got {}", args.len()),
            ));
        }
        Ok(transform)
    }

    /// Canonical name of the transform
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Scale(_) => "scale",
            Transform::ToInt => "to_int",
            Transform::ToFloat => "to_float",
            Transform::LeadingInt => "leading_int",
            Transform::Lowercase => "lowercase",
            Transform::Uppercase => "uppercase",
            Transform::Trim => "trim",
            Transform::First => "first",
        }
    }

    /// Apply the transform to a raw value
    pub fn apply(&self, value: &Value) -> Result<Value, TransformError> {
        match self {
            Transform::Scale(factor) => {
                let number = value.as_f64().ok_or_else(|| self.mismatch("a number", value))?;
                float_value(number * factor).ok_or_else(|| self.fail("result is not a finite number"))
            }
            Transform::ToInt => match value {
                Value::Number(n) => {
                    if n.is_i64() || n.is_u64() {
                        return Ok(value.clone());
                    }
                    let truncated = n.as_f64().map(f64::trunc).unwrap_or(f64::NAN);
                    if truncated.is_finite() && truncated.abs() < i64::MAX as f64 {
                        Ok(Value::from(truncated as i64))
                    } else {
                        Err(self.fail(format!("{} is out of integer range", n)))
                    }
                }
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| self.fail(format!("'{}' is not an integer", s))),
                _ => Err(self.mismatch("a number or string", value)),
            },
            Transform::ToFloat => {
                let number = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => return Err(self.mismatch("a number or string", value)),
                };
                number
                    .and_then(float_value)
                    .ok_or_else(|| self.fail(format!("{} is not a finite number", value)))
            }
            Transform::LeadingInt => {
                let s = value.as_str().ok_or_else(|| self.mismatch("a string", value))?;
                leading_int(s).map(Value::from).map_err(|reason| self.fail(reason))
            }
            Transform::Lowercase => self.map_str(value, str::to_lowercase),
            Transform::Uppercase => self.map_str(value, str::to_uppercase),
            Transform::Trim => self.map_str(value, |s| s.trim().to_string()),
            Transform::First => match value {
                Value::Array(items) => items
                    .first()
                    .cloned()
                    .ok_or_else(|| self.fail("array is empty")),
                _ => Err(self.mismatch("an array", value)),
            },
        }
    }

    fn map_str(&self, value: &Value, f: impl Fn(&str) -> String) -> Result<Value, TransformError> {
        value
            .as_str()
            .map(|s| Value::String(f(s)))
            .ok_or_else(|| self.mismatch("a string", value))
    }

    fn mismatch(&self, expected: &str, value: &Value) -> TransformError {
        self.fail(format!("expected {}, got {}", expected, type_name(value)))
    }

    fn fail(&self, reason: impl Into<String>) -> TransformError {
        TransformError::new(self.name(), reason)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Scale(factor) => write!(f, "scale({})", factor),
            other => write!(f, "{}()", other.name()),
        }
    }
}

/// A parsed conversion: one or more transforms applied left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    expression: String,
    steps: Vec<Transform>,
}

impl Conversion {
    /// Parse a conversion expression into its transform chain
    pub fn parse(expression: &str) -> Result<Self, TransformError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(TransformError::new(expression, "empty conversion expression"));
        }

        let steps = trimmed
            .split('|')
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expression: trimmed.to_string(),
            steps,
        })
    }

    /// Expression text as written in configuration
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn steps(&self) -> &[Transform] {
        &self.steps
    }

    /// Run every step in order, stopping at the first failure
    pub fn apply(&self, value: &Value) -> Result<Value, TransformError> {
        let mut current = value.clone();
        for step in &self.steps {
            current = step.apply(&current)?;
        }
        Ok(current)
    }
}

impl Serialize for Conversion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.expression)
    }
}

/// Evaluate a conversion expression against a raw value
pub fn evaluate(expression: &str, value: &Value) -> Result<Value, TransformError> {
    Conversion::parse(expression)?.apply(value)
}

/// Parse `name`, `name()` or `name(arg, ...)`
fn parse_term(term: &str) -> Result<Transform, TransformError> {
    let term = term.trim();
    let (name, args) = match term.find('(') {
        Some(open) => {
            let inner = term[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| TransformError::new(term, "missing closing parenthesis"))?;
            (term[..open].trim(), parse_args(term, inner)?)
        }
        None => (term, Vec::new()),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TransformError::new(term, "invalid transform name"));
    }
    Transform::from_parts(name, &args)
}

fn parse_args(term: &str, inner: &str) -> Result<Vec<f64>, TransformError> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|arg| {
            parse_number(arg.trim())
                .ok_or_else(|| TransformError::new(term, format!("invalid numeric argument '{}'", arg.trim())))
        })
        .collect()
}

/// Numeric literal or `a/b` fraction
fn parse_number(arg: &str) -> Option<f64> {
    let value = match arg.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => arg.parse().ok()?,
    };
    value.is_finite().then_some(value)
}

/// Integer from the first whitespace-delimited token; the whole token must parse
fn leading_int(s: &str) -> Result<i64, String> {
    let token = s
        .split_whitespace()
        .next()
        .ok_or_else(|| format!("'{}' has no leading token", s))?;
    token.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            format!("'{}' is out of range for an integer", token)
        }
        _ => format!("first token '{}' of '{}' is not an integer", token, s),
    })
}

fn float_value(number: f64) -> Option<Value> {
    Number::from_f64(number).map(Value::Number)
}

/// JSON type name used in diagnostics
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
