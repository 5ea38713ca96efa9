//! Rule engine matching a [Value] against a [FieldDescriptor].
//!
//! A value is first matched against the descriptor's [FieldKind], recursing
//! into arrays and nested objects, then every [Constraint] is checked in
//! declaration order. The first failing rule wins and is reported with the
//! dotted path of the offending field.

use crate::common::Value;
use crate::errors::{ErrorKind, RecordError, RecordResult};
use crate::schema::{Constraint, FieldDescriptor, FieldKind};
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern is valid")
});

/// Validates `value` for `field` and returns the normalized value.
///
/// Nested objects come back with unknown keys stripped and defaults applied.
pub(crate) fn apply(field: &FieldDescriptor, value: &Value, path: &str) -> RecordResult<Value> {
    let normalized = match_kind(field.kind(), value, path)?;
    for constraint in field.constraints() {
        check_constraint(constraint, &normalized)
            .map_err(|reason| RecordError::validation(path, &reason))?;
    }
    Ok(normalized)
}

// 2^63: the first float past i64::MAX
const I64_FLOAT_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn match_kind(kind: &FieldKind, value: &Value, path: &str) -> RecordResult<Value> {
    let matched = match (kind, value) {
        (FieldKind::Any, v) if !v.is_null() => true,
        (FieldKind::String, Value::String(_)) => true,
        (FieldKind::Number, v) if v.is_number() => true,
        (FieldKind::Integer, Value::Float(v)) if v.is_finite() && v.fract() == 0.0 => {
            return to_int(*v, path);
        }
        (FieldKind::Integer, Value::Int(_)) => true,
        (FieldKind::Boolean, Value::Bool(_)) => true,
        (FieldKind::Bytes, Value::Bytes(_)) => true,
        (FieldKind::Date, Value::Int(_)) => true,
        (FieldKind::Date, Value::String(text)) => {
            return DateTime::parse_from_rfc3339(text)
                .map(|date| Value::Int(date.timestamp_millis()))
                .map_err(|e| RecordError::validation(path, &format!("invalid date ({})", e)));
        }
        (FieldKind::Enum(variants), Value::String(s)) => {
            if !variants.iter().any(|v| v == s) {
                return Err(RecordError::validation(
                    path,
                    &format!("expected one of [{}], found '{}'", variants.join(", "), s),
                ));
            }
            true
        }
        (FieldKind::Array(element), Value::Array(items)) => {
            let mut normalized = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, index);
                normalized.push(match_kind(element, item, &item_path)?);
            }
            return Ok(Value::Array(normalized));
        }
        (FieldKind::Tuple(elements), Value::Array(items)) => {
            if elements.len() != items.len() {
                return Err(RecordError::validation(
                    path,
                    &format!("expected {} element(s), found {}", elements.len(), items.len()),
                ));
            }
            let mut normalized = Vec::with_capacity(items.len());
            for (index, (element, item)) in elements.iter().zip(items).enumerate() {
                let item_path = format!("{}[{}]", path, index);
                normalized.push(match_kind(element, item, &item_path)?);
            }
            return Ok(Value::Array(normalized));
        }
        (FieldKind::Object(shape), Value::Document(doc)) => {
            return Ok(Value::Document(shape.parse_at(doc, path)?));
        }
        _ => false,
    };

    if matched {
        Ok(value.clone())
    } else {
        Err(RecordError::field_error(
            path,
            &format!("expected {}, found {}", kind.type_name(), value.type_name()),
            ErrorKind::InvalidDataType,
        ))
    }
}

// integral floats are stored as integers for integer fields
fn to_int(value: f64, path: &str) -> RecordResult<Value> {
    if (-I64_FLOAT_BOUND..I64_FLOAT_BOUND).contains(&value) {
        Ok(Value::Int(value as i64))
    } else {
        Err(RecordError::validation(path, "out of integer range"))
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Bytes(b) => Some(b.len()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

fn check_constraint(constraint: &Constraint, value: &Value) -> Result<(), String> {
    match constraint {
        Constraint::MinLength(min) => match length_of(value) {
            Some(len) if len < *min => Err(format!("must contain at least {} element(s)", min)),
            _ => Ok(()),
        },
        Constraint::MaxLength(max) => match length_of(value) {
            Some(len) if len > *max => Err(format!("must contain at most {} element(s)", max)),
            _ => Ok(()),
        },
        Constraint::Min(min) => match value.as_number() {
            Some(n) if n < *min => Err(format!("must be greater than or equal to {}", min)),
            _ => Ok(()),
        },
        Constraint::Max(max) => match value.as_number() {
            Some(n) if n > *max => Err(format!("must be less than or equal to {}", max)),
            _ => Ok(()),
        },
        Constraint::Email => match value.as_str() {
            Some(s) if !is_email(s) => Err("invalid email".to_string()),
            _ => Ok(()),
        },
        Constraint::Uuid => match value.as_str() {
            Some(s) if !UUID_PATTERN.is_match(s) => Err("invalid uuid".to_string()),
            _ => Ok(()),
        },
        Constraint::Pattern(pattern) => match value.as_str() {
            Some(s) if !pattern.is_match(s) => {
                Err(format!("does not match pattern {}", pattern.as_str()))
            }
            _ => Ok(()),
        },
    }
}

fn is_email(s: &str) -> bool {
    !s.starts_with('.') && !s.contains("..") && EMAIL_PATTERN.is_match(s)
}
