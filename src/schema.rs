//! Model-level casting and validation of documents against a collection schema.
//!
//! Create runs every field rule (required, defaults, type, constraints) and drops keys the
//! schema does not declare. Update checks only the fields present in the patch. Both collect
//! one message per failing field, in declaration order, instead of stopping at the first.

use crate::config::{CollectionSchema, FieldSchema, FieldType, CREATED_AT, ID_FIELD, UPDATED_AT};
use crate::store::Document;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Number, Value};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn joined(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.joined())
    }
}

/// RFC 3339 with millisecond precision in UTC; sorts lexicographically in time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct DocumentValidator;

impl DocumentValidator {
    /// Validate a create body. Returns the cast document without `_id` or timestamps.
    pub fn validate_new(
        schema: &CollectionSchema,
        body: &Document,
        now: DateTime<Utc>,
    ) -> Result<Document, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut out = Document::new();
        for field in &schema.fields {
            match body.get(&field.name).filter(|v| !v.is_null()) {
                Some(v) => match validate_field(field, v) {
                    Ok(cast) => {
                        out.insert(field.name.clone(), cast);
                    }
                    Err(msg) => errors.push(FieldError::new(&field.name, msg)),
                },
                None => {
                    if let Some(default) = &field.default {
                        out.insert(field.name.clone(), resolve_default(field, default, now));
                    } else if field.is_required() {
                        errors.push(FieldError::new(&field.name, required_message(field)));
                    }
                }
            }
        }
        errors.into_result(out)
    }

    /// Validate an update patch: only present fields are checked; `null` clears a field unless it is required.
    pub fn validate_patch(schema: &CollectionSchema, patch: &Document) -> Result<Document, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut out = Document::new();
        for field in &schema.fields {
            let Some(v) = patch.get(&field.name) else { continue };
            if v.is_null() {
                if field.is_required() {
                    errors.push(FieldError::new(&field.name, required_message(field)));
                } else {
                    out.insert(field.name.clone(), Value::Null);
                }
                continue;
            }
            match validate_field(field, v) {
                Ok(cast) => {
                    out.insert(field.name.clone(), cast);
                }
                Err(msg) => errors.push(FieldError::new(&field.name, msg)),
            }
        }
        errors.into_result(out)
    }
}

/// Shallow-merge `patch` into `current`. Returns `None` when nothing would change.
pub fn merge_patch(current: &Document, patch: &Document) -> Option<Document> {
    let changed = patch.iter().any(|(k, v)| current.get(k) != Some(v));
    if !changed {
        return None;
    }
    let mut merged = current.clone();
    for (k, v) in patch {
        merged.insert(k.clone(), v.clone());
    }
    Some(merged)
}

/// Stamp store-managed fields onto a validated document.
pub fn stamp_new(schema: &CollectionSchema, mut doc: Document, id: &str, now: DateTime<Utc>) -> Document {
    doc.insert(ID_FIELD.into(), Value::String(id.to_string()));
    if schema.timestamps {
        let ts = Value::String(timestamp(now));
        doc.insert(CREATED_AT.into(), ts.clone());
        doc.insert(UPDATED_AT.into(), ts);
    }
    doc
}

fn required_message(field: &FieldSchema) -> String {
    field
        .rules
        .message
        .clone()
        .unwrap_or_else(|| format!("{} is required", field.name))
}

fn resolve_default(field: &FieldSchema, default: &Value, now: DateTime<Utc>) -> Value {
    if field.field_type == FieldType::Date && default.as_str() == Some("now") {
        return Value::String(timestamp(now));
    }
    default.clone()
}

fn validate_field(field: &FieldSchema, v: &Value) -> Result<Value, String> {
    let cast = cast_value(field, v).map_err(|msg| field.rules.message.clone().unwrap_or(msg))?;
    check_rules(field, &cast).map_err(|msg| field.rules.message.clone().unwrap_or(msg))?;
    Ok(cast)
}

fn cast_failed(field: &FieldSchema, ty: FieldType, v: &Value) -> String {
    let shown = match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!("Cast to {} failed for value \"{}\" at path \"{}\"", ty.as_str(), shown, field.name)
}

fn cast_value(field: &FieldSchema, v: &Value) -> Result<Value, String> {
    if field.field_type == FieldType::Array {
        let items = match v {
            Value::Array(items) => items.clone(),
            scalar => vec![scalar.clone()],
        };
        let Some(item_type) = field.items else {
            return Ok(Value::Array(items));
        };
        return items
            .iter()
            .map(|item| cast_scalar(item_type, item).ok_or_else(|| cast_failed(field, item_type, item)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    cast_scalar(field.field_type, v).ok_or_else(|| cast_failed(field, field.field_type, v))
}

/// Cast a JSON value to the declared type; `None` when it cannot be represented.
pub fn cast_scalar(ty: FieldType, v: &Value) -> Option<Value> {
    match ty {
        FieldType::String => match v {
            Value::String(_) => Some(v.clone()),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        FieldType::Number => match v {
            Value::Number(_) => Some(v.clone()),
            Value::String(s) => parse_number(s),
            _ => None,
        },
        FieldType::Integer => match v {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(v.clone()),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::Number((f as i64).into())),
            Value::String(s) => s.trim().parse::<i64>().ok().map(|i| Value::Number(i.into())),
            _ => None,
        },
        FieldType::Boolean => match v {
            Value::Bool(_) => Some(v.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::Date => match v {
            Value::String(s) => parse_date(s).map(|d| Value::String(timestamp(d))),
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|d| Value::String(timestamp(d))),
            _ => None,
        },
        FieldType::Id => v
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s.trim()).ok())
            .map(|u| Value::String(u.to_string())),
        FieldType::Object => v.is_object().then(|| v.clone()),
        FieldType::Array => v.is_array().then(|| v.clone()),
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

fn check_rules(field: &FieldSchema, v: &Value) -> Result<(), String> {
    let col = field.name.as_str();
    let rule = &field.rules;
    if let Some(format) = &rule.format {
        check_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(format!("{} must be at most {} characters", col, max));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(format!("{} must be at least {} characters", col, min));
            }
        }
        if let Some(re) = &field.pattern {
            if !re.is_match(s) {
                return Err(format!("{} does not match required pattern", col));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        let values: Vec<&Value> = match v {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        if let Some(bad) = values.into_iter().find(|x| !allowed.iter().any(|a| value_eq(x, a))) {
            let shown: Vec<String> = allowed.iter().take(5).map(display_value).collect();
            return Err(format!(
                "{} is not a valid value for {}; must be one of: {}",
                display_value(bad),
                col,
                shown.join(", ")
            ));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(format!("{} must be at least {}", col, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(format!("{} must be at most {}", col, max));
            }
        }
    }
    Ok(())
}

fn check_format(col: &str, v: &Value, format: &str) -> Result<(), String> {
    let Some(s) = v.as_str() else { return Ok(()) };
    match format.to_lowercase().as_str() {
        "email" => {
            let well_formed = s
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
                .unwrap_or(false);
            if !well_formed {
                return Err(format!("{} must be a valid email", col));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(format!("{} must be a valid UUID", col));
            }
        }
        _ => {}
    }
    Ok(())
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equality with numbers compared by value (`1` equals `1.0`).
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationRule;
    use serde_json::json;

    fn product_schema() -> CollectionSchema {
        let mut title = FieldSchema::new("title", FieldType::String);
        title.rules = ValidationRule {
            required: Some(true),
            min_length: Some(3),
            ..Default::default()
        };
        let mut price = FieldSchema::new("price", FieldType::Number);
        price.rules = ValidationRule {
            required: Some(true),
            minimum: Some(0.0),
            message: None,
            ..Default::default()
        };
        let mut status = FieldSchema::new("status", FieldType::String);
        status.default = Some(json!("draft"));
        status.rules.allowed = Some(vec![json!("draft"), json!("published")]);
        let mut tags = FieldSchema::new("tags", FieldType::Array);
        tags.items = Some(FieldType::String);
        CollectionSchema::new("products", "products", vec![title, price, status, tags])
    }

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn create_collects_every_violation_in_field_order() {
        let schema = product_schema();
        let err = DocumentValidator::validate_new(&schema, &doc(json!({ "price": -1, "status": "gone" })), Utc::now())
            .unwrap_err();
        let fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["title", "price", "status"]);
        assert_eq!(
            err.joined(),
            "title is required, price must be at least 0, gone is not a valid value for status; must be one of: draft, published"
        );
    }

    #[test]
    fn create_casts_applies_defaults_and_drops_unknown_keys() {
        let schema = product_schema();
        let out = DocumentValidator::validate_new(
            &schema,
            &doc(json!({ "title": "Lamp", "price": "12.5", "tags": "home", "_id": "x", "extra": true })),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(
            Value::Object(out),
            json!({ "title": "Lamp", "price": 12.5, "status": "draft", "tags": ["home"] })
        );
    }

    #[test]
    fn cast_failure_reports_path() {
        let schema = product_schema();
        let err = DocumentValidator::validate_new(&schema, &doc(json!({ "title": "Lamp", "price": "cheap" })), Utc::now())
            .unwrap_err();
        assert_eq!(err.joined(), "Cast to Number failed for value \"cheap\" at path \"price\"");
    }

    #[test]
    fn custom_message_replaces_generated_one() {
        let mut schema = product_schema();
        schema.fields[0].rules.message = Some("Product title is required".into());
        let err = DocumentValidator::validate_new(&schema, &doc(json!({ "price": 1 })), Utc::now()).unwrap_err();
        assert_eq!(err.joined(), "Product title is required");
    }

    #[test]
    fn patch_checks_only_present_fields() {
        let schema = product_schema();
        let out = DocumentValidator::validate_patch(&schema, &doc(json!({ "price": 3 }))).unwrap();
        assert_eq!(Value::Object(out), json!({ "price": 3 }));

        let err = DocumentValidator::validate_patch(&schema, &doc(json!({ "title": null, "price": -2 }))).unwrap_err();
        assert_eq!(err.joined(), "title is required, price must be at least 0");
    }

    #[test]
    fn merge_reports_no_change_for_identical_patch() {
        let current = doc(json!({ "title": "Lamp", "price": 3 }));
        assert!(merge_patch(&current, &doc(json!({ "price": 3 }))).is_none());
        let merged = merge_patch(&current, &doc(json!({ "price": 4 }))).unwrap();
        assert_eq!(merged["price"], 4);
        assert_eq!(merged["title"], "Lamp");
    }

    #[test]
    fn dates_normalize_to_utc_millis() {
        assert_eq!(
            cast_scalar(FieldType::Date, &json!("2024-03-01")),
            Some(json!("2024-03-01T00:00:00.000Z"))
        );
        assert_eq!(
            cast_scalar(FieldType::Date, &json!("2024-03-01T10:00:00+02:00")),
            Some(json!("2024-03-01T08:00:00.000Z"))
        );
        assert_eq!(cast_scalar(FieldType::Date, &json!("yesterday")), None);
    }
}
