//! Filter conditions parsed from the query string, plus the upstream scope merge.

use crate::config::{CollectionSchema, FieldSchema};
use crate::query::{QueryParams, RESERVED_PARAMS};
use crate::schema::{cast_scalar, value_eq};
use crate::store::Document;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl CompareOp {
    /// Operator from the bracket suffix in `field[op]=value`.
    pub fn from_suffix(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "gt" => CompareOp::Gt,
            "gte" => CompareOp::Gte,
            "lt" => CompareOp::Lt,
            "lte" => CompareOp::Lte,
            "in" => CompareOp::In,
            _ => return None,
        })
    }

    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::In => "IN",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: CompareOp,
    /// For `In`, always an array.
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Condition {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Condition::new(field, CompareOp::Eq, value)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let actual = doc.get(&self.field);
        match self.op {
            CompareOp::Eq => actual.is_some_and(|a| eq_or_contains(a, &self.value)),
            CompareOp::Ne => !actual.is_some_and(|a| eq_or_contains(a, &self.value)),
            CompareOp::In => match (&self.value, actual) {
                (Value::Array(options), Some(a)) => options.iter().any(|o| eq_or_contains(a, o)),
                _ => false,
            },
            op => actual
                .and_then(|a| compare_scalars(a, &self.value))
                .is_some_and(|ord| match op {
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Gte => ord != Ordering::Less,
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Lte => ord != Ordering::Greater,
                    _ => false,
                }),
        }
    }
}

/// Equality; against an array field, matches when any element is equal.
fn eq_or_contains(actual: &Value, expected: &Value) -> bool {
    if value_eq(actual, expected) {
        return true;
    }
    matches!(actual, Value::Array(items) if items.iter().any(|i| value_eq(i, expected)))
}

/// Ordering between two scalars of the same JSON kind; `None` across kinds.
pub fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Case-insensitive substring match of `term` over any of `fields`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSearch {
    pub fields: Vec<String>,
    pub term: String,
}

impl TextSearch {
    pub fn matches(&self, doc: &Document) -> bool {
        let needle = self.term.to_lowercase();
        self.fields.iter().any(|f| match doc.get(f) {
            Some(Value::String(s)) => s.to_lowercase().contains(&needle),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .any(|s| s.to_lowercase().contains(&needle)),
            _ => false,
        })
    }

    /// `ILIKE` pattern with `%`, `_` and `\` in the term escaped.
    pub fn like_pattern(&self) -> String {
        let mut out = String::with_capacity(self.term.len() + 2);
        out.push('%');
        for ch in self.term.chars() {
            if matches!(ch, '%' | '_' | '\\') {
                out.push('\\');
            }
            out.push(ch);
        }
        out.push('%');
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub search: Option<TextSearch>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_search(mut self, search: TextSearch) -> Self {
        self.search = Some(search);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc)) && self.search.as_ref().map_or(true, |s| s.matches(doc))
    }

    /// Merge with an upstream scope filter: conditions are ANDed, and any field the scope
    /// constrains is taken from the scope only.
    pub fn scoped_by(self, scope: &Filter) -> Filter {
        let pinned: HashSet<&str> = scope.conditions.iter().map(|c| c.field.as_str()).collect();
        let mut conditions = scope.conditions.clone();
        conditions.extend(
            self.conditions
                .into_iter()
                .filter(|c| !pinned.contains(c.field.as_str())),
        );
        Filter {
            conditions,
            search: self.search.or_else(|| scope.search.clone()),
        }
    }

    /// Conditions from `field=value` and `field[op]=value` pairs. Reserved keys, unknown fields
    /// and unknown operators are ignored.
    pub fn from_query(schema: &CollectionSchema, params: &QueryParams) -> Filter {
        let mut filter = Filter::new();
        for (key, raw) in params {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            let (name, op) = match key.split_once('[') {
                Some((name, rest)) => {
                    let Some(op) = rest.strip_suffix(']').and_then(CompareOp::from_suffix) else {
                        continue;
                    };
                    (name, op)
                }
                None => (key.as_str(), CompareOp::Eq),
            };
            let Some(field) = schema.field(name) else { continue };
            let value = match op {
                CompareOp::In => Value::Array(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| cast_query_value(field, s))
                        .collect(),
                ),
                _ => cast_query_value(field, raw),
            };
            filter = filter.and(Condition::new(name, op, value));
        }
        filter
    }
}

/// Cast a raw query-string value by the field's declared type, falling back to the string.
pub fn cast_query_value(field: &FieldSchema, raw: &str) -> Value {
    let raw_value = Value::String(raw.to_string());
    cast_scalar(field.scalar_type(), &raw_value).unwrap_or(raw_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldType;
    use serde_json::json;

    fn schema() -> CollectionSchema {
        let mut tags = FieldSchema::new("tags", FieldType::Array);
        tags.items = Some(FieldType::String);
        CollectionSchema::new(
            "products",
            "products",
            vec![
                FieldSchema::new("title", FieldType::String),
                FieldSchema::new("price", FieldType::Number),
                FieldSchema::new("active", FieldType::Boolean),
                tags,
            ],
        )
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_typed_equality_and_operators() {
        let f = Filter::from_query(
            &schema(),
            &params(&[("price[gte]", "10"), ("active", "true"), ("page", "2"), ("color", "red"), ("price[zz]", "1")]),
        );
        assert_eq!(
            f.conditions,
            vec![
                Condition::eq("active", json!(true)),
                Condition::new("price", CompareOp::Gte, json!(10)),
            ]
        );
    }

    #[test]
    fn in_operator_splits_values() {
        let f = Filter::from_query(&schema(), &params(&[("price[in]", "1, 2,,3")]));
        assert_eq!(f.conditions[0].value, json!([1, 2, 3]));
        assert!(f.matches(&doc(json!({ "price": 2 }))));
        assert!(!f.matches(&doc(json!({ "price": 4 }))));
    }

    #[test]
    fn equality_matches_array_elements() {
        let f = Filter::new().and(Condition::eq("tags", json!("red")));
        assert!(f.matches(&doc(json!({ "tags": ["blue", "red"] }))));
        assert!(!f.matches(&doc(json!({ "tags": ["blue"] }))));
        assert!(!f.matches(&doc(json!({}))));
    }

    #[test]
    fn comparisons_do_not_cross_types() {
        let gt = Condition::new("price", CompareOp::Gt, json!(5));
        assert!(gt.matches(&doc(json!({ "price": 5.5 }))));
        assert!(!gt.matches(&doc(json!({ "price": "9" }))));
        assert!(!gt.matches(&doc(json!({}))));
        let ne = Condition::new("price", CompareOp::Ne, json!(5));
        assert!(ne.matches(&doc(json!({}))));
    }

    #[test]
    fn scope_pins_its_fields_and_keeps_the_rest() {
        let scope = Filter::new().and(Condition::eq("category", json!("c1")));
        let query = Filter::new()
            .and(Condition::eq("category", json!("c2")))
            .and(Condition::new("price", CompareOp::Lt, json!(10)));
        let merged = query.scoped_by(&scope);
        assert_eq!(
            merged.conditions,
            vec![
                Condition::eq("category", json!("c1")),
                Condition::new("price", CompareOp::Lt, json!(10)),
            ]
        );
    }

    #[test]
    fn search_is_case_insensitive_over_fields() {
        let s = TextSearch {
            fields: vec!["title".into(), "tags".into()],
            term: "LaM".into(),
        };
        assert!(s.matches(&doc(json!({ "title": "Desk lamp" }))));
        assert!(s.matches(&doc(json!({ "title": "x", "tags": ["lamps"] }))));
        assert!(!s.matches(&doc(json!({ "title": "chair" }))));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let s = TextSearch {
            fields: vec![],
            term: "50%_off".into(),
        };
        assert_eq!(s.like_pattern(), "%50\\%\\_off%");
    }
}
