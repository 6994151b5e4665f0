//! Resolved collection model: config validated and flattened for runtime use.

use crate::config::{FieldType, ParentConfig, ValidationRule};
use crate::query::Population;
use regex::Regex;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

#[derive(Clone, Debug)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    pub items: Option<FieldType>,
    pub unique: bool,
    /// Target collection for population.
    pub reference: Option<String>,
    pub default: Option<serde_json::Value>,
    pub rules: ValidationRule,
    /// `rules.pattern`, compiled once at resolve time.
    pub pattern: Option<Regex>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldSchema {
            name: name.into(),
            field_type,
            items: None,
            unique: false,
            reference: None,
            default: None,
            rules: ValidationRule::default(),
            pattern: None,
        }
    }

    pub fn is_required(&self) -> bool {
        self.rules.required == Some(true)
    }

    /// Type used to cast a scalar compared against this field (array fields compare per element).
    pub fn scalar_type(&self) -> FieldType {
        match self.field_type {
            FieldType::Array => self.items.unwrap_or(FieldType::String),
            t => t,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CollectionSchema {
    pub name: String,
    pub path_segment: String,
    /// Declared fields in declaration order; validation messages follow this order.
    pub fields: Vec<FieldSchema>,
    pub search_fields: Vec<String>,
    pub timestamps: bool,
    pub populate: Vec<Population>,
    pub parent: Option<ParentConfig>,
    builtin: Vec<FieldSchema>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>, path_segment: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        CollectionSchema {
            name: name.into(),
            path_segment: path_segment.into(),
            fields,
            search_fields: Vec::new(),
            timestamps: true,
            populate: Vec::new(),
            parent: None,
            builtin: vec![
                FieldSchema::new(ID_FIELD, FieldType::Id),
                FieldSchema::new(CREATED_AT, FieldType::Date),
                FieldSchema::new(UPDATED_AT, FieldType::Date),
            ],
        }
    }

    pub fn with_search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Declared field or one of the store-managed fields (`_id`, `createdAt`, `updatedAt`).
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.builtin.iter().find(|f| f.name == name))
    }

    pub fn declared(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.unique)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub collections: Vec<CollectionSchema>,
}
