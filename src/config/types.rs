//! Raw collection config types matching the collections JSON file.

use serde::{Deserialize, Serialize};

/// Declared type of a document field. Drives casting of body values and query-string values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Id,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Number => "Number",
            FieldType::Integer => "Integer",
            FieldType::Boolean => "Boolean",
            FieldType::Date => "Date",
            FieldType::Id => "ObjectId",
            FieldType::Object => "Object",
            FieldType::Array => "Array",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    /// Replaces every generated message for this field.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_: FieldType,
    /// Element type when `type` is `array`.
    #[serde(default)]
    pub items: Option<FieldType>,
    #[serde(default)]
    pub unique: bool,
    /// Collection name the stored id (or ids) refer to.
    #[serde(default, rename = "ref")]
    pub ref_: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(flatten)]
    pub rules: ValidationRule,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PopulateConfig {
    pub path: String,
    #[serde(default)]
    pub select: Option<Vec<String>>,
}

/// Mounts the collection's list and create routes below a parent document, e.g.
/// `/categories/:id/products`, scoped to documents whose `field` holds that id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParentConfig {
    pub path_segment: String,
    pub field: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    pub path_segment: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default)]
    pub populate: Vec<PopulateConfig>,
    #[serde(default)]
    pub parent: Option<ParentConfig>,
}

fn default_true() -> bool {
    true
}
