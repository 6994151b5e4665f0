//! Load collection config from a JSON file and resolve it into runtime schemas.

use crate::config::resolved::{CollectionSchema, FieldSchema, ResolvedModel};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::query::Population;
use regex::Regex;
use std::path::Path;

/// Read a JSON array of collection configs.
pub async fn load_collections(path: &Path) -> Result<Vec<CollectionConfig>, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Build resolved model from collection configs (validates first).
pub fn resolve(configs: &[CollectionConfig]) -> Result<ResolvedModel, ConfigError> {
    validate(configs)?;

    let collections = configs.iter().map(resolve_collection).collect::<Result<Vec<_>, _>>()?;
    Ok(ResolvedModel { collections })
}

fn resolve_collection(c: &CollectionConfig) -> Result<CollectionSchema, ConfigError> {
    let fields = c.fields.iter().map(resolve_field).collect::<Result<Vec<_>, _>>()?;
    let mut schema = CollectionSchema::new(&c.name, &c.path_segment, fields);
    schema.search_fields = c.search_fields.clone();
    schema.timestamps = c.timestamps;
    schema.populate = c
        .populate
        .iter()
        .map(|p| Population {
            path: p.path.clone(),
            select: p.select.clone(),
        })
        .collect();
    schema.parent = c.parent.clone();
    Ok(schema)
}

fn resolve_field(f: &FieldConfig) -> Result<FieldSchema, ConfigError> {
    let pattern = f
        .rules
        .pattern
        .as_deref()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::Validation(format!("invalid pattern for {}: {}", f.name, e)))
        })
        .transpose()?;
    Ok(FieldSchema {
        name: f.name.clone(),
        field_type: f.type_,
        items: f.items,
        unique: f.unique,
        reference: f.ref_.clone(),
        default: f.default.clone(),
        rules: f.rules.clone(),
        pattern,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_fields_in_declaration_order() {
        let configs: Vec<CollectionConfig> = serde_json::from_value(json!([
            { "name": "products", "path_segment": "products",
              "fields": [
                  { "name": "title", "required": true, "min_length": 3 },
                  { "name": "price", "type": "number", "minimum": 0 },
                  { "name": "tags", "type": "array", "items": "string" }
              ],
              "search_fields": ["title"] }
        ]))
        .unwrap();
        let model = resolve(&configs).unwrap();
        let products = &model.collections[0];
        let names: Vec<&str> = products.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["title", "price", "tags"]);
        assert!(products.fields[0].is_required());
        assert_eq!(products.fields[2].scalar_type(), FieldType::String);
        assert!(products.timestamps);
        assert!(products.field("_id").is_some());
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let configs: Vec<CollectionConfig> = serde_json::from_value(json!([
            { "name": "users", "path_segment": "users", "fields": [{ "name": "slug", "pattern": "([" }] }
        ]))
        .unwrap();
        assert!(matches!(resolve(&configs), Err(ConfigError::Validation(_))));
    }
}
