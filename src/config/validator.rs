//! Config validation: referential integrity between collections and route consistency.

use crate::config::{CollectionConfig, FieldType};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(configs: &[CollectionConfig]) -> Result<(), ConfigError> {
    let names: HashSet<&str> = configs.iter().map(|c| c.name.as_str()).collect();
    let segments: HashSet<&str> = configs.iter().map(|c| c.path_segment.as_str()).collect();
    let mut path_segments = HashSet::new();

    for c in configs {
        if c.name.trim().is_empty() {
            return Err(ConfigError::Validation("collection name must not be empty".into()));
        }
        if !path_segments.insert(c.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(c.path_segment.clone()));
        }

        let mut field_names = HashSet::new();
        for f in &c.fields {
            if !field_names.insert(f.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    collection: c.name.clone(),
                    field: f.name.clone(),
                });
            }
            if f.name.starts_with('_') || f.name == "createdAt" || f.name == "updatedAt" {
                return Err(ConfigError::Validation(format!(
                    "{}.{} collides with a store-managed field",
                    c.name, f.name
                )));
            }
            if let Some(target) = &f.ref_ {
                if !names.contains(target.as_str()) {
                    return Err(ConfigError::MissingReference {
                        kind: "collection",
                        id: target.clone(),
                    });
                }
                let holds_ids = f.type_ == FieldType::Id
                    || (f.type_ == FieldType::Array && f.items == Some(FieldType::Id));
                if !holds_ids {
                    return Err(ConfigError::Validation(format!(
                        "{}.{} has a ref but does not hold ids",
                        c.name, f.name
                    )));
                }
            }
        }

        for s in &c.search_fields {
            if !field_names.contains(s.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "search field",
                    id: format!("{}.{}", c.name, s),
                });
            }
        }

        for p in &c.populate {
            let field = c
                .fields
                .iter()
                .find(|f| f.name == p.path)
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "populate path",
                    id: format!("{}.{}", c.name, p.path),
                })?;
            if field.ref_.is_none() {
                return Err(ConfigError::Validation(format!(
                    "populate path {}.{} is not a ref field",
                    c.name, p.path
                )));
            }
        }

        if let Some(parent) = &c.parent {
            if !field_names.contains(parent.field.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "parent field",
                    id: format!("{}.{}", c.name, parent.field),
                });
            }
            if !segments.contains(parent.path_segment.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "parent path segment",
                    id: parent.path_segment.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> Vec<CollectionConfig> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn rejects_duplicate_path_segments() {
        let configs = parse(json!([
            { "name": "products", "path_segment": "items" },
            { "name": "categories", "path_segment": "items" }
        ]));
        assert!(matches!(validate(&configs), Err(ConfigError::DuplicatePathSegment(p)) if p == "items"));
    }

    #[test]
    fn rejects_ref_to_unknown_collection() {
        let configs = parse(json!([
            { "name": "products", "path_segment": "products",
              "fields": [{ "name": "category", "type": "id", "ref": "categories" }] }
        ]));
        assert!(matches!(validate(&configs), Err(ConfigError::MissingReference { kind: "collection", .. })));
    }

    #[test]
    fn rejects_populate_on_plain_field() {
        let configs = parse(json!([
            { "name": "products", "path_segment": "products",
              "fields": [{ "name": "title" }],
              "populate": [{ "path": "title" }] }
        ]));
        assert!(matches!(validate(&configs), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_parent_segment_without_collection() {
        let configs = parse(json!([
            { "name": "products", "path_segment": "products",
              "fields": [{ "name": "category", "type": "id" }],
              "parent": { "path_segment": "departments", "field": "category" } }
        ]));
        assert!(matches!(
            validate(&configs),
            Err(ConfigError::MissingReference { kind: "parent path segment", .. })
        ));
    }

    #[test]
    fn accepts_consistent_config() {
        let configs = parse(json!([
            { "name": "categories", "path_segment": "categories", "fields": [{ "name": "name", "required": true }] },
            { "name": "products", "path_segment": "products",
              "fields": [
                  { "name": "title" },
                  { "name": "category", "type": "id", "ref": "categories" }
              ],
              "search_fields": ["title"],
              "populate": [{ "path": "category", "select": ["name"] }],
              "parent": { "path_segment": "categories", "field": "category" } }
        ]));
        validate(&configs).unwrap();
    }
}
