//! Population: resolve reference ids stored in a document into the referenced documents.
//!
//! Backends call [`plan`] to learn which ids to fetch from which collection, fetch them in one
//! batch per path, then [`splice`] the results back in.

use crate::config::{CollectionSchema, ID_FIELD};
use crate::query::{Population, Projection};
use crate::store::Document;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug)]
pub struct RefRequest<'a> {
    pub population: &'a Population,
    pub collection: &'a str,
    pub ids: Vec<String>,
}

/// One request per population whose path is a reference field; other paths are skipped.
pub fn plan<'a>(schema: &'a CollectionSchema, doc: &Document, populations: &'a [Population]) -> Vec<RefRequest<'a>> {
    populations
        .iter()
        .filter_map(|p| {
            let collection = schema.declared(&p.path)?.reference.as_deref()?;
            let ids = match doc.get(&p.path) {
                Some(Value::String(id)) => vec![id.clone()],
                Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                _ => Vec::new(),
            };
            Some(RefRequest {
                population: p,
                collection,
                ids,
            })
        })
        .collect()
}

/// Index fetched documents by `_id`.
pub fn by_id(docs: Vec<Document>) -> HashMap<String, Document> {
    docs.into_iter()
        .filter_map(|d| {
            let id = d.get(ID_FIELD)?.as_str()?.to_string();
            Some((id, d))
        })
        .collect()
}

/// Replace the ids at the request's path. A dangling scalar becomes `null`; dangling array
/// entries are dropped.
pub fn splice(doc: &mut Document, request: &RefRequest<'_>, found: &HashMap<String, Document>) {
    let projection = Projection::from_select(request.population.select.as_deref());
    let resolve = |id: &str| found.get(id).cloned().map(|d| Value::Object(projection.apply(d)));
    let Some(current) = doc.get(&request.population.path) else { return };
    let replaced = match current {
        Value::String(id) => resolve(id).unwrap_or(Value::Null),
        Value::Array(items) => Value::Array(items.iter().filter_map(Value::as_str).filter_map(resolve).collect()),
        _ => return,
    };
    doc.insert(request.population.path.clone(), replaced);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldSchema, FieldType};
    use serde_json::json;

    fn schema() -> CollectionSchema {
        let mut category = FieldSchema::new("category", FieldType::Id);
        category.reference = Some("categories".into());
        let mut tags = FieldSchema::new("tags", FieldType::Array);
        tags.items = Some(FieldType::Id);
        tags.reference = Some("tags".into());
        CollectionSchema::new(
            "products",
            "products",
            vec![FieldSchema::new("title", FieldType::String), category, tags],
        )
    }

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn plans_only_reference_paths() {
        let schema = schema();
        let pops = vec![Population::path("category"), Population::path("title"), Population::path("tags")];
        let d = doc(json!({ "category": "c1", "tags": ["t1", "t2"], "title": "x" }));
        let plan = plan(&schema, &d, &pops);
        let summary: Vec<(&str, Vec<String>)> = plan.iter().map(|r| (r.collection, r.ids.clone())).collect();
        assert_eq!(
            summary,
            vec![("categories", vec!["c1".to_string()]), ("tags", vec!["t1".to_string(), "t2".to_string()])]
        );
    }

    #[test]
    fn splices_with_select_and_drops_dangling() {
        let schema = schema();
        let pops = vec![Population::path("category").select(&["name"]), Population::path("tags")];
        let mut d = doc(json!({ "category": "c1", "tags": ["t1", "gone"] }));
        let found = by_id(vec![
            doc(json!({ "_id": "c1", "name": "Lighting", "slug": "lighting" })),
            doc(json!({ "_id": "t1", "label": "new" })),
        ]);
        for request in plan(&schema, &d.clone(), &pops) {
            splice(&mut d, &request, &found);
        }
        assert_eq!(
            Value::Object(d),
            json!({ "category": { "_id": "c1", "name": "Lighting" }, "tags": [{ "_id": "t1", "label": "new" }] })
        );
    }

    #[test]
    fn dangling_scalar_becomes_null() {
        let schema = schema();
        let pops = vec![Population::path("category")];
        let mut d = doc(json!({ "category": "missing" }));
        let snapshot = d.clone();
        for request in plan(&schema, &snapshot, &pops) {
            splice(&mut d, &request, &HashMap::new());
        }
        assert_eq!(d["category"], Value::Null);
    }
}
