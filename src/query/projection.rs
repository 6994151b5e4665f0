use crate::config::ID_FIELD;
use crate::store::Document;

/// Field selection applied to returned documents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    /// Only these fields, plus `_id`.
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    /// `"title,price"` includes; `"-description"` excludes. When both kinds are mixed the
    /// inclusions win.
    pub fn parse(s: &str) -> Projection {
        let names: Vec<&str> = s.split(',').map(str::trim).filter(|n| !n.is_empty()).collect();
        let include: Vec<String> = names
            .iter()
            .filter(|n| !n.starts_with('-'))
            .map(|n| n.to_string())
            .collect();
        if !include.is_empty() {
            return Projection::Include(include);
        }
        let exclude: Vec<String> = names
            .iter()
            .filter_map(|n| n.strip_prefix('-'))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        if exclude.is_empty() {
            Projection::All
        } else {
            Projection::Exclude(exclude)
        }
    }

    pub fn from_select(select: Option<&[String]>) -> Projection {
        match select {
            Some(fields) if !fields.is_empty() => Projection::parse(&fields.join(",")),
            _ => Projection::All,
        }
    }

    pub fn apply(&self, mut doc: Document) -> Document {
        match self {
            Projection::All => doc,
            Projection::Include(fields) => {
                doc.retain(|k, _| k == ID_FIELD || fields.iter().any(|f| f == k));
                doc
            }
            Projection::Exclude(fields) => {
                doc.retain(|k, _| !fields.iter().any(|f| f == k));
                doc
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc() -> Document {
        json!({ "_id": "1", "title": "Lamp", "price": 3, "stock": 9 })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn include_keeps_id() {
        let p = Projection::parse("title, price");
        assert_eq!(Value::Object(p.apply(doc())), json!({ "_id": "1", "title": "Lamp", "price": 3 }));
    }

    #[test]
    fn exclude_drops_named_fields() {
        let p = Projection::parse("-stock,-price");
        assert_eq!(Value::Object(p.apply(doc())), json!({ "_id": "1", "title": "Lamp" }));
    }

    #[test]
    fn empty_selection_is_all() {
        assert_eq!(Projection::parse(" , "), Projection::All);
        assert_eq!(Projection::from_select(None), Projection::All);
    }
}
