//! Builds parameterized SQL over a `(id uuid, seq bigserial, doc jsonb)` collection table.
//! Identifiers and JSON keys come from config only; every value is a bound text parameter
//! cast in SQL.

use crate::query::{CompareOp, Condition, Filter, ListQuery, SortKey};
use crate::store::Document;
use serde_json::Value;

/// Quote identifier for PostgreSQL.
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub(crate) fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// JSON key as a SQL string literal.
fn json_key(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub(crate) fn unique_index_name(collection: &str, field: &str) -> String {
    format!("{}_{}_unique", collection, field)
}

pub(crate) fn unique_field_from_index<'a>(collection: &str, index: &'a str) -> Option<&'a str> {
    index
        .strip_prefix(collection)?
        .strip_prefix('_')?
        .strip_suffix("_unique")
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<String>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: String) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }
}

pub fn select_by_id(schema: &str, collection: &str, id: &uuid::Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.to_string());
    q.sql = format!(
        "SELECT doc FROM {} WHERE id = ${}::uuid",
        qualified_table(schema, collection),
        n
    );
    q
}

/// Batch fetch for population. Ids are bound as one `uuid[]` literal.
pub fn select_by_ids(schema: &str, collection: &str, ids: &[uuid::Uuid]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let list = ids.iter().map(|u| u.to_string()).collect::<Vec<_>>().join(",");
    let n = q.push_param(format!("{{{}}}", list));
    q.sql = format!(
        "SELECT doc FROM {} WHERE id = ANY(${}::uuid[])",
        qualified_table(schema, collection),
        n
    );
    q
}

pub fn insert(schema: &str, collection: &str, id: &str, doc: &Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_n = q.push_param(id.to_string());
    let doc_n = q.push_param(Value::Object(doc.clone()).to_string());
    q.sql = format!(
        "INSERT INTO {} (id, doc) VALUES (${}::uuid, ${}::jsonb) RETURNING doc",
        qualified_table(schema, collection),
        id_n,
        doc_n
    );
    q
}

/// Shallow merge of `patch`; `stamp` (e.g. `updatedAt`) is merged only when the patch changes the document.
pub fn update(schema: &str, collection: &str, id: &uuid::Uuid, patch: &Document, stamp: &Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_n = q.push_param(id.to_string());
    let patch_n = q.push_param(Value::Object(patch.clone()).to_string());
    let stamp_n = q.push_param(Value::Object(stamp.clone()).to_string());
    q.sql = format!(
        "UPDATE {table} SET doc = CASE WHEN doc || ${p}::jsonb = doc THEN doc \
         ELSE doc || ${p}::jsonb || ${s}::jsonb END \
         WHERE id = ${i}::uuid RETURNING doc",
        table = qualified_table(schema, collection),
        p = patch_n,
        s = stamp_n,
        i = id_n
    );
    q
}

pub fn delete(schema: &str, collection: &str, id: &uuid::Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.to_string());
    q.sql = format!(
        "DELETE FROM {} WHERE id = ${}::uuid RETURNING doc",
        qualified_table(schema, collection),
        n
    );
    q
}

pub fn count(schema: &str, collection: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(filter, &mut q);
    q.sql = format!(
        "SELECT COUNT(*) AS n FROM {}{}",
        qualified_table(schema, collection),
        where_clause
    );
    q
}

/// Filtered, sorted, windowed SELECT. Projection is applied to the decoded rows.
pub fn select_list(schema: &str, collection: &str, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(query.where_filter(), &mut q);
    let order_clause = order_clause(query.sort_keys());
    let window_clause = query
        .window()
        .map(|w| format!(" LIMIT {} OFFSET {}", w.limit, w.skip()))
        .unwrap_or_default();
    q.sql = format!(
        "SELECT doc FROM {}{}{}{}",
        qualified_table(schema, collection),
        where_clause,
        order_clause,
        window_clause
    );
    q
}

fn where_clause(filter: &Filter, q: &mut QueryBuf) -> String {
    let mut parts: Vec<String> = filter.conditions.iter().map(|c| condition_sql(c, q)).collect();
    if let Some(search) = &filter.search {
        let n = q.push_param(search.like_pattern());
        let any: Vec<String> = search
            .fields
            .iter()
            .map(|f| format!("doc ->> {} ILIKE ${}", json_key(f), n))
            .collect();
        parts.push(if any.is_empty() {
            "FALSE".to_string()
        } else {
            format!("({})", any.join(" OR "))
        });
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn condition_sql(c: &Condition, q: &mut QueryBuf) -> String {
    let path = format!("doc -> {}", json_key(&c.field));
    let text_path = format!("doc ->> {}", json_key(&c.field));
    match c.op {
        CompareOp::Eq => {
            let n = q.push_param(c.value.to_string());
            format!("{} @> ${}::jsonb", path, n)
        }
        CompareOp::Ne => {
            let n = q.push_param(c.value.to_string());
            format!("NOT COALESCE({} @> ${}::jsonb, FALSE)", path, n)
        }
        CompareOp::In => {
            let options = c.value.as_array().map(Vec::as_slice).unwrap_or(&[]);
            if options.is_empty() {
                return "FALSE".to_string();
            }
            let any: Vec<String> = options
                .iter()
                .map(|o| {
                    let n = q.push_param(o.to_string());
                    format!("{} @> ${}::jsonb", path, n)
                })
                .collect();
            format!("({})", any.join(" OR "))
        }
        op => match &c.value {
            Value::Number(num) => {
                let n = q.push_param(num.to_string());
                format!(
                    "CASE WHEN jsonb_typeof({}) = 'number' THEN ({})::numeric {} ${}::numeric ELSE FALSE END",
                    path,
                    text_path,
                    op.sql(),
                    n
                )
            }
            Value::String(s) => {
                let n = q.push_param(s.clone());
                format!(
                    "CASE WHEN jsonb_typeof({}) = 'string' THEN ({}) COLLATE \"C\" {} ${} ELSE FALSE END",
                    path,
                    text_path,
                    op.sql(),
                    n
                )
            }
            Value::Bool(_) => {
                let n = q.push_param(c.value.to_string());
                format!(
                    "CASE WHEN jsonb_typeof({}) = 'boolean' THEN {} {} ${}::jsonb ELSE FALSE END",
                    path,
                    path,
                    op.sql(),
                    n
                )
            }
            _ => "FALSE".to_string(),
        },
    }
}

/// ORDER BY the sort keys, tie-broken by insertion order.
fn order_clause(keys: &[SortKey]) -> String {
    let mut parts: Vec<String> = keys
        .iter()
        .map(|k| {
            format!(
                "doc -> {} {}",
                json_key(&k.field),
                if k.descending { "DESC NULLS LAST" } else { "ASC NULLS FIRST" }
            )
        })
        .collect();
    // Ties follow the leading key's direction.
    let newest_first = keys.first().is_some_and(|k| k.descending);
    parts.push(if newest_first { "seq DESC" } else { "seq ASC" }.to_string());
    format!(" ORDER BY {}", parts.join(", "))
}
