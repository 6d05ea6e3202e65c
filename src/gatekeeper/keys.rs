// SPDX-License-Identifier: Apache-2.0

//! Primary-key discovery for editable result grids.
//!
//! Only simple single-table SELECTs are understood: the first table after
//! `FROM` is taken as the row source. Joins and subqueries yield no keys.

use std::sync::OnceLock;

use regex::Regex;
use sqlx::sqlite::SqliteConnection;
use tracing::debug;

use litefed_core::WorkspaceResult;

use crate::engine::sqlite::{engine_error, pragma_call, table_columns};

const IDENT: &str = r#""(?:[^"]|"")+"|\[[^\]]+\]|`[^`]+`|[A-Za-z_][A-Za-z0-9_$]*"#;

/// A table reference lifted from statement text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

fn from_clause() -> &'static Regex {
    static FROM: OnceLock<Regex> = OnceLock::new();
    FROM.get_or_init(|| {
        let pattern = format!(r"(?is)\bFROM\s+({ident})(?:\s*\.\s*({ident}))?", ident = IDENT);
        Regex::new(&pattern).expect("static regex")
    })
}

fn select_list() -> &'static Regex {
    static LIST: OnceLock<Regex> = OnceLock::new();
    LIST.get_or_init(|| {
        Regex::new(r"(?is)^\s*SELECT\s+(?:DISTINCT\s+|ALL\s+)?(.*?)\bFROM\b").expect("static regex")
    })
}

fn unquote(ident: &str) -> String {
    let ident = ident.trim();
    let inner = |open: char, close: char| {
        ident
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
    };
    if let Some(inner) = inner('"', '"') {
        return inner.replace("\"\"", "\"");
    }
    if let Some(inner) = inner('[', ']').or_else(|| inner('`', '`')) {
        return inner.to_string();
    }
    ident.to_string()
}

/// First `FROM <table>` or `FROM <schema>.<table>` in the statement.
pub fn extract_from_table(sql: &str) -> Option<TableRef> {
    let caps = from_clause().captures(sql)?;
    let first = unquote(caps.get(1)?.as_str());
    match caps.get(2) {
        Some(table) => Some(TableRef {
            schema: Some(first),
            table: unquote(table.as_str()),
        }),
        None => Some(TableRef {
            schema: None,
            table: first,
        }),
    }
}

/// Primary-key columns in key order. Falls back to a primary-key-origin
/// index, then to the first UNIQUE constraint index.
pub async fn discover_key_columns(
    conn: &mut SqliteConnection,
    schema: Option<&str>,
    table: &str,
) -> WorkspaceResult<Vec<String>> {
    let mut pk: Vec<(i64, String)> = table_columns(conn, schema, table)
        .await?
        .into_iter()
        .filter(|col| col.is_primary_key())
        .map(|col| (col.primary_key_position, col.name))
        .collect();
    if !pk.is_empty() {
        pk.sort_by_key(|(position, _)| *position);
        return Ok(pk.into_iter().map(|(_, name)| name).collect());
    }

    let list_sql = format!(
        r#"SELECT name, origin, "unique" FROM {} ORDER BY seq"#,
        pragma_call("index_list", schema)
    );
    let mut query = sqlx::query_as::<_, (String, String, i64)>(&list_sql).bind(table);
    if let Some(schema) = schema {
        query = query.bind(schema);
    }
    let indexes = query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &list_sql))?;

    let candidate = indexes
        .iter()
        .find(|(_, origin, _)| origin == "pk")
        .or_else(|| {
            indexes
                .iter()
                .find(|(_, origin, unique)| origin == "u" && *unique != 0)
        });
    let Some((index, origin, _)) = candidate else {
        return Ok(Vec::new());
    };

    let info_sql = format!(
        "SELECT name FROM {} ORDER BY seqno",
        pragma_call("index_info", schema)
    );
    let mut query = sqlx::query_scalar::<_, Option<String>>(&info_sql).bind(index.as_str());
    if let Some(schema) = schema {
        query = query.bind(schema);
    }
    let names = query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &info_sql))?;

    // expression indexes have unnamed columns
    if names.iter().any(Option::is_none) {
        return Ok(Vec::new());
    }
    debug!(table, index = %index, origin = %origin, "Using index as row key");
    Ok(names.into_iter().flatten().collect())
}

/// Splits a select list on commas outside parentheses and quotes.
fn select_items(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '[') => quote = Some(']'),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                items.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(list[start..].trim());
    items
}

/// `*` or `<table>.*` as a whole select item
fn is_star_item(item: &str) -> bool {
    match item.strip_suffix('*') {
        Some("") => true,
        Some(prefix) => prefix
            .trim_end()
            .strip_suffix('.')
            .map(|qualifier| {
                let qualifier = qualifier.trim();
                !qualifier.is_empty() && !qualifier.contains(|c: char| "()*+-/".contains(c))
            })
            .unwrap_or(false),
        None => false,
    }
}

/// Keys that appear in the result: all of them behind a `*` selector,
/// otherwise only those named in the statement text.
pub fn keys_present(sql: &str, keys: &[String]) -> Vec<String> {
    let star = select_list()
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|list| select_items(list.as_str()).into_iter().any(is_star_item))
        .unwrap_or(false);
    if star {
        return keys.to_vec();
    }

    keys.iter()
        .filter(|key| {
            Regex::new(&format!(r"(?i)(^|[^A-Za-z0-9_]){}($|[^A-Za-z0-9_])", regex::escape(key)))
                .map(|re| re.is_match(sql))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}
