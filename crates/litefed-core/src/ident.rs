// SPDX-License-Identifier: Apache-2.0

//! Identifier sanitizing
//!
//! Pure functions that turn file names and user strings into safe SQL
//! identifiers and catalog keys. Nothing here touches the database.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// File extensions picked up by a workspace scan and accepted by import.
pub const DATABASE_EXTENSIONS: [&str; 2] = [".db", ".sqlite"];

/// Schema names SQLite reserves on every connection.
const RESERVED_SCHEMAS: [&str; 2] = ["main", "temp"];

fn illegal_chars() -> &'static Regex {
    static ILLEGAL: OnceLock<Regex> = OnceLock::new();
    ILLEGAL.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_]").expect("static regex"))
}

fn underscore_runs() -> &'static Regex {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"_{2,}").expect("static regex"))
}

/// Strips a trailing extension and lowercases: `"Orders.DB"` -> `"orders"`.
pub fn clean_db_name(input: &str) -> String {
    let input = input.trim();
    let base = match input.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains(['/', '\\']) => stem,
        _ => input,
    };
    base.to_lowercase()
}

/// Folds anything outside `[A-Za-z0-9_]` to `_`, collapses underscore runs,
/// trims edge underscores and guards against a leading digit.
///
/// The result is never empty and is stable under repeated application.
pub fn sanitize_identifier(name: &str) -> String {
    let folded = illegal_chars().replace_all(name.trim(), "_");
    let collapsed = underscore_runs().replace_all(&folded, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        return "unnamed".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{}", trimmed);
    }
    trimmed.to_string()
}

/// Catalog key for a user-supplied database name.
pub fn logical_name(input: &str) -> String {
    sanitize_identifier(&clean_db_name(input))
}

pub fn is_reserved_schema(name: &str) -> bool {
    RESERVED_SCHEMAS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Derives an attach alias from a database file path, moving reserved
/// schema names out of the way (`main.db` -> `main_db`).
pub fn alias_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let alias = logical_name(file_name);
    if is_reserved_schema(&alias) {
        format!("{}_db", alias)
    } else {
        alias
    }
}

/// Candidate name for collision fallbacks: attempt 0 is the base itself.
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}_{}", base, attempt + 1)
    }
}

/// Lowercased extension including the dot, e.g. `".sqlite"`.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

pub fn is_database_file(path: &Path) -> bool {
    file_extension(path)
        .map(|ext| DATABASE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Double-quotes an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schema-qualified, quoted table reference.
pub fn qualified_table(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(table),
    }
}
