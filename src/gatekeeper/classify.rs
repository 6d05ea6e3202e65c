// SPDX-License-Identifier: Apache-2.0

//! Statement text heuristics
//!
//! Lightweight scanning of user SQL, not a parser: statement splitting that
//! respects quotes and comments, leading-keyword classification and the
//! ATTACH/DETACH interdiction scan.

use std::sync::OnceLock;

use regex::Regex;

/// Separator used when fragments are joined back together.
pub const STATEMENT_SEPARATOR: &str = ";\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

fn attach_line() -> &'static Regex {
    static ATTACH: OnceLock<Regex> = OnceLock::new();
    ATTACH.get_or_init(|| Regex::new(r"(?i)^\s*(ATTACH|DETACH)\b").expect("static regex"))
}

/// Splits on `;` outside string literals, quoted identifiers and comments.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        // doubled quote escapes itself
                        if bytes.get(i + 1) == Some(&quote) {
                            i += 1;
                        } else {
                            break;
                        }
                    }
                    i += 1;
                }
            }
            b'[' => {
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 1;
            }
            b';' => {
                fragments.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < sql.len() {
        fragments.push(&sql[start..]);
    }
    fragments
}

/// Trims each statement, drops empty ones and rejoins with the canonical separator.
pub fn normalize(sql: &str) -> String {
    let fragments: Vec<&str> = split_statements(sql)
        .into_iter()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect();

    let mut normalized = String::with_capacity(sql.len());
    for (idx, fragment) in fragments.iter().enumerate() {
        if idx > 0 {
            normalized.push_str(STATEMENT_SEPARATOR);
        }
        normalized.push_str(fragment);
        // a trailing line comment would swallow the separator
        let last_line = fragment.lines().last().unwrap_or_default();
        if idx + 1 < fragments.len() && last_line.contains("--") {
            normalized.push('\n');
        }
    }
    normalized
}

/// Skips leading whitespace and comments.
fn skip_trivia(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
        } else if let Some(after) = trimmed.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, tail)| tail).unwrap_or("");
        } else {
            return trimmed;
        }
    }
}

/// First keyword of a statement, uppercased.
pub fn leading_keyword(sql: &str) -> Option<String> {
    let rest = skip_trivia(sql);
    let keyword: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if keyword.is_empty() {
        None
    } else {
        Some(keyword.to_ascii_uppercase())
    }
}

/// SELECT and PRAGMA take the read path; everything else is a write.
pub fn classify(sql: &str) -> StatementKind {
    match leading_keyword(sql).as_deref() {
        Some("SELECT") | Some("PRAGMA") => StatementKind::Read,
        _ => StatementKind::Write,
    }
}

/// True when any statement, or any line of one, starts with ATTACH or DETACH.
pub fn contains_attach_or_detach(sql: &str) -> bool {
    split_statements(sql).into_iter().any(|statement| {
        matches!(leading_keyword(statement).as_deref(), Some("ATTACH") | Some("DETACH"))
            || statement.lines().any(|line| attach_line().is_match(line))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_empty_fragments() {
        assert_eq!(normalize("  SELECT 1 ;; ;SELECT 2;  "), "SELECT 1;\nSELECT 2");
        assert_eq!(normalize(" ; ;"), "");
    }

    #[test]
    fn split_respects_literals_and_comments() {
        let sql = "SELECT 'a;b', \"c;d\" -- e;f\n; /* g;h */ SELECT [i;j]";
        let parts = split_statements(sql);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("'a;b'"));
        assert!(parts[1].contains("[i;j]"));
        assert_eq!(split_statements("SELECT 'it''s;ok'").len(), 1);
    }

    #[test]
    fn normalize_keeps_line_comments_from_swallowing_statements() {
        let normalized = normalize("SELECT 1 -- note\n; SELECT 2");
        assert_eq!(normalized, "SELECT 1 -- note\n;\nSELECT 2");
        assert_eq!(split_statements(&normalized).len(), 2);
    }

    #[test]
    fn leading_keyword_skips_comments() {
        assert_eq!(leading_keyword("  -- hi\n /* x */ select 1").as_deref(), Some("SELECT"));
        assert_eq!(leading_keyword("pragma table_info(t)").as_deref(), Some("PRAGMA"));
        assert_eq!(leading_keyword("  ").as_deref(), None);
        assert_eq!(leading_keyword("(SELECT 1)"), None);
    }

    #[test]
    fn classification_by_first_keyword() {
        assert_eq!(classify("SELECT * FROM t"), StatementKind::Read);
        assert_eq!(classify("Pragma database_list"), StatementKind::Read);
        assert_eq!(classify("INSERT INTO t VALUES (1)"), StatementKind::Write);
        assert_eq!(classify("WITH x AS (SELECT 1) SELECT * FROM x"), StatementKind::Write);
        assert_eq!(classify(""), StatementKind::Write);
    }

    #[test]
    fn attach_detach_detection() {
        assert!(contains_attach_or_detach("attach database 'x.db' as x"));
        assert!(contains_attach_or_detach("SELECT 1;\n  Detach x"));
        assert!(contains_attach_or_detach("/* sneaky */ ATTACH 'x' AS y"));
        assert!(contains_attach_or_detach("SELECT 1\nATTACH 'x' AS y"));
        assert!(!contains_attach_or_detach("SELECT 'attach' AS word"));
        assert!(!contains_attach_or_detach("SELECT * FROM attachments"));
    }
}
