//! Input screening for configuration-supplied names and filter predicates.
//!
//! Filter predicates are compiled by DataFusion against an in-memory table, so
//! they can never reach a real database. They are still screened so that a
//! configuration file can only express row predicates: no statement
//! separators, comments, subqueries or DDL/DML keywords.

use crate::error::{Result, SentriError};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted filter predicate length.
pub const MAX_PREDICATE_LENGTH: usize = 5000;

/// Keywords that may not appear outside string literals in a filter predicate.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "select",
    "insert",
    "update",
    "delete",
    "drop",
    "create",
    "alter",
    "truncate",
    "exec",
    "execute",
    "declare",
    "grant",
    "revoke",
    "copy",
    "attach",
    "pragma",
    "union",
];

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| {
    // Hard-coded pattern
    #[allow(clippy::expect_used)]
    Regex::new(r"'(?:[^']|'')*'").expect("Hard-coded regex pattern should be valid")
});

static FORBIDDEN_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i)\b(?:{})\b", FORBIDDEN_KEYWORDS.join("|"));
    #[allow(clippy::expect_used)]
    Regex::new(&pattern).expect("Hard-coded regex pattern should be valid")
});

/// Screening for column names and filter predicates.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a column name taken from configuration.
    ///
    /// Column names from CSV headers may contain spaces or punctuation, so this
    /// only rejects empty names, oversized names, control characters and quotes.
    pub fn validate_column_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SentriError::config(
                "column name cannot be empty or whitespace-only",
            ));
        }
        if name.len() > 128 {
            return Err(SentriError::config(format!(
                "column name too long (max 128 characters): '{}'",
                crate::logging::truncate_field(name, 32)
            )));
        }
        if name.chars().any(|c| c.is_control() || c == '"') {
            return Err(SentriError::config(format!(
                "column name contains forbidden characters: '{}'",
                name.escape_debug()
            )));
        }
        Ok(())
    }

    /// Screens a filter predicate before it is compiled.
    ///
    /// Keywords are matched on word boundaries outside string literals, so
    /// `status = 'closed'` or `note = 'drop-off'` are accepted.
    pub fn validate_filter_predicate(predicate: &str) -> Result<()> {
        if predicate.len() > MAX_PREDICATE_LENGTH {
            return Err(SentriError::filter(
                crate::logging::truncate_field(predicate, 64),
                format!("predicate too long (max {MAX_PREDICATE_LENGTH} characters)"),
            ));
        }
        if predicate.contains('\0') {
            return Err(SentriError::filter(predicate, "predicate cannot contain null bytes"));
        }

        let code = STRING_LITERAL.replace_all(predicate, "''");
        if code.contains('\'') && code.matches('\'').count() % 2 != 0 {
            return Err(SentriError::filter(predicate, "unterminated string literal"));
        }
        for token in [";", "--", "/*", "*/"] {
            if code.contains(token) {
                return Err(SentriError::filter(
                    predicate,
                    format!("predicate contains forbidden token '{token}'"),
                ));
            }
        }
        if let Some(found) = FORBIDDEN_KEYWORD.find(&code) {
            return Err(SentriError::filter(
                predicate,
                format!(
                    "predicate contains forbidden keyword '{}'",
                    found.as_str().to_lowercase()
                ),
            ));
        }
        Ok(())
    }
}
