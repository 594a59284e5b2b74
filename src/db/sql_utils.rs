// =====================================================
// SQL UTILITIES MODULE
// Identifier checks, placeholders and template substitution
// =====================================================

use crate::db_types::DatabaseType;
use regex::Regex;
use std::sync::LazyLock;

static COLUMN_IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").unwrap());

static TABLE_IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_$]+(\.[A-Za-z0-9_$]+)?$").unwrap()
});

/// Table names may carry one schema qualifier (`schema.table`).
pub fn is_safe_table_name(name: &str) -> bool {
    TABLE_IDENTIFIER_REGEX.is_match(name)
}

pub fn is_safe_column_name(name: &str) -> bool {
    COLUMN_IDENTIFIER_REGEX.is_match(name)
}

/// Positional placeholder for the `position`-th parameter (1-based) of a
/// statement.
pub fn placeholder(db_type: &DatabaseType, position: usize) -> String {
    match db_type {
        DatabaseType::PostgreSQL => format!("${}", position),
        DatabaseType::MySQL | DatabaseType::SQLite => "?".to_string(),
    }
}

/// Replaces every `@` of a DDL or finalization template with the table name.
/// Returns `None` when no usable template is configured.
pub fn substitute_table_token(template: Option<&str>, table: &str) -> Option<String> {
    template
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.replace('@', table))
}
