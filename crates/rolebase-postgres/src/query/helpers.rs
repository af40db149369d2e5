//! Query builder helper functions.

use crate::{Result, RolebaseError, SqlValue};
use unicode_normalization::UnicodeNormalization;

/// Quotes a SQL identifier.
///
/// Handles schema-qualified names by quoting each part separately.
pub fn quote_identifier(name: &str) -> String {
    if name.contains('.') {
        name.split('.')
            .map(|part| format!("\"{}\"", part))
            .collect::<Vec<_>>()
            .join(".")
    } else {
        format!("\"{}\"", name)
    }
}

/// Validates a single identifier part (schema, table or column name).
///
/// Identifiers end up in SQL text, so only plain ASCII names are accepted.
/// Reserved words are allowed because schema and table names are quoted and
/// column names in this schema (`name`, `action`, `resource`) are non-reserved.
pub fn validate_identifier_part(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RolebaseError::Query("Identifier cannot be empty".to_string()));
    }

    // Normalize to NFKC to prevent Unicode confusables
    let name = name.nfkc().collect::<String>();

    // PostgreSQL limit is 63 bytes
    if name.len() > 63 {
        return Err(RolebaseError::Query(format!(
            "Identifier '{}' exceeds maximum length of 63",
            name
        )));
    }

    let first_char = name.chars().next().ok_or_else(|| {
        RolebaseError::Query(format!("Identifier '{}' is empty or invalid", name))
    })?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(RolebaseError::Query(format!(
            "Identifier '{}' must start with a letter or underscore",
            name
        )));
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(RolebaseError::Query(format!(
            "Identifier '{}' contains invalid character '{}'",
            name, ch
        )));
    }

    let name_lower = name.to_lowercase();
    if name_lower.starts_with("pg_") {
        return Err(RolebaseError::Query(format!(
            "Access to PostgreSQL system catalog '{}' is not allowed",
            name
        )));
    }
    if name_lower == "information_schema" {
        return Err(RolebaseError::Query(
            "Access to information_schema is not allowed".to_string(),
        ));
    }

    Ok(())
}

/// Validates a projected or returned column; `*` is accepted.
pub fn validate_column(name: &str) -> Result<()> {
    if name == "*" {
        return Ok(());
    }
    validate_identifier_part(name)
}

/// Escapes LIKE metacharacters so caller text matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Rejects `field` if the clause already names it.
pub(crate) fn reject_duplicate<'a>(
    field: &str,
    taken: impl IntoIterator<Item = &'a str>,
    clause: &str,
) -> Result<()> {
    if taken.into_iter().any(|name| name == field) {
        return Err(RolebaseError::Query(format!(
            "Field '{}' appears more than once in {}",
            field, clause
        )));
    }
    Ok(())
}

/// Accumulates bound parameters while SQL is rendered.
///
/// `push` appends the value and hands back its placeholder in one step, so a
/// placeholder can never be emitted without its parameter or out of order.
#[derive(Debug, Default)]
pub(crate) struct ParamList {
    params: Vec<SqlValue>,
}

impl ParamList {
    pub(crate) fn push(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub(crate) fn into_vec(self) -> Vec<SqlValue> {
        self.params
    }

    /// `None` when nothing was bound.
    pub(crate) fn into_option(self) -> Option<Vec<SqlValue>> {
        if self.params.is_empty() {
            None
        } else {
            Some(self.params)
        }
    }
}

/// Returns the highest `$n` placeholder index in `sql` (0 when none).
///
/// Dollar-quoted bodies (`$$`) and `$` followed by non-digits are ignored.
pub fn max_placeholder_index(sql: &str) -> usize {
    let mut max = 0;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            continue;
        }
        let mut num_str = String::new();
        while let Some(&next_ch) = chars.peek() {
            if !next_ch.is_ascii_digit() {
                break;
            }
            num_str.push(next_ch);
            chars.next();
        }
        if let Ok(num) = num_str.parse::<usize>() {
            max = max.max(num);
        }
    }

    max
}
