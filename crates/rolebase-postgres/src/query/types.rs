//! Query builder types and enums.

use sqlx::postgres::PgArguments;
use std::fmt;
use std::str::FromStr;

use super::helpers::max_placeholder_index;
use crate::{Result, RolebaseError, SqlValue};

/// Comparison operators used by WHERE conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Case-insensitive pattern match (ILIKE)
    ILike,
}

impl Operator {
    /// Returns the SQL operator string.
    pub fn to_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::ILike => "ILIKE",
        }
    }
}

/// Sort order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order
    #[default]
    Asc,
    /// Descending order
    Desc,
}

impl OrderDirection {
    /// Returns the SQL order direction string.
    pub fn to_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = RolebaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(OrderDirection::Asc),
            "DESC" => Ok(OrderDirection::Desc),
            _ => Err(RolebaseError::Query(format!(
                "Invalid order direction '{}': expected ASC or DESC",
                s
            ))),
        }
    }
}

/// Ordered field -> value mapping handed to builder methods.
///
/// Entry order is preserved, and so is placeholder order. `SqlValue::Null`
/// (or `None` through the `Option` conversion) marks an absent value.
///
/// ```ignore
/// let filters = FieldMap::new()
///     .with("name", "admin")
///     .with("is_active", None::<bool>);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, SqlValue)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns the map for chaining.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<SqlValue>) {
        self.entries.push((field.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// An immutable (SQL text, positional parameters) pair.
///
/// `params` is `None` when nothing is bound, which is distinct from
/// `Some(vec![])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    params: Option<Vec<SqlValue>>,
}

impl Query {
    pub fn new(sql: impl Into<String>, params: Option<Vec<SqlValue>>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A literal statement with no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, None)
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self::new(sql, Some(params))
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> Option<&[SqlValue]> {
        self.params.as_deref()
    }

    /// Number of bound parameters (0 for `None`).
    pub fn param_count(&self) -> usize {
        self.params.as_ref().map_or(0, Vec::len)
    }

    /// Highest `$n` placeholder referenced by the SQL text.
    pub fn placeholder_count(&self) -> usize {
        max_placeholder_index(&self.sql)
    }

    pub fn into_parts(self) -> (String, Option<Vec<SqlValue>>) {
        (self.sql, self.params)
    }

    /// Binds the parameters in order.
    ///
    /// # Errors
    ///
    /// Returns error if any value fails to encode.
    pub fn arguments(&self) -> Result<PgArguments> {
        let mut args = PgArguments::default();
        for param in self.params.iter().flatten() {
            param.bind_to_arguments(&mut args)?;
        }
        Ok(args)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl From<(String, Option<Vec<SqlValue>>)> for Query {
    fn from((sql, params): (String, Option<Vec<SqlValue>>)) -> Self {
        Self::new(sql, params)
    }
}
