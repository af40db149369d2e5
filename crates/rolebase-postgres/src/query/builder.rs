//! QueryBuilder struct and core implementation.

use super::helpers::{quote_identifier, validate_identifier_part, ParamList};
use super::types::{Operator, OrderDirection};
use crate::{Result, SqlValue};

/// Represents a WHERE condition.
#[derive(Debug, Clone)]
pub(crate) struct WhereCondition {
    pub(crate) field: String,
    pub(crate) operator: Operator,
    pub(crate) value: SqlValue,
}

/// Parameterized SQL builder for one schema-qualified table.
///
/// Chained calls accumulate state; a terminal `build_*` call consumes the
/// builder. Values never reach the SQL text: every value becomes a `$n`
/// placeholder whose number is assigned while rendering.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) schema: String,
    pub(crate) table: String,
    /// SELECT columns (empty means SELECT *)
    pub(crate) select_columns: Vec<String>,
    pub(crate) where_conditions: Vec<WhereCondition>,
    /// UPDATE assignments
    pub(crate) set_fields: Vec<(String, SqlValue)>,
    /// INSERT columns and values
    pub(crate) insert_fields: Vec<(String, SqlValue)>,
    pub(crate) order_by_clause: Option<(String, OrderDirection)>,
    /// (limit, offset)
    pub(crate) limit_clause: Option<(u64, u64)>,
}

impl QueryBuilder {
    /// Creates a new query builder for `schema.table`.
    ///
    /// # Errors
    ///
    /// Returns error if either name is not a valid identifier.
    pub fn new(schema: &str, table: &str) -> Result<Self> {
        validate_identifier_part(schema)?;
        validate_identifier_part(table)?;
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
            select_columns: Vec::new(),
            where_conditions: Vec::new(),
            set_fields: Vec::new(),
            insert_fields: Vec::new(),
            order_by_clause: None,
            limit_clause: None,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `"schema"."table"`
    pub fn qualified_table(&self) -> String {
        quote_identifier(&format!("{}.{}", self.schema, self.table))
    }

    /// Renders `WHERE a = $n AND ...`, pushing each value as it goes.
    pub(crate) fn render_where(&self, params: &mut ParamList) -> Option<String> {
        if self.where_conditions.is_empty() {
            return None;
        }

        let parts: Vec<String> = self
            .where_conditions
            .iter()
            .map(|cond| {
                let placeholder = params.push(cond.value.clone());
                format!("{} {} {}", cond.field, cond.operator.to_sql(), placeholder)
            })
            .collect();

        Some(format!("WHERE {}", parts.join(" AND ")))
    }

    pub(crate) fn render_returning(returning: Option<&[&str]>) -> Option<String> {
        match returning {
            Some(cols) if !cols.is_empty() => Some(format!("RETURNING {}", cols.join(", "))),
            _ => None,
        }
    }
}
