//! SELECT query building and filter methods.

use super::builder::{QueryBuilder, WhereCondition};
use super::helpers::{
    escape_like, reject_duplicate, validate_column, validate_identifier_part, ParamList,
};
use super::types::{FieldMap, Operator, OrderDirection, Query};
use crate::{Result, RolebaseError, SqlValue};

impl QueryBuilder {
    /// Sets the projected columns. An empty slice selects `*`.
    pub fn select(mut self, columns: &[&str]) -> Result<Self> {
        for col in columns {
            validate_column(col)?;
        }
        self.select_columns = columns.iter().map(|s| s.to_string()).collect();
        Ok(self)
    }

    /// Adds `field = $n` conditions joined with AND.
    ///
    /// Entries whose value is null are skipped. A field may appear only once
    /// per call; separate calls may repeat it.
    pub fn where_clause(mut self, filters: FieldMap) -> Result<Self> {
        let mut seen: Vec<String> = Vec::with_capacity(filters.len());
        for (field, value) in filters {
            validate_identifier_part(&field)?;
            reject_duplicate(&field, seen.iter().map(String::as_str), "WHERE")?;
            seen.push(field.clone());
            if value.is_null() {
                continue;
            }
            self.where_conditions.push(WhereCondition {
                field,
                operator: Operator::Eq,
                value,
            });
        }
        Ok(self)
    }

    /// Adds case-insensitive substring conditions (`field ILIKE $n`).
    ///
    /// The bound value is `%text%` with LIKE metacharacters in `text`
    /// escaped. Null entries are skipped.
    pub fn where_like(mut self, filters: FieldMap) -> Result<Self> {
        let mut seen: Vec<String> = Vec::with_capacity(filters.len());
        for (field, value) in filters {
            validate_identifier_part(&field)?;
            reject_duplicate(&field, seen.iter().map(String::as_str), "WHERE")?;
            seen.push(field.clone());
            let text = match value {
                SqlValue::Null => continue,
                SqlValue::String(s) => s,
                other => {
                    return Err(RolebaseError::Query(format!(
                        "ILIKE filter on '{}' requires a text value, got {}",
                        field,
                        other.pg_type_name()
                    )))
                }
            };
            self.where_conditions.push(WhereCondition {
                field,
                operator: Operator::ILike,
                value: SqlValue::String(format!("%{}%", escape_like(&text))),
            });
        }
        Ok(self)
    }

    /// Sets `ORDER BY field direction`. A later call replaces an earlier one.
    pub fn order_by(mut self, field: &str, direction: OrderDirection) -> Result<Self> {
        validate_identifier_part(field)?;
        self.order_by_clause = Some((field.to_string(), direction));
        Ok(self)
    }

    /// Sets `LIMIT count OFFSET offset`.
    pub fn limit(mut self, count: u64, offset: u64) -> Self {
        self.limit_clause = Some((count, offset));
        self
    }

    /// Builds the SELECT statement.
    ///
    /// Parameters are `None` when no condition was added.
    pub fn build_select(self) -> Query {
        let mut params = ParamList::default();

        let columns = if self.select_columns.is_empty() {
            "*".to_string()
        } else {
            self.select_columns.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, self.qualified_table());

        if let Some(where_sql) = self.render_where(&mut params) {
            sql.push(' ');
            sql.push_str(&where_sql);
        }

        if let Some((field, direction)) = &self.order_by_clause {
            sql.push_str(&format!(" ORDER BY {} {}", field, direction.to_sql()));
        }

        if let Some((count, offset)) = self.limit_clause {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", count, offset));
        }

        Query::new(sql, params.into_option())
    }
}
