//! INSERT and UPDATE query building.

use super::builder::QueryBuilder;
use super::helpers::{reject_duplicate, validate_column, validate_identifier_part, ParamList};
use super::types::{FieldMap, Query};
use crate::{Result, RolebaseError, SqlValue};

impl QueryBuilder {
    /// Adds INSERT columns.
    ///
    /// Entries whose value is falsy (null, `false`, zero, empty text, empty
    /// bytes, empty JSON container) are left out of the statement so the
    /// column default applies. Use [`insert_non_null`](Self::insert_non_null)
    /// to keep `false` and `0`.
    pub fn insert(self, data: FieldMap) -> Result<Self> {
        self.push_insert(data, |value| value.is_falsy())
    }

    /// Adds INSERT columns, skipping only null values.
    pub fn insert_non_null(self, data: FieldMap) -> Result<Self> {
        self.push_insert(data, |value| value.is_null())
    }

    fn push_insert(
        mut self,
        data: FieldMap,
        skip: impl Fn(&SqlValue) -> bool,
    ) -> Result<Self> {
        let mut seen: Vec<String> = Vec::with_capacity(data.len());
        for (field, value) in data {
            validate_identifier_part(&field)?;
            let taken = self
                .insert_fields
                .iter()
                .map(|(name, _)| name.as_str())
                .chain(seen.iter().map(String::as_str));
            reject_duplicate(&field, taken, "INSERT")?;
            seen.push(field.clone());
            if skip(&value) {
                continue;
            }
            self.insert_fields.push((field, value));
        }
        Ok(self)
    }

    /// Adds UPDATE assignments. Null values are skipped.
    ///
    /// A column may be assigned only once, across all `set` calls.
    pub fn set(mut self, data: FieldMap) -> Result<Self> {
        let mut seen: Vec<String> = Vec::with_capacity(data.len());
        for (field, value) in data {
            validate_identifier_part(&field)?;
            let taken = self
                .set_fields
                .iter()
                .map(|(name, _)| name.as_str())
                .chain(seen.iter().map(String::as_str));
            reject_duplicate(&field, taken, "SET")?;
            seen.push(field.clone());
            if value.is_null() {
                continue;
            }
            self.set_fields.push((field, value));
        }
        Ok(self)
    }

    /// Builds `INSERT INTO "schema"."table" (cols) VALUES ($1, ...)`.
    ///
    /// # Errors
    ///
    /// Returns error if no column survived filtering.
    pub fn build_insert(self, returning: Option<&[&str]>) -> Result<Query> {
        if self.insert_fields.is_empty() {
            return Err(RolebaseError::Query(
                "INSERT requires at least one column".to_string(),
            ));
        }
        validate_returning(returning)?;

        let mut params = ParamList::default();
        let table = self.qualified_table();
        let mut columns = Vec::with_capacity(self.insert_fields.len());
        let mut placeholders = Vec::with_capacity(self.insert_fields.len());

        for (field, value) in self.insert_fields {
            placeholders.push(params.push(value));
            columns.push(field);
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );

        if let Some(returning_sql) = Self::render_returning(returning) {
            sql.push(' ');
            sql.push_str(&returning_sql);
        }

        Ok(Query::with_params(sql, params.into_vec()))
    }

    /// Builds `UPDATE "schema"."table" SET ... [WHERE ...]`.
    ///
    /// SET placeholders are numbered first, WHERE placeholders continue from
    /// there.
    ///
    /// # Errors
    ///
    /// Returns error if no assignment survived filtering.
    pub fn build_update(self, returning: Option<&[&str]>) -> Result<Query> {
        if self.set_fields.is_empty() {
            return Err(RolebaseError::Query(
                "UPDATE requires at least one field in SET clause".to_string(),
            ));
        }
        validate_returning(returning)?;

        let mut params = ParamList::default();
        let assignments: Vec<String> = self
            .set_fields
            .iter()
            .map(|(field, value)| format!("{} = {}", field, params.push(value.clone())))
            .collect();

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.qualified_table(),
            assignments.join(", ")
        );

        if let Some(where_sql) = self.render_where(&mut params) {
            sql.push(' ');
            sql.push_str(&where_sql);
        }

        if let Some(returning_sql) = Self::render_returning(returning) {
            sql.push(' ');
            sql.push_str(&returning_sql);
        }

        Ok(Query::with_params(sql, params.into_vec()))
    }
}

fn validate_returning(returning: Option<&[&str]>) -> Result<()> {
    for col in returning.unwrap_or_default() {
        validate_column(col)?;
    }
    Ok(())
}
