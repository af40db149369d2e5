//! Parameterized SQL builder.
//!
//! Builds SELECT, INSERT and UPDATE statements against one schema-qualified
//! table. Values are always bound as `$n` placeholders; placeholder numbers
//! are assigned while the statement is rendered, so the parameter list always
//! lines up with the SQL text.
//!
//! # Examples
//!
//! ## SELECT Query
//!
//! ```ignore
//! use rolebase_postgres::{FieldMap, OrderDirection, QueryBuilder};
//!
//! let query = QueryBuilder::new("user", "employees")?
//!     .select(&["id", "email"])?
//!     .where_clause(FieldMap::new().with("is_active", true))?
//!     .where_like(FieldMap::new().with("first_name", "ana"))?
//!     .order_by("last_name", OrderDirection::Asc)?
//!     .limit(10, 20)
//!     .build_select();
//! // SELECT id, email FROM "user"."employees"
//! //   WHERE is_active = $1 AND first_name ILIKE $2
//! //   ORDER BY last_name ASC LIMIT 10 OFFSET 20
//! ```
//!
//! ## INSERT Query
//!
//! ```ignore
//! let query = QueryBuilder::new("user", "roles")?
//!     .insert(FieldMap::new().with("name", "editor").with("description", None::<String>))?
//!     .build_insert(Some(&["id"]))?;
//! // INSERT INTO "user"."roles" (name) VALUES ($1) RETURNING id
//! ```
//!
//! ## UPDATE Query
//!
//! ```ignore
//! let query = QueryBuilder::new("user", "roles")?
//!     .set(FieldMap::new().with("is_active", false))?
//!     .where_clause(FieldMap::new().with("id", 3))?
//!     .build_update(None)?;
//! // UPDATE "user"."roles" SET is_active = $1 WHERE id = $2
//! ```

mod builder;
mod helpers;
mod modify;
mod select;
mod types;

#[cfg(test)]
mod tests;

pub use builder::QueryBuilder;
pub use helpers::{escape_like, quote_identifier, validate_identifier_part};
pub use types::{FieldMap, Operator, OrderDirection, Query};
