//! Pooled PostgreSQL access layer for the roles / permissions / employees schema.
//!
//! The crate owns four concerns:
//!
//! - **Pool lifecycle**: [`PoolManager`] connects once, hands out connections
//!   that return to the pool on drop, and runs closures inside transactions
//!   that commit on `Ok` and roll back on `Err`.
//! - **Query construction**: [`QueryBuilder`] renders parameterized SELECT,
//!   INSERT and UPDATE statements against a schema-qualified table. Values are
//!   only ever bound as `$n` placeholders.
//! - **Execution**: [`QueryExecutor`] runs built queries, single or batched,
//!   and folds every outcome into a [`QueryResult`].
//! - **Schema**: [`seed`] holds the idempotent DDL script.
//!
//! # Architecture
//!
//! ```text
//! Service layer (CRUD handlers, out of crate)
//!           |
//!   QueryBuilder -> Query -> QueryExecutor -> QueryResult
//!                                  |
//!                             PoolManager
//!                                  |
//!                     SQLx (PostgreSQL driver)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rolebase_postgres::{DatabaseSettings, FieldMap, PoolManager, QueryBuilder, QueryExecutor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = PoolManager::new(DatabaseSettings::from_env()?);
//! manager.connect().await?;
//!
//! let query = QueryBuilder::new("user", "roles")?
//!     .insert(FieldMap::new().with("name", "editor").with("is_active", true))?
//!     .build_insert(Some(&["id"]))?;
//! let result = QueryExecutor::new(&manager).write(&query, true).await;
//! if !result.success {
//!     eprintln!("{} ({})", result.message, result.status());
//! }
//!
//! manager.disconnect().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Executor bound to a transaction
//!
//! ```rust,ignore
//! manager
//!     .run_in_transaction(|conn| Box::pin(async move {
//!         let mut executor = QueryExecutor::bound(conn);
//!         let result = executor.write(&insert_role, true).await;
//!         result.into_result()
//!     }))
//!     .await?;
//! ```

/// Settings loaded from `DB_*` environment variables.
pub mod config;

/// Connection pool lifecycle and transaction scopes.
pub mod connection;

pub mod executor;

/// Pool metrics and health reporting.
pub mod metrics;

/// Parameterized SQL builder.
pub mod query;

pub mod result;

/// Row representation.
pub mod row;

/// Idempotent schema script.
pub mod seed;

pub mod transaction;

/// Parameter and column values.
pub mod types;

pub use config::{DatabaseSettings, Environment};
pub use connection::{PoolConfig, PoolManager, PooledConnection};
pub use executor::{ExecutorConfig, QueryExecutor};
pub use metrics::{HealthStatus, PoolMetrics};
pub use query::{FieldMap, Operator, OrderDirection, Query, QueryBuilder};
pub use result::QueryResult;
pub use row::Row;
pub use transaction::{AccessMode, IsolationLevel, TransactionOptions};
pub use types::{row_to_columns, SqlValue};

pub use rolebase_common::{status_for, HttpStatus, Result, RolebaseError};
