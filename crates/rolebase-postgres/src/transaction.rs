//! Transaction scopes.
//!
//! A scope begins a transaction on a connection, runs a unit of work against
//! that same connection, commits when the work returns `Ok` and rolls back
//! when it returns `Err`. Beginning a scope on a connection that is already
//! inside a transaction opens a savepoint instead.

use futures::future::BoxFuture;
use sqlx::{Connection as _, PgConnection};
use std::fmt::Display;
use tracing::{error, info};

use crate::RolebaseError;

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    /// Read committed (PostgreSQL default)
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Returns the SQL isolation level string.
    pub fn to_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    pub fn to_sql(&self) -> &'static str {
        match self {
            AccessMode::ReadWrite => "READ WRITE",
            AccessMode::ReadOnly => "READ ONLY",
        }
    }
}

/// Options applied with `SET TRANSACTION` at the start of a top-level scope.
///
/// ```rust,ignore
/// let report = TransactionOptions::new()
///     .read_only()
///     .isolation_level(IsolationLevel::RepeatableRead);
/// manager.run_in_transaction_with(&report, |conn| Box::pin(async move { ... })).await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionOptions {
    pub isolation_level: IsolationLevel,
    pub access_mode: AccessMode,
    /// Only meaningful for SERIALIZABLE READ ONLY.
    pub deferrable: bool,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access_mode = AccessMode::ReadOnly;
        self
    }

    pub fn read_write(mut self) -> Self {
        self.access_mode = AccessMode::ReadWrite;
        self
    }

    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = deferrable;
        self
    }

    /// Build the SQL string for SET TRANSACTION command.
    pub fn to_sql(&self) -> String {
        let mut parts = vec![
            format!("ISOLATION LEVEL {}", self.isolation_level.to_sql()),
            self.access_mode.to_sql().to_string(),
        ];

        // DEFERRABLE is only valid for SERIALIZABLE READ ONLY
        if self.isolation_level == IsolationLevel::Serializable
            && self.access_mode == AccessMode::ReadOnly
        {
            if self.deferrable {
                parts.push("DEFERRABLE".to_string());
            } else {
                parts.push("NOT DEFERRABLE".to_string());
            }
        }

        format!("SET TRANSACTION {}", parts.join(", "))
    }
}

/// Runs `body` inside a transaction (or savepoint) on `conn`.
///
/// `options` must be `None` for nested scopes: PostgreSQL rejects
/// `SET TRANSACTION` after the first statement of a transaction.
pub(crate) async fn run_scoped<T, E, F>(
    conn: &mut PgConnection,
    options: Option<&TransactionOptions>,
    body: F,
) -> std::result::Result<T, E>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, std::result::Result<T, E>>,
    E: From<RolebaseError> + Display,
{
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| E::from(RolebaseError::from(e)))?;

    if let Some(options) = options {
        sqlx::query(&options.to_sql())
            .execute(&mut *tx)
            .await
            .map_err(|e| E::from(RolebaseError::from(e)))?;
    }

    match body(&mut *tx).await {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| E::from(RolebaseError::from(e)))?;
            info!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            error!(error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}
