//! Query execution with uniform result envelopes.
//!
//! Every operation returns a [`QueryResult`]; driver errors are classified
//! and captured in the envelope instead of being returned. Inside a batch,
//! the first failing statement aborts the scope so it rolls back. Nothing is
//! retried.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use sqlx::postgres::PgConnection;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use crate::transaction::run_scoped;
use crate::{PoolConfig, PoolManager, Query, QueryResult, Result, RolebaseError, Row, SqlValue};

const SUCCESS_MESSAGE: &str = "Query executed successfully";
const FAILURE_MESSAGE: &str = "Query execution failed";

/// Executor tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Threshold for slow query logging
    pub slow_query_threshold: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(1000),
        }
    }
}

impl From<&PoolConfig> for ExecutorConfig {
    fn from(config: &PoolConfig) -> Self {
        Self {
            slow_query_threshold: config.slow_query_threshold,
        }
    }
}

enum Target<'a> {
    /// Acquire a connection per operation.
    Pool(&'a PoolManager),
    /// Reuse a connection the caller already holds (possibly mid-transaction).
    Bound(&'a mut PgConnection),
}

/// Runs built queries and normalizes the outcome.
///
/// ```rust,ignore
/// let mut executor = QueryExecutor::new(&manager);
/// let query = QueryBuilder::new("user", "roles")?
///     .where_clause(FieldMap::new().with("name", "admin"))?
///     .build_select();
/// let result = executor.select(&query).await;
/// ```
pub struct QueryExecutor<'a> {
    target: Target<'a>,
    config: ExecutorConfig,
}

impl<'a> QueryExecutor<'a> {
    /// Executor that checks a connection out of `manager` per operation.
    pub fn new(manager: &'a PoolManager) -> Self {
        Self {
            target: Target::Pool(manager),
            config: ExecutorConfig::from(manager.config()),
        }
    }

    /// Executor bound to a connection the caller holds, typically the one
    /// handed to a `run_in_transaction` body.
    ///
    /// Starts from `ExecutorConfig::default()`; carry the pool's settings in
    /// with [`with_config`](Self::with_config):
    ///
    /// ```rust,ignore
    /// let config = manager.executor_config();
    /// manager
    ///     .run_in_transaction(move |conn| Box::pin(async move {
    ///         let mut executor = QueryExecutor::bound(conn).with_config(config);
    ///         executor.write(&insert_role, false).await.into_result()
    ///     }))
    ///     .await?;
    /// ```
    pub fn bound(conn: &'a mut PgConnection) -> Self {
        Self {
            target: Target::Bound(conn),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes a read. `affected_rows` is the number of rows returned.
    #[instrument(skip(self, query), fields(params = query.param_count()))]
    pub async fn select(&mut self, query: &Query) -> QueryResult {
        match self.fetch(query).await {
            Ok(rows) => QueryResult::rows(rows, SUCCESS_MESSAGE),
            Err(e) => {
                warn!(error = %e, "Select failed");
                QueryResult::failure(FAILURE_MESSAGE, e)
            }
        }
    }

    /// Executes a mutating statement.
    ///
    /// With `returning`, the statement's rows are fetched and counted;
    /// otherwise `affected_rows` is the backend's row count.
    #[instrument(skip(self, query), fields(params = query.param_count()))]
    pub async fn write(&mut self, query: &Query, returning: bool) -> QueryResult {
        let outcome = if returning {
            self.fetch(query)
                .await
                .map(|rows| QueryResult::rows(rows, SUCCESS_MESSAGE))
        } else {
            self.execute(query)
                .await
                .map(|n| QueryResult::written(n, SUCCESS_MESSAGE))
        };

        outcome.unwrap_or_else(|e| {
            warn!(error = %e, "Write failed");
            QueryResult::failure(FAILURE_MESSAGE, e)
        })
    }

    /// Executes an ordered batch atomically.
    ///
    /// `queries[i]` is bound with `params_list[i]`. Returned rows (when
    /// `returning`) are concatenated in statement order. On failure the batch
    /// is rolled back and `affected_rows` reports what the earlier statements
    /// touched before the rollback.
    #[instrument(skip(self, queries, params_list), fields(statements = queries.len()))]
    pub async fn transaction(
        &mut self,
        queries: &[String],
        params_list: &[Option<Vec<SqlValue>>],
        returning: bool,
    ) -> QueryResult {
        if queries.len() != params_list.len() {
            return QueryResult::failure(
                "Transaction failed",
                RolebaseError::Validation(format!(
                    "The quantity of queries ({}) is different than params ({})",
                    queries.len(),
                    params_list.len()
                )),
            );
        }

        let batch = queries
            .iter()
            .zip(params_list)
            .map(|(sql, params)| Query::new(sql.clone(), params.clone()))
            .collect();

        match self.run_atomic(batch, returning).await {
            Ok(outcome) if returning => {
                QueryResult::rows(outcome.rows, "Transaction completed successfully")
            }
            Ok(outcome) => {
                QueryResult::written(outcome.affected_rows, "Transaction completed successfully")
            }
            Err(e) => {
                error!(
                    error = %e.source,
                    statement = ?e.statement,
                    affected_rows = e.affected_rows,
                    "Transaction failed: rolled back"
                );
                QueryResult::partial_failure("Transaction failed", e.source, e.affected_rows)
            }
        }
    }

    /// Executes one statement shape once per parameter set, atomically.
    ///
    /// `affected_rows` is the number of parameter sets submitted.
    #[instrument(skip(self, sql, params_list), fields(sets = params_list.len()))]
    pub async fn bulk_execute(&mut self, sql: &str, params_list: &[Vec<SqlValue>]) -> QueryResult {
        if params_list.is_empty() {
            return QueryResult::written(0, "Bulk operation completed");
        }

        let batch = params_list
            .iter()
            .map(|params| Query::with_params(sql, params.clone()))
            .collect();

        match self.run_atomic(batch, false).await {
            Ok(_) => QueryResult::written(params_list.len() as u64, "Bulk operation completed"),
            Err(e) => {
                error!(error = %e.source, statement = ?e.statement, "Bulk operation failed");
                QueryResult::failure("Bulk operation failed", e.source)
            }
        }
    }

    async fn fetch(&mut self, query: &Query) -> Result<Vec<Row>> {
        match &mut self.target {
            Target::Pool(manager) => {
                let mut conn = manager.acquire().await?;
                fetch_rows(&mut conn, query, &self.config).await
            }
            Target::Bound(conn) => fetch_rows(conn, query, &self.config).await,
        }
    }

    async fn execute(&mut self, query: &Query) -> Result<u64> {
        match &mut self.target {
            Target::Pool(manager) => {
                let mut conn = manager.acquire().await?;
                execute_statement(&mut conn, query, &self.config).await
            }
            Target::Bound(conn) => execute_statement(conn, query, &self.config).await,
        }
    }

    /// Runs `batch` in a transaction on a pooled connection, or in a
    /// savepoint on a bound one.
    async fn run_atomic(
        &mut self,
        batch: Vec<Query>,
        returning: bool,
    ) -> std::result::Result<BatchOutcome, BatchError> {
        let config = self.config.clone();
        match &mut self.target {
            Target::Pool(manager) => {
                manager
                    .run_in_transaction(move |conn| batch_body(conn, batch, returning, config))
                    .await
            }
            Target::Bound(conn) => {
                run_scoped(conn, None, move |c| batch_body(c, batch, returning, config)).await
            }
        }
    }
}

#[derive(Debug, Default)]
struct BatchOutcome {
    rows: Vec<Row>,
    affected_rows: u64,
}

/// A batch failure with the row count accumulated before it.
#[derive(Debug, Error)]
#[error("{source}")]
struct BatchError {
    source: RolebaseError,
    /// Index of the failing statement; `None` for begin/commit failures.
    statement: Option<usize>,
    affected_rows: u64,
}

impl From<RolebaseError> for BatchError {
    fn from(source: RolebaseError) -> Self {
        Self {
            source,
            statement: None,
            affected_rows: 0,
        }
    }
}

fn batch_body(
    conn: &mut PgConnection,
    batch: Vec<Query>,
    returning: bool,
    config: ExecutorConfig,
) -> BoxFuture<'_, std::result::Result<BatchOutcome, BatchError>> {
    Box::pin(async move {
        let mut outcome = BatchOutcome::default();

        for (index, query) in batch.iter().enumerate() {
            let step = if returning {
                fetch_rows(conn, query, &config).await.map(|rows| {
                    outcome.affected_rows += rows.len() as u64;
                    outcome.rows.extend(rows);
                })
            } else {
                execute_statement(conn, query, &config)
                    .await
                    .map(|n| outcome.affected_rows += n)
            };

            if let Err(source) = step {
                return Err(BatchError {
                    source,
                    statement: Some(index),
                    affected_rows: outcome.affected_rows,
                });
            }
        }

        Ok(outcome)
    })
}

async fn fetch_rows(
    conn: &mut PgConnection,
    query: &Query,
    config: &ExecutorConfig,
) -> Result<Vec<Row>> {
    let args = query.arguments()?;
    let start = Instant::now();
    let rows = sqlx::query_with(query.sql(), args)
        .fetch_all(&mut *conn)
        .await?;
    log_query_completion(query.sql(), start.elapsed(), config);
    rows.iter().map(Row::from_sqlx).collect()
}

async fn execute_statement(
    conn: &mut PgConnection,
    query: &Query,
    config: &ExecutorConfig,
) -> Result<u64> {
    let args = query.arguments()?;
    let start = Instant::now();
    let done = sqlx::query_with(query.sql(), args)
        .execute(&mut *conn)
        .await?;
    log_query_completion(query.sql(), start.elapsed(), config);
    Ok(done.rows_affected())
}

/// Log query completion with slow query detection.
fn log_query_completion(sql: &str, elapsed: Duration, config: &ExecutorConfig) {
    let elapsed_ms = elapsed.as_millis() as u64;
    let sql_preview: String = sql.chars().take(100).collect();

    if elapsed >= config.slow_query_threshold {
        warn!(
            sql = %sql_preview,
            elapsed_ms = elapsed_ms,
            threshold_ms = config.slow_query_threshold.as_millis() as u64,
            "Slow query detected"
        );
    } else {
        debug!(sql = %sql_preview, elapsed_ms = elapsed_ms, "Query completed");
    }
}
