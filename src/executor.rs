//! Raw statement execution with per-batch policy
//!
//! Two policies cover every call site: one transaction for all-or-nothing
//! batches (CSV import, confirmed script execution), best-effort for
//! model-generated INSERT batches where a bad row should not sink the rest.

use std::time::Duration;

use sqlx::mysql::MySqlPool;
use tracing::{debug, warn};

use crate::database::DatabaseError;

/// Result of executing one statement.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub statement: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    fn ok(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            succeeded: true,
            error: None,
        }
    }

    fn failed(statement: &str, message: String) -> Self {
        Self {
            statement: statement.to_string(),
            succeeded: false,
            error: Some(message),
        }
    }
}

/// Executes ordered statement batches against the pool.
pub struct StatementExecutor {
    pool: MySqlPool,
    statement_timeout: Duration,
}

impl StatementExecutor {
    pub fn new(pool: MySqlPool, statement_timeout_secs: u64) -> Self {
        Self {
            pool,
            statement_timeout: Duration::from_secs(statement_timeout_secs),
        }
    }

    /// Execute a batch of statements in order.
    ///
    /// An empty batch is rejected outright — running nothing must never look
    /// like success. With `transactional` set, the first failure rolls the
    /// whole batch back and surfaces one aggregate error; otherwise each
    /// statement runs independently and failures are recorded per statement
    /// while the rest of the batch continues.
    pub async fn execute(
        &self,
        statements: &[String],
        transactional: bool,
    ) -> Result<Vec<ExecutionOutcome>, DatabaseError> {
        if statements.is_empty() {
            return Err(DatabaseError::EmptyBatch);
        }

        if transactional {
            self.execute_transactional(statements).await
        } else {
            Ok(self.execute_best_effort(statements).await)
        }
    }

    async fn execute_transactional(
        &self,
        statements: &[String],
    ) -> Result<Vec<ExecutionOutcome>, DatabaseError> {
        debug!(count = statements.len(), "executing transactional batch");
        let mut tx = self.pool.begin().await?;

        for statement in statements {
            let run = sqlx::query(statement).execute(&mut *tx);
            match tokio::time::timeout(self.statement_timeout, run).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!(statement = %statement, error = %e, "statement failed, rolling back batch");
                    tx.rollback().await.ok();
                    return Err(DatabaseError::BatchFailed {
                        statement: statement.clone(),
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(statement = %statement, "statement timed out, rolling back batch");
                    tx.rollback().await.ok();
                    return Err(DatabaseError::StatementTimeout {
                        statement: statement.clone(),
                        timeout_secs: self.statement_timeout.as_secs(),
                    });
                }
            }
        }

        tx.commit().await?;
        Ok(statements.iter().map(|s| ExecutionOutcome::ok(s)).collect())
    }

    async fn execute_best_effort(&self, statements: &[String]) -> Vec<ExecutionOutcome> {
        debug!(count = statements.len(), "executing best-effort batch");
        let mut outcomes = Vec::with_capacity(statements.len());

        for statement in statements {
            let run = sqlx::query(statement).execute(&self.pool);
            let outcome = match tokio::time::timeout(self.statement_timeout, run).await {
                Ok(Ok(_)) => ExecutionOutcome::ok(statement),
                Ok(Err(e)) => {
                    warn!(statement = %statement, error = %e, "statement failed, continuing batch");
                    ExecutionOutcome::failed(statement, e.to_string())
                }
                Err(_) => ExecutionOutcome::failed(
                    statement,
                    format!(
                        "timed out after {}s",
                        self.statement_timeout.as_secs()
                    ),
                ),
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_lazy;

    fn executor() -> StatementExecutor {
        StatementExecutor::new(connect_lazy("mysql://root@localhost/x").unwrap(), 30)
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_before_any_io() {
        let err = executor().execute(&[], true).await.unwrap_err();
        assert!(matches!(err, DatabaseError::EmptyBatch));

        let err = executor().execute(&[], false).await.unwrap_err();
        assert!(matches!(err, DatabaseError::EmptyBatch));
    }

    #[test]
    fn outcomes_carry_the_offending_statement() {
        let outcome = ExecutionOutcome::failed("INSERT INTO t VALUES (1);", "boom".to_string());
        assert!(!outcome.succeeded);
        assert_eq!(outcome.statement, "INSERT INTO t VALUES (1);");
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }
}
