//! Postgres implementation of TransactionRepository.
//!
//! The reconcile step runs inside a database transaction with
//! `SELECT ... FOR UPDATE` on the target row, so a retried webhook and a
//! polling sweep for the same identifier serialize at the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{
    ReconcileOutcome, RepositoryError, RepositoryResult, TransactionRepository,
};

#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(error: sqlx::Error) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        _ => RepositoryError::Database(error.to_string()),
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, transaction: &Transaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO shwary_transactions (
                id, shwary_id, amount, currency, phone_number, status, sandbox,
                related_type, related_id, raw_response, error_message, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.shwary_id)
        .bind(&transaction.amount)
        .bind(&transaction.currency)
        .bind(&transaction.phone_number)
        .bind(transaction.status.as_str())
        .bind(transaction.sandbox)
        .bind(&transaction.related_type)
        .bind(&transaction.related_id)
        .bind(&transaction.raw_response)
        .bind(&transaction.error_message)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.into_domain())
    }

    async fn update(&self, transaction: &Transaction) -> RepositoryResult<Transaction> {
        // shwary_id is write-once: the predicate rejects reassignment.
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE shwary_transactions
            SET shwary_id = $2, status = $3, raw_response = $4, error_message = $5,
                updated_at = NOW()
            WHERE id = $1 AND (shwary_id IS NULL OR shwary_id = $2)
            RETURNING *
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.shwary_id)
        .bind(transaction.status.as_str())
        .bind(&transaction.raw_response)
        .bind(&transaction.error_message)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(row.into_domain()),
            None => {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM shwary_transactions WHERE id = $1)",
                )
                .bind(transaction.id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;

                if exists {
                    Err(RepositoryError::Conflict(format!(
                        "transaction {} already has a provider identifier",
                        transaction.id
                    )))
                } else {
                    Err(RepositoryError::NotFound(transaction.id.to_string()))
                }
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM shwary_transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(|r| r.into_domain())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn find_by_shwary_id(&self, shwary_id: &str) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM shwary_transactions WHERE shwary_id = $1",
        )
        .bind(shwary_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(|r| r.into_domain()))
    }

    async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM shwary_transactions
            WHERE status = 'pending' AND created_at <= $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn reconcile_status(
        &self,
        shwary_id: &str,
        status: &TransactionStatus,
        raw: &serde_json::Value,
    ) -> RepositoryResult<Option<ReconcileOutcome>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM shwary_transactions WHERE shwary_id = $1 FOR UPDATE",
        )
        .bind(shwary_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(map_sqlx)?;
            return Ok(None);
        };

        let current = row.into_domain();
        let previous = current.status.clone();

        if previous == *status {
            tx.commit().await.map_err(map_sqlx)?;
            return Ok(Some(ReconcileOutcome {
                previous,
                transaction: current,
            }));
        }

        let updated = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE shwary_transactions
            SET status = $2, raw_response = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(status.as_str())
        .bind(raw)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;

        Ok(Some(ReconcileOutcome {
            previous,
            transaction: updated.into_domain(),
        }))
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    shwary_id: Option<String>,
    amount: bigdecimal::BigDecimal,
    currency: String,
    phone_number: String,
    status: String,
    sandbox: bool,
    related_type: Option<String>,
    related_id: Option<String>,
    raw_response: Option<serde_json::Value>,
    error_message: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> Transaction {
        Transaction {
            id: self.id,
            shwary_id: self.shwary_id,
            amount: self.amount,
            currency: self.currency,
            phone_number: self.phone_number,
            status: TransactionStatus::parse(&self.status),
            sandbox: self.sandbox,
            related_type: self.related_type,
            related_id: self.related_id,
            raw_response: self.raw_response,
            error_message: self.error_message,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
