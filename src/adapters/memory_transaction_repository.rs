//! In-memory implementation of TransactionRepository.
//!
//! Backs the integration tests and embedders that do not run Postgres.
//! Row-level locking becomes an explicit per-identifier async mutex:
//! the reconcile step for one `shwary_id` is serialized, steps for
//! different identifiers proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{
    ReconcileOutcome, RepositoryError, RepositoryResult, TransactionRepository,
};

#[derive(Default)]
struct Inner {
    rows: HashMap<Uuid, Transaction>,
    by_shwary_id: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryTransactionRepository {
    inner: RwLock<Inner>,
    row_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored transaction, insertion order not guaranteed.
    pub async fn all(&self) -> Vec<Transaction> {
        let inner = self.inner.read().await;
        inner.rows.values().cloned().collect()
    }

    async fn row_lock(&self, shwary_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.row_locks.lock().await;
        locks
            .entry(shwary_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl TransactionRepository for MemoryTransactionRepository {
    async fn insert(&self, transaction: &Transaction) -> RepositoryResult<Transaction> {
        let mut inner = self.inner.write().await;

        if inner.rows.contains_key(&transaction.id) {
            return Err(RepositoryError::Conflict(format!(
                "duplicate transaction id {}",
                transaction.id
            )));
        }
        if let Some(shwary_id) = &transaction.shwary_id {
            if inner.by_shwary_id.contains_key(shwary_id) {
                return Err(RepositoryError::Conflict(format!(
                    "duplicate shwary_id {shwary_id}"
                )));
            }
            inner.by_shwary_id.insert(shwary_id.clone(), transaction.id);
        }

        inner.rows.insert(transaction.id, transaction.clone());
        Ok(transaction.clone())
    }

    async fn update(&self, transaction: &Transaction) -> RepositoryResult<Transaction> {
        let mut inner = self.inner.write().await;

        let existing = inner
            .rows
            .get(&transaction.id)
            .ok_or_else(|| RepositoryError::NotFound(transaction.id.to_string()))?
            .clone();

        match (&existing.shwary_id, &transaction.shwary_id) {
            (Some(current), new) if new.as_deref() != Some(current) => {
                return Err(RepositoryError::Conflict(format!(
                    "transaction {} already has a provider identifier",
                    transaction.id
                )));
            }
            (None, Some(new)) => {
                if let Some(&other) = inner.by_shwary_id.get(new) {
                    if other != transaction.id {
                        return Err(RepositoryError::Conflict(format!(
                            "duplicate shwary_id {new}"
                        )));
                    }
                }
                inner.by_shwary_id.insert(new.clone(), transaction.id);
            }
            _ => {}
        }

        let mut updated = transaction.clone();
        updated.created_at = existing.created_at;
        updated.updated_at = Utc::now();
        inner.rows.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction> {
        let inner = self.inner.read().await;
        inner
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn find_by_shwary_id(&self, shwary_id: &str) -> RepositoryResult<Option<Transaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_shwary_id
            .get(shwary_id)
            .and_then(|id| inner.rows.get(id))
            .cloned())
    }

    async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Transaction>> {
        let inner = self.inner.read().await;
        let mut stale: Vec<Transaction> = inner
            .rows
            .values()
            .filter(|t| t.status == TransactionStatus::Pending && t.created_at <= cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|t| t.created_at);
        Ok(stale)
    }

    async fn reconcile_status(
        &self,
        shwary_id: &str,
        status: &TransactionStatus,
        raw: &serde_json::Value,
    ) -> RepositoryResult<Option<ReconcileOutcome>> {
        let lock = self.row_lock(shwary_id).await;
        let _guard = lock.lock().await;

        let mut inner = self.inner.write().await;
        let Some(&id) = inner.by_shwary_id.get(shwary_id) else {
            return Ok(None);
        };

        let row = inner
            .rows
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::Database("shwary_id index out of sync".to_string()))?;

        let previous = row.status.clone();
        if previous != *status {
            row.status = status.clone();
            row.raw_response = Some(raw.clone());
            row.updated_at = Utc::now();
        }

        Ok(Some(ReconcileOutcome {
            previous,
            transaction: row.clone(),
        }))
    }
}
