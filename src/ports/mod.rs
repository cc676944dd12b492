//! Ports the gateway core depends on: transaction persistence and the
//! Shwary payment provider. Adapters live under `crate::adapters` and
//! `crate::shwary`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Country, Transaction, TransactionStatus};
use crate::shwary::ShwaryError;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate non-null `shwary_id`, or an attempt to reassign one.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result of a locked reconcile step.
///
/// `transaction` is the row after the step; when `previous` equals
/// `transaction.status` nothing was written.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub previous: TransactionStatus,
    pub transaction: Transaction,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        self.previous != self.transaction.status
    }
}

/// Persistence port for payment transactions.
///
/// Implementations own `updated_at`: every mutation bumps it. The
/// non-null `shwary_id` uniqueness invariant is enforced here, not in
/// the service layer.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, transaction: &Transaction) -> RepositoryResult<Transaction>;

    /// Persists mutable fields (`shwary_id`, `status`, `raw_response`,
    /// `error_message`) of an existing row. Rejects reassignment of an
    /// already-set `shwary_id` with `Conflict`.
    async fn update(&self, transaction: &Transaction) -> RepositoryResult<Transaction>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction>;

    async fn find_by_shwary_id(&self, shwary_id: &str) -> RepositoryResult<Option<Transaction>>;

    /// Pending transactions created at or before `cutoff`, oldest first.
    async fn list_stale_pending(&self, cutoff: DateTime<Utc>)
        -> RepositoryResult<Vec<Transaction>>;

    /// Atomic locked read-modify-write for one transaction, keyed by
    /// provider identifier. The row is held under an exclusive lock for
    /// the duration of the step so concurrent webhook deliveries and
    /// polling sweeps serialize. Returns `None` when no row matches; a
    /// step where the status is already `status` writes nothing.
    async fn reconcile_status(
        &self,
        shwary_id: &str,
        status: &TransactionStatus,
        raw: &serde_json::Value,
    ) -> RepositoryResult<Option<ReconcileOutcome>>;
}

/// Payload returned by the Shwary API for both initiation and lookup.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub status: TransactionStatus,
    /// Full verbatim payload; persisted as `raw_response` once trusted.
    pub raw: serde_json::Value,
}

/// Outbound port to the Shwary payment API. One attempt per call, no
/// retries; a timeout surfaces as any other provider error.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn initiate_payment(
        &self,
        country: Country,
        amount: &BigDecimal,
        phone_number: &str,
        callback_url: &str,
    ) -> Result<ProviderResponse, ShwaryError>;

    async fn get_transaction(&self, shwary_id: &str) -> Result<ProviderResponse, ShwaryError>;
}
