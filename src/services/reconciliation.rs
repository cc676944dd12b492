//! Webhook reconciliation: the verify-by-reference protocol.
//!
//! Shwary webhooks carry no signature, so an inbound claim is never
//! trusted on its own. The authoritative status is always re-read from
//! the API by identifier; the claimed value is only compared for the
//! security log and then discarded.

use serde_json::Value;

use crate::domain::TransactionStatus;
use crate::error::AppError;
use crate::services::PaymentService;

/// What a reconcile step did, for logging and the sweep report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// No local transaction matches the identifier. Accepted without
    /// mutation so the provider stops retrying.
    Unknown,
    /// Authoritative status equals the persisted one; nothing written,
    /// no events.
    Unchanged,
    Updated {
        previous: TransactionStatus,
        current: TransactionStatus,
    },
}

impl PaymentService {
    /// Handles one webhook delivery for `shwary_id` claiming
    /// `claimed_status`.
    ///
    /// A failed provider re-query aborts the whole step with a provider
    /// error (the caller answers 500 so Shwary retries); no state is
    /// touched in that case.
    pub async fn reconcile_webhook(
        &self,
        shwary_id: &str,
        claimed_status: &str,
    ) -> Result<ReconcileAction, AppError> {
        let verified = match self.provider.get_transaction(shwary_id).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(
                    %shwary_id,
                    %error,
                    "could not verify webhook against the Shwary API"
                );
                return Err(AppError::Provider(error));
            }
        };

        if verified.status.as_str() != claimed_status.to_ascii_lowercase() {
            tracing::warn!(
                %shwary_id,
                claimed = claimed_status,
                verified = %verified.status,
                "webhook status mismatch; keeping the API value"
            );
        }

        self.apply_trusted_status(shwary_id, &verified.status, &verified.raw)
            .await
    }

    /// Applies an already-trusted status: locked read-modify-write in
    /// the repository, then event dispatch once the write committed.
    pub(crate) async fn apply_trusted_status(
        &self,
        shwary_id: &str,
        status: &TransactionStatus,
        raw: &Value,
    ) -> Result<ReconcileAction, AppError> {
        let outcome = match self
            .repository
            .reconcile_status(shwary_id, status, raw)
            .await?
        {
            Some(outcome) => outcome,
            None => {
                tracing::warn!(%shwary_id, "no local transaction for identifier, ignoring");
                return Ok(ReconcileAction::Unknown);
            }
        };

        if !outcome.changed() {
            return Ok(ReconcileAction::Unchanged);
        }

        if outcome.previous.is_terminal() {
            tracing::warn!(
                %shwary_id,
                previous = %outcome.previous,
                current = %outcome.transaction.status,
                "provider moved a terminal transaction back; applying as confirmed"
            );
        }

        self.events
            .publish_status_change(&outcome.previous, &outcome.transaction, raw);

        Ok(ReconcileAction::Updated {
            previous: outcome.previous,
            current: outcome.transaction.status,
        })
    }
}
