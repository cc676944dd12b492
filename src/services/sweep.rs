//! Catch-up sweep over stale pending transactions.
//!
//! Invoked externally on a timer (CLI `sweep` subcommand under the
//! host's cron); there is no internal scheduler.

use chrono::{Duration, Utc};

use crate::error::AppError;
use crate::services::{PaymentService, ReconcileAction};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
    pub still_pending: usize,
    pub errors: usize,
}

impl PaymentService {
    /// Re-checks every pending transaction older than `older_than`
    /// against the Shwary API. Per-item failures are counted, never
    /// fatal to the sweep.
    pub async fn sweep(&self, older_than: Duration) -> Result<SweepReport, AppError> {
        let cutoff = Utc::now() - older_than;
        let pending = self.repository.list_stale_pending(cutoff).await?;

        let mut report = SweepReport {
            checked: pending.len(),
            ..SweepReport::default()
        };

        for txn in pending {
            let Some(shwary_id) = txn.shwary_id.as_deref() else {
                // Initiation crashed before the provider answered; there
                // is no identifier to poll with.
                tracing::warn!(
                    transaction_id = %txn.id,
                    "pending transaction has no provider identifier"
                );
                report.errors += 1;
                continue;
            };

            let response = match self.provider.get_transaction(shwary_id).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::error!(%shwary_id, %error, "sweep status check failed");
                    report.errors += 1;
                    continue;
                }
            };

            match self
                .apply_trusted_status(shwary_id, &response.status, &response.raw)
                .await
            {
                Ok(ReconcileAction::Updated { current, .. }) => {
                    tracing::info!(%shwary_id, status = %current, "sweep updated transaction");
                    report.updated += 1;
                }
                Ok(_) => report.still_pending += 1,
                Err(error) => {
                    tracing::error!(%shwary_id, %error, "sweep update failed");
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }
}
