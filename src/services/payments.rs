//! Payment initiation against the Shwary API.

use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::Utc;

use crate::config::Config;
use crate::domain::{Country, EntityRef, Transaction, TransactionStatus};
use crate::error::AppError;
use crate::events::EventBus;
use crate::ports::{PaymentProvider, TransactionRepository};
use crate::shwary::ShwaryClient;

pub struct PaymentService {
    pub(crate) provider: Arc<dyn PaymentProvider>,
    pub(crate) repository: Arc<dyn TransactionRepository>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) sandbox: bool,
    /// Absolute webhook URL handed to the provider when the caller does
    /// not supply one. Resolved and validated at configuration time.
    pub(crate) callback_url: String,
}

impl PaymentService {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        repository: Arc<dyn TransactionRepository>,
        events: Arc<EventBus>,
        sandbox: bool,
        callback_url: String,
    ) -> Self {
        Self {
            provider,
            repository,
            events,
            sandbox,
            callback_url,
        }
    }

    /// Default factory: builds a `ShwaryClient` from configuration. Use
    /// `new` to inject a different provider.
    pub fn from_config(
        config: &Config,
        repository: Arc<dyn TransactionRepository>,
        events: Arc<EventBus>,
    ) -> Self {
        let client = ShwaryClient::new(
            config.merchant_id.clone(),
            config.merchant_key.clone(),
            config.sandbox,
            Duration::from_secs(config.timeout_secs),
        );

        Self::new(
            Arc::new(client),
            repository,
            events,
            config.sandbox,
            config.webhook_url(),
        )
    }

    /// Creates a local pending transaction and initiates the payment on
    /// the Shwary API.
    ///
    /// The pending row is persisted before the outbound call so a trace
    /// exists even if the call crashes. A provider failure leaves the
    /// row FAILED with the failure message (and the structured payload
    /// when the error carries one) and is re-raised to the caller.
    pub async fn initiate(
        &self,
        related: Option<EntityRef>,
        amount: BigDecimal,
        phone_number: &str,
        country: Country,
        currency: &str,
        callback_url: Option<String>,
    ) -> Result<Transaction, AppError> {
        if amount <= BigDecimal::from(0) {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }
        if phone_number.trim().is_empty() {
            return Err(AppError::Validation("phone_number is required".to_string()));
        }

        let mut txn = self
            .repository
            .insert(&Transaction::new(
                related,
                amount,
                currency.to_string(),
                phone_number.to_string(),
                self.sandbox,
            ))
            .await?;

        let callback_url = callback_url.unwrap_or_else(|| self.callback_url.clone());

        match self
            .provider
            .initiate_payment(country, &txn.amount, phone_number, &callback_url)
            .await
        {
            Ok(response) => {
                txn.shwary_id = Some(response.id);
                txn.status = response.status;
                txn.raw_response = Some(response.raw);
                txn.error_message = None;
                txn.updated_at = Utc::now();

                Ok(self.repository.update(&txn).await?)
            }
            Err(error) => {
                txn.status = TransactionStatus::Failed;
                txn.error_message = Some(error.to_string());
                if let Some(raw) = error.raw_payload() {
                    txn.raw_response = Some(raw.clone());
                }
                txn.updated_at = Utc::now();

                self.repository.update(&txn).await?;

                tracing::error!(
                    transaction_id = %txn.id,
                    %error,
                    "payment initiation failed"
                );
                Err(AppError::Provider(error))
            }
        }
    }

    /// Forces a status check for one transaction (polling path, used
    /// when the webhook never arrived). Returns `None` when no local
    /// transaction matches the identifier.
    pub async fn check_status(
        &self,
        shwary_id: &str,
    ) -> Result<Option<TransactionStatus>, AppError> {
        if self.repository.find_by_shwary_id(shwary_id).await?.is_none() {
            return Ok(None);
        }

        let response = self.provider.get_transaction(shwary_id).await?;
        self.apply_trusted_status(shwary_id, &response.status, &response.raw)
            .await?;

        Ok(Some(response.status))
    }
}
