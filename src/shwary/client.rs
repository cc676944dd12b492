//! HTTP client for the Shwary mobile-money API.

use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::{Country, TransactionStatus};
use crate::ports::{PaymentProvider, ProviderResponse};

const SANDBOX_BASE_URL: &str = "https://sandbox.api.shwary.com";
const PRODUCTION_BASE_URL: &str = "https://api.shwary.com";

#[derive(Error, Debug)]
pub enum ShwaryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from the API, with the body when it was JSON.
    #[error("Shwary API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        raw: Option<Value>,
    },

    #[error("Invalid response from Shwary: {0}")]
    InvalidResponse(String),
}

impl ShwaryError {
    /// Structured payload carried by the failure, when the API sent one.
    pub fn raw_payload(&self) -> Option<&Value> {
        match self {
            ShwaryError::Api { raw, .. } => raw.as_ref(),
            _ => None,
        }
    }
}

/// Merchant-authenticated client for the Shwary API, sandbox or
/// production depending on configuration.
#[derive(Clone)]
pub struct ShwaryClient {
    client: Client,
    base_url: String,
    merchant_id: String,
    merchant_key: String,
}

impl ShwaryClient {
    pub fn new(
        merchant_id: String,
        merchant_key: String,
        sandbox: bool,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let base_url = if sandbox {
            SANDBOX_BASE_URL.to_string()
        } else {
            PRODUCTION_BASE_URL.to_string()
        };

        ShwaryClient {
            client,
            base_url,
            merchant_id,
            merchant_key,
        }
    }

    /// Overrides the API base URL. Used by tests against a local server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn payments_url(&self) -> String {
        format!("{}/v1/payments", self.base_url.trim_end_matches('/'))
    }

    async fn parse_response(response: reqwest::Response) -> Result<ProviderResponse, ShwaryError> {
        let status = response.status();

        if !status.is_success() {
            let raw = response.json::<Value>().await.ok();
            let message = raw
                .as_ref()
                .and_then(|v| v.get("message").and_then(Value::as_str))
                .unwrap_or("request rejected")
                .to_string();
            return Err(ShwaryError::Api {
                status: status.as_u16(),
                message,
                raw,
            });
        }

        let raw = response.json::<Value>().await?;
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ShwaryError::InvalidResponse("missing transaction id".to_string()))?
            .to_string();
        let payment_status = raw
            .get("status")
            .and_then(Value::as_str)
            .map(TransactionStatus::parse)
            .ok_or_else(|| ShwaryError::InvalidResponse("missing status".to_string()))?;

        Ok(ProviderResponse {
            id,
            status: payment_status,
            raw,
        })
    }
}

#[async_trait]
impl PaymentProvider for ShwaryClient {
    async fn initiate_payment(
        &self,
        country: Country,
        amount: &BigDecimal,
        phone_number: &str,
        callback_url: &str,
    ) -> Result<ProviderResponse, ShwaryError> {
        let body = json!({
            "country": country.as_str(),
            "amount": amount.to_string(),
            "phone_number": phone_number,
            "callback_url": callback_url,
        });

        let response = self
            .client
            .post(self.payments_url())
            .header("X-Merchant-Id", &self.merchant_id)
            .bearer_auth(&self.merchant_key)
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn get_transaction(&self, shwary_id: &str) -> Result<ProviderResponse, ShwaryError> {
        let url = format!("{}/{}", self.payments_url(), shwary_id);

        let response = self
            .client
            .get(&url)
            .header("X-Merchant-Id", &self.merchant_id)
            .bearer_auth(&self.merchant_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
