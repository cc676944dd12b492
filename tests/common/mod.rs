#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bigdecimal::BigDecimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use shwary_gateway::adapters::MemoryTransactionRepository;
use shwary_gateway::domain::{Country, Transaction, TransactionStatus};
use shwary_gateway::events::{EventBus, PaymentEvent, Subscriber};
use shwary_gateway::ports::{PaymentProvider, ProviderResponse, TransactionRepository};
use shwary_gateway::services::PaymentService;
use shwary_gateway::shwary::ShwaryError;
use shwary_gateway::{create_app, AppState};

#[derive(Clone)]
pub enum ProviderOutcome {
    Success(ProviderResponse),
    Failure { message: String, raw: Option<Value> },
}

/// Scripted stand-in for the Shwary API.
#[derive(Default)]
pub struct MockProvider {
    initiate: Mutex<Option<ProviderOutcome>>,
    statuses: Mutex<HashMap<String, ProviderOutcome>>,
}

impl MockProvider {
    pub fn set_initiate_success(&self, id: &str, status: &str) {
        let raw = json!({"id": id, "status": status});
        *self.initiate.lock().unwrap() = Some(ProviderOutcome::Success(ProviderResponse {
            id: id.to_string(),
            status: TransactionStatus::parse(status),
            raw,
        }));
    }

    pub fn set_initiate_failure(&self, message: &str, raw: Option<Value>) {
        *self.initiate.lock().unwrap() = Some(ProviderOutcome::Failure {
            message: message.to_string(),
            raw,
        });
    }

    pub fn set_status(&self, id: &str, status: &str) {
        let raw = json!({"id": id, "status": status, "source": "api"});
        self.statuses.lock().unwrap().insert(
            id.to_string(),
            ProviderOutcome::Success(ProviderResponse {
                id: id.to_string(),
                status: TransactionStatus::parse(status),
                raw,
            }),
        );
    }

    pub fn set_status_failure(&self, id: &str, message: &str) {
        self.statuses.lock().unwrap().insert(
            id.to_string(),
            ProviderOutcome::Failure {
                message: message.to_string(),
                raw: None,
            },
        );
    }
}

fn outcome_to_result(outcome: Option<ProviderOutcome>) -> Result<ProviderResponse, ShwaryError> {
    match outcome {
        Some(ProviderOutcome::Success(response)) => Ok(response),
        Some(ProviderOutcome::Failure { message, raw }) => Err(ShwaryError::Api {
            status: 503,
            message,
            raw,
        }),
        None => Err(ShwaryError::Api {
            status: 404,
            message: "transaction not found".to_string(),
            raw: None,
        }),
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn initiate_payment(
        &self,
        _country: Country,
        _amount: &BigDecimal,
        _phone_number: &str,
        _callback_url: &str,
    ) -> Result<ProviderResponse, ShwaryError> {
        outcome_to_result(self.initiate.lock().unwrap().clone())
    }

    async fn get_transaction(&self, shwary_id: &str) -> Result<ProviderResponse, ShwaryError> {
        outcome_to_result(self.statuses.lock().unwrap().get(shwary_id).cloned())
    }
}

/// Subscriber that records every dispatched event, in order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<PaymentEvent>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().iter().filter(|k| **k == kind).count()
    }
}

impl Subscriber for Recorder {
    fn on_event(&self, event: &PaymentEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct TestHarness {
    pub provider: Arc<MockProvider>,
    pub repository: Arc<MemoryTransactionRepository>,
    pub recorder: Arc<Recorder>,
    pub service: Arc<PaymentService>,
}

impl TestHarness {
    pub fn new() -> Self {
        let provider = Arc::new(MockProvider::default());
        let repository = Arc::new(MemoryTransactionRepository::new());
        let recorder = Recorder::new();

        let mut events = EventBus::new();
        events.subscribe(recorder.clone());

        let service = Arc::new(PaymentService::new(
            provider.clone(),
            repository.clone(),
            Arc::new(events),
            true,
            "https://host.example/webhook".to_string(),
        ));

        Self {
            provider,
            repository,
            recorder,
            service,
        }
    }

    pub fn app(&self) -> Router {
        create_app(AppState {
            service: self.service.clone(),
            repository: self.repository.clone(),
        })
    }

    /// Inserts a pending transaction already confirmed by the provider.
    pub async fn seed_pending(&self, shwary_id: &str) -> Transaction {
        let mut txn = Transaction::new(
            None,
            BigDecimal::from(5000),
            "CDF".to_string(),
            "+243810000000".to_string(),
            true,
        );
        txn.shwary_id = Some(shwary_id.to_string());
        txn.error_message = None;
        self.repository.insert(&txn).await.unwrap()
    }
}

pub async fn post_webhook(app: Router, payload: &str) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    app.oneshot(request).await.unwrap().status()
}

pub async fn get(app: Router, uri: &str) -> StatusCode {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap().status()
}
