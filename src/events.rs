//! Synchronous in-process event dispatch for persisted status changes.
//!
//! Events fire only after the reconcile step has committed; a failing
//! subscriber is logged and skipped so it can never re-open or roll back
//! the already-committed update.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{Transaction, TransactionStatus};

#[derive(Debug, Clone)]
pub enum PaymentEvent {
    /// Fires on every persisted status change, before the specific
    /// success/failure event.
    StatusChanged {
        previous: TransactionStatus,
        current: TransactionStatus,
        transaction: Transaction,
        raw: Value,
    },
    PaymentSucceeded {
        transaction: Transaction,
        raw: Value,
    },
    PaymentFailed {
        transaction: Transaction,
        raw: Value,
    },
}

impl PaymentEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentEvent::StatusChanged { .. } => "status_changed",
            PaymentEvent::PaymentSucceeded { .. } => "payment_succeeded",
            PaymentEvent::PaymentFailed { .. } => "payment_failed",
        }
    }
}

pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &PaymentEvent) -> anyhow::Result<()>;
}

/// Ordered list of subscribers, registered at startup.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn dispatch(&self, event: &PaymentEvent) {
        for subscriber in &self.subscribers {
            if let Err(error) = subscriber.on_event(event) {
                tracing::error!(kind = event.kind(), %error, "event subscriber failed");
            }
        }
    }

    /// Emits the fixed sequence for a committed status change: the
    /// generic change event, then succeeded or failed when the new
    /// status is terminal.
    pub fn publish_status_change(
        &self,
        previous: &TransactionStatus,
        transaction: &Transaction,
        raw: &Value,
    ) {
        self.dispatch(&PaymentEvent::StatusChanged {
            previous: previous.clone(),
            current: transaction.status.clone(),
            transaction: transaction.clone(),
            raw: raw.clone(),
        });

        match transaction.status {
            TransactionStatus::Completed => self.dispatch(&PaymentEvent::PaymentSucceeded {
                transaction: transaction.clone(),
                raw: raw.clone(),
            }),
            TransactionStatus::Failed => self.dispatch(&PaymentEvent::PaymentFailed {
                transaction: transaction.clone(),
                raw: raw.clone(),
            }),
            _ => {}
        }
    }
}
