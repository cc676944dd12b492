//! Transaction domain entity.
//! Framework-agnostic representation of one Shwary payment attempt.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel error message set at creation, cleared once the provider answers.
pub const INITIATING_MESSAGE: &str = "Initiating...";

/// Payment status as reported by the Shwary API.
///
/// The set is open: the provider may introduce statuses we do not know
/// about yet, so anything unrecognized round-trips through `Other`
/// instead of failing. Comparisons are plain equality on the lowercase
/// string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Other(String),
}

impl TransactionStatus {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => TransactionStatus::Pending,
            "completed" => TransactionStatus::Completed,
            "failed" => TransactionStatus::Failed,
            other => TransactionStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Other(value) => value.as_str(),
        }
    }

    /// Completed and failed are terminal; anything else is still open.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        TransactionStatus::parse(&value)
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Countries the Shwary API accepts payments from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Country {
    Drc,
    Ke,
    Ug,
}

impl Country {
    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Drc => "DRC",
            Country::Ke => "KE",
            Country::Ug => "UG",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Country {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "DRC" => Ok(Country::Drc),
            "KE" => Ok(Country::Ke),
            "UG" => Ok(Country::Ug),
            other => Err(format!("unknown country code: {other}")),
        }
    }
}

/// Back reference to an arbitrary entity in the host application.
///
/// A `{type tag, id}` pair the host resolves on its side. The gateway
/// stores it verbatim and never dereferences it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

/// One payment attempt against the Shwary API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Identifier issued by Shwary. `None` until the provider confirms,
    /// unique across transactions once set, never reassigned.
    pub shwary_id: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
    /// Customer phone number, E.164 (e.g. +243...).
    pub phone_number: String,
    pub status: TransactionStatus,
    pub sandbox: bool,
    pub related_type: Option<String>,
    pub related_id: Option<String>,
    /// Verbatim payload of the last *trusted* provider read.
    pub raw_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        related: Option<EntityRef>,
        amount: BigDecimal,
        currency: String,
        phone_number: String,
        sandbox: bool,
    ) -> Self {
        let now = Utc::now();
        let (related_type, related_id) = match related {
            Some(entity) => (Some(entity.entity_type), Some(entity.entity_id)),
            None => (None, None),
        };

        Self {
            id: Uuid::new_v4(),
            shwary_id: None,
            amount,
            currency,
            phone_number,
            status: TransactionStatus::Pending,
            sandbox,
            related_type,
            related_id,
            raw_response: None,
            error_message: Some(INITIATING_MESSAGE.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} {} ({})",
            self.shwary_id.as_deref().unwrap_or("<unconfirmed>"),
            self.amount,
            self.currency,
            self.status
        )
    }
}
