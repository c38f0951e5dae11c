use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raised by the checkout side once payment for an order is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedEvent {
    pub order_id: String,
    pub team_id: String,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
    pub transactions: Vec<LicenceTransaction>,
}

/// One purchased unit of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LicenceTransaction {
    pub transaction_id: String,
    pub kind: TransactionKind,
    pub price_id: String,
    /// The licence being extended; only set for renewals.
    pub target_licence_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    New,
    Renewal,
}

/// Marks a purchase transaction as applied so that confirming the same
/// order again does not build its licence twice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedTransaction {
    #[serde(rename = "_id")]
    pub transaction_id: String,
    pub order_id: String,
    pub licence_id: String,
    pub kind: TransactionKind,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub applied_at: DateTime<Utc>,
}

impl ProcessedTransaction {
    pub const COLLECTION: &'static str = "order_transactions";
}
