use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub transaction: Transaction,
    pub account_id: String,
    pub refunded: bool,
    pub is_promotional: bool,
    /// Score computed when the receipt was validated.
    pub fraud_score: u8,
    pub recorded_at: DateTime<Utc>,
    /// Only ever set by refund or cancellation events.
    pub refunded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub device_fingerprint: Option<String>,
}

impl PurchaseRecord {
    pub fn new(
        transaction: Transaction,
        account_id: impl Into<String>,
        fraud_score: u8,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let is_promotional = transaction.is_promotional();
        Self {
            transaction,
            account_id: account_id.into(),
            refunded: false,
            is_promotional,
            fraud_score,
            recorded_at,
            refunded_at: None,
            device_fingerprint: None,
        }
    }

    pub fn with_device_fingerprint(mut self, device_fingerprint: Option<String>) -> Self {
        self.device_fingerprint = device_fingerprint;
        self
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction.transaction_id
    }
}

/// Outcome of a conditional owner write against the purchase record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The record was written; the transaction had no owner yet.
    Claimed,
    /// The same account already owned the transaction. Nothing was written.
    AlreadyOwned,
    /// Another account owns the transaction. Nothing was written.
    OwnedByOther { owner_account_id: String },
}
