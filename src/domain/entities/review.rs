use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Medium,
    High,
    Critical,
}

/// Review-queue entry for a transaction whose score reached the medium
/// threshold. Resolved by moderators only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub fraud_score: u8,
    pub priority: AlertPriority,
    pub reasons: Vec<String>,
    pub flagged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminAlert {
    pub title: String,
    pub message: String,
    pub priority: AlertPriority,
    pub transaction_id: Option<String>,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudLogKind {
    DuplicateReceipt,
    PromoAbuse,
    HighFraudScore,
    JailbreakSignal,
    /// Benign authority or transport failure. Kept apart from the fraud kinds
    /// so failure metrics and review queues stay separate.
    ValidationFailure,
}

impl FraudLogKind {
    pub fn is_fraud_signal(&self) -> bool {
        !matches!(self, FraudLogKind::ValidationFailure)
    }
}

/// Append-only audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudLogEntry {
    pub kind: FraudLogKind,
    pub account_id: String,
    pub transaction_id: Option<String>,
    pub fraud_score: Option<u8>,
    pub status_code: Option<i64>,
    pub details: String,
    pub logged_at: DateTime<Utc>,
}

impl FraudLogEntry {
    pub(crate) fn new(kind: FraudLogKind, account_id: &str, details: impl Into<String>) -> Self {
        Self {
            kind,
            account_id: account_id.to_owned(),
            transaction_id: None,
            fraud_score: None,
            status_code: None,
            details: details.into(),
            logged_at: Utc::now(),
        }
    }

    pub(crate) fn transaction(mut self, transaction_id: &str) -> Self {
        self.transaction_id = Some(transaction_id.to_owned());
        self
    }

    pub(crate) fn score(mut self, score: u8) -> Self {
        self.fraud_score = Some(score);
        self
    }

    pub(crate) fn status(mut self, status: i64) -> Self {
        self.status_code = Some(status);
        self
    }
}
