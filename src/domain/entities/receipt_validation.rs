use chrono::{DateTime, Utc};
use serde::Serialize;

use super::transaction::Transaction;

/// Normalized outcome of validating a client receipt.
///
/// Business rejections (authority status, duplicate receipt, promotional
/// abuse) are reported here with `is_valid == false`; transport failures are
/// returned as errors instead.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptValidationResult {
    pub is_valid: bool,
    pub transaction: Option<Transaction>,
    pub is_subscription: bool,
    pub is_trial_period: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub auto_renew_status: bool,
    pub is_sandbox: bool,
    pub fraud_score: u8,
    pub flagged_for_review: bool,
    pub error: Option<String>,
    /// Authority status code, when the rejection came from the authority.
    pub status_code: Option<i64>,
}

impl ReceiptValidationResult {
    pub(crate) fn valid(
        transaction: Transaction,
        is_sandbox: bool,
        fraud_score: u8,
        flagged_for_review: bool,
    ) -> Self {
        Self {
            is_valid: true,
            is_subscription: transaction.is_subscription(),
            is_trial_period: transaction.is_trial_period,
            expires_at: transaction.expiry_time,
            auto_renew_status: transaction.auto_renew_status,
            transaction: Some(transaction),
            is_sandbox,
            fraud_score,
            flagged_for_review,
            error: None,
            status_code: None,
        }
    }

    pub(crate) fn rejected(error: impl Into<String>, fraud_score: u8) -> Self {
        Self {
            is_valid: false,
            transaction: None,
            is_subscription: false,
            is_trial_period: false,
            expires_at: None,
            auto_renew_status: false,
            is_sandbox: false,
            fraud_score,
            flagged_for_review: false,
            error: Some(error.into()),
            status_code: None,
        }
    }

    pub(crate) fn with_status(mut self, status: i64) -> Self {
        self.status_code = Some(status);
        self
    }
}
