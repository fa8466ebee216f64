use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single purchase event as reported by the platform. Renewals of a
/// subscription are separate transactions sharing `original_transaction_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub product_id: String,
    pub purchase_time: DateTime<Utc>,
    /// Absent for non-subscription products.
    pub expiry_time: Option<DateTime<Utc>>,
    pub is_trial_period: bool,
    pub is_intro_offer_period: bool,
    pub auto_renew_status: bool,
    pub cancellation_time: Option<DateTime<Utc>>,
    pub promotional_offer_id: Option<String>,
}

impl Transaction {
    pub fn is_subscription(&self) -> bool {
        self.expiry_time.is_some()
    }

    pub fn is_promotional(&self) -> bool {
        self.promotional_offer_id.is_some()
    }
}
