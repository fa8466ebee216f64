#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{formats::Flexible, serde_as, DisplayFromStr, TimestampMilliSeconds};

use crate::data::models::app_store_server_api::common::Environment;

/// Body of a verifyReceipt response.
///
/// https://developer.apple.com/documentation/appstorereceipts/responsebody
///
/// Apple encodes timestamps and booleans as strings in this API.
#[derive(Debug, Deserialize)]
pub(crate) struct VerifyReceiptResponseModel {
    /// 0 if the receipt is valid, otherwise one of the documented error
    /// codes.
    pub(crate) status: i64,
    pub(crate) environment: Option<Environment>,
    pub(crate) receipt: Option<ReceiptModel>,
    /// Most recent in-app purchase transactions. Only returned for receipts
    /// containing auto-renewable subscriptions.
    pub(crate) latest_receipt_info: Option<Vec<InAppTransactionModel>>,
    #[serde(default)]
    pub(crate) pending_renewal_info: Vec<PendingRenewalInfoModel>,
    #[serde(rename = "is-retryable", default)]
    pub(crate) is_retryable: bool,
}

impl VerifyReceiptResponseModel {
    pub(crate) fn is_sandbox(&self) -> bool {
        self.environment
            .as_ref()
            .is_some_and(|environment| environment.is_sandbox())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptModel {
    pub(crate) bundle_id: String,
    pub(crate) application_version: Option<String>,
    pub(crate) receipt_type: Option<String>,
    #[serde(default)]
    pub(crate) in_app: Vec<InAppTransactionModel>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InAppTransactionModel {
    pub(crate) transaction_id: String,
    pub(crate) original_transaction_id: String,
    pub(crate) product_id: String,
    #[serde_as(as = "TimestampMilliSeconds<String, Flexible>")]
    pub(crate) purchase_date_ms: DateTime<Utc>,
    #[serde_as(as = "Option<TimestampMilliSeconds<String, Flexible>>")]
    pub(crate) expires_date_ms: Option<DateTime<Utc>>,
    #[serde_as(as = "Option<TimestampMilliSeconds<String, Flexible>>")]
    pub(crate) cancellation_date_ms: Option<DateTime<Utc>>,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub(crate) is_trial_period: bool,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub(crate) is_in_intro_offer_period: bool,
    pub(crate) promotional_offer_id: Option<String>,
    pub(crate) offer_code_ref_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PendingRenewalInfoModel {
    pub(crate) original_transaction_id: Option<String>,
    pub(crate) auto_renew_product_id: Option<String>,
    /// "1" if the subscription will renew, "0" otherwise.
    pub(crate) auto_renew_status: Option<String>,
}

impl PendingRenewalInfoModel {
    pub(crate) fn will_auto_renew(&self) -> bool {
        self.auto_renew_status.as_deref() == Some("1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_encoded_fields() {
        let body = r#"{
            "status": 0,
            "environment": "Sandbox",
            "receipt": { "bundle_id": "com.example.app", "in_app": [] },
            "latest_receipt_info": [{
                "transaction_id": "1000000000000002",
                "original_transaction_id": "1000000000000001",
                "product_id": "premium_monthly",
                "purchase_date_ms": "1700000000000",
                "expires_date_ms": "1702592000000",
                "is_trial_period": "true",
                "is_in_intro_offer_period": "false"
            }],
            "pending_renewal_info": [{
                "original_transaction_id": "1000000000000001",
                "auto_renew_status": "1"
            }]
        }"#;
        let m: VerifyReceiptResponseModel = serde_json::from_str(body).unwrap();
        assert!(m.is_sandbox());
        let entry = &m.latest_receipt_info.as_ref().unwrap()[0];
        assert!(entry.is_trial_period);
        assert!(!entry.is_in_intro_offer_period);
        assert_eq!(entry.purchase_date_ms.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(
            entry.expires_date_ms.map(|d| d.timestamp_millis()),
            Some(1_702_592_000_000)
        );
        assert!(entry.cancellation_date_ms.is_none());
        assert!(m.pending_renewal_info[0].will_auto_renew());
    }

    #[test]
    fn error_status_without_receipt_parses() {
        let m: VerifyReceiptResponseModel =
            serde_json::from_str(r#"{"status": 21007}"#).unwrap();
        assert_eq!(m.status, 21007);
        assert!(m.receipt.is_none());
        assert!(m.latest_receipt_info.is_none());
        assert!(m.pending_renewal_info.is_empty());
    }
}
