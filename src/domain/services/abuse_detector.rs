use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::{
    data::datasources::purchase_record_datasource::PurchaseRecordDatasource,
    errors::IntegrityError,
};

/// Promotional purchases allowed per account within the lookback window.
pub const PROMOTIONAL_PURCHASE_CEILING: usize = 3;
pub const PROMOTIONAL_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatus {
    Unclaimed,
    /// Re-validation of a receipt the account already owns (e.g. reinstall).
    OwnedBySelf,
    OwnedByOther { owner_account_id: String },
}

/// Duplicate receipt and promotional code abuse checks.
pub struct AbuseDetector {
    purchases: Arc<dyn PurchaseRecordDatasource>,
}

impl AbuseDetector {
    pub fn new(purchases: Arc<dyn PurchaseRecordDatasource>) -> Self {
        Self { purchases }
    }

    pub async fn claim_status(
        &self,
        transaction_id: &str,
        account_id: &str,
    ) -> Result<ClaimStatus, IntegrityError> {
        Ok(
            match self.purchases.find_by_transaction_id(transaction_id).await? {
                None => ClaimStatus::Unclaimed,
                Some(record) if record.account_id == account_id => ClaimStatus::OwnedBySelf,
                Some(record) => ClaimStatus::OwnedByOther {
                    owner_account_id: record.account_id,
                },
            },
        )
    }

    /// True if the transaction is already owned by a different account.
    pub async fn check_receipt_duplicate(
        &self,
        transaction_id: &str,
        account_id: &str,
    ) -> Result<bool, IntegrityError> {
        Ok(matches!(
            self.claim_status(transaction_id, account_id).await?,
            ClaimStatus::OwnedByOther { .. }
        ))
    }

    /// True if the account exceeded the promotional purchase ceiling within
    /// the lookback window, or already used this exact promo code.
    pub async fn check_promotional_code_abuse(
        &self,
        account_id: &str,
        promo_code: &str,
    ) -> Result<bool, IntegrityError> {
        self.check_promotional_code_abuse_at(account_id, promo_code, Utc::now())
            .await
    }

    pub(crate) async fn check_promotional_code_abuse_at(
        &self,
        account_id: &str,
        promo_code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, IntegrityError> {
        let records = self.purchases.list_by_account(account_id).await?;
        let lookback_start = now - Duration::days(PROMOTIONAL_LOOKBACK_DAYS);

        let recent_promotional = records
            .iter()
            .filter(|r| r.is_promotional && r.transaction.purchase_time >= lookback_start)
            .count();
        let same_code_uses = records
            .iter()
            .filter(|r| r.transaction.promotional_offer_id.as_deref() == Some(promo_code))
            .count();

        debug!(
            account_id,
            promo_code, recent_promotional, same_code_uses, "promotional usage"
        );
        Ok(recent_promotional > PROMOTIONAL_PURCHASE_CEILING || same_code_uses >= 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::datasources::purchase_record_datasource::InMemoryPurchaseRecordDatasource,
        domain::entities::{purchase_record::PurchaseRecord, transaction::Transaction},
    };

    fn record(
        transaction_id: &str,
        account_id: &str,
        promo: Option<&str>,
        purchase_time: DateTime<Utc>,
    ) -> PurchaseRecord {
        PurchaseRecord::new(
            Transaction {
                transaction_id: transaction_id.to_owned(),
                original_transaction_id: transaction_id.to_owned(),
                product_id: "premium_monthly".to_owned(),
                purchase_time,
                expiry_time: None,
                is_trial_period: false,
                is_intro_offer_period: false,
                auto_renew_status: false,
                cancellation_time: None,
                promotional_offer_id: promo.map(str::to_owned),
            },
            account_id,
            0,
            purchase_time,
        )
    }

    fn detector() -> (Arc<InMemoryPurchaseRecordDatasource>, AbuseDetector) {
        let store = Arc::new(InMemoryPurchaseRecordDatasource::new());
        (store.clone(), AbuseDetector::new(store))
    }

    #[tokio::test]
    async fn same_account_revalidation_is_not_a_duplicate() {
        let (store, detector) = detector();
        assert!(!detector.check_receipt_duplicate("tx", "alice").await.unwrap());
        store.insert(record("tx", "alice", None, Utc::now())).await;
        assert!(!detector.check_receipt_duplicate("tx", "alice").await.unwrap());
        assert!(!detector.check_receipt_duplicate("tx", "alice").await.unwrap());
        assert!(detector.check_receipt_duplicate("tx", "bob").await.unwrap());
        assert_eq!(
            detector.claim_status("tx", "bob").await.unwrap(),
            ClaimStatus::OwnedByOther {
                owner_account_id: "alice".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn same_promo_code_is_abuse_on_second_use() {
        let (store, detector) = detector();
        assert!(!detector
            .check_promotional_code_abuse("alice", "SAME_PROMO")
            .await
            .unwrap());
        store
            .insert(record("tx-1", "alice", Some("SAME_PROMO"), Utc::now()))
            .await;
        assert!(detector
            .check_promotional_code_abuse("alice", "SAME_PROMO")
            .await
            .unwrap());
        // Other accounts are unaffected.
        assert!(!detector
            .check_promotional_code_abuse("bob", "SAME_PROMO")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn promotional_ceiling_applies_within_lookback() {
        let (store, detector) = detector();
        let now = Utc::now();
        for i in 0..4 {
            store
                .insert(record(
                    &format!("old-{i}"),
                    "alice",
                    Some(&format!("PROMO_{i}")),
                    now - Duration::days(60),
                ))
                .await;
        }
        assert!(!detector
            .check_promotional_code_abuse_at("alice", "NEW", now)
            .await
            .unwrap());

        for i in 0..4 {
            store
                .insert(record(
                    &format!("recent-{i}"),
                    "alice",
                    Some(&format!("RECENT_{i}")),
                    now - Duration::days(1),
                ))
                .await;
        }
        assert!(detector
            .check_promotional_code_abuse_at("alice", "NEW", now)
            .await
            .unwrap());
    }
}
