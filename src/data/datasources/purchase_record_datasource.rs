use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    domain::entities::purchase_record::{ClaimOutcome, PurchaseRecord},
    errors::IntegrityError,
};

/// Purchase record store, keyed by transaction id.
#[async_trait]
pub trait PurchaseRecordDatasource: Send + Sync {
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PurchaseRecord>, IntegrityError>;

    /// Conditional owner write. Must be atomic with respect to concurrent
    /// claims of the same transaction id: at most one account ever owns a
    /// transaction.
    async fn claim(&self, record: PurchaseRecord) -> Result<ClaimOutcome, IntegrityError>;

    async fn list_by_account(&self, account_id: &str)
        -> Result<Vec<PurchaseRecord>, IntegrityError>;

    /// Records from every account that were validated on the given device.
    async fn list_by_device_fingerprint(
        &self,
        device_fingerprint: &str,
    ) -> Result<Vec<PurchaseRecord>, IntegrityError>;

    /// Returns false if no record exists for the transaction.
    async fn mark_refunded(
        &self,
        transaction_id: &str,
        refunded_at: DateTime<Utc>,
    ) -> Result<bool, IntegrityError>;
}

#[derive(Default)]
pub struct InMemoryPurchaseRecordDatasource {
    records: Mutex<HashMap<String, PurchaseRecord>>,
}

impl InMemoryPurchaseRecordDatasource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record unconditionally. Intended for seeding history.
    pub async fn insert(&self, record: PurchaseRecord) {
        self.records
            .lock()
            .await
            .insert(record.transaction_id().to_owned(), record);
    }
}

#[async_trait]
impl PurchaseRecordDatasource for InMemoryPurchaseRecordDatasource {
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PurchaseRecord>, IntegrityError> {
        Ok(self.records.lock().await.get(transaction_id).cloned())
    }

    async fn claim(&self, record: PurchaseRecord) -> Result<ClaimOutcome, IntegrityError> {
        let mut records = self.records.lock().await;
        match records.get(record.transaction_id()) {
            Some(existing) if existing.account_id == record.account_id => {
                Ok(ClaimOutcome::AlreadyOwned)
            }
            Some(existing) => Ok(ClaimOutcome::OwnedByOther {
                owner_account_id: existing.account_id.clone(),
            }),
            None => {
                records.insert(record.transaction_id().to_owned(), record);
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    async fn list_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<PurchaseRecord>, IntegrityError> {
        let mut records: Vec<PurchaseRecord> = self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.transaction.purchase_time);
        Ok(records)
    }

    async fn list_by_device_fingerprint(
        &self,
        device_fingerprint: &str,
    ) -> Result<Vec<PurchaseRecord>, IntegrityError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.device_fingerprint.as_deref() == Some(device_fingerprint))
            .cloned()
            .collect())
    }

    async fn mark_refunded(
        &self,
        transaction_id: &str,
        refunded_at: DateTime<Utc>,
    ) -> Result<bool, IntegrityError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get_mut(transaction_id) else {
            return Ok(false);
        };
        record.refunded = true;
        record.refunded_at.get_or_insert(refunded_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::entities::transaction::Transaction;

    fn record(transaction_id: &str, account_id: &str) -> PurchaseRecord {
        PurchaseRecord::new(
            Transaction {
                transaction_id: transaction_id.to_owned(),
                original_transaction_id: transaction_id.to_owned(),
                product_id: "coins_100".to_owned(),
                purchase_time: Utc::now(),
                expiry_time: None,
                is_trial_period: false,
                is_intro_offer_period: false,
                auto_renew_status: false,
                cancellation_time: None,
                promotional_offer_id: None,
            },
            account_id,
            0,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn claim_is_conditional_on_owner() {
        let store = InMemoryPurchaseRecordDatasource::new();
        assert_eq!(store.claim(record("tx-1", "alice")).await.unwrap(), ClaimOutcome::Claimed);
        assert_eq!(
            store.claim(record("tx-1", "alice")).await.unwrap(),
            ClaimOutcome::AlreadyOwned
        );
        assert_eq!(
            store.claim(record("tx-1", "bob")).await.unwrap(),
            ClaimOutcome::OwnedByOther {
                owner_account_id: "alice".to_owned()
            }
        );
        let owner = store.find_by_transaction_id("tx-1").await.unwrap().unwrap();
        assert_eq!(owner.account_id, "alice");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_a_single_winner() {
        let store = Arc::new(InMemoryPurchaseRecordDatasource::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .claim(record("tx-race", &format!("account-{i}")))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() == ClaimOutcome::Claimed {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn mark_refunded_keeps_first_refund_time() {
        let store = InMemoryPurchaseRecordDatasource::new();
        store.insert(record("tx-2", "alice")).await;
        let first = Utc::now();
        assert!(store.mark_refunded("tx-2", first).await.unwrap());
        assert!(store
            .mark_refunded("tx-2", first + chrono::Duration::hours(1))
            .await
            .unwrap());
        let r = store.find_by_transaction_id("tx-2").await.unwrap().unwrap();
        assert!(r.refunded);
        assert_eq!(r.refunded_at, Some(first));
        assert!(!store.mark_refunded("missing", first).await.unwrap());
    }

    #[tokio::test]
    async fn lists_records_by_device_fingerprint() {
        let store = InMemoryPurchaseRecordDatasource::new();
        store
            .insert(record("tx-3", "alice").with_device_fingerprint(Some("fp-1".to_owned())))
            .await;
        store
            .insert(record("tx-4", "bob").with_device_fingerprint(Some("fp-1".to_owned())))
            .await;
        store.insert(record("tx-5", "carol")).await;
        let mut accounts: Vec<String> = store
            .list_by_device_fingerprint("fp-1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.account_id)
            .collect();
        accounts.sort();
        assert_eq!(accounts, ["alice", "bob"]);
        assert!(store.list_by_device_fingerprint("fp-2").await.unwrap().is_empty());
    }
}
