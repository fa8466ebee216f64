use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::entities::review::{AdminAlert, FlaggedTransaction, FraudLogEntry},
    errors::IntegrityError,
};

/// Append-only fraud log, review queue and admin alert queue.
#[async_trait]
pub trait AuditTrailDatasource: Send + Sync {
    async fn append_fraud_log(&self, entry: FraudLogEntry) -> Result<(), IntegrityError>;

    async fn push_flagged_transaction(
        &self,
        flagged: FlaggedTransaction,
    ) -> Result<(), IntegrityError>;

    async fn push_admin_alert(&self, alert: AdminAlert) -> Result<(), IntegrityError>;
}

#[derive(Default)]
pub struct InMemoryAuditTrailDatasource {
    fraud_log: Mutex<Vec<FraudLogEntry>>,
    flagged: Mutex<Vec<FlaggedTransaction>>,
    alerts: Mutex<Vec<AdminAlert>>,
}

impl InMemoryAuditTrailDatasource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fraud_log(&self) -> Vec<FraudLogEntry> {
        self.fraud_log.lock().await.clone()
    }

    pub async fn flagged_transactions(&self) -> Vec<FlaggedTransaction> {
        self.flagged.lock().await.clone()
    }

    pub async fn admin_alerts(&self) -> Vec<AdminAlert> {
        self.alerts.lock().await.clone()
    }
}

#[async_trait]
impl AuditTrailDatasource for InMemoryAuditTrailDatasource {
    async fn append_fraud_log(&self, entry: FraudLogEntry) -> Result<(), IntegrityError> {
        self.fraud_log.lock().await.push(entry);
        Ok(())
    }

    async fn push_flagged_transaction(
        &self,
        flagged: FlaggedTransaction,
    ) -> Result<(), IntegrityError> {
        self.flagged.lock().await.push(flagged);
        Ok(())
    }

    async fn push_admin_alert(&self, alert: AdminAlert) -> Result<(), IntegrityError> {
        self.alerts.lock().await.push(alert);
        Ok(())
    }
}
