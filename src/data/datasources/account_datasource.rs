use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::errors::IntegrityError;

#[async_trait]
pub trait AccountDatasource: Send + Sync {
    /// `None` if the account is unknown.
    async fn account_created_at(
        &self,
        account_id: &str,
    ) -> Result<Option<DateTime<Utc>>, IntegrityError>;
}

#[derive(Default)]
pub struct InMemoryAccountDatasource {
    accounts: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryAccountDatasource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, account_id: impl Into<String>, created_at: DateTime<Utc>) {
        self.accounts
            .write()
            .await
            .insert(account_id.into(), created_at);
    }
}

#[async_trait]
impl AccountDatasource for InMemoryAccountDatasource {
    async fn account_created_at(
        &self,
        account_id: &str,
    ) -> Result<Option<DateTime<Utc>>, IntegrityError> {
        Ok(self.accounts.read().await.get(account_id).copied())
    }
}
