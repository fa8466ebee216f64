use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;

use crate::errors::IntegrityError;

#[async_trait]
pub(crate) trait KeySetDatasource: Send + Sync {
    /// Fetches the issuer's published key set (JWKS).
    async fn fetch_key_set(&self) -> Result<JwkSet, IntegrityError>;
}

pub(crate) struct KeySetDatasourceImpl {
    client: reqwest::Client,
    url: String,
}

#[async_trait]
impl KeySetDatasource for KeySetDatasourceImpl {
    async fn fetch_key_set(&self) -> Result<JwkSet, IntegrityError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| IntegrityError::network("key set fetch", e))?;
        if !response.status().is_success() {
            return Err(IntegrityError::MalformedResponse(format!(
                "key set endpoint returned HTTP {}",
                response.status()
            )));
        }
        response.json().await.map_err(|e| {
            IntegrityError::MalformedResponse(format!("failed to parse key set: {e}"))
        })
    }
}

impl KeySetDatasourceImpl {
    pub(crate) fn new(url: String, timeout: Duration) -> Result<Self, IntegrityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntegrityError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }
}
