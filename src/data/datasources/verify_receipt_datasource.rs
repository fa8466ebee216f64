use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    data::models::verify_receipt::{
        verify_receipt_request_model::VerifyReceiptRequestModel,
        verify_receipt_response_model::VerifyReceiptResponseModel,
    },
    errors::IntegrityError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiptEnvironment {
    Production,
    Sandbox,
}

#[async_trait]
pub(crate) trait VerifyReceiptDatasource: Send + Sync {
    /// verifyReceipt:
    /// https://developer.apple.com/documentation/appstorereceipts/verifyreceipt
    ///
    /// receipt_data:
    ///   Base64-encoded receipt, as submitted by the client.
    ///
    /// A non-zero `status` in the response is not an error at this layer.
    async fn verify_receipt(
        &self,
        environment: ReceiptEnvironment,
        receipt_data: &str,
    ) -> Result<VerifyReceiptResponseModel, IntegrityError>;
}

pub(crate) struct VerifyReceiptDatasourceImpl {
    client: reqwest::Client,
    production_url: String,
    sandbox_url: String,
    shared_secret: String,
}

#[async_trait]
impl VerifyReceiptDatasource for VerifyReceiptDatasourceImpl {
    async fn verify_receipt(
        &self,
        environment: ReceiptEnvironment,
        receipt_data: &str,
    ) -> Result<VerifyReceiptResponseModel, IntegrityError> {
        let url = match environment {
            ReceiptEnvironment::Production => &self.production_url,
            ReceiptEnvironment::Sandbox => &self.sandbox_url,
        };
        debug!(?environment, "calling verifyReceipt");
        self.callout(
            url,
            &VerifyReceiptRequestModel {
                receipt_data,
                password: &self.shared_secret,
                exclude_old_transactions: true,
            },
        )
        .await
    }
}

impl VerifyReceiptDatasourceImpl {
    pub(crate) fn new(
        production_url: String,
        sandbox_url: String,
        shared_secret: String,
        timeout: Duration,
    ) -> Result<Self, IntegrityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntegrityError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            production_url,
            sandbox_url,
            shared_secret,
        })
    }

    async fn callout<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &VerifyReceiptRequestModel<'_>,
    ) -> Result<T, IntegrityError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| IntegrityError::network("verifyReceipt", e))?;

        if !response.status().is_success() {
            return Err(IntegrityError::MalformedResponse(format!(
                "verifyReceipt returned HTTP {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            if e.is_decode() {
                IntegrityError::MalformedResponse(format!(
                    "failed to parse verifyReceipt response: {e}"
                ))
            } else {
                IntegrityError::network("verifyReceipt", e)
            }
        })
    }
}
