use async_trait::async_trait;

use crate::{
    domain::entities::{device_info::DeviceInfo, receipt_validation::ReceiptValidationResult},
    errors::IntegrityError,
};

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    /// Validates a client-submitted receipt for `account_id` and assesses it
    /// for duplicate use, promotional abuse and fraud risk.
    ///
    /// Rejections by the authority or by the abuse checks come back as an
    /// invalid result. Transport failures and unusable authority responses
    /// are errors.
    async fn validate_receipt(
        &self,
        receipt_data: &str,
        account_id: &str,
        device_info: Option<&DeviceInfo>,
    ) -> Result<ReceiptValidationResult, IntegrityError>;
}
