use serde::Serialize;

/// Body of a verifyReceipt request.
///
/// https://developer.apple.com/documentation/appstorereceipts/requestbody
#[derive(Debug, Serialize)]
pub(crate) struct VerifyReceiptRequestModel<'a> {
    /// The Base64-encoded receipt data.
    #[serde(rename = "receipt-data")]
    pub(crate) receipt_data: &'a str,
    /// The app's shared secret.
    pub(crate) password: &'a str,
    /// Only return the latest renewal transaction of each subscription.
    #[serde(rename = "exclude-old-transactions")]
    pub(crate) exclude_old_transactions: bool,
}
