use std::collections::HashMap;

use once_cell::sync::Lazy;

pub(crate) const VERIFY_RECEIPT_PRODUCTION_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";
pub(crate) const VERIFY_RECEIPT_SANDBOX_URL: &str =
    "https://sandbox.itunes.apple.com/verifyReceipt";
pub(crate) const APPLE_JWK_URL: &str = "https://appleid.apple.com/auth/keys";

pub(crate) const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// verifyReceipt status codes.
pub(crate) const STATUS_OK: i64 = 0;
pub(crate) const STATUS_SANDBOX_RECEIPT_IN_PRODUCTION: i64 = 21007;

static STATUS_MESSAGES: Lazy<HashMap<i64, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (21000, "The request to the App Store was not made using the HTTP POST request method."),
        (21001, "This status code is no longer sent by the App Store."),
        (21002, "The data in the receipt-data property was malformed or the service experienced a temporary issue."),
        (21003, "The receipt could not be authenticated."),
        (21004, "The shared secret you provided does not match the shared secret on file for your account."),
        (21005, "The receipt server was temporarily unable to provide the receipt."),
        (21006, "This receipt is valid but the subscription has expired."),
        (21007, "This receipt is from the test environment, but it was sent to the production environment for verification."),
        (21008, "This receipt is from the production environment, but it was sent to the test environment for verification."),
        (21009, "Internal data access error."),
        (21010, "The user account cannot be found or has been deleted."),
    ])
});

/// Maps a verifyReceipt status code to its documented message.
pub(crate) fn receipt_status_message(status: i64) -> &'static str {
    if let Some(message) = STATUS_MESSAGES.get(&status) {
        return message;
    }
    match status {
        21100..=21199 => "Internal data access error.",
        _ => "Unknown receipt validation error.",
    }
}

// Fixed rejection scores.
pub(crate) const DUPLICATE_RECEIPT_SCORE: u8 = 100;
pub(crate) const PROMO_ABUSE_SCORE: u8 = 90;

pub(crate) const DUPLICATE_RECEIPT_ERROR: &str = "Receipt already used";
pub(crate) const PROMO_ABUSE_ERROR: &str = "Promotional offer abuse detected";
pub(crate) const BUNDLE_MISMATCH_ERROR: &str = "Receipt bundle mismatch";
