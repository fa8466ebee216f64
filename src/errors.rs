use std::time::Duration;

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum IntegrityError {
    /// The verification service returned a non-zero status that is not
    /// retried.
    #[error("Receipt validation rejected ({status}): {message}")]
    ValidationRejected { status: i64, message: String },

    /// The verification service reported success, but the response did not
    /// contain a usable transaction entry.
    #[error("Malformed verification response: {0}")]
    MalformedResponse(String),

    #[error("Receipt already used (transaction {transaction_id}).")]
    DuplicateReceipt { transaction_id: String },

    #[error("Promotional code abuse detected for account {account_id} ({promo_code}).")]
    PromoAbuseDetected {
        account_id: String,
        promo_code: String,
    },

    #[error("Network failure during {context} (timed out: {timed_out}): {source}")]
    NetworkFailure {
        context: String,
        timed_out: bool,
        #[source]
        source: BoxedSource,
    },

    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),

    #[error("{message}")]
    RateLimitExceeded {
        message: String,
        retry_after: Duration,
    },

    #[error("Authentication required.")]
    Unauthorized,

    #[error("Insufficient privileges.")]
    Forbidden,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntegrityError {
    pub(crate) fn network(context: &str, e: reqwest::Error) -> Self {
        IntegrityError::NetworkFailure {
            context: context.to_owned(),
            timed_out: e.is_timeout(),
            source: Box::new(e),
        }
    }

    /// HTTP status equivalent, for callers exposing these errors over HTTP.
    pub fn status_code(&self) -> u16 {
        match self {
            IntegrityError::ValidationRejected { .. }
            | IntegrityError::DuplicateReceipt { .. }
            | IntegrityError::PromoAbuseDetected { .. } => 400,
            IntegrityError::SignatureInvalid(_) | IntegrityError::Unauthorized => 401,
            IntegrityError::Forbidden => 403,
            IntegrityError::RateLimitExceeded { .. } => 429,
            IntegrityError::MalformedResponse(_) | IntegrityError::NetworkFailure { .. } => 502,
            IntegrityError::Store(_) | IntegrityError::Config(_) => 500,
        }
    }

    /// Whole seconds until a throttled call may be retried. Always at least
    /// one second for rate limit rejections.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            IntegrityError::RateLimitExceeded { retry_after, .. } => {
                Some(crate::domain::entities::rate_limit::ceil_secs(*retry_after))
            }
            _ => None,
        }
    }
}
