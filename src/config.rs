use std::{env, time::Duration};

use crate::{
    constants::{
        APPLE_JWK_URL, DEFAULT_HTTP_TIMEOUT_SECS, VERIFY_RECEIPT_PRODUCTION_URL,
        VERIFY_RECEIPT_SANDBOX_URL,
    },
    errors::IntegrityError,
};

/// Non-secret settings for the integrity subsystem.
#[derive(Debug, Clone)]
pub struct IntegrityConfig {
    /// Bundle identifier that receipts and notifications must belong to.
    pub bundle_id: String,
    pub verify_receipt_production_url: String,
    pub verify_receipt_sandbox_url: String,
    /// Published key set (JWKS) used to verify signed notifications.
    pub notification_key_set_url: String,
    /// Upper bound for every outbound call.
    pub http_timeout: Duration,
    /// Bootstrap admin emails. Only consulted by the admin gateway, after
    /// authentication and rate limiting.
    pub admin_email_allow_list: Vec<String>,
}

impl IntegrityConfig {
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            verify_receipt_production_url: VERIFY_RECEIPT_PRODUCTION_URL.to_owned(),
            verify_receipt_sandbox_url: VERIFY_RECEIPT_SANDBOX_URL.to_owned(),
            notification_key_set_url: APPLE_JWK_URL.to_owned(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            admin_email_allow_list: Vec::new(),
        }
    }

    /// Reads configuration from the environment. `IAP_BUNDLE_ID` is required,
    /// everything else falls back to the defaults.
    pub fn from_env() -> Result<Self, IntegrityError> {
        let bundle_id = env::var("IAP_BUNDLE_ID")
            .map_err(|_| IntegrityError::Config("IAP_BUNDLE_ID is not set".to_owned()))?;
        let mut config = Self::new(bundle_id);
        if let Ok(url) = env::var("IAP_VERIFY_RECEIPT_PRODUCTION_URL") {
            config.verify_receipt_production_url = url;
        }
        if let Ok(url) = env::var("IAP_VERIFY_RECEIPT_SANDBOX_URL") {
            config.verify_receipt_sandbox_url = url;
        }
        if let Ok(url) = env::var("IAP_NOTIFICATION_KEY_SET_URL") {
            config.notification_key_set_url = url;
        }
        if let Ok(secs) = env::var("IAP_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                IntegrityError::Config(format!("IAP_HTTP_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Ok(emails) = env::var("ADMIN_EMAIL_ALLOW_LIST") {
            config.admin_email_allow_list = parse_email_list(&emails);
        }
        Ok(config)
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_trimmed_and_lowercased() {
        assert_eq!(
            parse_email_list(" Ops@Example.com, ,root@example.com "),
            vec!["ops@example.com".to_owned(), "root@example.com".to_owned()]
        );
    }

    #[test]
    fn defaults_point_at_production_services() {
        let config = IntegrityConfig::new("com.example.app");
        assert_eq!(
            config.verify_receipt_production_url,
            "https://buy.itunes.apple.com/verifyReceipt"
        );
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert!(config.admin_email_allow_list.is_empty());
    }
}
