use std::{future::Future, sync::Arc};

use crate::{
    config::IntegrityConfig,
    data::{
        datasources::{
            account_datasource::{AccountDatasource, InMemoryAccountDatasource},
            app_store_server_notification_datasource::AppStoreServerNotificationDatasourceImpl,
            audit_trail_datasource::{AuditTrailDatasource, InMemoryAuditTrailDatasource},
            key_set_datasource::KeySetDatasourceImpl,
            purchase_record_datasource::{
                InMemoryPurchaseRecordDatasource, PurchaseRecordDatasource,
            },
            verify_receipt_datasource::VerifyReceiptDatasourceImpl,
        },
        repositories::{
            notification_repository_impl::NotificationRepositoryImpl,
            receipt_repository_impl::ReceiptRepositoryImpl,
        },
    },
    domain::{
        entities::{
            admin::{AdminClaims, GuardOptions, GuardedResponse},
            device_info::DeviceInfo,
            fraud_assessment::{FraudAssessment, FraudContext},
            rate_limit::RateLimitDecision,
            receipt_validation::ReceiptValidationResult,
            verified_notification::VerifiedNotification,
        },
        repositories::{
            notification_repository::NotificationRepository,
            receipt_repository::ReceiptRepository,
        },
        services::{
            abuse_detector::AbuseDetector, admin_gateway::AdminSecurityGateway,
            fraud_scoring::FraudScoringEngine, rate_limiter::RateLimiter,
        },
    },
    errors::IntegrityError,
    secrets::IntegritySecrets,
};

/// Persistent collaborators the integrity subsystem reads and writes.
#[derive(Clone)]
pub struct IntegrityStores {
    pub purchases: Arc<dyn PurchaseRecordDatasource>,
    pub accounts: Arc<dyn AccountDatasource>,
    pub audit_trail: Arc<dyn AuditTrailDatasource>,
}

impl IntegrityStores {
    pub fn in_memory() -> Self {
        Self {
            purchases: Arc::new(InMemoryPurchaseRecordDatasource::new()),
            accounts: Arc::new(InMemoryAccountDatasource::new()),
            audit_trail: Arc::new(InMemoryAuditTrailDatasource::new()),
        }
    }
}

pub struct IntegrityUtil<R: ReceiptRepository, N: NotificationRepository> {
    receipt_repository: R,
    notification_repository: N,
    abuse_detector: AbuseDetector,
    fraud_scoring_engine: Arc<FraudScoringEngine>,
    rate_limiter: Arc<RateLimiter>,
    admin_gateway: AdminSecurityGateway,
}

impl<R: ReceiptRepository, N: NotificationRepository> IntegrityUtil<R, N> {
    /// Validates a client-submitted receipt for `account_id`.
    ///
    /// Business rejections (authority status codes, duplicate receipts,
    /// promotional abuse) come back as an invalid result. Transport failures
    /// and malformed authority responses are errors.
    pub async fn validate_receipt(
        &self,
        receipt_data: &str,
        account_id: &str,
        device_info: Option<&DeviceInfo>,
    ) -> Result<ReceiptValidationResult, IntegrityError> {
        self.receipt_repository
            .validate_receipt(receipt_data, account_id, device_info)
            .await
    }

    /// Authenticates a signed platform notification. `None` means the
    /// request must be ignored.
    pub async fn verify_notification(
        &self,
        body: &str,
        origin: Option<&str>,
    ) -> Option<VerifiedNotification> {
        self.notification_repository
            .verify_notification(body, origin)
            .await
    }

    pub async fn apply_notification(
        &self,
        notification: &VerifiedNotification,
    ) -> Result<bool, IntegrityError> {
        self.notification_repository
            .apply_notification(notification)
            .await
    }

    pub async fn calculate_fraud_score(
        &self,
        account_id: &str,
        context: &FraudContext,
    ) -> Result<FraudAssessment, IntegrityError> {
        self.fraud_scoring_engine.assess(account_id, context).await
    }

    pub async fn flag_for_review(
        &self,
        account_id: &str,
        context: &FraudContext,
        assessment: &FraudAssessment,
    ) -> Result<(), IntegrityError> {
        self.fraud_scoring_engine
            .flag_for_review(account_id, context, assessment)
            .await
    }

    pub async fn check_receipt_duplicate(
        &self,
        transaction_id: &str,
        account_id: &str,
    ) -> Result<bool, IntegrityError> {
        self.abuse_detector
            .check_receipt_duplicate(transaction_id, account_id)
            .await
    }

    pub async fn check_promotional_code_abuse(
        &self,
        account_id: &str,
        promo_code: &str,
    ) -> Result<bool, IntegrityError> {
        self.abuse_detector
            .check_promotional_code_abuse(account_id, promo_code)
            .await
    }

    pub async fn check_login_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        self.rate_limiter.check_login_rate_limit(identifier).await
    }

    pub async fn check_admin_action_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        self.rate_limiter
            .check_admin_action_rate_limit(identifier)
            .await
    }

    pub async fn check_bulk_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        self.rate_limiter.check_bulk_rate_limit(identifier).await
    }

    /// Runs a privileged operation behind the admin security gateway.
    pub async fn guard_admin_operation<T, F, Fut>(
        &self,
        authorization: Option<&str>,
        options: GuardOptions,
        operation: F,
    ) -> Result<GuardedResponse<T>, IntegrityError>
    where
        F: FnOnce(AdminClaims) -> Fut,
        Fut: Future<Output = Result<T, IntegrityError>>,
    {
        self.admin_gateway
            .guard(authorization, options, operation)
            .await
    }
}

impl
    IntegrityUtil<
        ReceiptRepositoryImpl<VerifyReceiptDatasourceImpl>,
        NotificationRepositoryImpl<AppStoreServerNotificationDatasourceImpl<KeySetDatasourceImpl>>,
    >
{
    pub fn new(
        config: &IntegrityConfig,
        secrets: &IntegritySecrets,
        stores: IntegrityStores,
    ) -> Result<Self, IntegrityError> {
        let fraud_scoring_engine = Arc::new(FraudScoringEngine::new(
            stores.purchases.clone(),
            stores.accounts.clone(),
            stores.audit_trail.clone(),
        ));
        let rate_limiter = Arc::new(RateLimiter::new());
        Ok(Self {
            receipt_repository: ReceiptRepositoryImpl::new(
                VerifyReceiptDatasourceImpl::new(
                    config.verify_receipt_production_url.clone(),
                    config.verify_receipt_sandbox_url.clone(),
                    secrets.app_store_shared_secret.clone(),
                    config.http_timeout,
                )?,
                config.bundle_id.clone(),
                fraud_scoring_engine.clone(),
                stores.purchases.clone(),
                stores.audit_trail.clone(),
            ),
            notification_repository: NotificationRepositoryImpl::new(
                KeySetDatasourceImpl::new(
                    config.notification_key_set_url.clone(),
                    config.http_timeout,
                )?,
                config.bundle_id.clone(),
                stores.purchases.clone(),
            ),
            abuse_detector: AbuseDetector::new(stores.purchases),
            fraud_scoring_engine,
            admin_gateway: AdminSecurityGateway::new(
                rate_limiter.clone(),
                &secrets.admin_jwt_secret,
                config.admin_email_allow_list.clone(),
            ),
            rate_limiter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn util() -> IntegrityUtil<
        ReceiptRepositoryImpl<VerifyReceiptDatasourceImpl>,
        NotificationRepositoryImpl<AppStoreServerNotificationDatasourceImpl<KeySetDatasourceImpl>>,
    > {
        let mut config = IntegrityConfig::new("com.example.app");
        config.admin_email_allow_list = vec!["bootstrap@example.com".to_owned()];
        let secrets = IntegritySecrets {
            app_store_shared_secret: "shared".to_owned(),
            admin_jwt_secret: "admin-signing-secret".to_owned(),
        };
        IntegrityUtil::new(&config, &secrets, IntegrityStores::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn login_tier_allows_five_attempts() {
        let util = util();
        for expected_remaining in (0..5).rev() {
            assert_eq!(
                util.check_login_rate_limit("203.0.113.9").await,
                RateLimitDecision::Allowed {
                    remaining: expected_remaining
                }
            );
        }
        let decision = util.check_login_rate_limit("203.0.113.9").await;
        assert!(!decision.is_allowed());
        assert!(decision.retry_after().unwrap().as_secs() > 0);
    }

    #[tokio::test]
    async fn gateway_rejects_missing_credentials() {
        let util = util();
        let result = util
            .guard_admin_operation(None, GuardOptions::default(), |_| async { Ok(()) })
            .await;
        assert!(matches!(result, Err(IntegrityError::Unauthorized)));
    }

    #[tokio::test]
    async fn unknown_notification_is_ignored() {
        let util = util();
        assert!(util
            .verify_notification("{\"signedPayload\":\"\"}", Some("198.51.100.7"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn fresh_account_scores_low() {
        let util = util();
        let assessment = util
            .calculate_fraud_score("new-user", &FraudContext::default())
            .await
            .unwrap();
        assert!(!assessment.flagged_for_review);
        assert!(!util.check_receipt_duplicate("tx", "new-user").await.unwrap());
        assert!(!util
            .check_promotional_code_abuse("new-user", "SUMMER")
            .await
            .unwrap());
    }
}
