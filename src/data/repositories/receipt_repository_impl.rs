use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    constants::{
        receipt_status_message, BUNDLE_MISMATCH_ERROR, DUPLICATE_RECEIPT_ERROR,
        DUPLICATE_RECEIPT_SCORE, PROMO_ABUSE_ERROR, PROMO_ABUSE_SCORE,
        STATUS_OK, STATUS_SANDBOX_RECEIPT_IN_PRODUCTION,
    },
    data::{
        datasources::{
            audit_trail_datasource::AuditTrailDatasource,
            purchase_record_datasource::PurchaseRecordDatasource,
            verify_receipt_datasource::{
                ReceiptEnvironment, VerifyReceiptDatasource, VerifyReceiptDatasourceImpl,
            },
        },
        models::verify_receipt::verify_receipt_response_model::VerifyReceiptResponseModel,
    },
    domain::{
        entities::{
            device_info::DeviceInfo,
            fraud_assessment::{FraudAssessment, FraudContext},
            purchase_record::{ClaimOutcome, PurchaseRecord},
            receipt_validation::ReceiptValidationResult,
            review::{FraudLogEntry, FraudLogKind},
            transaction::Transaction,
        },
        repositories::receipt_repository::ReceiptRepository,
        services::{
            abuse_detector::{AbuseDetector, ClaimStatus},
            device_risk::{jailbreak_risk, JAILBREAK_SIGNAL_THRESHOLD},
            fraud_scoring::FraudScoringEngine,
        },
    },
    errors::IntegrityError,
};

pub(crate) struct ReceiptRepositoryImpl<V: VerifyReceiptDatasource> {
    verify_receipt_datasource: V,
    bundle_id: String,
    abuse_detector: AbuseDetector,
    fraud_scoring_engine: Arc<FraudScoringEngine>,
    purchases: Arc<dyn PurchaseRecordDatasource>,
    audit_trail: Arc<dyn AuditTrailDatasource>,
}

#[async_trait]
impl<V: VerifyReceiptDatasource> ReceiptRepository for ReceiptRepositoryImpl<V> {
    async fn validate_receipt(
        &self,
        receipt_data: &str,
        account_id: &str,
        device_info: Option<&DeviceInfo>,
    ) -> Result<ReceiptValidationResult, IntegrityError> {
        let response = match self.verify_with_sandbox_fallback(receipt_data).await {
            Ok(response) => response,
            Err(e) => {
                warn!(account_id, error = %e, "receipt verification call failed");
                self.log(FraudLogEntry::new(
                    FraudLogKind::ValidationFailure,
                    account_id,
                    e.to_string(),
                ))
                .await;
                return Err(e);
            }
        };

        if response.status != STATUS_OK {
            let message = receipt_status_message(response.status);
            info!(account_id, status = response.status, "receipt rejected by authority");
            self.log(
                FraudLogEntry::new(
                    FraudLogKind::ValidationFailure,
                    account_id,
                    IntegrityError::ValidationRejected {
                        status: response.status,
                        message: message.to_owned(),
                    }
                    .to_string(),
                )
                .status(response.status),
            )
            .await;
            return Ok(ReceiptValidationResult::rejected(message, 0).with_status(response.status));
        }

        // Bundle identity cannot be established without the receipt envelope.
        let Some(receipt) = &response.receipt else {
            let e = IntegrityError::MalformedResponse(
                "status 0 response carries no receipt".to_owned(),
            );
            self.log(
                FraudLogEntry::new(FraudLogKind::ValidationFailure, account_id, e.to_string())
                    .status(response.status),
            )
            .await;
            return Err(e);
        };
        if receipt.bundle_id != self.bundle_id {
            warn!(
                account_id,
                bundle_id = %receipt.bundle_id,
                "receipt issued for a different bundle"
            );
            self.log(FraudLogEntry::new(
                FraudLogKind::JailbreakSignal,
                account_id,
                format!("receipt bundle {} does not match", receipt.bundle_id),
            ))
            .await;
            return Ok(ReceiptValidationResult::rejected(BUNDLE_MISMATCH_ERROR, 0));
        }

        let transaction = match normalize_latest_transaction(&response) {
            Ok(transaction) => transaction,
            Err(e) => {
                self.log(
                    FraudLogEntry::new(FraudLogKind::ValidationFailure, account_id, e.to_string())
                        .status(response.status),
                )
                .await;
                return Err(e);
            }
        };

        self.assess_and_claim(
            transaction,
            response.is_sandbox(),
            receipt_data,
            account_id,
            device_info,
        )
        .await
    }
}

impl ReceiptRepositoryImpl<VerifyReceiptDatasourceImpl> {
    pub(crate) fn new(
        verify_receipt_datasource: VerifyReceiptDatasourceImpl,
        bundle_id: String,
        fraud_scoring_engine: Arc<FraudScoringEngine>,
        purchases: Arc<dyn PurchaseRecordDatasource>,
        audit_trail: Arc<dyn AuditTrailDatasource>,
    ) -> Self {
        Self::with_datasource(
            verify_receipt_datasource,
            bundle_id,
            fraud_scoring_engine,
            purchases,
            audit_trail,
        )
    }
}

impl<V: VerifyReceiptDatasource> ReceiptRepositoryImpl<V> {
    fn with_datasource(
        verify_receipt_datasource: V,
        bundle_id: String,
        fraud_scoring_engine: Arc<FraudScoringEngine>,
        purchases: Arc<dyn PurchaseRecordDatasource>,
        audit_trail: Arc<dyn AuditTrailDatasource>,
    ) -> Self {
        Self {
            verify_receipt_datasource,
            bundle_id,
            abuse_detector: AbuseDetector::new(purchases.clone()),
            fraud_scoring_engine,
            purchases,
            audit_trail,
        }
    }

    /// Production first. Only a "sandbox receipt sent to production" status
    /// triggers the one sandbox call; whatever the sandbox returns is final.
    async fn verify_with_sandbox_fallback(
        &self,
        receipt_data: &str,
    ) -> Result<VerifyReceiptResponseModel, IntegrityError> {
        let production = self
            .verify_receipt_datasource
            .verify_receipt(ReceiptEnvironment::Production, receipt_data)
            .await?;
        if production.status != STATUS_SANDBOX_RECEIPT_IN_PRODUCTION {
            return Ok(production);
        }
        info!("sandbox receipt sent to production; retrying against sandbox");
        self.verify_receipt_datasource
            .verify_receipt(ReceiptEnvironment::Sandbox, receipt_data)
            .await
    }

    async fn assess_and_claim(
        &self,
        transaction: Transaction,
        is_sandbox: bool,
        receipt_data: &str,
        account_id: &str,
        device_info: Option<&DeviceInfo>,
    ) -> Result<ReceiptValidationResult, IntegrityError> {
        let transaction_id = transaction.transaction_id.clone();

        let claim_status = self
            .abuse_detector
            .claim_status(&transaction_id, account_id)
            .await?;
        if let ClaimStatus::OwnedByOther { owner_account_id } = &claim_status {
            return Ok(self
                .reject_duplicate(account_id, &transaction_id, owner_account_id)
                .await);
        }
        let is_revalidation = claim_status == ClaimStatus::OwnedBySelf;

        if let Some(promo_code) = transaction.promotional_offer_id.as_deref() {
            if !is_revalidation
                && self
                    .abuse_detector
                    .check_promotional_code_abuse(account_id, promo_code)
                    .await?
            {
                warn!(account_id, promo_code, "promotional offer abuse");
                self.log(
                    FraudLogEntry::new(
                        FraudLogKind::PromoAbuse,
                        account_id,
                        IntegrityError::PromoAbuseDetected {
                            account_id: account_id.to_owned(),
                            promo_code: promo_code.to_owned(),
                        }
                        .to_string(),
                    )
                    .transaction(&transaction_id)
                    .score(PROMO_ABUSE_SCORE),
                )
                .await;
                return Ok(ReceiptValidationResult::rejected(
                    PROMO_ABUSE_ERROR,
                    PROMO_ABUSE_SCORE,
                ));
            }
        }

        let jailbreak_risk = jailbreak_risk(receipt_data, device_info, &self.bundle_id);
        if jailbreak_risk >= JAILBREAK_SIGNAL_THRESHOLD {
            self.log(
                FraudLogEntry::new(
                    FraudLogKind::JailbreakSignal,
                    account_id,
                    format!("jailbreak risk {jailbreak_risk:.2}"),
                )
                .transaction(&transaction_id),
            )
            .await;
        }

        let context = FraudContext {
            jailbreak_risk,
            is_promotional: transaction.is_promotional(),
            transaction_id: Some(transaction_id.clone()),
            product_id: Some(transaction.product_id.clone()),
            device_fingerprint: device_info.and_then(|d| d.device_fingerprint.clone()),
        };
        let assessment = self.fraud_scoring_engine.assess(account_id, &context).await?;

        if !is_revalidation {
            let record = PurchaseRecord::new(
                transaction.clone(),
                account_id,
                assessment.score,
                Utc::now(),
            )
            .with_device_fingerprint(context.device_fingerprint.clone());
            match self.purchases.claim(record).await? {
                ClaimOutcome::Claimed => {
                    if assessment.flagged_for_review {
                        self.spawn_flag_for_review(account_id, context, assessment.clone())
                            .await;
                    }
                }
                // A concurrent validation by the same account claimed it
                // first and owns the review bookkeeping.
                ClaimOutcome::AlreadyOwned => {}
                ClaimOutcome::OwnedByOther { owner_account_id } => {
                    return Ok(self
                        .reject_duplicate(account_id, &transaction_id, &owner_account_id)
                        .await);
                }
            }
        }

        Ok(ReceiptValidationResult::valid(
            transaction,
            is_sandbox,
            assessment.score,
            assessment.flagged_for_review,
        ))
    }

    async fn reject_duplicate(
        &self,
        account_id: &str,
        transaction_id: &str,
        owner_account_id: &str,
    ) -> ReceiptValidationResult {
        warn!(
            account_id,
            transaction_id, owner_account_id, "receipt already claimed by another account"
        );
        self.log(
            FraudLogEntry::new(
                FraudLogKind::DuplicateReceipt,
                account_id,
                IntegrityError::DuplicateReceipt {
                    transaction_id: transaction_id.to_owned(),
                }
                .to_string(),
            )
            .transaction(transaction_id)
            .score(DUPLICATE_RECEIPT_SCORE),
        )
        .await;
        ReceiptValidationResult::rejected(DUPLICATE_RECEIPT_ERROR, DUPLICATE_RECEIPT_SCORE)
    }

    /// Review bookkeeping runs out-of-band; the validation result does not
    /// wait for it.
    async fn spawn_flag_for_review(
        &self,
        account_id: &str,
        context: FraudContext,
        assessment: FraudAssessment,
    ) {
        let engine = self.fraud_scoring_engine.clone();
        let account_id = account_id.to_owned();
        let task = async move {
            if let Err(e) = engine
                .flag_for_review(&account_id, &context, &assessment)
                .await
            {
                warn!(account_id, error = %e, "failed to flag transaction for review");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => task.await,
        }
    }

    async fn log(&self, entry: FraudLogEntry) {
        if let Err(e) = self.audit_trail.append_fraud_log(entry).await {
            warn!(error = %e, "failed to append to fraud log");
        }
    }
}

/// Picks the most recent transaction entry and normalizes it.
fn normalize_latest_transaction(
    response: &VerifyReceiptResponseModel,
) -> Result<Transaction, IntegrityError> {
    let entries = response
        .latest_receipt_info
        .as_deref()
        .filter(|entries| !entries.is_empty())
        .or_else(|| {
            response
                .receipt
                .as_ref()
                .map(|receipt| receipt.in_app.as_slice())
                .filter(|entries| !entries.is_empty())
        })
        .ok_or_else(|| {
            IntegrityError::MalformedResponse(
                "response contains no transaction entries".to_owned(),
            )
        })?;
    let latest = entries
        .iter()
        .max_by_key(|entry| entry.purchase_date_ms)
        .ok_or_else(|| {
            IntegrityError::MalformedResponse("no latest transaction entry".to_owned())
        })?;
    let auto_renew_status = response
        .pending_renewal_info
        .iter()
        .find(|info| {
            info.original_transaction_id.as_deref() == Some(latest.original_transaction_id.as_str())
        })
        .map(|info| info.will_auto_renew())
        .unwrap_or(false);

    Ok(Transaction {
        transaction_id: latest.transaction_id.clone(),
        original_transaction_id: latest.original_transaction_id.clone(),
        product_id: latest.product_id.clone(),
        purchase_time: latest.purchase_date_ms,
        expiry_time: latest.expires_date_ms,
        is_trial_period: latest.is_trial_period,
        is_intro_offer_period: latest.is_in_intro_offer_period,
        auto_renew_status,
        cancellation_time: latest.cancellation_date_ms,
        promotional_offer_id: latest.promotional_offer_id.clone(),
    })
}
