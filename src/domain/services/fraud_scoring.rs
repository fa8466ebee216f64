use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::{
    data::datasources::{
        account_datasource::AccountDatasource, audit_trail_datasource::AuditTrailDatasource,
        purchase_record_datasource::PurchaseRecordDatasource,
    },
    domain::entities::{
        fraud_assessment::{FraudAssessment, FraudContext, FraudSignal, SignalKind},
        purchase_record::PurchaseRecord,
        review::{AdminAlert, AlertPriority, FlaggedTransaction, FraudLogEntry, FraudLogKind},
    },
    errors::IntegrityError,
};

pub const MEDIUM_RISK_THRESHOLD: u8 = 50;
pub const HIGH_RISK_THRESHOLD: u8 = 70;
pub const CRITICAL_RISK_THRESHOLD: u8 = 80;

// Signal weights.
const POINTS_PER_REFUND: f64 = 10.0;
const REFUND_RATIO_WEIGHT: f64 = 20.0;
const JAILBREAK_WEIGHT: f64 = 30.0;
const NEW_ACCOUNT_PENALTY: f64 = 20.0;
const PROMOTIONAL_ABUSE_PENALTY: f64 = 25.0;
const REFUND_CYCLING_WEIGHT: f64 = 25.0;
const POINTS_PER_HOURLY_EXCESS: f64 = 5.0;
const POINTS_PER_DAILY_EXCESS: f64 = 2.0;
const POINTS_PER_SAME_PRODUCT_EXCESS: f64 = 3.0;
const POINTS_PER_SHARED_DEVICE_ACCOUNT: f64 = 10.0;

// Signal thresholds.
const NEW_ACCOUNT_HOURS: i64 = 24;
const ESTABLISHED_ACCOUNT_DAYS: i64 = 14;
const PRIOR_PROMOTIONAL_CEILING: u32 = 3;
const REFUND_CYCLING_LOOKBACK_DAYS: i64 = 30;
const RAPID_REFUND_HOURS: i64 = 48;
const REFUND_CYCLING_MIN_PURCHASES: u32 = 2;
const REFUND_CYCLING_MIN_FRACTION: f64 = 0.5;
const HOURLY_PURCHASE_BASELINE: u32 = 5;
const DAILY_PURCHASE_BASELINE: u32 = 20;
const SAME_PRODUCT_DAILY_BASELINE: u32 = 5;
// One other account on a device is tolerated (shared family devices).
const SHARED_DEVICE_ACCOUNT_BASELINE: u32 = 1;
const SHARED_DEVICE_LOOKBACK_DAYS: i64 = 30;

/// Raw signal inputs, gathered from the stores for one account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalInputs {
    pub prior_purchases: u32,
    pub refunded_purchases: u32,
    pub jailbreak_risk: f64,
    /// `None` for unknown accounts, which are treated as brand new.
    pub account_age: Option<Duration>,
    pub is_promotional: bool,
    pub prior_promotional_purchases: u32,
    pub recent_purchases: u32,
    pub rapidly_refunded_purchases: u32,
    /// Including the purchase being scored.
    pub purchases_last_hour: u32,
    /// Including the purchase being scored.
    pub purchases_last_day: u32,
    /// Purchases of the scored product in the last day, including this one.
    pub same_product_last_day: u32,
    /// Distinct other accounts that purchased from the same device recently.
    pub other_accounts_on_device: u32,
}

/// Sums the weighted signals and clamps the total to [0, 100].
///
/// Individual contributions are not capped; the clamp is applied once, to
/// the sum.
pub fn score_signals(inputs: &SignalInputs) -> (u8, Vec<FraudSignal>) {
    let signals = vec![
        FraudSignal {
            kind: SignalKind::RefundHistory,
            points: refund_history_points(inputs),
        },
        FraudSignal {
            kind: SignalKind::JailbreakRisk,
            points: jailbreak_points(inputs.jailbreak_risk),
        },
        FraudSignal {
            kind: SignalKind::AccountAge,
            points: account_age_points(inputs.account_age),
        },
        FraudSignal {
            kind: SignalKind::PromotionalAbuse,
            points: promotional_points(inputs),
        },
        FraudSignal {
            kind: SignalKind::RefundCycling,
            points: refund_cycling_points(inputs),
        },
        FraudSignal {
            kind: SignalKind::Velocity,
            points: velocity_points(inputs),
        },
        FraudSignal {
            kind: SignalKind::SharedDevice,
            points: shared_device_points(inputs),
        },
    ];
    let total: f64 = signals.iter().map(|s| s.points).sum();
    (clamp_score(total), signals)
}

fn clamp_score(total: f64) -> u8 {
    if total.is_nan() {
        return 0;
    }
    total.round().clamp(0.0, 100.0) as u8
}

fn refund_history_points(inputs: &SignalInputs) -> f64 {
    if inputs.prior_purchases == 0 || inputs.refunded_purchases == 0 {
        return 0.0;
    }
    let refunded = inputs.refunded_purchases.min(inputs.prior_purchases) as f64;
    let ratio = refunded / inputs.prior_purchases as f64;
    refunded * POINTS_PER_REFUND + ratio * REFUND_RATIO_WEIGHT
}

fn jailbreak_points(risk: f64) -> f64 {
    if risk.is_nan() {
        return 0.0;
    }
    risk.clamp(0.0, 1.0) * JAILBREAK_WEIGHT
}

fn account_age_points(age: Option<Duration>) -> f64 {
    let Some(age) = age else {
        return NEW_ACCOUNT_PENALTY;
    };
    let new = Duration::hours(NEW_ACCOUNT_HOURS);
    let established = Duration::days(ESTABLISHED_ACCOUNT_DAYS);
    if age < new {
        NEW_ACCOUNT_PENALTY
    } else if age >= established {
        0.0
    } else {
        let decay_span = (established - new).num_seconds() as f64;
        let elapsed = (age - new).num_seconds() as f64;
        NEW_ACCOUNT_PENALTY * (1.0 - elapsed / decay_span)
    }
}

fn promotional_points(inputs: &SignalInputs) -> f64 {
    if inputs.is_promotional && inputs.prior_promotional_purchases > PRIOR_PROMOTIONAL_CEILING {
        PROMOTIONAL_ABUSE_PENALTY
    } else {
        0.0
    }
}

fn refund_cycling_points(inputs: &SignalInputs) -> f64 {
    if inputs.recent_purchases < REFUND_CYCLING_MIN_PURCHASES {
        return 0.0;
    }
    let fraction = inputs.rapidly_refunded_purchases.min(inputs.recent_purchases) as f64
        / inputs.recent_purchases as f64;
    if fraction >= REFUND_CYCLING_MIN_FRACTION {
        REFUND_CYCLING_WEIGHT * fraction
    } else {
        0.0
    }
}

fn velocity_points(inputs: &SignalInputs) -> f64 {
    let hourly_excess = inputs
        .purchases_last_hour
        .saturating_sub(HOURLY_PURCHASE_BASELINE) as f64;
    let daily_excess = inputs
        .purchases_last_day
        .saturating_sub(DAILY_PURCHASE_BASELINE) as f64;
    let same_product_excess = inputs
        .same_product_last_day
        .saturating_sub(SAME_PRODUCT_DAILY_BASELINE) as f64;
    hourly_excess * POINTS_PER_HOURLY_EXCESS
        + daily_excess * POINTS_PER_DAILY_EXCESS
        + same_product_excess * POINTS_PER_SAME_PRODUCT_EXCESS
}

fn shared_device_points(inputs: &SignalInputs) -> f64 {
    inputs
        .other_accounts_on_device
        .saturating_sub(SHARED_DEVICE_ACCOUNT_BASELINE) as f64
        * POINTS_PER_SHARED_DEVICE_ACCOUNT
}

/// Combines refund history, device risk, account age, promotional usage,
/// refund cycling and purchase velocity into a single score, and queues
/// risky transactions for human review.
pub struct FraudScoringEngine {
    purchases: Arc<dyn PurchaseRecordDatasource>,
    accounts: Arc<dyn AccountDatasource>,
    audit_trail: Arc<dyn AuditTrailDatasource>,
}

impl FraudScoringEngine {
    pub fn new(
        purchases: Arc<dyn PurchaseRecordDatasource>,
        accounts: Arc<dyn AccountDatasource>,
        audit_trail: Arc<dyn AuditTrailDatasource>,
    ) -> Self {
        Self {
            purchases,
            accounts,
            audit_trail,
        }
    }

    pub async fn assess(
        &self,
        account_id: &str,
        context: &FraudContext,
    ) -> Result<FraudAssessment, IntegrityError> {
        let inputs = self.gather_inputs(account_id, context, Utc::now()).await?;
        let (score, signals) = score_signals(&inputs);
        Ok(FraudAssessment {
            score,
            signals,
            flagged_for_review: score >= MEDIUM_RISK_THRESHOLD,
        })
    }

    pub(crate) async fn gather_inputs(
        &self,
        account_id: &str,
        context: &FraudContext,
        now: DateTime<Utc>,
    ) -> Result<SignalInputs, IntegrityError> {
        // The transaction being scored never counts towards its own history.
        let history: Vec<PurchaseRecord> = self
            .purchases
            .list_by_account(account_id)
            .await?
            .into_iter()
            .filter(|r| Some(r.transaction_id()) != context.transaction_id.as_deref())
            .collect();
        let created_at = self.accounts.account_created_at(account_id).await?;
        let other_accounts_on_device = match context.device_fingerprint.as_deref() {
            Some(fingerprint) => {
                let device_start = now - Duration::days(SHARED_DEVICE_LOOKBACK_DAYS);
                self.purchases
                    .list_by_device_fingerprint(fingerprint)
                    .await?
                    .iter()
                    .filter(|r| r.account_id != account_id)
                    .filter(|r| r.transaction.purchase_time >= device_start)
                    .map(|r| r.account_id.as_str())
                    .collect::<HashSet<_>>()
                    .len() as u32
            }
            None => 0,
        };

        let count = |pred: &dyn Fn(&PurchaseRecord) -> bool| -> u32 {
            history.iter().filter(|r| pred(r)).count() as u32
        };
        let since = |d: Duration| now - d;
        let cycling_start = since(Duration::days(REFUND_CYCLING_LOOKBACK_DAYS));
        let rapid = Duration::hours(RAPID_REFUND_HOURS);

        Ok(SignalInputs {
            prior_purchases: history.len() as u32,
            refunded_purchases: count(&|r| r.refunded),
            jailbreak_risk: context.jailbreak_risk,
            account_age: created_at.map(|created_at| now - created_at),
            is_promotional: context.is_promotional,
            prior_promotional_purchases: count(&|r| r.is_promotional),
            recent_purchases: count(&|r| r.transaction.purchase_time >= cycling_start),
            rapidly_refunded_purchases: count(&|r| {
                r.transaction.purchase_time >= cycling_start
                    && r.refunded_at
                        .is_some_and(|at| at - r.transaction.purchase_time <= rapid)
            }),
            purchases_last_hour: 1 + count(&|r| {
                r.transaction.purchase_time >= since(Duration::hours(1))
            }),
            purchases_last_day: 1 + count(&|r| {
                r.transaction.purchase_time >= since(Duration::days(1))
            }),
            same_product_last_day: match context.product_id.as_deref() {
                Some(product_id) => {
                    1 + count(&|r| {
                        r.transaction.product_id == product_id
                            && r.transaction.purchase_time >= since(Duration::days(1))
                    })
                }
                None => 0,
            },
            other_accounts_on_device,
        })
    }

    /// Persists a review-queue entry for a score at or above the medium
    /// threshold, plus a critical admin alert at or above the critical
    /// threshold. No-op below the medium threshold.
    pub async fn flag_for_review(
        &self,
        account_id: &str,
        context: &FraudContext,
        assessment: &FraudAssessment,
    ) -> Result<(), IntegrityError> {
        if assessment.score < MEDIUM_RISK_THRESHOLD {
            return Ok(());
        }
        let transaction_id = context.transaction_id.clone().unwrap_or_default();
        let reasons: Vec<String> = assessment
            .signals
            .iter()
            .filter(|s| s.points > 0.0)
            .map(|s| format!("{:?}: {:.1}", s.kind, s.points))
            .collect();
        let priority = if assessment.score >= HIGH_RISK_THRESHOLD {
            AlertPriority::High
        } else {
            AlertPriority::Medium
        };
        info!(
            account_id,
            transaction_id = %transaction_id,
            score = assessment.score,
            "transaction flagged for review"
        );

        self.audit_trail
            .append_fraud_log(
                FraudLogEntry::new(FraudLogKind::HighFraudScore, account_id, reasons.join(", "))
                    .transaction(&transaction_id)
                    .score(assessment.score),
            )
            .await?;
        self.audit_trail
            .push_flagged_transaction(FlaggedTransaction {
                transaction_id: transaction_id.clone(),
                account_id: account_id.to_owned(),
                fraud_score: assessment.score,
                priority,
                reasons: reasons.clone(),
                flagged_at: Utc::now(),
            })
            .await?;

        if assessment.score >= CRITICAL_RISK_THRESHOLD {
            warn!(account_id, score = assessment.score, "critical fraud score");
            self.audit_trail
                .push_admin_alert(AdminAlert {
                    title: "Critical fraud score".to_owned(),
                    message: format!(
                        "Transaction {transaction_id} scored {} ({})",
                        assessment.score,
                        reasons.join(", ")
                    ),
                    priority: AlertPriority::Critical,
                    transaction_id: context.transaction_id.clone(),
                    account_id: account_id.to_owned(),
                    created_at: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }
}
