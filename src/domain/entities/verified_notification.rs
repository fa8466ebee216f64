use chrono::{DateTime, Utc};

/// A platform notification whose signature and bundle identity have been
/// verified. Only ever constructed by the notification verifier.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedNotification {
    pub notification_id: String,
    pub notification_type: NotificationKind,
    pub subtype: Option<String>,
    pub signed_at: DateTime<Utc>,
    pub bundle_id: String,
    pub is_sandbox: bool,
    pub transaction: Option<NotificationTransaction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationTransaction {
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub product_id: String,
    pub revoked_at: Option<DateTime<Utc>>,
    pub offer_identifier: Option<String>,
    pub is_promotional_offer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    Subscribed,
    DidRenew,
    DidFailToRenew,
    DidChangeRenewalStatus,
    Expired,
    GracePeriodExpired,
    Refund,
    RefundReversed,
    Revoke,
    OfferRedeemed,
    Test,
    Other(String),
}

impl NotificationKind {
    /// Whether the notification revokes the entitlement of a recorded
    /// purchase.
    pub fn is_refund_or_revoke(&self) -> bool {
        matches!(self, NotificationKind::Refund | NotificationKind::Revoke)
    }
}
