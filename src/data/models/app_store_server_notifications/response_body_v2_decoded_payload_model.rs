#![allow(dead_code)]

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::data::models::app_store_server_api::common::Environment;

type JwsTransaction = String;
type JwsRenewalInfo = String;

/// Decoded `signedPayload` of a server notification.
///
/// https://developer.apple.com/documentation/appstoreservernotifications/responsebodyv2decodedpayload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponseBodyV2DecodedPayloadModel {
    pub(crate) notification_type: NotificationType,
    /// Present only for specific notification types.
    pub(crate) subtype: Option<String>,
    /// Mutually exclusive with the summary and external purchase token
    /// payloads, which are not consumed here.
    pub(crate) data: Option<NotificationData>,
    pub(crate) version: String,
    #[serde(with = "ts_milliseconds")]
    pub(crate) signed_date: DateTime<Utc>,
    #[serde(rename = "notificationUUID")]
    pub(crate) notification_uuid: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum NotificationType {
    Subscribed,
    DidChangeRenewalPref,
    DidChangeRenewalStatus,
    OfferRedeemed,
    DidRenew,
    Expired,
    DidFailToRenew,
    GracePeriodExpired,
    PriceIncrease,
    /// The App Store refunded a transaction.
    Refund,
    RefundDeclined,
    RefundReversed,
    RenewalExtended,
    /// Family Sharing access was revoked.
    Revoke,
    Test,
    ConsumptionRequest,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotificationData {
    pub(crate) app_apple_id: Option<u64>,
    pub(crate) bundle_id: String,
    pub(crate) bundle_version: Option<String>,
    pub(crate) environment: Environment,
    pub(crate) signed_transaction_info: Option<JwsTransaction>,
    pub(crate) signed_renewal_info: Option<JwsRenewalInfo>,
}
