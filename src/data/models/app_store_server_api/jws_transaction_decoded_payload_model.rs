#![allow(dead_code)]

use chrono::{
    serde::{ts_milliseconds, ts_milliseconds_option},
    DateTime, Utc,
};
use serde::Deserialize;

use super::common::{Environment, OfferType};

/// Decoded payload of a signed transaction (JWSTransaction), as embedded in
/// server notifications.
///
/// https://developer.apple.com/documentation/appstoreserverapi/jwstransactiondecodedpayload
///
/// Only the fields the integrity checks read are modelled.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JwsTransactionDecodedPayloadModel {
    pub(crate) bundle_id: String,
    pub(crate) environment: Environment,
    #[serde(default, with = "ts_milliseconds_option")]
    pub(crate) expires_date: Option<DateTime<Utc>>,
    /// Offer code or promotional offer identifier.
    pub(crate) offer_identifier: Option<String>,
    pub(crate) offer_type: Option<OfferType>,
    pub(crate) original_transaction_id: String,
    pub(crate) product_id: String,
    #[serde(with = "ts_milliseconds")]
    pub(crate) purchase_date: DateTime<Utc>,
    /// Set when the App Store refunded the transaction or revoked it from
    /// Family Sharing.
    #[serde(default, with = "ts_milliseconds_option")]
    pub(crate) revocation_date: Option<DateTime<Utc>>,
    pub(crate) transaction_id: String,
}
