use async_trait::async_trait;

use crate::{
    data::{
        datasources::{key_set_datasource::KeySetDatasource, utils::CachedKeySet},
        models::{
            app_store_server_api::jws_transaction_decoded_payload_model::JwsTransactionDecodedPayloadModel,
            app_store_server_notifications::{
                response_body_v2_decoded_payload_model::ResponseBodyV2DecodedPayloadModel,
                response_body_v2_model::ResponseBodyV2Model,
            },
        },
    },
    errors::IntegrityError,
};

#[async_trait]
pub(crate) trait AppStoreServerNotificationDatasource: Send + Sync {
    /// Verify and parse App Store Server Notification:
    /// https://developer.apple.com/documentation/appstoreservernotifications/app-store-server-notifications-v2
    ///
    /// notification:
    ///   The raw POST body of the notification.
    ///
    /// Both the outer payload and the embedded signed transaction (if any)
    /// are signature-checked.
    async fn parse_notification(
        &self,
        notification: &str,
    ) -> Result<
        (
            ResponseBodyV2DecodedPayloadModel,
            Option<JwsTransactionDecodedPayloadModel>,
        ),
        IntegrityError,
    >;
}

pub(crate) struct AppStoreServerNotificationDatasourceImpl<K: KeySetDatasource> {
    key_set: CachedKeySet<K>,
}

#[async_trait]
impl<K: KeySetDatasource> AppStoreServerNotificationDatasource
    for AppStoreServerNotificationDatasourceImpl<K>
{
    async fn parse_notification(
        &self,
        notification: &str,
    ) -> Result<
        (
            ResponseBodyV2DecodedPayloadModel,
            Option<JwsTransactionDecodedPayloadModel>,
        ),
        IntegrityError,
    > {
        let wrapper: ResponseBodyV2Model = serde_json::from_str(notification).map_err(|e| {
            IntegrityError::SignatureInvalid(format!("failed to parse notification body: {e}"))
        })?;
        let signed_payload = wrapper.signed_payload().ok_or_else(|| {
            IntegrityError::SignatureInvalid("notification has no signedPayload".to_owned())
        })?;
        let decoded_payload: ResponseBodyV2DecodedPayloadModel =
            self.key_set.verify(signed_payload).await?;
        let decoded_transaction_info = match decoded_payload
            .data
            .as_ref()
            .and_then(|data| data.signed_transaction_info.as_deref())
        {
            Some(jws) => Some(self.key_set.verify(jws).await?),
            None => None,
        };
        Ok((decoded_payload, decoded_transaction_info))
    }
}

impl<K: KeySetDatasource> AppStoreServerNotificationDatasourceImpl<K> {
    pub(crate) fn new(key_set_datasource: K) -> Self {
        Self {
            key_set: CachedKeySet::new(key_set_datasource),
        }
    }
}
