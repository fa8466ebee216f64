use serde::Deserialize;

/// Envelope POSTed by App Store Server Notifications V2.
///
/// https://developer.apple.com/documentation/appstoreservernotifications/responsebodyv2
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponseBodyV2Model {
    #[serde(default)]
    signed_payload: String,
}

impl ResponseBodyV2Model {
    /// The JWS to verify, if the envelope carries one.
    pub(crate) fn signed_payload(&self) -> Option<&str> {
        Some(self.signed_payload.trim()).filter(|jws| !jws.is_empty())
    }
}
