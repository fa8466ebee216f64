use serde::Deserialize;
use serde_repr::Deserialize_repr;

/// Environment a receipt, transaction or notification was issued in. Shared
/// by the verifyReceipt responses and the signed notification payloads.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub(crate) enum Environment {
    Sandbox,
    Production,

    #[serde(untagged)]
    Unknown(String),
}

impl Environment {
    pub(crate) fn is_sandbox(&self) -> bool {
        *self == Environment::Sandbox
    }
}

#[derive(Debug, Clone, Copy, Deserialize_repr, PartialEq)]
#[repr(u8)]
pub(crate) enum OfferType {
    Introductory = 1,
    /// Developer-signed promotional offer; subject to the promo abuse checks.
    Promotional = 2,
    OfferCode = 3,
    WinBack = 4,
}

impl OfferType {
    pub(crate) fn is_promotional(&self) -> bool {
        matches!(self, OfferType::Promotional | OfferType::OfferCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_environments_are_preserved() {
        let env: Environment = serde_json::from_str(r#""Xcode""#).unwrap();
        assert_eq!(env, Environment::Unknown("Xcode".to_owned()));
        assert!(!env.is_sandbox());
        let env: Environment = serde_json::from_str(r#""Sandbox""#).unwrap();
        assert!(env.is_sandbox());
    }

    #[test]
    fn offer_codes_count_as_promotional() {
        let offer: OfferType = serde_json::from_str("3").unwrap();
        assert!(offer.is_promotional());
        let offer: OfferType = serde_json::from_str("1").unwrap();
        assert!(!offer.is_promotional());
    }
}
