use std::collections::HashMap;

use jsonwebtoken::{
    jwk::{AlgorithmParameters, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{data::datasources::key_set_datasource::KeySetDatasource, errors::IntegrityError};

// Published keys are public, so only asymmetric algorithms are accepted.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::ES256, Algorithm::ES384, Algorithm::RS256];

/// Reads the key id and algorithm from a JWS header, without verifying
/// anything.
pub(crate) fn decode_jws_header(token: &str) -> Result<(String, Algorithm), IntegrityError> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| IntegrityError::SignatureInvalid(format!("failed to decode JWS header: {e}")))?;
    if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
        return Err(IntegrityError::SignatureInvalid(format!(
            "unsupported JWS algorithm {:?}",
            header.alg
        )));
    }
    let kid = header
        .kid
        .ok_or_else(|| IntegrityError::SignatureInvalid("JWS header has no key id".to_owned()))?;
    Ok((kid, header.alg))
}

/// Verifies the JWS signature with the given key and decodes its payload.
///
/// Platform payloads carry no registered claims, so none are required.
pub(crate) fn verify_jws_payload<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    alg: Algorithm,
) -> Result<T, IntegrityError> {
    let mut validation = Validation::new(alg);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;
    jsonwebtoken::decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| IntegrityError::SignatureInvalid(format!("JWS verification failed: {e}")))
}

/// Key set cache in front of a [`KeySetDatasource`].
///
/// Keys are cached by key id. An unknown key id always triggers a refetch of
/// the published set, so rotated keys are picked up on first use.
pub(crate) struct CachedKeySet<K: KeySetDatasource> {
    source: K,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl<K: KeySetDatasource> CachedKeySet<K> {
    pub(crate) fn new(source: K) -> Self {
        Self {
            source,
            keys: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn key_for(&self, kid: &str) -> Result<DecodingKey, IntegrityError> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }
        debug!(kid, "key id not cached; fetching key set");
        let set = self.source.fetch_key_set().await?;
        let fetched = decoding_keys(&set);
        let mut keys = self.keys.write().await;
        keys.extend(fetched);
        keys.get(kid).cloned().ok_or_else(|| {
            IntegrityError::SignatureInvalid(format!("key id {kid} not present in key set"))
        })
    }

    /// Verifies a JWS against the cached key set and decodes its payload.
    pub(crate) async fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, IntegrityError> {
        let (kid, alg) = decode_jws_header(token)?;
        let key = self.key_for(&kid).await?;
        verify_jws_payload(token, &key, alg)
    }
}

fn decoding_keys(set: &JwkSet) -> Vec<(String, DecodingKey)> {
    set.keys
        .iter()
        .filter_map(|jwk| {
            let kid = jwk.common.key_id.clone()?;
            if matches!(jwk.algorithm, AlgorithmParameters::OctetKey(_)) {
                debug!(kid = %kid, "skipping symmetric key");
                return None;
            }
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => Some((kid, key)),
                Err(e) => {
                    debug!(kid = %kid, error = %e, "skipping unusable key");
                    None
                }
            }
        })
        .collect()
}
