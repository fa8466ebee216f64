use std::env;

use crate::errors::IntegrityError;

const APP_STORE_SHARED_SECRET: &str = "APP_STORE_SHARED_SECRET";
const ADMIN_JWT_SECRET: &str = "ADMIN_JWT_SECRET";

#[derive(Clone)]
pub struct IntegritySecrets {
    /// App-specific shared secret sent as `password` to verifyReceipt.
    pub app_store_shared_secret: String,
    /// HS256 secret used to sign admin bearer tokens.
    pub admin_jwt_secret: String,
}

impl IntegritySecrets {
    pub fn from_env() -> Result<Self, IntegrityError> {
        Ok(Self {
            app_store_shared_secret: required(APP_STORE_SHARED_SECRET)?,
            admin_jwt_secret: required(ADMIN_JWT_SECRET)?,
        })
    }
}

impl std::fmt::Debug for IntegritySecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegritySecrets").finish_non_exhaustive()
    }
}

fn required(key: &str) -> Result<String, IntegrityError> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(IntegrityError::Config(format!("secret {key} is not set"))),
    }
}
