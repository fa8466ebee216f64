use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

/// Claims carried by an admin bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Admin identity; rate limits are keyed by this.
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
}

/// Per-operation gateway settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardOptions {
    pub check_rate_limit: bool,
    /// Also consumes the bulk-operation tier.
    pub is_bulk: bool,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            check_rate_limit: true,
            is_bulk: false,
        }
    }
}

impl GuardOptions {
    pub fn bulk() -> Self {
        Self {
            check_rate_limit: true,
            is_bulk: true,
        }
    }

    pub fn without_rate_limit() -> Self {
        Self {
            check_rate_limit: false,
            is_bulk: false,
        }
    }
}

/// Result of an operation that passed the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedResponse<T> {
    pub body: T,
    /// Remaining admin-action quota, when rate limiting was checked.
    pub remaining: Option<u32>,
}
