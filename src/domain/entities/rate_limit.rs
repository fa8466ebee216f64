use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitTier {
    /// Keyed by originating identifier (IP or username).
    Login,
    /// Keyed by admin identity.
    AdminAction,
    /// Keyed by admin identity.
    BulkOperation,
}

impl RateLimitTier {
    pub fn ceiling(&self) -> u32 {
        match self {
            RateLimitTier::Login => 5,
            RateLimitTier::AdminAction => 100,
            RateLimitTier::BulkOperation => 10,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            RateLimitTier::Login => Duration::from_secs(15 * 60),
            RateLimitTier::AdminAction => Duration::from_secs(60),
            RateLimitTier::BulkOperation => Duration::from_secs(60 * 60),
        }
    }

    pub(crate) fn exceeded_message(&self) -> &'static str {
        match self {
            RateLimitTier::Login => "Too many login attempts. Please try again later.",
            RateLimitTier::AdminAction => "Too many admin requests. Please slow down.",
            RateLimitTier::BulkOperation => "Too many bulk operations. Please try again later.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        remaining: u32,
    },
    Limited {
        message: String,
        /// Time until the current window resets. Never zero.
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitDecision::Allowed { remaining } => *remaining,
            RateLimitDecision::Limited { .. } => 0,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RateLimitDecision::Allowed { .. } => None,
            RateLimitDecision::Limited { retry_after, .. } => Some(*retry_after),
        }
    }
}

/// Rounds up to whole seconds, with a floor of one second.
pub(crate) fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}
