use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::entities::rate_limit::{RateLimitDecision, RateLimitTier};

#[derive(Debug)]
struct RateLimitBucket {
    count: u32,
    window_expires_at: Instant,
}

impl RateLimitBucket {
    fn refresh(&mut self, tier: RateLimitTier, now: Instant) {
        if now >= self.window_expires_at {
            self.count = 0;
            self.window_expires_at = now + tier.window();
        }
    }
}

// Expired buckets are swept at most this often, from inside the check.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct Buckets {
    entries: HashMap<(RateLimitTier, String), RateLimitBucket>,
    next_sweep_at: Option<Instant>,
}

impl Buckets {
    fn sweep_if_due(&mut self, now: Instant) {
        match self.next_sweep_at {
            Some(at) if now < at => {}
            Some(_) => {
                let before = self.entries.len();
                self.entries
                    .retain(|_, bucket| bucket.window_expires_at > now);
                let dropped = before - self.entries.len();
                if dropped > 0 {
                    debug!(dropped, "expired rate limit buckets dropped");
                }
                self.next_sweep_at = Some(now + SWEEP_INTERVAL);
            }
            None => self.next_sweep_at = Some(now + SWEEP_INTERVAL),
        }
    }
}

/// Fixed-window request counters for the login, admin-action and
/// bulk-operation tiers.
///
/// All buckets sit behind one lock, so the read-compare-increment sequence
/// for a key is atomic: concurrent callers for the same identifier can never
/// both observe a count below the ceiling and both proceed.
#[derive(Default)]
pub struct RateLimiter {
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 5 attempts per 15 minutes, keyed by originating identifier.
    pub async fn check_login_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        self.check(RateLimitTier::Login, identifier).await
    }

    /// 100 requests per minute, keyed by admin identity.
    pub async fn check_admin_action_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        self.check(RateLimitTier::AdminAction, identifier).await
    }

    /// 10 operations per hour, keyed by admin identity.
    pub async fn check_bulk_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        self.check(RateLimitTier::BulkOperation, identifier).await
    }

    pub async fn check(&self, tier: RateLimitTier, identifier: &str) -> RateLimitDecision {
        self.check_at(tier, identifier, Instant::now()).await
    }

    pub(crate) async fn check_at(
        &self,
        tier: RateLimitTier,
        identifier: &str,
        now: Instant,
    ) -> RateLimitDecision {
        self.check_all_at(&[tier], identifier, now).await
    }

    /// Checks several tiers for one identifier as a single step.
    ///
    /// Either every tier is under its ceiling and each is incremented, or
    /// the first exhausted tier is reported and nothing is consumed. The
    /// returned `remaining` is that of the first tier.
    pub async fn check_all(&self, tiers: &[RateLimitTier], identifier: &str) -> RateLimitDecision {
        self.check_all_at(tiers, identifier, Instant::now()).await
    }

    pub(crate) async fn check_all_at(
        &self,
        tiers: &[RateLimitTier],
        identifier: &str,
        now: Instant,
    ) -> RateLimitDecision {
        let mut buckets = self.buckets.lock().await;
        buckets.sweep_if_due(now);

        for &tier in tiers {
            let Some(bucket) = buckets.entries.get_mut(&(tier, identifier.to_owned())) else {
                continue;
            };
            bucket.refresh(tier, now);
            if bucket.count >= tier.ceiling() {
                let retry_after = bucket
                    .window_expires_at
                    .saturating_duration_since(now)
                    .max(Duration::from_secs(1));
                warn!(?tier, identifier, ?retry_after, "rate limit exceeded");
                return RateLimitDecision::Limited {
                    message: tier.exceeded_message().to_owned(),
                    retry_after,
                };
            }
        }

        let mut first_remaining = None;
        for &tier in tiers {
            let bucket = buckets
                .entries
                .entry((tier, identifier.to_owned()))
                .or_insert_with(|| RateLimitBucket {
                    count: 0,
                    window_expires_at: now + tier.window(),
                });
            bucket.count += 1;
            first_remaining.get_or_insert(tier.ceiling() - bucket.count);
        }
        RateLimitDecision::Allowed {
            remaining: first_remaining.unwrap_or(0),
        }
    }

    pub async fn reset(&self, tier: RateLimitTier, identifier: &str) {
        self.buckets
            .lock()
            .await
            .entries
            .remove(&(tier, identifier.to_owned()));
    }

    /// Drops buckets whose window has passed. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.entries.len();
        buckets
            .entries
            .retain(|_, bucket| bucket.window_expires_at > now);
        before - buckets.entries.len()
    }

    #[cfg(test)]
    async fn bucket_count(&self) -> usize {
        self.buckets.lock().await.entries.len()
    }
}
