use std::{future::Future, sync::Arc};

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::{debug, warn};

use crate::{
    domain::{
        entities::{
            admin::{AdminClaims, GuardOptions, GuardedResponse, ADMIN_ROLE},
            rate_limit::{RateLimitDecision, RateLimitTier},
        },
        services::rate_limiter::RateLimiter,
    },
    errors::IntegrityError,
};

/// Guard in front of privileged admin operations.
///
/// Order of checks: authentication, then rate limiting (when enabled for the
/// operation), then authorization. Allow-listed emails go through the same
/// rate limits as every other admin.
pub struct AdminSecurityGateway {
    rate_limiter: Arc<RateLimiter>,
    decoding_key: DecodingKey,
    email_allow_list: Vec<String>,
}

impl AdminSecurityGateway {
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        admin_jwt_secret: &str,
        email_allow_list: Vec<String>,
    ) -> Self {
        Self {
            rate_limiter,
            decoding_key: DecodingKey::from_secret(admin_jwt_secret.as_bytes()),
            email_allow_list: email_allow_list
                .into_iter()
                .map(|email| email.to_lowercase())
                .collect(),
        }
    }

    /// Decodes a bearer token (with or without the `Bearer ` prefix).
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<AdminClaims, IntegrityError> {
        let token = authorization
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
            .filter(|token| !token.is_empty())
            .ok_or(IntegrityError::Unauthorized)?;
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<AdminClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "admin token rejected");
                IntegrityError::Unauthorized
            })
    }

    fn is_authorized(&self, claims: &AdminClaims) -> bool {
        claims.role == ADMIN_ROLE
            || self
                .email_allow_list
                .iter()
                .any(|email| *email == claims.email.to_lowercase())
    }

    /// Runs `operation` if the caller passes every check.
    pub async fn guard<T, F, Fut>(
        &self,
        authorization: Option<&str>,
        options: GuardOptions,
        operation: F,
    ) -> Result<GuardedResponse<T>, IntegrityError>
    where
        F: FnOnce(AdminClaims) -> Fut,
        Fut: Future<Output = Result<T, IntegrityError>>,
    {
        let claims = self.authenticate(authorization)?;

        let remaining = if options.check_rate_limit {
            // A throttled bulk call must not spend admin-action quota.
            let tiers: &[RateLimitTier] = if options.is_bulk {
                &[RateLimitTier::AdminAction, RateLimitTier::BulkOperation]
            } else {
                &[RateLimitTier::AdminAction]
            };
            let decision = self.rate_limiter.check_all(tiers, &claims.sub).await;
            Some(reject_if_limited(decision)?)
        } else {
            None
        };

        if !self.is_authorized(&claims) {
            warn!(admin = %claims.sub, "admin operation forbidden");
            return Err(IntegrityError::Forbidden);
        }

        let body = operation(claims).await?;
        Ok(GuardedResponse { body, remaining })
    }
}

fn reject_if_limited(decision: RateLimitDecision) -> Result<u32, IntegrityError> {
    match decision {
        RateLimitDecision::Allowed { remaining } => Ok(remaining),
        RateLimitDecision::Limited {
            message,
            retry_after,
        } => Err(IntegrityError::RateLimitExceeded {
            message,
            retry_after,
        }),
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    const SECRET: &str = "admin-signing-secret";

    fn token(sub: &str, email: &str, role: &str) -> String {
        let claims = AdminClaims {
            sub: sub.to_owned(),
            email: email.to_owned(),
            role: role.to_owned(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    fn gateway() -> AdminSecurityGateway {
        AdminSecurityGateway::new(
            Arc::new(RateLimiter::new()),
            SECRET,
            vec!["Bootstrap@Example.com".to_owned()],
        )
    }

    async fn resolve_report(_: AdminClaims) -> Result<&'static str, IntegrityError> {
        Ok("resolved")
    }

    #[tokio::test]
    async fn unauthenticated_calls_are_rejected_before_rate_limiting() {
        let limiter = Arc::new(RateLimiter::new());
        let gateway = AdminSecurityGateway::new(limiter.clone(), SECRET, vec![]);
        let result = gateway
            .guard(None, GuardOptions::default(), resolve_report)
            .await;
        assert!(matches!(result, Err(IntegrityError::Unauthorized)));

        let result = gateway
            .guard(Some("Bearer not-a-token"), GuardOptions::default(), resolve_report)
            .await;
        assert!(matches!(result, Err(IntegrityError::Unauthorized)));

        // No quota was consumed by the rejected calls.
        assert_eq!(
            limiter.check_admin_action_rate_limit("anyone").await,
            RateLimitDecision::Allowed { remaining: 99 }
        );
    }

    #[tokio::test]
    async fn admin_passes_and_sees_remaining_quota() {
        let gateway = gateway();
        let auth = token("admin-1", "ops@example.com", ADMIN_ROLE);
        let response = gateway
            .guard(Some(auth.as_str()), GuardOptions::default(), resolve_report)
            .await
            .unwrap();
        assert_eq!(response.body, "resolved");
        assert_eq!(response.remaining, Some(99));
    }

    #[tokio::test]
    async fn throttled_admin_gets_retry_after() {
        let gateway = gateway();
        let auth = token("admin-1", "ops@example.com", ADMIN_ROLE);
        for _ in 0..100 {
            gateway
                .guard(Some(auth.as_str()), GuardOptions::default(), resolve_report)
                .await
                .unwrap();
        }
        let err = gateway
            .guard(Some(auth.as_str()), GuardOptions::default(), resolve_report)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 429);
        assert!(err.retry_after_secs().unwrap() > 0);
    }

    #[tokio::test]
    async fn bulk_operations_consume_the_bulk_tier() {
        let gateway = gateway();
        let auth = token("admin-2", "ops@example.com", ADMIN_ROLE);
        for _ in 0..10 {
            gateway
                .guard(Some(auth.as_str()), GuardOptions::bulk(), resolve_report)
                .await
                .unwrap();
        }
        let err = gateway
            .guard(Some(auth.as_str()), GuardOptions::bulk(), resolve_report)
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrityError::RateLimitExceeded { .. }));
        // Non-bulk operations are still within the admin-action tier.
        assert!(gateway
            .guard(Some(auth.as_str()), GuardOptions::default(), resolve_report)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn throttled_bulk_retries_leave_admin_quota_untouched() {
        let limiter = Arc::new(RateLimiter::new());
        let gateway = AdminSecurityGateway::new(limiter.clone(), SECRET, vec![]);
        let auth = token("admin-4", "ops@example.com", ADMIN_ROLE);
        let mut allowed = 0;
        for _ in 0..30 {
            if gateway
                .guard(Some(auth.as_str()), GuardOptions::bulk(), resolve_report)
                .await
                .is_ok()
            {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
        assert_eq!(
            limiter.check_admin_action_rate_limit("admin-4").await,
            RateLimitDecision::Allowed { remaining: 89 }
        );
    }

    #[tokio::test]
    async fn non_admin_is_forbidden_unless_allow_listed() {
        let gateway = gateway();
        let user = token("user-1", "someone@example.com", "user");
        let result = gateway
            .guard(Some(user.as_str()), GuardOptions::default(), resolve_report)
            .await;
        assert!(matches!(result, Err(IntegrityError::Forbidden)));

        let bootstrap = token("user-2", "bootstrap@example.com", "user");
        let response = gateway
            .guard(Some(bootstrap.as_str()), GuardOptions::default(), resolve_report)
            .await
            .unwrap();
        assert_eq!(response.remaining, Some(99));
    }

    #[tokio::test]
    async fn disabled_rate_limit_skips_quota() {
        let gateway = gateway();
        let auth = token("admin-3", "ops@example.com", ADMIN_ROLE);
        let response = gateway
            .guard(Some(auth.as_str()), GuardOptions::without_rate_limit(), resolve_report)
            .await
            .unwrap();
        assert_eq!(response.remaining, None);
    }
}
