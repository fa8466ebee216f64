use async_trait::async_trait;

use crate::{domain::entities::verified_notification::VerifiedNotification, errors::IntegrityError};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Authenticates a platform notification.
    ///
    /// `origin` is the caller's network address, used for audit logging only.
    /// Returns `None` on any failure; callers must then ignore the request.
    async fn verify_notification(
        &self,
        body: &str,
        origin: Option<&str>,
    ) -> Option<VerifiedNotification>;

    /// Applies the state change a verified notification implies. Returns
    /// whether a stored purchase record was updated.
    async fn apply_notification(
        &self,
        notification: &VerifiedNotification,
    ) -> Result<bool, IntegrityError>;
}
