use async_trait::async_trait;

use super::value_objects::{UserId, UserRecord};

// ============================================================================
// User Directory - read-only client of the identity service
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserDirectoryError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}

/// Read access to users owned by the identity service.
///
/// This service never writes users directly; it only appends events to the
/// users stream through the router.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user: &UserId) -> Result<UserRecord, UserDirectoryError>;
}
