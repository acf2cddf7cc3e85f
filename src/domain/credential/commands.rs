use crate::domain::user::UserId;
use super::value_objects::{DeletionReason, PasswordHash, PhoneNumber};

// ============================================================================
// Credential Domain Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum CredentialCommand {
    Create {
        phone: PhoneNumber,
        password_hash: PasswordHash,
        user: UserId,
    },
    UpdatePassword {
        password_hash: PasswordHash,
    },
    Delete {
        reason: DeletionReason,
    },
}
