// ============================================================================
// Verification Code Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    /// No record for the key, or the record gates a different action
    #[error("Verification code not found")]
    NotFound,

    #[error("Verification code already used")]
    AlreadyUsed,

    #[error("Verification code expired")]
    Expired,

    #[error("Verification code key already taken: {0}")]
    KeyCollision(String),

    #[error("Aggregate not initialized")]
    NotInitialized,
}
