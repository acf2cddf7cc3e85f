// ============================================================================
// Credential Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credential not found")]
    NotFound,

    #[error("Credential already added for phone {0}")]
    AlreadyAdded(String),

    #[error("Invalid phone number: {0:?}")]
    InvalidPhone(String),

    #[error("Aggregate not initialized")]
    NotInitialized,
}
