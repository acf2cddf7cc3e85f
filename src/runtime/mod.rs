// ============================================================================
// Runtime - the event-sourcing engine this service runs on
// ============================================================================
//
// Workflows see the engine through two seams: `PhonePasswordReads` for the
// current state of credentials and codes, and `EventSink` (see routing) for
// appending batches. `InMemoryRuntime` is a complete reference engine used by
// the binary and by tests.
//
// ============================================================================

pub mod memory;
pub mod stack;

pub use memory::InMemoryRuntime;
pub use stack::InMemoryStack;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::credential::{CredentialAggregate, PhoneNumber};
use crate::domain::user::UserId;
use crate::domain::verification::{ActionKind, CodeKey, VerificationCode};

/// Read access to the phonePassword read model
#[async_trait]
pub trait PhonePasswordReads: Send + Sync {
    /// Active credential for the phone
    async fn credential(&self, phone: &PhoneNumber) -> Result<Option<CredentialAggregate>>;

    /// Active credentials owned by the user, ordered by phone
    async fn credentials_by_user(&self, user: &UserId) -> Result<Vec<CredentialAggregate>>;

    /// Code record by key, used or not
    async fn code(&self, key: &CodeKey) -> Result<Option<VerificationCode>>;

    /// Unused, unexpired codes for a phone and action
    async fn live_codes(
        &self,
        phone: &PhoneNumber,
        action: ActionKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<VerificationCode>>;
}
