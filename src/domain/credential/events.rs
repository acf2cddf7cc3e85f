use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::event_sourcing::DomainEvent;
use super::value_objects::{DeletionReason, PasswordHash, PhoneNumber};

// ============================================================================
// Credential Events - Domain Events for the Credential Aggregate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CredentialEvent {
    Created(CredentialCreated),
    PasswordUpdated(CredentialPasswordUpdated),
    Deleted(CredentialDeleted),
}

impl DomainEvent for CredentialEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CredentialEvent::Created(_) => "CredentialCreated",
            CredentialEvent::PasswordUpdated(_) => "CredentialPasswordUpdated",
            CredentialEvent::Deleted(_) => "CredentialDeleted",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Credential Created - phone bound to a user with a password hash
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CredentialCreated {
    pub phone: PhoneNumber,
    pub password_hash: PasswordHash,
    pub user: UserId,
}

/// Credential Password Updated - "set password to X"
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CredentialPasswordUpdated {
    pub password_hash: PasswordHash,
}

/// Credential Deleted - phone released
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CredentialDeleted {
    pub reason: DeletionReason,
}
