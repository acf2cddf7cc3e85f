use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::event_sourcing::Aggregate;
use super::value_objects::{CredentialStatus, PasswordHash, PhoneNumber};
use super::commands::CredentialCommand;
use super::events::*;
use super::errors::CredentialError;

// ============================================================================
// Credential Aggregate - Business Logic
// ============================================================================
//
// One stream per phone number. A deleted credential keeps its stream; a later
// `Created` on the same phone reopens it with a new owner and hash.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialAggregate {
    pub phone: PhoneNumber,
    pub password_hash: PasswordHash,
    pub user: UserId,
    pub status: CredentialStatus,
    pub version: i64,
}

impl CredentialAggregate {
    pub fn is_active(&self) -> bool {
        self.status == CredentialStatus::Active
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user == user
    }

    pub fn password_matches(&self, candidate: &PasswordHash) -> bool {
        &self.password_hash == candidate
    }

    fn validate_active(&self) -> Result<(), CredentialError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CredentialError::NotFound)
        }
    }
}

impl Aggregate for CredentialAggregate {
    type Event = CredentialEvent;
    type Command = CredentialCommand;
    type Error = CredentialError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            CredentialEvent::Created(e) => Ok(Self {
                phone: e.phone.clone(),
                password_hash: e.password_hash.clone(),
                user: e.user,
                status: CredentialStatus::Active,
                version: 1,
            }),
            _ => Err(CredentialError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            CredentialEvent::Created(e) => {
                // Uniqueness of phone across credentials is enforced here, at commit time
                if self.is_active() {
                    return Err(CredentialError::AlreadyAdded(self.phone.to_string()));
                }
                self.password_hash = e.password_hash.clone();
                self.user = e.user;
                self.status = CredentialStatus::Active;
            }
            CredentialEvent::PasswordUpdated(e) => {
                // A fan-out update racing a deletion is dropped
                if self.is_active() {
                    self.password_hash = e.password_hash.clone();
                }
            }
            CredentialEvent::Deleted(_) => {
                // A stale delete (racing swap or double delete) must not commit
                self.validate_active()?;
                self.status = CredentialStatus::Deleted;
            }
        }

        self.version += 1;
        Ok(())
    }

    fn handle_new(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CredentialCommand::Create { phone, password_hash, user } => {
                Ok(vec![CredentialEvent::Created(CredentialCreated {
                    phone: phone.clone(),
                    password_hash: password_hash.clone(),
                    user: *user,
                })])
            }
            CredentialCommand::UpdatePassword { .. } | CredentialCommand::Delete { .. } => {
                Err(CredentialError::NotFound)
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CredentialCommand::Create { phone, password_hash, user } => {
                if self.is_active() {
                    return Err(CredentialError::AlreadyAdded(self.phone.to_string()));
                }

                Ok(vec![CredentialEvent::Created(CredentialCreated {
                    phone: phone.clone(),
                    password_hash: password_hash.clone(),
                    user: *user,
                })])
            }

            CredentialCommand::UpdatePassword { password_hash } => {
                self.validate_active()?;

                if &self.password_hash == password_hash {
                    return Ok(vec![]); // No change
                }

                Ok(vec![CredentialEvent::PasswordUpdated(CredentialPasswordUpdated {
                    password_hash: password_hash.clone(),
                })])
            }

            CredentialCommand::Delete { reason } => {
                self.validate_active()?;

                Ok(vec![CredentialEvent::Deleted(CredentialDeleted { reason: *reason })])
            }
        }
    }

    fn aggregate_id(&self) -> &str {
        self.phone.as_str()
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
