use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::domain::credential::{CredentialAggregate, CredentialEvent, PhoneNumber};
use crate::domain::user::UserId;
use crate::domain::verification::{ActionKind, CodeKey, VerificationCode};
use crate::event_sourcing::{Aggregate, DomainEvent};
use crate::routing::PhonePasswordEvent;

// ============================================================================
// Phone Password Projection - credentials and verification codes
// ============================================================================
//
// Read model of the phonePassword stream. A batch is folded into staged
// copies of the touched aggregates and only written back when every event
// applied, so a rejected batch leaves no trace.
//
// Deleted credentials and used codes stay in the map; reads filter them.
//
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct PhonePasswordProjection {
    credentials: HashMap<PhoneNumber, CredentialAggregate>,
    codes: HashMap<CodeKey, VerificationCode>,
}

#[derive(Default)]
struct Staged {
    credentials: HashMap<PhoneNumber, CredentialAggregate>,
    codes: HashMap<CodeKey, VerificationCode>,
}

impl PhonePasswordProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a batch all-or-nothing. Errors carry the aggregate's own error
    /// type so callers can downcast them.
    pub fn apply_batch(&mut self, events: &[PhonePasswordEvent]) -> Result<()> {
        let mut staged = Staged::default();

        for event in events {
            match event {
                PhonePasswordEvent::Credential { phone, event } => {
                    let current = staged
                        .credentials
                        .remove(phone)
                        .or_else(|| self.credentials.get(phone).cloned());
                    if let (Some(c), CredentialEvent::PasswordUpdated(_)) = (&current, event) {
                        if !c.is_active() {
                            tracing::warn!(%phone, "Password update reached a deleted credential; dropped");
                        }
                    }
                    let next = CredentialAggregate::evolve(current, event)
                        .map_err(anyhow::Error::new)
                        .with_context(|| format!("Credential {} rejected {}", phone, event.event_type()))?;
                    staged.credentials.insert(phone.clone(), next);
                }
                PhonePasswordEvent::Code { key, event } => {
                    let current = staged
                        .codes
                        .remove(key)
                        .or_else(|| self.codes.get(key).cloned());
                    let next = VerificationCode::evolve(current, event)
                        .map_err(anyhow::Error::new)
                        .with_context(|| format!("Code {} rejected {}", key, event.event_type()))?;
                    staged.codes.insert(key.clone(), next);
                }
            }
        }

        self.credentials.extend(staged.credentials);
        self.codes.extend(staged.codes);
        Ok(())
    }

    /// Current version of the credential stream, active or not
    pub fn credential_version(&self, phone: &PhoneNumber) -> Option<i64> {
        self.credentials.get(phone).map(|c| c.version)
    }

    pub fn code_version(&self, key: &CodeKey) -> Option<i64> {
        self.codes.get(key).map(|c| c.version)
    }

    /// Active credential for the phone
    pub fn credential(&self, phone: &PhoneNumber) -> Option<&CredentialAggregate> {
        self.credentials.get(phone).filter(|c| c.is_active())
    }

    /// Active credentials of a user, ordered by phone
    pub fn credentials_by_user(&self, user: &UserId) -> Vec<CredentialAggregate> {
        let mut owned: Vec<CredentialAggregate> = self
            .credentials
            .values()
            .filter(|c| c.is_active() && c.is_owned_by(user))
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.phone.cmp(&b.phone));
        owned
    }

    pub fn code(&self, key: &CodeKey) -> Option<&VerificationCode> {
        self.codes.get(key)
    }

    /// Unused, unexpired codes for the phone and action, soonest expiry first
    pub fn live_codes(&self, phone: &PhoneNumber, action: ActionKind, now: DateTime<Utc>) -> Vec<VerificationCode> {
        let mut live: Vec<VerificationCode> = self
            .codes
            .values()
            .filter(|c| &c.phone == phone && c.action_kind() == action && c.is_live(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| a.expire.cmp(&b.expire).then_with(|| a.key.as_str().cmp(b.key.as_str())));
        live
    }
}
