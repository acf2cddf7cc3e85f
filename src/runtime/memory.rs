use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::credential::{CredentialAggregate, CredentialEvent, PhoneNumber};
use crate::domain::notification::NotificationEvent;
use crate::domain::session::SessionEvent;
use crate::domain::user::{UserDirectory, UserDirectoryError, UserEvent, UserId, UserRecord};
use crate::domain::verification::{ActionKind, CodeEvent, CodeKey, VerificationCode};
use crate::event_sourcing::EventStore;
use crate::projections::{PhonePasswordProjection, UserProjection};
use crate::routing::{EventBatch, EventSink, PhonePasswordEvent};
use super::PhonePasswordReads;

// ============================================================================
// In-Memory Runtime
// ============================================================================
//
// One event store per aggregate type, keyed by the aggregate's natural key,
// plus the projections the workflows read from. A phonePassword batch is
// checked against the projection under its write lock before anything is
// appended, so the batch commits as a whole or not at all.
//
// ============================================================================

pub struct InMemoryRuntime {
    phone_password: RwLock<PhonePasswordProjection>,
    users: RwLock<UserProjection>,

    credential_store: EventStore<CredentialEvent>,
    code_store: EventStore<CodeEvent>,
    user_store: EventStore<UserEvent>,
    session_store: EventStore<SessionEvent>,
    sms_store: EventStore<NotificationEvent>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self {
            phone_password: RwLock::new(PhonePasswordProjection::new()),
            users: RwLock::new(UserProjection::new()),
            credential_store: EventStore::new("credential"),
            code_store: EventStore::new("code"),
            user_store: EventStore::new("user"),
            session_store: EventStore::new("session"),
            sms_store: EventStore::new("sms"),
        }
    }

    /// Registers a user as if created by the identity service
    pub async fn seed_user(&self, user: UserRecord) {
        self.users.write().await.insert(user);
    }

    /// Drops a user as if deleted by the identity service
    pub async fn remove_user(&self, user: &UserId) -> Option<UserRecord> {
        self.users.write().await.remove(user)
    }

    pub async fn user(&self, user: &UserId) -> Option<UserRecord> {
        self.users.read().await.get(user).cloned()
    }

    /// Texts sent to a phone, oldest first
    pub async fn sent_messages(&self, phone: &PhoneNumber) -> Result<Vec<String>> {
        Ok(self
            .sms_store
            .load_events(phone.as_str())
            .await?
            .into_iter()
            .map(|envelope| envelope.event_data.text().to_string())
            .collect())
    }

    pub async fn session_events(&self, session_id: &str) -> Result<Vec<SessionEvent>> {
        Ok(self
            .session_store
            .load_events(session_id)
            .await?
            .into_iter()
            .map(|envelope| envelope.event_data)
            .collect())
    }

    /// Rebuilds a credential from its stream, deleted or not
    pub async fn replay_credential(&self, phone: &PhoneNumber) -> Result<CredentialAggregate> {
        self.credential_store.load_aggregate(phone.as_str()).await
    }

    pub async fn replay_code(&self, key: &CodeKey) -> Result<VerificationCode> {
        self.code_store.load_aggregate(key.as_str()).await
    }

    /// JSON export of a credential stream for operator reconciliation
    pub async fn export_credential(&self, phone: &PhoneNumber) -> Result<Vec<String>> {
        self.credential_store.export_json(phone.as_str()).await
    }

    pub async fn export_code(&self, key: &CodeKey) -> Result<Vec<String>> {
        self.code_store.export_json(key.as_str()).await
    }

    async fn append_phone_password(&self, events: Vec<PhonePasswordEvent>, correlation_id: Uuid) -> Result<()> {
        let mut projection = self.phone_password.write().await;

        // Group per aggregate stream, keeping emission order inside each group
        let mut credential_groups: Vec<(PhoneNumber, Vec<CredentialEvent>)> = Vec::new();
        let mut code_groups: Vec<(CodeKey, Vec<CodeEvent>)> = Vec::new();
        for event in &events {
            match event {
                PhonePasswordEvent::Credential { phone, event } => {
                    match credential_groups.iter_mut().find(|(p, _)| p == phone) {
                        Some((_, group)) => group.push(event.clone()),
                        None => credential_groups.push((phone.clone(), vec![event.clone()])),
                    }
                }
                PhonePasswordEvent::Code { key, event } => {
                    match code_groups.iter_mut().find(|(k, _)| k == key) {
                        Some((_, group)) => group.push(event.clone()),
                        None => code_groups.push((key.clone(), vec![event.clone()])),
                    }
                }
            }
        }

        let credential_versions: HashMap<PhoneNumber, i64> = credential_groups
            .iter()
            .map(|(phone, _)| (phone.clone(), projection.credential_version(phone).unwrap_or(0)))
            .collect();
        let code_versions: HashMap<CodeKey, i64> = code_groups
            .iter()
            .map(|(key, _)| (key.clone(), projection.code_version(key).unwrap_or(0)))
            .collect();

        projection.apply_batch(&events)?;

        for (phone, group) in credential_groups {
            let expected = credential_versions.get(&phone).copied();
            self.credential_store
                .append_events(phone.as_str(), expected, group, correlation_id)
                .await?;
        }
        for (key, group) in code_groups {
            let expected = code_versions.get(&key).copied();
            self.code_store
                .append_events(key.as_str(), expected, group, correlation_id)
                .await?;
        }

        tracing::debug!(%correlation_id, events = events.len(), "phonePassword batch committed");
        Ok(())
    }

    async fn append_users(&self, events: Vec<UserEvent>, correlation_id: Uuid) -> Result<()> {
        let mut projection = self.users.write().await;
        for event in events {
            projection.apply(&event);
            self.user_store
                .append_events(&event.user().to_string(), None, vec![event], correlation_id)
                .await?;
        }
        Ok(())
    }
}

impl Default for InMemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhonePasswordReads for InMemoryRuntime {
    async fn credential(&self, phone: &PhoneNumber) -> Result<Option<CredentialAggregate>> {
        Ok(self.phone_password.read().await.credential(phone).cloned())
    }

    async fn credentials_by_user(&self, user: &UserId) -> Result<Vec<CredentialAggregate>> {
        Ok(self.phone_password.read().await.credentials_by_user(user))
    }

    async fn code(&self, key: &CodeKey) -> Result<Option<VerificationCode>> {
        Ok(self.phone_password.read().await.code(key).cloned())
    }

    async fn live_codes(
        &self,
        phone: &PhoneNumber,
        action: ActionKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<VerificationCode>> {
        Ok(self.phone_password.read().await.live_codes(phone, action, now))
    }
}

#[async_trait]
impl UserDirectory for InMemoryRuntime {
    async fn get_user(&self, user: &UserId) -> Result<UserRecord, UserDirectoryError> {
        self.users
            .read()
            .await
            .get(user)
            .cloned()
            .ok_or(UserDirectoryError::UserNotFound(*user))
    }
}

#[async_trait]
impl EventSink for InMemoryRuntime {
    async fn append(&self, batch: EventBatch, correlation_id: Uuid) -> Result<()> {
        match batch {
            EventBatch::PhonePassword(events) => self
                .append_phone_password(events, correlation_id)
                .await
                .context("phonePassword batch rejected"),
            EventBatch::Users(events) => self.append_users(events, correlation_id).await,
            EventBatch::Session(events) => {
                for event in events {
                    let SessionEvent::LoggedIn { session, .. } = &event;
                    let session = session.clone();
                    self.session_store
                        .append_events(&session, None, vec![event], correlation_id)
                        .await?;
                }
                Ok(())
            }
            EventBatch::Sms(events) => {
                for event in events {
                    let phone = event.phone().clone();
                    tracing::info!(phone = %phone, "📨 SMS queued");
                    self.sms_store
                        .append_events(phone.as_str(), None, vec![event], correlation_id)
                        .await?;
                }
                Ok(())
            }
        }
    }
}
