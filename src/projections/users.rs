use std::collections::HashMap;

use crate::domain::user::{UserEvent, UserId, UserRecord};

// ============================================================================
// User Projection - local stand-in for the identity service read model
// ============================================================================
//
// Applies the events this service addresses to the users stream. Both login
// method events are idempotent so redelivery converges on the same set.
//
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct UserProjection {
    users: HashMap<UserId, UserRecord>,
}

impl UserProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    pub fn remove(&mut self, user: &UserId) -> Option<UserRecord> {
        self.users.remove(user)
    }

    pub fn get(&self, user: &UserId) -> Option<&UserRecord> {
        self.users.get(user)
    }

    pub fn apply(&mut self, event: &UserEvent) {
        match event {
            UserEvent::Created { user, data } => {
                let record = self.users.entry(*user).or_insert_with(|| UserRecord::new(*user));
                record.data = data.clone();
            }
            UserEvent::LoginMethodAdded { user, method } => match self.users.get_mut(user) {
                Some(record) => {
                    if !record.login_methods.iter().any(|m| m.same_key(method)) {
                        record.login_methods.push(method.clone());
                    }
                }
                None => tracing::warn!(%user, "loginMethodAdded for unknown user ignored"),
            },
            UserEvent::LoginMethodRemoved { user, method } => match self.users.get_mut(user) {
                Some(record) => record.login_methods.retain(|m| !m.same_key(method)),
                None => tracing::warn!(%user, "loginMethodRemoved for unknown user ignored"),
            },
        }
    }
}
