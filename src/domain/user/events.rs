use serde::{Deserialize, Serialize};

use crate::event_sourcing::DomainEvent;
use super::value_objects::{LoginMethod, UserId};

// ============================================================================
// User Stream Events
// ============================================================================
//
// Events this service addresses to the identity service's "users" stream.
// The identity service owns and applies them.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UserEvent {
    #[serde(rename = "UserCreated")]
    Created {
        user: UserId,
        #[serde(default)]
        data: serde_json::Value,
    },
    #[serde(rename = "loginMethodAdded")]
    LoginMethodAdded { user: UserId, method: LoginMethod },
    #[serde(rename = "loginMethodRemoved")]
    LoginMethodRemoved { user: UserId, method: LoginMethod },
}

impl UserEvent {
    pub fn user(&self) -> UserId {
        match self {
            UserEvent::Created { user, .. }
            | UserEvent::LoginMethodAdded { user, .. }
            | UserEvent::LoginMethodRemoved { user, .. } => *user,
        }
    }
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Created { .. } => "UserCreated",
            UserEvent::LoginMethodAdded { .. } => "loginMethodAdded",
            UserEvent::LoginMethodRemoved { .. } => "loginMethodRemoved",
        }
    }
}
