use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::event_sourcing::DomainEvent;

// ============================================================================
// Session Stream Events
// ============================================================================
//
// The session service owns expiry and storage; this service only produces
// the login event binding a client session to a user.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    #[serde(rename = "loggedIn")]
    LoggedIn {
        user: UserId,
        session: String,
        expire: Option<DateTime<Utc>>,
        #[serde(default)]
        roles: Vec<String>,
    },
}

impl SessionEvent {
    pub fn logged_in(user: UserId, session: impl Into<String>, roles: Vec<String>) -> Self {
        SessionEvent::LoggedIn {
            user,
            session: session.into(),
            expire: None,
            roles,
        }
    }
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::LoggedIn { .. } => "loggedIn",
        }
    }
}
