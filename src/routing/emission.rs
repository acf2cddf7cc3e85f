use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::credential::{CredentialEvent, PhoneNumber};
use crate::domain::notification::NotificationEvent;
use crate::domain::session::SessionEvent;
use crate::domain::user::UserEvent;
use crate::domain::verification::{CodeEvent, CodeKey};
use crate::event_sourcing::DomainEvent;

/// Target streams a workflow can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stream {
    /// This service's own stream: credentials and verification codes
    PhonePassword,
    Users,
    Session,
    Sms,
}

impl Stream {
    pub const ALL: [Stream; 4] = [Stream::PhonePassword, Stream::Users, Stream::Session, Stream::Sms];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::PhonePassword => "phonePassword",
            Stream::Users => "users",
            Stream::Session => "session",
            Stream::Sms => "sms",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event on the phonePassword stream, addressed to one aggregate instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "aggregate", rename_all = "camelCase")]
pub enum PhonePasswordEvent {
    Credential { phone: PhoneNumber, event: CredentialEvent },
    Code { key: CodeKey, event: CodeEvent },
}

impl PhonePasswordEvent {
    /// Stream id of the addressed aggregate (credential key or code key)
    pub fn aggregate_id(&self) -> &str {
        match self {
            PhonePasswordEvent::Credential { phone, .. } => phone.as_str(),
            PhonePasswordEvent::Code { key, .. } => key.as_str(),
        }
    }
}

impl DomainEvent for PhonePasswordEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PhonePasswordEvent::Credential { event, .. } => event.event_type(),
            PhonePasswordEvent::Code { event, .. } => event.event_type(),
        }
    }
}

/// One atomic, ordered batch for a single stream
#[derive(Debug, Clone, PartialEq)]
pub enum EventBatch {
    PhonePassword(Vec<PhonePasswordEvent>),
    Users(Vec<UserEvent>),
    Session(Vec<SessionEvent>),
    Sms(Vec<NotificationEvent>),
}

impl EventBatch {
    pub fn stream(&self) -> Stream {
        match self {
            EventBatch::PhonePassword(_) => Stream::PhonePassword,
            EventBatch::Users(_) => Stream::Users,
            EventBatch::Session(_) => Stream::Session,
            EventBatch::Sms(_) => Stream::Sms,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EventBatch::PhonePassword(events) => events.len(),
            EventBatch::Users(events) => events.len(),
            EventBatch::Session(events) => events.len(),
            EventBatch::Sms(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Effects of one workflow step, grouped by target stream in emission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Emission {
    phone_password: Vec<PhonePasswordEvent>,
    users: Vec<UserEvent>,
    session: Vec<SessionEvent>,
    sms: Vec<NotificationEvent>,
}

impl Emission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(mut self, phone: &PhoneNumber, event: CredentialEvent) -> Self {
        self.phone_password.push(PhonePasswordEvent::Credential { phone: phone.clone(), event });
        self
    }

    pub fn credentials<I>(mut self, phone: &PhoneNumber, events: I) -> Self
    where
        I: IntoIterator<Item = CredentialEvent>,
    {
        for event in events {
            self = self.credential(phone, event);
        }
        self
    }

    pub fn code(mut self, key: &CodeKey, event: CodeEvent) -> Self {
        self.phone_password.push(PhonePasswordEvent::Code { key: key.clone(), event });
        self
    }

    pub fn user(mut self, event: UserEvent) -> Self {
        self.users.push(event);
        self
    }

    pub fn session(mut self, event: SessionEvent) -> Self {
        self.session.push(event);
        self
    }

    pub fn sms(mut self, event: NotificationEvent) -> Self {
        self.sms.push(event);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.phone_password.is_empty()
            && self.users.is_empty()
            && self.session.is_empty()
            && self.sms.is_empty()
    }

    pub fn phone_password_events(&self) -> &[PhonePasswordEvent] {
        &self.phone_password
    }

    /// Non-empty batches; the phonePassword batch, if any, comes first
    pub fn into_batches(self) -> Vec<EventBatch> {
        let mut batches = Vec::with_capacity(4);
        if !self.phone_password.is_empty() {
            batches.push(EventBatch::PhonePassword(self.phone_password));
        }
        if !self.users.is_empty() {
            batches.push(EventBatch::Users(self.users));
        }
        if !self.session.is_empty() {
            batches.push(EventBatch::Session(self.session));
        }
        if !self.sms.is_empty() {
            batches.push(EventBatch::Sms(self.sms));
        }
        batches
    }
}
