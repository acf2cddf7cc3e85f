use serde::{Deserialize, Serialize};

use crate::domain::credential::PhoneNumber;
use crate::domain::verification::ActionKind;
use crate::event_sourcing::DomainEvent;

// ============================================================================
// Notification (SMS) Stream
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NotificationEvent {
    Sent { phone: PhoneNumber, text: String },
}

impl NotificationEvent {
    pub fn sent(phone: &PhoneNumber, text: impl Into<String>) -> Self {
        NotificationEvent::Sent {
            phone: phone.clone(),
            text: text.into(),
        }
    }

    pub fn phone(&self) -> &PhoneNumber {
        match self {
            NotificationEvent::Sent { phone, .. } => phone,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            NotificationEvent::Sent { text, .. } => text,
        }
    }
}

impl DomainEvent for NotificationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::Sent { .. } => "sent",
        }
    }
}

/// Values substituted into a message template
#[derive(Debug, Clone, Default)]
pub struct MessageParams<'a> {
    pub code: &'a str,
    pub phone: Option<&'a PhoneNumber>,
    pub old_phone: Option<&'a PhoneNumber>,
    pub new_phone: Option<&'a PhoneNumber>,
}

/// Locale-neutral SMS templates keyed by action kind.
///
/// Placeholders: `{code}`, `{phone}`, `{old_phone}`, `{new_phone}`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageTemplates {
    pub register: String,
    pub reset_password: String,
    pub phone_change: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            register: "Your registration code is {code}".to_string(),
            reset_password: "Your password reset code for {phone} is {code}".to_string(),
            phone_change: "Code {code} confirms changing your phone from {old_phone} to {new_phone}".to_string(),
        }
    }
}

impl MessageTemplates {
    pub fn template(&self, action: ActionKind) -> &str {
        match action {
            ActionKind::Register => &self.register,
            ActionKind::ResetPassword => &self.reset_password,
            ActionKind::PhoneChange => &self.phone_change,
        }
    }

    pub fn render(&self, action: ActionKind, params: &MessageParams<'_>) -> String {
        let phone = |p: Option<&PhoneNumber>| p.map(PhoneNumber::as_str).unwrap_or_default().to_string();

        self.template(action)
            .replace("{code}", params.code)
            .replace("{phone}", &phone(params.phone))
            .replace("{old_phone}", &phone(params.old_phone))
            .replace("{new_phone}", &phone(params.new_phone))
    }
}
