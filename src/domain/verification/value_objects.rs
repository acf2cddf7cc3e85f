use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::credential::{PasswordHash, PhoneNumber};
use crate::domain::user::UserId;

// ============================================================================
// Verification Code Value Objects
// ============================================================================

/// Pending action a code gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Register,
    ResetPassword,
    PhoneChange,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Register => "register",
            ActionKind::ResetPassword => "resetPassword",
            ActionKind::PhoneChange => "phoneChange",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted key of a code record: `"<phone>_<code>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeKey(String);

impl CodeKey {
    pub fn new(phone: &PhoneNumber, code: &str) -> Self {
        Self(format!("{}_{}", phone.as_str(), code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Action-specific data carried by a code until it is redeemed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CodePayload {
    #[serde(rename_all = "camelCase")]
    Register {
        user: UserId,
        password_hash: PasswordHash,
        #[serde(default)]
        user_data: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    ResetPassword {
        user: UserId,
    },
    #[serde(rename_all = "camelCase")]
    PhoneChange {
        old_phone: PhoneNumber,
        new_phone: PhoneNumber,
        user: UserId,
    },
}

impl CodePayload {
    pub fn action_kind(&self) -> ActionKind {
        match self {
            CodePayload::Register { .. } => ActionKind::Register,
            CodePayload::ResetPassword { .. } => ActionKind::ResetPassword,
            CodePayload::PhoneChange { .. } => ActionKind::PhoneChange,
        }
    }

    pub fn user(&self) -> UserId {
        match self {
            CodePayload::Register { user, .. }
            | CodePayload::ResetPassword { user }
            | CodePayload::PhoneChange { user, .. } => *user,
        }
    }
}
