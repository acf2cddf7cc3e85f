use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::credential::PhoneNumber;

// ============================================================================
// User Value Objects
// ============================================================================

/// Login method type written by this service
pub const PHONE_PASSWORD_METHOD: &str = "phonePassword";

/// Identity of a user owned by the identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Mint a fresh user id (self-registration)
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One entry of a user's polymorphic login-method set, keyed by (type, id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginMethod {
    #[serde(rename = "type")]
    pub method_type: String,
    pub id: String,
    pub phone: PhoneNumber,
}

impl LoginMethod {
    pub fn phone_password(phone: &PhoneNumber) -> Self {
        Self {
            method_type: PHONE_PASSWORD_METHOD.to_string(),
            id: phone.as_str().to_string(),
            phone: phone.clone(),
        }
    }

    pub fn same_key(&self, other: &LoginMethod) -> bool {
        self.method_type == other.method_type && self.id == other.id
    }
}

/// Read-model of a user as exposed by the identity service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub login_methods: Vec<LoginMethod>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl UserRecord {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            roles: Vec::new(),
            login_methods: Vec::new(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_login_method(&self, method_type: &str, id: &str) -> bool {
        self.login_methods
            .iter()
            .any(|m| m.method_type == method_type && m.id == id)
    }
}
