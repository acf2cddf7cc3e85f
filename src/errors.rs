use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::credential::CredentialError;
use crate::domain::user::UserDirectoryError;
use crate::domain::verification::CodeError;

// ============================================================================
// Workflow Errors
// ============================================================================
//
// Every rejection is decided before any event is emitted. Callers match on
// `ErrorKind`, optionally scoped to an input field for form validation.
//
// ============================================================================

/// Closed taxonomy of workflow rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    AlreadyAdded,
    AlreadyUsed,
    Expired,
    WrongPassword,
    NotAuthorized,
    Taken,
    RegistrationNotConfirmed,
    UserNotFound,
    InternalServerError,
    Invalid,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "notFound",
            ErrorKind::AlreadyAdded => "alreadyAdded",
            ErrorKind::AlreadyUsed => "alreadyUsed",
            ErrorKind::Expired => "expired",
            ErrorKind::WrongPassword => "wrongPassword",
            ErrorKind::NotAuthorized => "notAuthorized",
            ErrorKind::Taken => "taken",
            ErrorKind::RegistrationNotConfirmed => "registrationNotConfirmed",
            ErrorKind::UserNotFound => "userNotFound",
            ErrorKind::InternalServerError => "internalServerError",
            ErrorKind::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Rejected(ErrorKind),

    /// Rejection attached to one input field
    #[error("{field}: {kind}")]
    Field { field: &'static str, kind: ErrorKind },

    /// Storage or delivery failure; not a business rule
    #[error("runtime failure: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    pub fn field(field: &'static str, kind: ErrorKind) -> Self {
        WorkflowError::Field { field, kind }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Rejected(kind) | WorkflowError::Field { kind, .. } => *kind,
            WorkflowError::Runtime(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn field_name(&self) -> Option<&'static str> {
        match self {
            WorkflowError::Field { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Label used for the outcome dimension of command metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            WorkflowError::Runtime(_) => "error",
            _ => self.kind().as_str(),
        }
    }

    /// Maps a runtime failure back to a rejection when the runtime refused a
    /// batch because an aggregate invariant failed at commit time.
    pub fn from_runtime(err: anyhow::Error) -> Self {
        let kind = if let Some(e) = err.downcast_ref::<CredentialError>() {
            Some(credential_kind(e))
        } else {
            err.downcast_ref::<CodeError>().map(code_kind)
        };

        match kind {
            Some(kind) => WorkflowError::Rejected(kind),
            None => WorkflowError::Runtime(err),
        }
    }
}

impl From<ErrorKind> for WorkflowError {
    fn from(kind: ErrorKind) -> Self {
        WorkflowError::Rejected(kind)
    }
}

fn credential_kind(err: &CredentialError) -> ErrorKind {
    match err {
        CredentialError::NotFound | CredentialError::NotInitialized => ErrorKind::NotFound,
        CredentialError::AlreadyAdded(_) => ErrorKind::AlreadyAdded,
        CredentialError::InvalidPhone(_) => ErrorKind::Invalid,
    }
}

fn code_kind(err: &CodeError) -> ErrorKind {
    match err {
        CodeError::NotFound | CodeError::NotInitialized => ErrorKind::NotFound,
        CodeError::AlreadyUsed => ErrorKind::AlreadyUsed,
        CodeError::Expired => ErrorKind::Expired,
        CodeError::KeyCollision(_) => ErrorKind::InternalServerError,
    }
}

impl From<CredentialError> for WorkflowError {
    fn from(err: CredentialError) -> Self {
        WorkflowError::Rejected(credential_kind(&err))
    }
}

impl From<CodeError> for WorkflowError {
    fn from(err: CodeError) -> Self {
        WorkflowError::Rejected(code_kind(&err))
    }
}

impl From<UserDirectoryError> for WorkflowError {
    fn from(err: UserDirectoryError) -> Self {
        match err {
            UserDirectoryError::UserNotFound(_) => WorkflowError::Rejected(ErrorKind::UserNotFound),
            UserDirectoryError::Unavailable(reason) => {
                WorkflowError::Runtime(anyhow::anyhow!("identity service unavailable: {}", reason))
            }
        }
    }
}
