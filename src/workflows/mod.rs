// ============================================================================
// Workflows - credential lifecycle orchestration
// ============================================================================
//
// Every step follows the same shape: read the current state of the
// aggregates involved, decide, and only when every check passed hand one
// `Emission` to the router. A rejected step emits nothing.
//
// - codes          issue / redeem verification codes
// - credential     create, update, delete, user-deletion cascade
// - registration   startRegister, resendRegisterCode, finishRegister
// - login          login
// - password       change by user, change all, reset
// - phone_change   startPhoneChange, finishPhoneChange
//
// ============================================================================

pub mod codes;
pub mod credential;
pub mod registration;
pub mod login;
pub mod password;
pub mod phone_change;

#[cfg(test)]
pub(crate) mod test_support;

pub use codes::{CodeSource, IssuedCode, Redemption};

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::WorkflowConfig;
use crate::domain::credential::PhoneNumber;
use crate::domain::notification::MessageTemplates;
use crate::domain::user::{UserDirectory, UserId};
use crate::domain::verification::issuer;
use crate::errors::{ErrorKind, WorkflowError, WorkflowResult};
use crate::metrics::Metrics;
use crate::routing::{Emission, EventRouter};
use crate::runtime::PhonePasswordReads;
use crate::triggers::{Trigger, TriggerQueue};

/// What the transport knows about the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientContext {
    pub user: Option<UserId>,
    pub session_id: Option<String>,
}

impl ClientContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            user: None,
            session_id: Some(session_id.into()),
        }
    }

    pub fn authenticated(user: UserId, session_id: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            session_id: Some(session_id.into()),
        }
    }
}

/// Collaborators a service instance runs against
pub struct ServiceDeps {
    pub reads: Arc<dyn PhonePasswordReads>,
    pub users: Arc<dyn UserDirectory>,
    pub router: Arc<EventRouter>,
    pub triggers: TriggerQueue,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<Metrics>,
}

pub struct PhonePasswordService {
    reads: Arc<dyn PhonePasswordReads>,
    users: Arc<dyn UserDirectory>,
    router: Arc<EventRouter>,
    triggers: TriggerQueue,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    config: WorkflowConfig,
    templates: MessageTemplates,
    codes: CodeSource,
}

impl PhonePasswordService {
    pub fn new(deps: ServiceDeps, config: WorkflowConfig) -> Self {
        Self {
            reads: deps.reads,
            users: deps.users,
            router: deps.router,
            triggers: deps.triggers,
            clock: deps.clock,
            metrics: deps.metrics,
            config,
            templates: MessageTemplates::default(),
            codes: Arc::new(issuer::generate_code),
        }
    }

    pub fn with_templates(mut self, templates: MessageTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Replaces the random code generator, e.g. with a scripted sequence
    pub fn with_code_source(mut self, codes: CodeSource) -> Self {
        self.codes = codes;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Runs one workflow step, recording its outcome and latency
    async fn observe<T, F>(&self, workflow: &'static str, step: F) -> WorkflowResult<T>
    where
        F: Future<Output = WorkflowResult<T>>,
    {
        let start = Instant::now();
        let result = step.await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(_) => {
                tracing::info!(workflow, elapsed_ms = elapsed * 1000.0, "Command succeeded");
                self.metrics.record_command(workflow, "ok", elapsed);
            }
            Err(WorkflowError::Runtime(e)) => {
                tracing::error!(workflow, error = %e, "Command failed");
                self.metrics.record_command(workflow, "error", elapsed);
            }
            Err(e) => {
                tracing::info!(workflow, kind = %e.kind(), field = ?e.field_name(), "Command rejected");
                self.metrics.record_command(workflow, e.outcome(), elapsed);
            }
        }

        result
    }

    /// Hands the step's effects to the router; the phonePassword batch is the
    /// commit point
    async fn commit(&self, emission: Emission) -> WorkflowResult<()> {
        let correlation_id = Uuid::new_v4();
        self.router
            .route(emission, correlation_id)
            .await
            .map_err(WorkflowError::from_runtime)
    }

    async fn raise(&self, trigger: Trigger) -> WorkflowResult<()> {
        self.triggers.trigger(trigger).await.map_err(WorkflowError::Runtime)
    }
}

/// Parses caller input, rejecting it as `invalid` on the named field
fn parse_phone(raw: &str, field: &'static str) -> WorkflowResult<PhoneNumber> {
    PhoneNumber::parse(raw).map_err(|_| WorkflowError::field(field, ErrorKind::Invalid))
}

fn reject<T>(kind: ErrorKind) -> WorkflowResult<T> {
    Err(WorkflowError::Rejected(kind))
}
