use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::credential::{CredentialAggregate, CredentialCommand, DeletionReason};
use crate::event_sourcing::Aggregate;
use crate::metrics::Metrics;
use crate::routing::{Emission, EventRouter};
use crate::runtime::PhonePasswordReads;
use super::Trigger;

// ============================================================================
// Trigger Worker
// ============================================================================
//
// Consumes the trigger queue one intent at a time. Handling is best effort:
// a failed trigger is logged and counted, never retried here.
//
// ============================================================================

pub struct TriggerWorker {
    receiver: mpsc::Receiver<Trigger>,
    reads: Arc<dyn PhonePasswordReads>,
    router: Arc<EventRouter>,
    metrics: Arc<Metrics>,
}

impl TriggerWorker {
    pub fn new(
        receiver: mpsc::Receiver<Trigger>,
        reads: Arc<dyn PhonePasswordReads>,
        router: Arc<EventRouter>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { receiver, reads, router, metrics }
    }

    /// Runs until every queue sender is dropped
    pub async fn run(mut self) {
        tracing::info!("🎯 TriggerWorker started");
        while let Some(trigger) = self.receiver.recv().await {
            self.process(trigger).await;
        }
        tracing::info!("🛑 TriggerWorker stopped - queue closed");
    }

    /// Handles every trigger already queued, without waiting for more
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(trigger) = self.receiver.try_recv() {
            self.process(trigger).await;
            handled += 1;
        }
        handled
    }

    async fn process(&self, trigger: Trigger) {
        let name = trigger.name();
        let user = trigger.user();

        match self.handle(trigger).await {
            Ok(0) => {
                tracing::warn!(trigger = name, %user, "Trigger matched no credentials");
                self.metrics.record_trigger(name, "noop");
            }
            Ok(count) => {
                tracing::info!(trigger = name, %user, credentials = count, "✅ Trigger handled");
                self.metrics.record_trigger(name, "ok");
            }
            Err(e) => {
                tracing::error!(trigger = name, %user, error = %e, "Trigger failed");
                self.metrics.record_trigger(name, "error");
            }
        }
    }

    /// Re-derives concrete credential events for the trigger and routes
    /// them. Returns how many credentials were addressed.
    pub async fn handle(&self, trigger: Trigger) -> Result<usize> {
        let (user, command) = match trigger {
            Trigger::PasswordChanged { user, password_hash } => {
                (user, CredentialCommand::UpdatePassword { password_hash })
            }
            Trigger::UserDeleted { user } => {
                (user, CredentialCommand::Delete { reason: DeletionReason::UserDeleted })
            }
        };

        let credentials = self.reads.credentials_by_user(&user).await?;
        let mut emission = Emission::new();
        for credential in &credentials {
            let events = CredentialAggregate::decide(Some(credential), &command)?;
            emission = emission.credentials(&credential.phone, events);
        }

        self.router.route(emission, Uuid::new_v4()).await?;
        Ok(credentials.len())
    }
}
