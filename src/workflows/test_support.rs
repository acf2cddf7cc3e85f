use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::clock::{Clock, ManualClock};
use crate::config::{ServiceConfig, WorkflowConfig};
use crate::domain::credential::PhoneNumber;
use crate::domain::verification::{ActionKind, VerificationCode};
use crate::metrics::Metrics;
use crate::runtime::{InMemoryRuntime, InMemoryStack, PhonePasswordReads};
use crate::triggers::TriggerWorker;
use super::PhonePasswordService;

/// Service on an in-memory runtime with a clock that only moves on demand
pub(crate) struct Harness {
    pub runtime: Arc<InMemoryRuntime>,
    pub service: PhonePasswordService,
    pub worker: TriggerWorker,
    pub clock: Arc<ManualClock>,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub async fn new() -> Self {
        let config = ServiceConfig {
            workflow: WorkflowConfig::default(),
            trigger_queue_capacity: 64,
            metrics_port: 0,
        };
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()));
        let metrics = Arc::new(Metrics::new().unwrap());

        let stack = InMemoryStack::build(&config, clock.clone() as Arc<dyn Clock>, metrics.clone());
        Self {
            runtime: stack.runtime,
            service: stack.service,
            worker: stack.worker,
            clock,
            metrics,
        }
    }

    pub fn phone(&self, raw: &str) -> PhoneNumber {
        PhoneNumber::parse(raw).unwrap()
    }

    pub async fn drain_triggers(&mut self) -> usize {
        self.worker.drain().await
    }

    pub async fn live_codes(&self, phone: &PhoneNumber, action: ActionKind) -> Vec<VerificationCode> {
        self.runtime.live_codes(phone, action, self.clock.now()).await.unwrap()
    }

    /// The code an SMS would have delivered; expects exactly one live code
    pub async fn live_code(&self, phone: &str, action: ActionKind) -> String {
        let live = self.live_codes(&self.phone(phone), action).await;
        assert_eq!(live.len(), 1, "expected one live {} code for {}", action, phone);
        live[0].code.clone()
    }
}
