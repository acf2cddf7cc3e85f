use std::sync::Arc;

use crate::clock::Clock;
use crate::config::ServiceConfig;
use crate::metrics::Metrics;
use crate::routing::EventRouter;
use crate::triggers::{TriggerQueue, TriggerWorker};
use crate::workflows::{PhonePasswordService, ServiceDeps};
use super::InMemoryRuntime;

/// Service, trigger worker and in-memory runtime wired together
pub struct InMemoryStack {
    pub runtime: Arc<InMemoryRuntime>,
    pub service: PhonePasswordService,
    pub worker: TriggerWorker,
}

impl InMemoryStack {
    pub fn build(config: &ServiceConfig, clock: Arc<dyn Clock>, metrics: Arc<Metrics>) -> Self {
        let runtime = Arc::new(InMemoryRuntime::new());
        let router = Arc::new(EventRouter::uniform(runtime.clone()).with_metrics(metrics.clone()));
        let (triggers, receiver) = TriggerQueue::channel(config.trigger_queue_capacity);

        let worker = TriggerWorker::new(receiver, runtime.clone(), router.clone(), metrics.clone());
        let service = PhonePasswordService::new(
            ServiceDeps {
                reads: runtime.clone(),
                users: runtime.clone(),
                router,
                triggers,
                clock,
                metrics,
            },
            config.workflow.clone(),
        );

        Self { runtime, service, worker }
    }
}
