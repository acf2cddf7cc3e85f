// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Workflow commands (outcome by error kind, latency)
// - Events routed per target stream
// - Verification codes issued and redeemed per action
// - Trigger processing
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Command Metrics
    pub commands_total: IntCounterVec,
    pub command_duration: HistogramVec,

    // Routing Metrics
    pub events_emitted: IntCounterVec,

    // Verification Code Metrics
    pub codes_issued: IntCounterVec,
    pub codes_redeemed: IntCounterVec,

    // Trigger Metrics
    pub triggers_processed: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Command Metrics
        let commands_total = IntCounterVec::new(
            Opts::new("phone_password_commands_total", "Total workflow commands by outcome"),
            &["workflow", "outcome"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("phone_password_command_duration_seconds", "Workflow command duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["workflow"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        // Routing Metrics
        let events_emitted = IntCounterVec::new(
            Opts::new("phone_password_events_emitted_total", "Total events delivered per target stream"),
            &["stream"],
        )?;
        registry.register(Box::new(events_emitted.clone()))?;

        // Verification Code Metrics
        let codes_issued = IntCounterVec::new(
            Opts::new("phone_password_codes_issued_total", "Total verification codes issued"),
            &["action"],
        )?;
        registry.register(Box::new(codes_issued.clone()))?;

        let codes_redeemed = IntCounterVec::new(
            Opts::new("phone_password_codes_redeemed_total", "Total verification codes redeemed"),
            &["action"],
        )?;
        registry.register(Box::new(codes_redeemed.clone()))?;

        // Trigger Metrics
        let triggers_processed = IntCounterVec::new(
            Opts::new("phone_password_triggers_processed_total", "Total triggers handled by the worker"),
            &["trigger", "outcome"],
        )?;
        registry.register(Box::new(triggers_processed.clone()))?;

        Ok(Self {
            registry,
            commands_total,
            command_duration,
            events_emitted,
            codes_issued,
            codes_redeemed,
            triggers_processed,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a finished workflow command
    pub fn record_command(&self, workflow: &str, outcome: &str, duration_secs: f64) {
        self.commands_total.with_label_values(&[workflow, outcome]).inc();
        self.command_duration.with_label_values(&[workflow]).observe(duration_secs);
    }

    /// Helper to record a delivered batch
    pub fn record_events(&self, stream: &str, count: usize) {
        self.events_emitted.with_label_values(&[stream]).inc_by(count as u64);
    }

    pub fn record_code_issued(&self, action: &str) {
        self.codes_issued.with_label_values(&[action]).inc();
    }

    pub fn record_code_redeemed(&self, action: &str) {
        self.codes_redeemed.with_label_values(&[action]).inc();
    }

    pub fn record_trigger(&self, trigger: &str, outcome: &str) {
        self.triggers_processed.with_label_values(&[trigger, outcome]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command("login", "ok", 0.01);
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_command() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command("login", "ok", 0.05);
        metrics.record_command("login", "wrongPassword", 0.01);
        metrics.record_command("login", "ok", 0.02);

        assert_eq!(metrics.commands_total.with_label_values(&["login", "ok"]).get(), 2);
        assert_eq!(metrics.commands_total.with_label_values(&["login", "wrongPassword"]).get(), 1);
        assert_eq!(metrics.command_duration.with_label_values(&["login"]).get_sample_count(), 3);
    }

    #[test]
    fn test_record_events_counts_batch_size() {
        let metrics = Metrics::new().unwrap();
        metrics.record_events("phonePassword", 2);
        metrics.record_events("users", 1);
        metrics.record_events("phonePassword", 1);

        assert_eq!(metrics.events_emitted.with_label_values(&["phonePassword"]).get(), 3);
        assert_eq!(metrics.events_emitted.with_label_values(&["users"]).get(), 1);
    }

    #[test]
    fn test_code_and_trigger_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_code_issued("register");
        metrics.record_code_redeemed("register");
        metrics.record_trigger("passwordChanged", "ok");

        let gathered = metrics.registry.gather();
        assert!(gathered.iter().any(|m| m.name() == "phone_password_codes_issued_total"));
        assert_eq!(metrics.triggers_processed.with_label_values(&["passwordChanged", "ok"]).get(), 1);
    }
}
