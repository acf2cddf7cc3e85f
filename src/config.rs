use anyhow::{Context, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

const PREFIX: &str = "PHONE_PASSWORD_";

/// Code lifetimes used by the workflows
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub register_code_ttl: Duration,
    /// Expiry extension applied by a register-code resend
    pub register_code_prolong: Duration,
    pub reset_code_ttl: Duration,
    pub phone_change_code_ttl: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            register_code_ttl: Duration::minutes(10),
            register_code_prolong: Duration::hours(10),
            reset_code_ttl: Duration::hours(24),
            phone_change_code_ttl: Duration::hours(24),
        }
    }
}

/// Service configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub workflow: WorkflowConfig,
    pub trigger_queue_capacity: usize,
    pub metrics_port: u16,
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an injected variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |suffix: &str, default: i64| -> Result<Duration> {
            let value: i64 = read(&lookup, suffix, default)?;
            if value <= 0 {
                anyhow::bail!("{}{} must be a positive number of seconds", PREFIX, suffix);
            }
            Ok(Duration::seconds(value))
        };

        let workflow = WorkflowConfig {
            register_code_ttl: secs("REGISTER_CODE_TTL_SECS", 600)?,
            register_code_prolong: secs("REGISTER_CODE_PROLONG_SECS", 36_000)?,
            reset_code_ttl: secs("RESET_CODE_TTL_SECS", 86_400)?,
            phone_change_code_ttl: secs("PHONE_CHANGE_CODE_TTL_SECS", 86_400)?,
        };

        let trigger_queue_capacity: usize = read(&lookup, "TRIGGER_QUEUE_CAPACITY", 1024)?;
        if trigger_queue_capacity == 0 {
            anyhow::bail!("{}TRIGGER_QUEUE_CAPACITY must be greater than zero", PREFIX);
        }

        Ok(Self {
            workflow,
            trigger_queue_capacity,
            metrics_port: read(&lookup, "METRICS_PORT", 9090)?,
        })
    }
}

fn read<F, T>(lookup: &F, suffix: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let key = format!("{}{}", PREFIX, suffix);
    match lookup(&key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.workflow, WorkflowConfig::default());
        assert_eq!(config.workflow.register_code_ttl, Duration::seconds(600));
        assert_eq!(config.trigger_queue_capacity, 1024);
        assert_eq!(config.metrics_port, 9090);
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("PHONE_PASSWORD_REGISTER_CODE_TTL_SECS", "60"),
            ("PHONE_PASSWORD_METRICS_PORT", " 9100 "),
        ]))
        .unwrap();
        assert_eq!(config.workflow.register_code_ttl, Duration::seconds(60));
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let err = ServiceConfig::from_lookup(lookup_from(&[("PHONE_PASSWORD_RESET_CODE_TTL_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("PHONE_PASSWORD_RESET_CODE_TTL_SECS"));

        assert!(ServiceConfig::from_lookup(lookup_from(&[("PHONE_PASSWORD_RESET_CODE_TTL_SECS", "0")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup_from(&[("PHONE_PASSWORD_TRIGGER_QUEUE_CAPACITY", "0")])).is_err());
    }
}
