use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use phone_password::clock::{Clock, SystemClock};
use phone_password::config::ServiceConfig;
use phone_password::domain::credential::{PasswordHash, PhoneNumber};
use phone_password::domain::verification::ActionKind;
use phone_password::metrics::{self, Metrics};
use phone_password::runtime::{InMemoryRuntime, InMemoryStack, PhonePasswordReads};
use phone_password::workflows::ClientContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,phone_password=debug"))
        )
        .init();

    tracing::info!("Starting phone-password service");

    let config = ServiceConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let system = actix_web::rt::System::new();
        if let Err(e) = system.block_on(metrics::start_metrics_server(metrics_registry, metrics_port)) {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 2. Runtime, service and trigger worker ===
    let stack = InMemoryStack::build(&config, Arc::new(SystemClock) as Arc<dyn Clock>, metrics.clone());
    let runtime = stack.runtime;
    let service = stack.service;
    tokio::spawn(stack.worker.run());

    // === 3. Credential lifecycle ===
    let client = ClientContext::with_session("demo-session");

    service.start_register("+15550001", "hash-1", json!({ "name": "Demo" })).await?;
    let code = live_code(&runtime, "+15550001", ActionKind::Register).await?;
    let user = service.finish_register("+15550001", &code, &client).await?;
    tracing::info!(%user, "Registered");

    service.login("+15550001", "hash-1", &client).await?;
    tracing::info!(%user, "Logged in");

    service.start_password_reset("+15550001").await?;
    let code = live_code(&runtime, "+15550001", ActionKind::ResetPassword).await?;
    service.finish_password_reset("+15550001", &code, "hash-2").await?;
    tracing::info!(%user, "Password reset");

    let client = ClientContext::authenticated(user, "demo-session");
    service.start_phone_change("+15550002", "hash-2", &client).await?;
    let code = live_code(&runtime, "+15550002", ActionKind::PhoneChange).await?;
    service.finish_phone_change("+15550002", &code).await?;

    service.update_password_by_user(user, "+15550002", "hash-2", "hash-3").await?;
    wait_for_hash(&runtime, "+15550002", "hash-3").await?;
    service.login("+15550002", "hash-3", &client).await?;

    for line in runtime.export_credential(&PhoneNumber::parse("+15550002")?).await? {
        tracing::debug!("{}", line);
    }

    tracing::info!("Demo complete, serving metrics on port {}", metrics_port);
    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// Stands in for the SMS gateway: the code the user would have received
async fn live_code(runtime: &InMemoryRuntime, phone: &str, action: ActionKind) -> anyhow::Result<String> {
    let phone = PhoneNumber::parse(phone)?;
    let live = runtime.live_codes(&phone, action, SystemClock.now()).await?;
    live.into_iter()
        .next()
        .map(|record| record.code)
        .ok_or_else(|| anyhow::anyhow!("no live {} code for {}", action, phone))
}

/// Waits until the trigger worker has applied a password change
async fn wait_for_hash(runtime: &InMemoryRuntime, phone: &str, hash: &str) -> anyhow::Result<()> {
    let phone = PhoneNumber::parse(phone)?;
    let expected = PasswordHash::new(hash);

    tokio::time::timeout(tokio::time::Duration::from_secs(5), async {
        loop {
            match runtime.credential(&phone).await? {
                Some(credential) if credential.password_matches(&expected) => return anyhow::Ok(()),
                _ => tokio::time::sleep(tokio::time::Duration::from_millis(20)).await,
            }
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("password change for {} not applied within 5s", phone))?
}
