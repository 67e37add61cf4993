use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use label_delay_bot::analytics::TracingAnalytics;
use label_delay_bot::config::Settings;
use label_delay_bot::entitlements::OwnerAllowlist;
use label_delay_bot::github::TokenClientFactory;
use label_delay_bot::jobs::{MemoryQueue, QueueRunner};
use label_delay_bot::pipeline::Pipeline;
use label_delay_bot::scheduler::ActionScheduler;
use label_delay_bot::server::{AppState, build_router};
use label_delay_bot::worker::JobWorker;

/// Used when `RUST_LOG` is unset. Only names targets this binary links.
const DEFAULT_LOG_FILTER: &str = "label_delay_bot=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env().context("failed to read settings")?;

    let factory = Arc::new(
        TokenClientFactory::from_token(settings.github_token.clone())
            .context("failed to build GitHub client")?,
    );
    let queue = Arc::new(MemoryQueue::new());
    let analytics = Arc::new(TracingAnalytics);

    let shutdown = CancellationToken::new();
    let worker = JobWorker::new(factory.clone()).with_config_path(&settings.config_path);
    let runner = QueueRunner::new(
        queue.clone(),
        worker,
        analytics.clone(),
        settings.poll_interval,
    );
    let runner = tokio::spawn(runner.run(shutdown.clone()));

    let pipeline = Pipeline::new(
        factory,
        ActionScheduler::new(queue, analytics),
        Arc::new(OwnerAllowlist::new(&settings.allowed_owners)),
        settings.bot_login.clone(),
    )
    .with_config_path(&settings.config_path);
    let app = build_router(AppState::new(pipeline, settings.webhook_secret.as_bytes()));

    let listener = tokio::net::TcpListener::bind(settings.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.listen_addr))?;
    info!(addr = %settings.listen_addr, "listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await
        .context("server error")?;

    shutdown.cancel();
    runner.await.context("queue runner panicked")?;
    Ok(())
}
