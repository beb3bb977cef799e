mod api;
mod bootstrap;
mod documents;
mod health;

use std::time::Duration;

use anyhow::Result;
use propquote_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use propquote_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap emits its lifecycle events.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = api::router(app.api_state.clone())
        .merge(health::router(health::HealthState::new(app.db_pool.clone(), app.pdf_enabled)));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        pdf_enabled = app.pdf_enabled,
        "propquote-server listening"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "propquote-server stopping"
    );
    let drain = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let audit_writer = app.audit_writer;
    let db_pool = app.db_pool;
    let closed = tokio::time::timeout(drain, async {
        let written = audit_writer.shutdown().await;
        tracing::info!(
            event_name = "system.server.audit_flushed",
            correlation_id = "shutdown",
            written,
            "audit trail flushed"
        );
        db_pool.close().await;
    })
    .await;
    if closed.is_err() {
        tracing::warn!(
            event_name = "system.server.drain_timeout",
            correlation_id = "shutdown",
            timeout_secs = drain.as_secs(),
            "audit trail or database pool did not close before the shutdown deadline"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}
