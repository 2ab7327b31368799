//! bookingsync - booking reconciliation server
//!
//! Main entry point: loads configuration, starts the watch renewal scheduler
//! and serves the HTTP API until interrupted.

use std::sync::Arc;

use anyhow::Context;
use bookingsync_api::utils::logging::init_tracing;
use bookingsync_api::{router, AppContext};
use bookingsync_infra::{WatchRenewalConfig, WatchRenewalScheduler};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = bookingsync_infra::config::load().context("failed to load configuration")?;
    let bind_addr = config.server.bind_addr.clone();
    let renewal = WatchRenewalConfig::from_calendar_config(&config.calendar);

    let ctx = Arc::new(
        AppContext::new_with_config(config).await.context("failed to initialise application")?,
    );

    let mut scheduler = WatchRenewalScheduler::new(renewal, Arc::clone(&ctx.service));
    scheduler.start().await.context("failed to start watch renewal scheduler")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "bookingsync listening");

    axum::serve(listener, router(ctx)).with_graceful_shutdown(shutdown_signal()).await?;

    if let Err(err) = scheduler.stop().await {
        warn!(error = %err, "Watch renewal scheduler did not stop cleanly");
    }
    info!("bookingsync stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
