//! Speed-test callback server binary
//!
//! Runs the callback listener against an in-memory scoreboard. Hosts embed
//! [`CallbackService`] instead.

use std::env;
use std::process;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use speedtest_callback::{CallbackConfig, CallbackService, MemoryScoreboard};

#[tokio::main]
async fn main() {
    let log_level = env::var("SPEEDTEST_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }

    let config = match CallbackConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            process::exit(1);
        }
    };

    let scoreboard = Arc::new(MemoryScoreboard::new());

    let service = match CallbackService::start(&config, scoreboard.clone(), scoreboard.clone()).await
    {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "Failed to start callback service");
            process::exit(1);
        }
    };

    info!(
        addr = %service.local_addr(),
        callback = %service.callback_url(),
        "Speed-test callback listening"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to wait for Ctrl-C");
    }

    info!("Shutting down");
    service.stop().await;

    match scoreboard.delivery_count() {
        Ok(count) => info!(deliveries = count, "Stopped"),
        Err(e) => error!(error = %e, "Scoreboard unavailable"),
    }
}
