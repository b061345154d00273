use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;

mod quake_logic;
use quake_logic::{config, downstream, logger};

use lib_common::core::FeedState;
use lib_common::ingestors::UsgsPollingPlugin;
use lib_common::seismic::ApiCallUsgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Explicitly install the default crypto provider for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();
    dotenvy::dotenv().ok();

    let config = config::load_config();
    logger::setup_logging(&config.log_dir(), &config.log_level())?;

    let usgs_settings = config.usgs_settings();
    let source = ApiCallUsgs::new(&usgs_settings)
        .with_context(|| format!("Invalid USGS base URL {}", usgs_settings.base_url))?;
    let state = FeedState::new(Arc::new(source), config.feed_settings());

    // Nothing is served until every window has been seen once.
    state.bootstrap().await.context("Failed to initialize earthquake data")?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let poller = UsgsPollingPlugin::new(state.clone());
    let poller_shutdown = shutdown_tx.subscribe();
    let poller_handle = tokio::spawn(async move { poller.run(poller_shutdown).await });

    let mut downstream_handle = tokio::spawn(downstream::run(
        config.clone(),
        state.clone(),
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal, or for the listener to die on its own
    let early_exit = tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
            None
        }
        _ = terminate() => {
            log::info!("SIGTERM received, initiating shutdown.");
            None
        }
        res = &mut downstream_handle => Some(res),
    };

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    let downstream_result = match early_exit {
        Some(res) => res,
        None => downstream_handle.await,
    };
    let _ = poller_handle.await;

    downstream_result.context("Downstream task panicked")??;
    log::info!("Shutdown complete.");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut term_signal) => {
            term_signal.recv().await;
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    // On non-unix platforms, just wait forever.
    std::future::pending::<()>().await;
}
