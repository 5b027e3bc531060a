mod config;

use binance_rest::{BinanceRestClient, ClientConfig};
use config::GatewayConfig;
use connector_binance::{run_ticker_relay, ExecutionStream, ExecutionStreamConfig};
use connector_core::{create_tick_channel, TickerRelayConfig};
use metrics::{create_metrics, SharedMetrics};
use order_engine::OrderEngine;
use order_store::{InMemoryOrderStore, SharedOrderStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Interval for periodic health status logging.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    common::init_logging();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    info!(
        environment = ?config.environment,
        symbols = ?config.ticker_symbols,
        reconcile_policy = %config.reconcile_policy,
        "Starting order gateway"
    );

    let client_config = ClientConfig::new(config.credentials.clone(), config.environment);
    let rest_client = match BinanceRestClient::new(client_config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to build REST client");
            std::process::exit(1);
        }
    };
    if let Err(e) = rest_client.sync_time().await {
        warn!(error = %e, "Server time sync failed, signing with the local clock");
    }

    let store: SharedOrderStore = Arc::new(InMemoryOrderStore::new());
    let engine = OrderEngine::with_client(Arc::clone(&rest_client), Arc::clone(&store));

    if let Some(symbol) = config.ticker_symbols.first() {
        match engine.symbol_price(symbol).await {
            Ok(price) => info!(symbol = %symbol, price = %price, "Price oracle reachable"),
            Err(e) => warn!(symbol = %symbol, error = %e, "Price oracle check failed"),
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Execution stream
    let stream_metrics = create_metrics();
    let stream_config = ExecutionStreamConfig::for_environment(config.environment)
        .with_ws_base_url(config.ws_base_url())
        .with_reconcile_policy(config.reconcile_policy);
    let execution_stream = ExecutionStream::new(
        stream_config,
        rest_client.clone(),
        Arc::clone(&store),
        stream_metrics.clone(),
    );
    let mut state_rx = execution_stream.subscribe_state();
    let stream_shutdown_rx = shutdown_rx.clone();
    let stream_handle = tokio::spawn(async move {
        if let Err(e) = execution_stream.run(stream_shutdown_rx).await {
            error!(error = %e, "Execution stream error");
        }
    });
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            info!(state = %state, "Execution stream state");
        }
    });

    // Ticker relay
    let ticker_metrics = create_metrics();
    let relay_config = TickerRelayConfig::for_environment(config.environment)
        .with_symbols(config.ticker_symbols.clone())
        .with_ws_base_url(config.ws_base_url());
    let (tick_tx, mut tick_rx) = create_tick_channel();
    let relay_metrics = ticker_metrics.clone();
    let relay_shutdown_rx = shutdown_rx.clone();
    let relay_handle = tokio::spawn(async move {
        if let Err(e) = run_ticker_relay(relay_config, tick_tx, relay_shutdown_rx, relay_metrics).await {
            error!(error = %e, "Ticker relay error");
        }
    });

    // Spawn ctrl_c handler
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating shutdown");
            let _ = shutdown_tx_clone.send(true);
        }
    });

    // Spawn periodic health reporter
    let health_shutdown_rx = shutdown_tx.subscribe();
    let health_stream_metrics = stream_metrics.clone();
    let health_ticker_metrics = ticker_metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);
        let mut shutdown_rx = health_shutdown_rx;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    log_health("execution_stream", &health_stream_metrics);
                    log_health("ticker_relay", &health_ticker_metrics);
                }
                _ = connector_core::shutdown_requested(&mut shutdown_rx) => break,
            }
        }
    });

    // Print ticks as they arrive
    while let Some(tick) = tick_rx.recv().await {
        println!(
            "{} | {} | price: {} | change: {}%",
            tick.event_time_ms, tick.symbol, tick.price, tick.change_percent
        );
    }

    info!("Tick channel closed, waiting for streams to finish");

    let _ = relay_handle.await;
    let _ = stream_handle.await;

    println!("\nExecution stream\n{}", stream_metrics.snapshot());
    println!("Ticker relay\n{}", ticker_metrics.snapshot());

    info!("Shutdown complete");
}

fn log_health(stream: &str, metrics: &SharedMetrics) {
    let snapshot = metrics.snapshot();
    info!(
        stream = stream,
        status = %snapshot.health_status(),
        messages = snapshot.messages_received,
        execution_reports = snapshot.execution_reports,
        fills_reconciled = snapshot.fills_reconciled,
        ticks = snapshot.ticks_forwarded,
        errors = snapshot.websocket_errors + snapshot.parse_errors,
        keepalive_failures = snapshot.keepalive_failures,
        reconnects = snapshot.reconnect_attempts,
        "Health check"
    );
}
