//! Ticker relay: public 24hr-ticker stream to a local tick channel.

use common::ExponentialBackoff;
use connector_core::{sleep_or_shutdown, ConnectorError, TickSender, TickerRelayConfig};
use futures_util::{SinkExt, StreamExt};
use metrics::SharedMetrics;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::parser::{parse_message, ParsedMessage};

/// Duration of stable connection before resetting backoff.
pub(crate) const STABLE_CONNECTION_THRESHOLD: Duration = Duration::from_secs(300); // 5 minutes

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) fn build_stream_url(symbols: &[String], base_url: &str) -> String {
    let streams: Vec<String> = symbols
        .iter()
        .map(|symbol| format!("{}@ticker", symbol.to_lowercase()))
        .collect();

    if streams.len() == 1 {
        format!("{}/ws/{}", base_url, streams[0])
    } else {
        format!("{}/stream?streams={}", base_url, streams.join("/"))
    }
}

/// Result of a connection attempt.
pub(crate) enum ConnectResult {
    Connected(WsStream),
    Shutdown,
    Error(ConnectorError),
}

/// Attempt to connect with timeout and shutdown check.
pub(crate) async fn connect_with_timeout(
    url: &str,
    timeout: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> ConnectResult {
    if *shutdown_rx.borrow() {
        return ConnectResult::Shutdown;
    }

    tokio::select! {
        biased;

        _ = connector_core::shutdown_requested(shutdown_rx) => ConnectResult::Shutdown,

        result = tokio::time::timeout(timeout, connect_async(url)) => match result {
            Ok(Ok((stream, _))) => ConnectResult::Connected(stream),
            Ok(Err(e)) => ConnectResult::Error(ConnectorError::WebSocket(e.to_string())),
            Err(_) => ConnectResult::Error(ConnectorError::WebSocket("connection timeout".to_string())),
        },
    }
}

/// Result of a session.
enum SessionResult {
    /// Session ran and then shutdown was requested
    Shutdown,
    /// Session connected successfully (returns session duration when it ended)
    Connected {
        duration: Duration,
        error: ConnectorError,
    },
    /// Failed to connect
    ConnectFailed(ConnectorError),
}

/// Run a single WebSocket connection session.
async fn run_session(
    url: &str,
    config: &TickerRelayConfig,
    sender: &TickSender,
    shutdown_rx: &mut watch::Receiver<bool>,
    metrics: &SharedMetrics,
) -> SessionResult {
    info!(url = %url, "Connecting to ticker stream");

    let ws_stream = match connect_with_timeout(url, config.connect_timeout, shutdown_rx).await {
        ConnectResult::Connected(stream) => stream,
        ConnectResult::Shutdown => return SessionResult::Shutdown,
        ConnectResult::Error(e) => return SessionResult::ConnectFailed(e),
    };

    info!("Connected to ticker stream");
    metrics.mark_connected();
    let connected_at = Instant::now();

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;

            _ = connector_core::shutdown_requested(shutdown_rx) => {
                info!("Shutdown signal received, closing ticker stream");
                let _ = write.close().await;
                return SessionResult::Shutdown;
            }

            msg_opt = read.next() => {
                let msg = match msg_opt {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        error!(error = %e, "Ticker stream error");
                        metrics.inc_websocket_errors();
                        return SessionResult::Connected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::WebSocket(e.to_string()),
                        };
                    }
                    None => {
                        info!("Ticker stream ended");
                        return SessionResult::Connected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::ConnectionClosed,
                        };
                    }
                };

                match msg {
                    Message::Text(text) => {
                        metrics.inc_messages_received();
                        match parse_message(&text) {
                            Ok(ParsedMessage::Ticker(tick)) if config.is_interesting(&tick.symbol) => {
                                if sender.send(tick).is_err() {
                                    info!("Tick receiver dropped, stopping relay");
                                    return SessionResult::Connected {
                                        duration: connected_at.elapsed(),
                                        error: ConnectorError::ChannelClosed,
                                    };
                                }
                                metrics.inc_ticks_forwarded();
                            }
                            Ok(ParsedMessage::Ticker(tick)) => {
                                debug!(symbol = %tick.symbol, "Tick outside interest set");
                            }
                            Ok(ParsedMessage::Unknown) => {}
                            Err(e) => {
                                metrics.inc_parse_errors();
                                warn!(error = %e, "Failed to parse ticker message");
                            }
                        }
                    }
                    Message::Ping(data) => {
                        debug!("Received Ping, sending Pong");
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            warn!(error = %e, "Failed to send Pong");
                            metrics.inc_websocket_errors();
                            return SessionResult::Connected {
                                duration: connected_at.elapsed(),
                                error: ConnectorError::WebSocket(e.to_string()),
                            };
                        }
                    }
                    Message::Close(_) => {
                        info!("Ticker stream closed by server");
                        return SessionResult::Connected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::ConnectionClosed,
                        };
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Relay filtered ticks until shutdown, reconnecting with backoff.
///
/// Returns `Err(ChannelClosed)` once the tick receiver is gone, since
/// there is nobody left to relay to.
pub async fn run_ticker_relay(
    config: TickerRelayConfig,
    sender: TickSender,
    mut shutdown_rx: watch::Receiver<bool>,
    metrics: SharedMetrics,
) -> Result<(), ConnectorError> {
    let url = build_stream_url(&config.symbols, &config.ws_base_url);
    let mut backoff = ExponentialBackoff::default();
    let mut needs_reconnect = false;

    loop {
        if *shutdown_rx.borrow() {
            info!("Shutdown requested, exiting ticker relay");
            return Ok(());
        }

        let result = run_session(&url, &config, &sender, &mut shutdown_rx, &metrics).await;
        metrics.mark_disconnected();

        match result {
            SessionResult::Shutdown => {
                info!("Ticker relay shutdown complete");
                return Ok(());
            }
            SessionResult::Connected { duration, error } => {
                if needs_reconnect {
                    metrics.inc_reconnect_successes();
                }
                needs_reconnect = true;

                if matches!(error, ConnectorError::ChannelClosed) {
                    return Err(ConnectorError::ChannelClosed);
                }

                if duration >= STABLE_CONNECTION_THRESHOLD {
                    info!(
                        duration_secs = duration.as_secs(),
                        "Connection was stable, resetting backoff"
                    );
                    backoff.reset();
                }

                metrics.inc_reconnect_attempts();
                let delay = backoff.next_delay();
                warn!(
                    error = %error,
                    attempt = backoff.attempt(),
                    delay_secs = delay.as_secs_f64(),
                    "Ticker stream lost, reconnecting"
                );

                if sleep_or_shutdown(delay, &mut shutdown_rx).await {
                    info!("Shutdown requested during backoff");
                    return Ok(());
                }
            }
            SessionResult::ConnectFailed(e) => {
                metrics.inc_connection_failures();
                needs_reconnect = true;

                let delay = backoff.next_delay();
                warn!(
                    error = %e,
                    attempt = backoff.attempt(),
                    delay_secs = delay.as_secs_f64(),
                    "Ticker stream connection failed, retrying"
                );

                if sleep_or_shutdown(delay, &mut shutdown_rx).await {
                    info!("Shutdown requested during backoff");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::BinanceEnvironment;

    #[test]
    fn test_build_stream_url_single_production() {
        let symbols = vec!["BTCUSDT".to_string()];
        let url = build_stream_url(&symbols, BinanceEnvironment::Production.ws_base_url());
        assert_eq!(url, "wss://stream.binance.com:9443/ws/btcusdt@ticker");
    }

    #[test]
    fn test_build_stream_url_multiple_production() {
        let symbols = vec!["BTCUSDT".to_string(), "SOLUSDT".to_string()];
        let url = build_stream_url(&symbols, BinanceEnvironment::Production.ws_base_url());
        assert_eq!(
            url,
            "wss://stream.binance.com:9443/stream?streams=btcusdt@ticker/solusdt@ticker"
        );
    }

    #[test]
    fn test_build_stream_url_testnet() {
        let symbols = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];
        let url = build_stream_url(&symbols, BinanceEnvironment::Testnet.ws_base_url());
        assert_eq!(
            url,
            "wss://testnet.binance.vision/stream?streams=btcusdt@ticker/ethusdt@ticker"
        );
    }

    #[tokio::test]
    async fn test_connect_returns_shutdown_when_already_requested() {
        let (_tx, mut rx) = watch::channel(true);
        let result =
            connect_with_timeout("ws://127.0.0.1:9/ws", Duration::from_secs(1), &mut rx).await;
        assert!(matches!(result, ConnectResult::Shutdown));
    }
}
