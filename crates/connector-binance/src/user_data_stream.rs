//! User data stream consumer.
//!
//! Keeps one private WebSocket open per process and reconciles execution
//! reports into the order store. Each connection runs three tasks:
//!
//! - **reader**: decodes messages and applies them to the store
//! - **writer**: sends the liveness ping every 3 minutes and answers pings
//! - **keepalive**: extends the listen key every 30 minutes
//!
//! The tasks share one [`CancellationToken`]. Whichever fails first cancels
//! it and the rest unwind; an external shutdown cancels it the same way,
//! after which the writer sends a close frame and the reader gets a short
//! grace period to drain.
//!
//! Handles listen key lifecycle (creation, refresh, expiry, close).

use crate::client::{connect_with_timeout, ConnectResult, WsStream, STABLE_CONNECTION_THRESHOLD};
use crate::reconcile::{reconcile, ReconcilePolicy};
use crate::session::ListenKeyProvider;
use crate::user_data_parser::{parse_user_data_message, UserDataMessage};
use common::{BinanceEnvironment, ExponentialBackoff};
use connector_core::{shutdown_requested, sleep_or_shutdown, ConnectorError, StreamState};
use execution_core::ExecutionReport;
use futures_util::stream::SplitStream;
use futures_util::{Sink, SinkExt, StreamExt};
use metrics::SharedMetrics;
use order_store::SharedOrderStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Listen keys expire after 60 minutes; refresh at half that.
pub const LISTEN_KEY_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Liveness ping period on the private stream.
pub const PING_INTERVAL: Duration = Duration::from_secs(3 * 60);

/// How long the reader may drain after a close frame was sent.
pub const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ExecutionStreamConfig {
    pub ws_base_url: String,
    /// Must be non-zero.
    pub keepalive_interval: Duration,
    /// Must be non-zero.
    pub ping_interval: Duration,
    pub connect_timeout: Duration,
    pub close_grace: Duration,
    pub backoff: ExponentialBackoff,
    pub reconcile_policy: ReconcilePolicy,
}

impl Default for ExecutionStreamConfig {
    fn default() -> Self {
        Self::for_environment(BinanceEnvironment::default())
    }
}

impl ExecutionStreamConfig {
    pub fn for_environment(environment: BinanceEnvironment) -> Self {
        Self {
            ws_base_url: environment.ws_base_url().to_string(),
            keepalive_interval: LISTEN_KEY_KEEPALIVE_INTERVAL,
            ping_interval: PING_INTERVAL,
            connect_timeout: Duration::from_secs(30),
            close_grace: CLOSE_GRACE,
            backoff: ExponentialBackoff::default(),
            reconcile_policy: ReconcilePolicy::default(),
        }
    }

    pub fn with_ws_base_url(mut self, url: impl Into<String>) -> Self {
        self.ws_base_url = url.into();
        self
    }

    pub fn with_reconcile_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.reconcile_policy = policy;
        self
    }

    fn stream_url(&self, listen_key: &str) -> String {
        format!("{}/ws/{}", self.ws_base_url, listen_key)
    }
}

/// How one of the per-connection tasks finished.
#[derive(Debug)]
enum TaskEnd {
    /// Stopped because the session token was cancelled.
    Cancelled,
    /// The exchange no longer knows the listen key.
    ListenKeyExpired,
    Failed(ConnectorError),
}

/// Result of a user data stream session.
#[derive(Debug)]
enum SessionResult {
    /// Shutdown was requested
    Shutdown,
    /// Listen key expired; reconnect with a fresh one, no backoff
    ListenKeyExpired,
    /// Read, ping or pong failure
    Failed(ConnectorError),
}

/// The private execution stream consumer.
pub struct ExecutionStream {
    config: ExecutionStreamConfig,
    listen_keys: Arc<dyn ListenKeyProvider>,
    store: SharedOrderStore,
    metrics: SharedMetrics,
    state_tx: watch::Sender<StreamState>,
}

impl ExecutionStream {
    pub fn new(
        config: ExecutionStreamConfig,
        listen_keys: Arc<dyn ListenKeyProvider>,
        store: SharedOrderStore,
        metrics: SharedMetrics,
    ) -> Self {
        let (state_tx, _) = watch::channel(StreamState::Disconnected);
        Self {
            config,
            listen_keys,
            store,
            metrics,
            state_tx,
        }
    }

    /// Observe `Disconnected → Connecting → Streaming` transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: StreamState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Execution stream state changed");
        }
    }

    /// Run until `true` is published on `shutdown_rx`.
    ///
    /// Listen-key and connection failures are retried with backoff; this
    /// only returns once shutdown has been handled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), ConnectorError> {
        let mut backoff = self.config.backoff.restarted();
        let mut connected_before = false;

        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown requested, exiting execution stream");
                self.set_state(StreamState::Disconnected);
                return Ok(());
            }

            self.set_state(StreamState::Connecting);

            let listen_key = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown_rx) => {
                    self.set_state(StreamState::Disconnected);
                    return Ok(());
                }
                result = self.listen_keys.create_listen_key() => result,
            };
            let listen_key = match listen_key {
                Ok(key) => key,
                Err(e) => {
                    let error = ConnectorError::Session(e.to_string());
                    self.metrics.inc_connection_failures();
                    self.set_state(StreamState::Disconnected);

                    let delay = backoff.next_delay();
                    warn!(
                        error = %error,
                        attempt = backoff.attempt(),
                        delay_secs = delay.as_secs_f64(),
                        "Failed to create listen key, retrying"
                    );
                    if sleep_or_shutdown(delay, &mut shutdown_rx).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            let url = self.config.stream_url(&listen_key);
            let ws_stream =
                match connect_with_timeout(&url, self.config.connect_timeout, &mut shutdown_rx)
                    .await
                {
                    ConnectResult::Connected(stream) => stream,
                    ConnectResult::Shutdown => {
                        self.close_listen_key(&listen_key).await;
                        self.set_state(StreamState::Disconnected);
                        return Ok(());
                    }
                    ConnectResult::Error(e) => {
                        self.metrics.inc_connection_failures();
                        self.set_state(StreamState::Disconnected);
                        self.close_listen_key(&listen_key).await;

                        let delay = backoff.next_delay();
                        warn!(
                            error = %e,
                            attempt = backoff.attempt(),
                            delay_secs = delay.as_secs_f64(),
                            "Execution stream connection failed, retrying"
                        );
                        if sleep_or_shutdown(delay, &mut shutdown_rx).await {
                            return Ok(());
                        }
                        continue;
                    }
                };

            info!("Connected to user data stream");
            if connected_before {
                self.metrics.inc_reconnect_successes();
            }
            connected_before = true;
            self.metrics.mark_connected();
            self.set_state(StreamState::Streaming);
            let connected_at = Instant::now();

            let result = self.run_session(ws_stream, &listen_key, &mut shutdown_rx).await;

            self.metrics.mark_disconnected();
            self.set_state(StreamState::Disconnected);

            match result {
                SessionResult::Shutdown => {
                    self.close_listen_key(&listen_key).await;
                    info!("Execution stream shutdown complete");
                    return Ok(());
                }
                SessionResult::ListenKeyExpired => {
                    info!("Listen key expired, creating new one");
                    self.metrics.inc_reconnect_attempts();
                }
                SessionResult::Failed(error) => {
                    // The next attempt creates a new key.
                    self.close_listen_key(&listen_key).await;
                    if connected_at.elapsed() >= STABLE_CONNECTION_THRESHOLD {
                        backoff.reset();
                    }
                    self.metrics.inc_reconnect_attempts();

                    let delay = backoff.next_delay();
                    warn!(
                        error = %error,
                        attempt = backoff.attempt(),
                        delay_secs = delay.as_secs_f64(),
                        "Execution stream lost, reconnecting"
                    );
                    if sleep_or_shutdown(delay, &mut shutdown_rx).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn close_listen_key(&self, listen_key: &str) {
        if let Err(e) = self.listen_keys.close_listen_key(listen_key).await {
            warn!(error = %e, "Failed to close listen key");
        }
    }

    /// Run one connection until shutdown or the first task failure.
    async fn run_session(
        &self,
        ws_stream: WsStream,
        listen_key: &str,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SessionResult {
        let token = CancellationToken::new();
        let (write, read) = ws_stream.split();
        let (pong_tx, pong_rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(
            Reader {
                store: Arc::clone(&self.store),
                policy: self.config.reconcile_policy,
                metrics: Arc::clone(&self.metrics),
                pong_tx,
                token: token.clone(),
                close_grace: self.config.close_grace,
            }
            .run(read),
        );
        let writer = tokio::spawn(
            Writer {
                ping_interval: self.config.ping_interval,
                close_grace: self.config.close_grace,
                pong_rx,
                metrics: Arc::clone(&self.metrics),
                token: token.clone(),
            }
            .run(write),
        );
        let keepalive = tokio::spawn(
            KeepAlive {
                listen_keys: Arc::clone(&self.listen_keys),
                listen_key: listen_key.to_string(),
                interval: self.config.keepalive_interval,
                metrics: Arc::clone(&self.metrics),
                token: token.clone(),
            }
            .run(),
        );

        let shutdown = tokio::select! {
            biased;
            _ = shutdown_requested(shutdown_rx) => {
                info!("Shutdown signal received, closing user data stream");
                true
            }
            _ = token.cancelled() => false,
        };
        token.cancel();

        let (reader_end, writer_end, keepalive_end) =
            tokio::join!(join_task(reader), join_task(writer), join_task(keepalive));

        if shutdown {
            return SessionResult::Shutdown;
        }

        let ends = [keepalive_end, writer_end, reader_end];
        if ends.iter().any(|end| matches!(end, TaskEnd::ListenKeyExpired)) {
            return SessionResult::ListenKeyExpired;
        }
        let error = ends
            .into_iter()
            .find_map(|end| match end {
                TaskEnd::Failed(e) => Some(e),
                _ => None,
            })
            .unwrap_or(ConnectorError::ConnectionClosed);
        SessionResult::Failed(error)
    }
}

async fn join_task(handle: JoinHandle<TaskEnd>) -> TaskEnd {
    match handle.await {
        Ok(end) => end,
        Err(e) => TaskEnd::Failed(ConnectorError::WebSocket(format!("stream task failed: {e}"))),
    }
}

/// First tick one full period from now.
fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

struct Reader {
    store: SharedOrderStore,
    policy: ReconcilePolicy,
    metrics: SharedMetrics,
    /// Ping payloads the writer must echo.
    pong_tx: mpsc::UnboundedSender<Vec<u8>>,
    token: CancellationToken,
    close_grace: Duration,
}

impl Reader {
    async fn run(self, mut read: SplitStream<WsStream>) -> TaskEnd {
        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => {
                    self.drain(&mut read).await;
                    return TaskEnd::Cancelled;
                }

                msg_opt = read.next() => match msg_opt {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text).await,
                    Some(Ok(Message::Ping(data))) => {
                        debug!("Received Ping, queueing Pong");
                        let _ = self.pong_tx.send(data);
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("User data stream closed by server");
                        self.token.cancel();
                        return TaskEnd::Failed(ConnectorError::ConnectionClosed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "User data stream error");
                        self.metrics.inc_websocket_errors();
                        self.token.cancel();
                        return TaskEnd::Failed(ConnectorError::WebSocket(e.to_string()));
                    }
                    None => {
                        info!("User data stream ended");
                        self.token.cancel();
                        return TaskEnd::Failed(ConnectorError::ConnectionClosed);
                    }
                },
            }
        }
    }

    /// Keep applying reports until the server acknowledges the close or the
    /// grace period runs out.
    async fn drain(&self, read: &mut SplitStream<WsStream>) {
        let drained = tokio::time::timeout(self.close_grace, async {
            while let Some(Ok(msg)) = read.next().await {
                match msg {
                    Message::Text(text) => self.handle_text(&text).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        })
        .await;

        if drained.is_err() {
            debug!("Close grace period elapsed before the server closed");
        }
    }

    async fn handle_text(&self, text: &str) {
        self.metrics.inc_messages_received();

        match parse_user_data_message(text) {
            Ok(UserDataMessage::ExecutionReport(report)) => self.apply(report).await,
            Ok(UserDataMessage::Unknown) => {}
            Err(e) => {
                self.metrics.inc_parse_errors();
                warn!(error = %e, text = %text, "Failed to parse user data message");
            }
        }
    }

    async fn apply(&self, report: ExecutionReport) {
        self.metrics.inc_execution_reports();
        debug!(
            order_id = report.order_id,
            client_order_id = %report.client_order_id,
            execution_type = ?report.execution_type,
            status = %report.order_status,
            "Received execution report"
        );

        match reconcile(self.store.as_ref(), &report, self.policy).await {
            Ok(Some(outcome)) if outcome.modified > 0 => self.metrics.inc_fills_reconciled(),
            Ok(_) => {}
            Err(e) => {
                error!(
                    order_id = report.order_id,
                    error = %e,
                    "Failed to persist execution report"
                );
            }
        }
    }
}

struct Writer {
    ping_interval: Duration,
    close_grace: Duration,
    pong_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    metrics: SharedMetrics,
    token: CancellationToken,
}

impl Writer {
    async fn run<S>(mut self, mut write: S) -> TaskEnd
    where
        S: Sink<Message, Error = WsError> + Unpin,
    {
        let mut ping = periodic(self.ping_interval);

        let end = loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => break TaskEnd::Cancelled,

                Some(data) = self.pong_rx.recv() => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        warn!(error = %e, "Failed to send Pong");
                        self.metrics.inc_websocket_errors();
                        break TaskEnd::Failed(ConnectorError::WebSocket(e.to_string()));
                    }
                }

                _ = ping.tick() => {
                    debug!("Sending liveness ping");
                    if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                        error!(error = %e, "Failed to send ping");
                        self.metrics.inc_websocket_errors();
                        break TaskEnd::Failed(ConnectorError::WebSocket(e.to_string()));
                    }
                }
            }
        };

        self.token.cancel();
        if matches!(end, TaskEnd::Cancelled) {
            match tokio::time::timeout(self.close_grace, write.close()).await {
                Ok(Ok(())) => debug!("Close frame sent"),
                Ok(Err(e)) => debug!(error = %e, "Close frame not sent"),
                Err(_) => debug!("Timed out sending close frame"),
            }
        }
        end
    }
}

struct KeepAlive {
    listen_keys: Arc<dyn ListenKeyProvider>,
    listen_key: String,
    interval: Duration,
    metrics: SharedMetrics,
    token: CancellationToken,
}

impl KeepAlive {
    async fn run(self) -> TaskEnd {
        let mut keepalive = periodic(self.interval);

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => return TaskEnd::Cancelled,

                _ = keepalive.tick() => {
                    let result = tokio::select! {
                        biased;
                        _ = self.token.cancelled() => return TaskEnd::Cancelled,
                        result = self.listen_keys.keepalive_listen_key(&self.listen_key) => result,
                    };

                    match result {
                        Ok(()) => debug!("Listen key refreshed"),
                        Err(e) if e.is_listen_key_expired() => {
                            warn!(error = %e, "Listen key expired during refresh");
                            self.token.cancel();
                            return TaskEnd::ListenKeyExpired;
                        }
                        Err(e) => {
                            self.metrics.inc_keepalive_failures();
                            warn!(error = %e, "Failed to refresh listen key, will retry");
                        }
                    }
                }
            }
        }
    }
}
