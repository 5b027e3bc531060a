use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe counters for one stream (private execution stream or ticker relay).
#[derive(Debug)]
pub struct StreamMetrics {
    // Counters
    messages_received: AtomicU64,
    parse_errors: AtomicU64,
    websocket_errors: AtomicU64,
    connection_failures: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_successes: AtomicU64,
    execution_reports: AtomicU64,
    fills_reconciled: AtomicU64,
    ticks_forwarded: AtomicU64,
    keepalive_failures: AtomicU64,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_message_time: Option<Instant>,
    last_error_time: Option<Instant>,
    /// `None` while streaming.
    disconnected_since: Option<Instant>,
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamMetrics {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            messages_received: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            websocket_errors: AtomicU64::new(0),
            connection_failures: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            reconnect_successes: AtomicU64::new(0),
            execution_reports: AtomicU64::new(0),
            fills_reconciled: AtomicU64::new(0),
            ticks_forwarded: AtomicU64::new(0),
            keepalive_failures: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: now,
                last_message_time: None,
                last_error_time: None,
                disconnected_since: Some(now),
            }),
        }
    }

    // --- Connection state ---

    pub fn mark_connected(&self) {
        self.inner.write().disconnected_since = None;
    }

    pub fn mark_disconnected(&self) {
        let mut inner = self.inner.write();
        if inner.disconnected_since.is_none() {
            inner.disconnected_since = Some(Instant::now());
        }
    }

    // --- Increment methods ---

    pub fn inc_messages_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_message_time = Some(Instant::now());
    }

    pub fn inc_parse_errors(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_websocket_errors(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_connection_failures(&self) {
        self.connection_failures.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconnect_successes(&self) {
        self.reconnect_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_execution_reports(&self) {
        self.execution_reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fills_reconciled(&self) {
        self.fills_reconciled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ticks_forwarded(&self) {
        self.ticks_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_keepalive_failures(&self) {
        self.keepalive_failures.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    // --- Getter methods ---

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    pub fn websocket_errors(&self) -> u64 {
        self.websocket_errors.load(Ordering::Relaxed)
    }

    pub fn connection_failures(&self) -> u64 {
        self.connection_failures.load(Ordering::Relaxed)
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    pub fn reconnect_successes(&self) -> u64 {
        self.reconnect_successes.load(Ordering::Relaxed)
    }

    pub fn execution_reports(&self) -> u64 {
        self.execution_reports.load(Ordering::Relaxed)
    }

    pub fn fills_reconciled(&self) -> u64 {
        self.fills_reconciled.load(Ordering::Relaxed)
    }

    pub fn ticks_forwarded(&self) -> u64 {
        self.ticks_forwarded.load(Ordering::Relaxed)
    }

    pub fn keepalive_failures(&self) -> u64 {
        self.keepalive_failures.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_message(&self) -> Option<f64> {
        self.inner
            .read()
            .last_message_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_error(&self) -> Option<f64> {
        self.inner
            .read()
            .last_error_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// How long the stream has been down; `None` while connected.
    pub fn secs_disconnected(&self) -> Option<f64> {
        self.inner
            .read()
            .disconnected_since
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received(),
            parse_errors: self.parse_errors(),
            websocket_errors: self.websocket_errors(),
            connection_failures: self.connection_failures(),
            reconnect_attempts: self.reconnect_attempts(),
            reconnect_successes: self.reconnect_successes(),
            execution_reports: self.execution_reports(),
            fills_reconciled: self.fills_reconciled(),
            ticks_forwarded: self.ticks_forwarded(),
            keepalive_failures: self.keepalive_failures(),
            uptime_secs: self.uptime_secs(),
            secs_since_last_message: self.secs_since_last_message(),
            secs_since_last_error: self.secs_since_last_error(),
            secs_disconnected: self.secs_disconnected(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub parse_errors: u64,
    pub websocket_errors: u64,
    pub connection_failures: u64,
    pub reconnect_attempts: u64,
    pub reconnect_successes: u64,
    pub execution_reports: u64,
    pub fills_reconciled: u64,
    pub ticks_forwarded: u64,
    pub keepalive_failures: u64,
    pub uptime_secs: f64,
    pub secs_since_last_message: Option<f64>,
    pub secs_since_last_error: Option<f64>,
    pub secs_disconnected: Option<f64>,
}

/// Health status of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Connected, or still inside the startup grace period.
    Healthy,
    /// Down for a short while, most likely reconnecting.
    Degraded,
    /// Down for an extended period.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    const DEGRADED_THRESHOLD_SECS: f64 = 30.0;
    const UNHEALTHY_THRESHOLD_SECS: f64 = 60.0;

    /// Health from connectivity alone.
    ///
    /// The private stream can be silent for hours, so message freshness
    /// is reported but not judged.
    pub fn health_status(&self) -> HealthStatus {
        let Some(down_secs) = self.secs_disconnected else {
            return HealthStatus::Healthy;
        };

        // Never connected yet and still starting up.
        if self.reconnect_attempts == 0
            && self.connection_failures == 0
            && self.uptime_secs < Self::DEGRADED_THRESHOLD_SECS
        {
            return HealthStatus::Healthy;
        }

        if down_secs > Self::UNHEALTHY_THRESHOLD_SECS {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Uptime:              {:.1}s", self.uptime_secs)?;
        writeln!(f, "Messages received:   {}", self.messages_received)?;
        writeln!(f, "Execution reports:   {}", self.execution_reports)?;
        writeln!(f, "Fills reconciled:    {}", self.fills_reconciled)?;
        writeln!(f, "Ticks forwarded:     {}", self.ticks_forwarded)?;
        writeln!(f, "Parse errors:        {}", self.parse_errors)?;
        writeln!(f, "WebSocket errors:    {}", self.websocket_errors)?;
        writeln!(f, "Connection failures: {}", self.connection_failures)?;
        writeln!(f, "Keep-alive failures: {}", self.keepalive_failures)?;
        writeln!(f, "Reconnect attempts:  {}", self.reconnect_attempts)?;
        writeln!(f, "Reconnect successes: {}", self.reconnect_successes)?;
        if let Some(secs) = self.secs_disconnected {
            writeln!(f, "Disconnected for:    {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_message {
            writeln!(f, "Since last message:  {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_error {
            writeln!(f, "Since last error:    {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<StreamMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(StreamMetrics::new())
}
