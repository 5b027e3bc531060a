//! Shared fixtures for the connector integration tests.
//!
//! - [`MockWsServer`]: scripted WebSocket server that records what clients do
//! - [`FakeListenKeys`]: in-memory listen-key provider

#![allow(dead_code)]

use async_trait::async_trait;
use binance_rest::BinanceRestError;
use connector_binance::ListenKeyProvider;
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// One action the server performs on a connection.
#[derive(Debug, Clone)]
pub enum Step {
    Send(String),
    Wait(Duration),
    /// Drop the TCP connection without a close handshake.
    Drop,
}

/// What the server observed from clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Handshake completed on this request path (including query).
    Connected(String),
    Text(String),
    Ping,
    Close,
}

/// A mock WebSocket server for testing.
///
/// Each accepted connection runs the next queued script; once the scripts
/// run out, connections are simply held open.
pub struct MockWsServer {
    addr: SocketAddr,
    events: Arc<Mutex<Vec<ServerEvent>>>,
    scripts: Arc<Mutex<VecDeque<Vec<Step>>>>,
}

impl MockWsServer {
    pub async fn start(scripts: Vec<Vec<Step>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let scripts = Arc::new(Mutex::new(VecDeque::from(scripts)));

        let events_clone = Arc::clone(&events);
        let scripts_clone = Arc::clone(&scripts);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let script = scripts_clone.lock().unwrap().pop_front().unwrap_or_default();
                tokio::spawn(handle_connection(stream, script, Arc::clone(&events_clone)));
            }
        });

        Self {
            addr,
            events,
            scripts,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn events(&self) -> Vec<ServerEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Request paths of all completed handshakes, in order.
    pub fn connected_paths(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::Connected(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &ServerEvent) -> usize {
        self.events().iter().filter(|event| *event == wanted).count()
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: Vec<Step>,
    events: Arc<Mutex<Vec<ServerEvent>>>,
) {
    let mut path = String::new();
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        path = request.uri().to_string();
        Ok(response)
    };
    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    events.lock().unwrap().push(ServerEvent::Connected(path));

    let (mut write, mut read) = ws_stream.split();

    let read_events = Arc::clone(&events);
    let reader = tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            let event = match msg {
                Ok(Message::Text(text)) => ServerEvent::Text(text),
                Ok(Message::Ping(_)) => ServerEvent::Ping,
                Ok(Message::Close(_)) => {
                    read_events.lock().unwrap().push(ServerEvent::Close);
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            };
            read_events.lock().unwrap().push(event);
        }
    });

    for step in script {
        match step {
            Step::Send(text) => {
                if write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Step::Wait(delay) => tokio::time::sleep(delay).await,
            Step::Drop => {
                reader.abort();
                return;
            }
        }
    }

    let _ = reader.await;
}

/// Listen keys handed out as `key-1`, `key-2`, ...
#[derive(Default)]
pub struct FakeListenKeys {
    created: AtomicU32,
    keepalives: AtomicU32,
    closed: Mutex<Vec<String>>,
    expire_on_keepalive: AtomicBool,
    fail_keepalive: AtomicBool,
    fail_create: AtomicU32,
}

impl FakeListenKeys {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every keep-alive with `-1125`.
    pub fn expiring() -> Arc<Self> {
        let keys = Self::default();
        keys.expire_on_keepalive.store(true, Ordering::SeqCst);
        Arc::new(keys)
    }

    /// Answer every keep-alive with a server error that is not `-1125`.
    pub fn flaky_keepalives() -> Arc<Self> {
        let keys = Self::default();
        keys.fail_keepalive.store(true, Ordering::SeqCst);
        Arc::new(keys)
    }

    /// Reject the first `n` create calls.
    pub fn failing_creates(n: u32) -> Arc<Self> {
        let keys = Self::default();
        keys.fail_create.store(n, Ordering::SeqCst);
        Arc::new(keys)
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn keepalives(&self) -> u32 {
        self.keepalives.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListenKeyProvider for FakeListenKeys {
    async fn create_listen_key(&self) -> Result<String, BinanceRestError> {
        let remaining = self.fail_create.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_create.store(remaining - 1, Ordering::SeqCst);
            return Err(BinanceRestError::from_api_response(
                401,
                r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions for action."}"#,
            ));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("key-{n}"))
    }

    async fn keepalive_listen_key(&self, _listen_key: &str) -> Result<(), BinanceRestError> {
        self.keepalives.fetch_add(1, Ordering::SeqCst);
        if self.expire_on_keepalive.load(Ordering::SeqCst) {
            return Err(BinanceRestError::from_api_response(
                400,
                r#"{"code":-1125,"msg":"This listenKey does not exist."}"#,
            ));
        }
        if self.fail_keepalive.load(Ordering::SeqCst) {
            return Err(BinanceRestError::from_api_response(
                503,
                r#"{"code":-1001,"msg":"Internal error; unable to process your request."}"#,
            ));
        }
        Ok(())
    }

    async fn close_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError> {
        self.closed.lock().unwrap().push(listen_key.to_string());
        Ok(())
    }
}

/// Poll `condition` every 10ms for up to 5s.
pub async fn eventually(description: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {description}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// An `executionReport` event as the exchange sends it.
pub fn execution_report(order_id: i64, execution_type: &str, status: &str, filled: &str) -> String {
    serde_json::json!({
        "e": "executionReport",
        "E": 1_700_000_000_000_i64,
        "s": "BTCUSDT",
        "c": "gw_0123456789abcdef0123456789abcdef",
        "S": "BUY",
        "o": "MARKET",
        "f": "GTC",
        "q": "0.01000000",
        "p": "0.00000000",
        "P": "0.00000000",
        "g": -1,
        "x": execution_type,
        "X": status,
        "r": "NONE",
        "i": order_id,
        "l": filled,
        "z": filled,
        "L": "50000.00000000",
        "n": "0",
        "N": null,
        "T": 1_700_000_000_000_i64,
        "t": 1,
        "m": false
    })
    .to_string()
}

/// A combined-stream 24hr ticker event.
pub fn ticker(symbol: &str, price: &str, change_percent: &str) -> String {
    serde_json::json!({
        "stream": format!("{}@ticker", symbol.to_lowercase()),
        "data": {
            "e": "24hrTicker",
            "E": 1_700_000_000_000_i64,
            "s": symbol,
            "c": price,
            "P": change_percent
        }
    })
    .to_string()
}
