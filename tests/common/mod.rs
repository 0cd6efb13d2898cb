//! Mock chain nodes shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

pub const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";
pub const TEST_PASSWORD: &str = "12345678";

/// Reply of a scripted JSON-RPC method: `Ok(result)` or `Err((code, message))`.
pub type RpcReply = Result<Value, (i64, String)>;

/// A JSON-RPC over HTTP node answering from a closure.
pub struct HttpNode {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<String>>>,
}

impl HttpNode {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Methods called so far, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| *m == method).count()
    }
}

/// Start a scripted node. Each connection carries one request.
pub async fn start_http_node<F>(handler: F) -> HttpNode
where
    F: Fn(&str, &Value) -> RpcReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let recorded = calls.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = handler.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let Some(body) = read_http_body(&mut socket).await else {
                    return;
                };
                let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                let method = request["method"].as_str().unwrap_or_default().to_string();
                recorded.lock().unwrap().push(method.clone());

                let reply = match handler(&method, &request["params"]) {
                    Ok(result) => json!({"jsonrpc": "2.0", "id": request["id"], "result": result}),
                    Err((code, message)) => json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "error": {"code": code, "message": message},
                    }),
                };
                write_http_response(&mut socket, "200 OK", &reply.to_string()).await;
            });
        }
    });

    HttpNode { addr, calls }
}

/// Start a node that answers every request with HTTP 503.
pub async fn start_unavailable_node() -> HttpNode {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let recorded = calls.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let recorded = recorded.clone();
            tokio::spawn(async move {
                if read_http_body(&mut socket).await.is_some() {
                    recorded.lock().unwrap().push("unavailable".to_string());
                }
                write_http_response(&mut socket, "503 Service Unavailable", "Service Unavailable").await;
            });
        }
    });

    HttpNode { addr, calls }
}

async fn read_http_body(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some(buf[header_end..header_end + content_length].to_vec())
}

async fn write_http_response(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// A hex quantity the way nodes encode them.
pub fn quantity(n: u64) -> Value {
    Value::String(format!("0x{:x}", n))
}

/// What the WebSocket node pushes to every live connection.
#[derive(Debug, Clone)]
pub enum WsFrame {
    /// A well-formed `newHeads` notification for this block number.
    Header(u64),
    /// A notification for the live subscription whose header cannot be decoded.
    BadHeader,
    /// Arbitrary text.
    Raw(String),
    /// Drop the connection without a close handshake.
    Drop,
}

/// A WebSocket node that serves `eth_subscribe ["newHeads"]`.
pub struct WsNode {
    pub addr: SocketAddr,
    frames: broadcast::Sender<WsFrame>,
    connections: Arc<AtomicU32>,
    unsubscribed: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    refused: Arc<AtomicU32>,
}

impl WsNode {
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn push(&self, frame: WsFrame) {
        let _ = self.frames.send(frame);
    }

    /// Connections that completed `eth_subscribe`.
    pub fn connections(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Drop every later connection before the handshake.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Connections dropped since `close`.
    pub fn refused(&self) -> u32 {
        self.refused.load(Ordering::SeqCst)
    }

    /// Subscription ids received through `eth_unsubscribe`.
    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().unwrap().clone()
    }

    /// Wait until `n` connections have subscribed.
    pub async fn wait_for_connections(&self, n: u32) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.connections() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("subscription never (re)connected");
    }

    pub async fn wait_for_unsubscribe(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.unsubscribed.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("eth_unsubscribe never arrived");
    }
}

pub async fn start_ws_node() -> WsNode {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (frames, _) = broadcast::channel(64);
    let connections = Arc::new(AtomicU32::new(0));
    let unsubscribed = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));
    let refused = Arc::new(AtomicU32::new(0));

    let node = WsNode {
        addr,
        frames: frames.clone(),
        connections: connections.clone(),
        unsubscribed: unsubscribed.clone(),
        closed: closed.clone(),
        refused: refused.clone(),
    };

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            if closed.load(Ordering::SeqCst) {
                refused.fetch_add(1, Ordering::SeqCst);
                drop(socket);
                continue;
            }
            let frames = frames.subscribe();
            let connections = connections.clone();
            let unsubscribed = unsubscribed.clone();
            tokio::spawn(serve_ws(socket, frames, connections, unsubscribed));
        }
    });

    node
}

async fn serve_ws(
    socket: TcpStream,
    mut frames: broadcast::Receiver<WsFrame>,
    connections: Arc<AtomicU32>,
    unsubscribed: Arc<Mutex<Vec<String>>>,
) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
        return;
    };

    let mut subscription: Option<String> = None;
    loop {
        tokio::select! {
            incoming = ws.next() => {
                let Some(Ok(message)) = incoming else { return };
                let Message::Text(text) = message else { continue };
                let request: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
                match request["method"].as_str() {
                    Some("eth_subscribe") => {
                        let number = connections.load(Ordering::SeqCst) + 1;
                        let id = format!("0xsub{}", number);
                        subscription = Some(id.clone());
                        let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": id});
                        if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                            return;
                        }
                        connections.fetch_add(1, Ordering::SeqCst);
                    }
                    Some("eth_unsubscribe") => {
                        let id = request["params"][0].as_str().unwrap_or_default().to_string();
                        unsubscribed.lock().unwrap().push(id);
                        let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": true});
                        let _ = ws.send(Message::Text(reply.to_string().into())).await;
                    }
                    _ => {}
                }
            }
            frame = frames.recv() => {
                let Ok(frame) = frame else { return };
                let Some(id) = subscription.clone() else { continue };
                let text = match frame {
                    WsFrame::Header(number) => notification(&id, header(number)),
                    WsFrame::BadHeader => notification(&id, json!({"number": "not-a-quantity"})),
                    WsFrame::Raw(text) => text,
                    WsFrame::Drop => return,
                };
                if ws.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn notification(subscription: &str, result: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_subscription",
        "params": {"subscription": subscription, "result": result},
    })
    .to_string()
}

fn header(number: u64) -> Value {
    json!({
        "number": quantity(number),
        "hash": format!("0x{:064x}", number),
        "parentHash": format!("0x{:064x}", number.saturating_sub(1)),
        "timestamp": quantity(1_700_000_000 + number),
        "gasUsed": quantity(21_000),
        "gasLimit": quantity(30_000_000),
        "miner": "0x0000000000000000000000000000000000000000",
    })
}
