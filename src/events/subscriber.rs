//! WebSocket `newHeads` subscription.
//!
//! # Responsibilities
//! - Open the socket and register `eth_subscribe ["newHeads"]`
//! - Forward notifications to the handler through a bounded channel
//! - Reconnect with backoff and re-subscribe when the socket drops
//! - Send `eth_unsubscribe` and close cleanly on request

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::blockchain::types::{SdkError, SdkResult};
use crate::config::{RetryConfig, SubscriptionConfig};
use crate::events::types::{NewBlockEvent, WireHeader, WireMessage};
use crate::lifecycle::{Shutdown, ShutdownListener};
use crate::observability::metrics;
use crate::resilience::backoff::policy_backoff;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIBE_REQUEST_ID: u64 = 1;
const UNSUBSCRIBE_REQUEST_ID: u64 = 2;
const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens block subscriptions against one WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct BlockSubscriber {
    ws_url: String,
    config: SubscriptionConfig,
    retries: RetryConfig,
}

/// A live block subscription.
pub struct Subscription {
    id: Uuid,
    remote_id: watch::Receiver<String>,
    shutdown: Shutdown,
    reader: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl Subscription {
    /// Local id; stable across reconnects.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subscription id assigned by the node for the current connection.
    pub fn remote_id(&self) -> String {
        self.remote_id.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        !self.shutdown.is_triggered() && !self.reader.is_finished()
    }

    /// Unsubscribe, close the socket, and wait for the handler to drain.
    pub async fn unsubscribe(self) {
        self.shutdown.trigger();
        let _ = self.reader.await;
        let _ = self.dispatcher.await;
        tracing::info!(subscription_id = %self.id, "Block subscription closed");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("remote_id", &*self.remote_id.borrow())
            .field("active", &self.is_active())
            .finish()
    }
}

impl BlockSubscriber {
    pub fn new(ws_url: impl Into<String>, config: SubscriptionConfig, retries: RetryConfig) -> Self {
        Self {
            ws_url: ws_url.into(),
            config,
            retries,
        }
    }

    /// Subscribe to new blocks. `handler` runs on a background task for every block.
    ///
    /// Connection and registration errors are returned here; later
    /// disconnects are handled by the background task.
    pub async fn subscribe<F>(&self, handler: F) -> SdkResult<Subscription>
    where
        F: Fn(NewBlockEvent) + Send + Sync + 'static,
    {
        let (stream, remote_id) = open(&self.ws_url).await?;
        let id = Uuid::new_v4();
        tracing::info!(
            subscription_id = %id,
            remote_id = %remote_id,
            ws_url = %self.ws_url,
            "Subscribed to new blocks"
        );

        let (events_tx, events_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (remote_tx, remote_rx) = watch::channel(remote_id);
        let shutdown = Shutdown::new();

        let dispatcher = tokio::spawn(dispatch(events_rx, Arc::new(handler)));
        let task = ReaderTask {
            id,
            ws_url: self.ws_url.clone(),
            config: self.config.clone(),
            retries: self.retries.clone(),
            events: events_tx,
            remote_id: remote_tx,
            stop: shutdown.listener(),
        };
        let reader = tokio::spawn(task.run(stream));

        Ok(Subscription {
            id,
            remote_id: remote_rx,
            shutdown,
            reader,
            dispatcher,
        })
    }
}

async fn dispatch(mut events: mpsc::Receiver<NewBlockEvent>, handler: Arc<dyn Fn(NewBlockEvent) + Send + Sync>) {
    while let Some(event) = events.recv().await {
        handler(event);
    }
}

/// Connect and register the subscription. Returns the node's subscription id.
async fn open(ws_url: &str) -> SdkResult<(WsStream, String)> {
    let (mut stream, _) = connect_async(ws_url)
        .await
        .map_err(|e| SdkError::Subscription(format!("connect to {} failed: {}", ws_url, e)))?;

    let request = json!({
        "jsonrpc": "2.0",
        "id": SUBSCRIBE_REQUEST_ID,
        "method": "eth_subscribe",
        "params": ["newHeads"],
    });
    stream
        .send(Message::Text(request.to_string().into()))
        .await
        .map_err(|e| SdkError::Subscription(format!("eth_subscribe send failed: {}", e)))?;

    let answer = timeout(SUBSCRIBE_TIMEOUT, async {
        while let Some(message) = stream.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(_) => continue,
                Err(e) => return Err(SdkError::Subscription(e.to_string())),
            };
            let Ok(reply) = serde_json::from_str::<WireMessage>(text.as_str()) else {
                continue;
            };
            if reply.id != Some(SUBSCRIBE_REQUEST_ID) {
                continue;
            }
            if let Some(error) = reply.error {
                return Err(SdkError::Subscription(format!(
                    "eth_subscribe rejected ({}): {}",
                    error.code, error.message
                )));
            }
            return match reply.result {
                Some(serde_json::Value::String(remote_id)) => Ok(remote_id),
                other => Err(SdkError::Subscription(format!(
                    "unexpected eth_subscribe result: {:?}",
                    other
                ))),
            };
        }
        Err(SdkError::Subscription("socket closed before eth_subscribe answered".to_string()))
    })
    .await
    .map_err(|_| SdkError::Subscription("eth_subscribe timed out".to_string()))??;

    Ok((stream, answer))
}

/// Decode a notification for `remote_id`. `Ok(None)` for anything else on the socket.
pub(crate) fn parse_notification(text: &str, remote_id: &str) -> Result<Option<NewBlockEvent>, serde_json::Error> {
    let message: WireMessage = serde_json::from_str(text)?;
    match (message.method.as_deref(), message.params) {
        (Some("eth_subscription"), Some(params)) if params.subscription == remote_id => {
            let header: WireHeader = serde_json::from_value(params.result)?;
            Ok(Some(header.into()))
        }
        _ => Ok(None),
    }
}

enum StreamEnd {
    Stopped,
    HandlerGone,
    Disconnected(String),
}

struct ReaderTask {
    id: Uuid,
    ws_url: String,
    config: SubscriptionConfig,
    retries: RetryConfig,
    events: mpsc::Sender<NewBlockEvent>,
    remote_id: watch::Sender<String>,
    stop: ShutdownListener,
}

impl ReaderTask {
    async fn run(mut self, mut stream: WsStream) {
        loop {
            match self.pump(&mut stream).await {
                StreamEnd::Stopped => {
                    self.unsubscribe(&mut stream).await;
                    return;
                }
                StreamEnd::HandlerGone => {
                    tracing::debug!(subscription_id = %self.id, "Block handler dropped");
                    let _ = stream.close(None).await;
                    return;
                }
                StreamEnd::Disconnected(reason) => {
                    tracing::warn!(subscription_id = %self.id, reason = %reason, "Block subscription disconnected");
                    if !self.config.reconnect {
                        return;
                    }
                    match self.reconnect().await {
                        Some(new_stream) => stream = new_stream,
                        None => return,
                    }
                }
            }
        }
    }

    async fn pump(&mut self, stream: &mut WsStream) -> StreamEnd {
        let remote_id = self.remote_id.borrow().clone();
        loop {
            tokio::select! {
                _ = self.stop.wait() => return StreamEnd::Stopped,
                message = stream.next() => match message {
                    None => return StreamEnd::Disconnected("closed by node".to_string()),
                    Some(Err(e)) => return StreamEnd::Disconnected(e.to_string()),
                    Some(Ok(Message::Close(_))) => return StreamEnd::Disconnected("close frame".to_string()),
                    Some(Ok(Message::Text(text))) => match parse_notification(text.as_str(), &remote_id) {
                        Ok(Some(event)) => {
                            metrics::record_block_received();
                            tracing::debug!(subscription_id = %self.id, number = event.number, "New block");
                            if self.events.send(event).await.is_err() {
                                return StreamEnd::HandlerGone;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(subscription_id = %self.id, error = %e, "Skipping malformed notification");
                        }
                    },
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    /// Reopen the subscription. `None` when stopped or out of attempts.
    async fn reconnect(&mut self) -> Option<WsStream> {
        for attempt in 1..=self.config.max_reconnects {
            let delay = policy_backoff(&self.retries, attempt);
            tokio::select! {
                _ = self.stop.wait() => return None,
                _ = sleep(delay) => {}
            }

            metrics::record_subscription_reconnect();
            match open(&self.ws_url).await {
                Ok((stream, remote_id)) => {
                    tracing::info!(
                        subscription_id = %self.id,
                        remote_id = %remote_id,
                        attempt = attempt,
                        "Block subscription re-established"
                    );
                    let _ = self.remote_id.send(remote_id);
                    return Some(stream);
                }
                Err(e) => {
                    tracing::warn!(subscription_id = %self.id, attempt = attempt, error = %e, "Reconnect failed");
                }
            }
        }

        tracing::error!(
            subscription_id = %self.id,
            max_reconnects = self.config.max_reconnects,
            "Giving up on block subscription"
        );
        None
    }

    async fn unsubscribe(&self, stream: &mut WsStream) {
        let remote_id = self.remote_id.borrow().clone();
        let request = json!({
            "jsonrpc": "2.0",
            "id": UNSUBSCRIBE_REQUEST_ID,
            "method": "eth_unsubscribe",
            "params": [remote_id],
        });
        if let Err(e) = stream.send(Message::Text(request.to_string().into())).await {
            tracing::debug!(subscription_id = %self.id, error = %e, "eth_unsubscribe not delivered");
        }
        let _ = stream.close(None).await;
    }
}
