//! WebSocket client using tokio-tungstenite
//!
//! Outgoing control frames:
//!
//! ```json
//! {"action": "hello", "clientId": "CatStory_Presenter_..."}
//! {"action": "subscribe", "topic": "catstory/orchestrator/to/presenter"}
//! {"action": "publish", "topic": "catstory/presenter/to/orchestrator", "payload": "..."}
//! ```
//!
//! Incoming deliveries are `{"topic": "...", "payload": ...}`. A text frame
//! that is not a delivery is passed on as a payload with an empty topic.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use crate::ports::outbound::{PubSubTransport, TransportError, TransportEvent};

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlFrame<'a> {
    Hello {
        #[serde(rename = "clientId")]
        client_id: &'a str,
    },
    Subscribe {
        topic: &'a str,
    },
    Publish {
        topic: &'a str,
        payload: &'a str,
    },
}

#[derive(Debug, Deserialize)]
struct Delivery {
    topic: String,
    payload: Value,
}

fn parse_delivery(text: &str) -> TransportEvent {
    match serde_json::from_str::<Delivery>(text) {
        Ok(Delivery {
            topic,
            payload: Value::String(payload),
        }) => TransportEvent::Message { topic, payload },
        Ok(Delivery { topic, payload }) => TransportEvent::Message {
            topic,
            payload: payload.to_string(),
        },
        Err(_) => TransportEvent::Message {
            topic: String::new(),
            payload: text.to_string(),
        },
    }
}

/// The writer half of an open link.
struct Link {
    tx: mpsc::UnboundedSender<Message>,
    /// Cancelled on intentional disconnect so the reader does not report `Closed`.
    closing: CancellationToken,
}

/// Pub/sub transport over a single WebSocket connection.
#[derive(Default)]
pub struct WebSocketTransport {
    link: Mutex<Option<Link>>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send_frame(&self, frame: &ControlFrame<'_>) -> Result<(), TransportError> {
        let json = serde_json::to_string(frame)
            .map_err(|e| TransportError::PublishFailed(e.to_string()))?;
        let guard = self.lock();
        let link = guard.as_ref().ok_or(TransportError::NotConnected)?;
        link.tx
            .send(Message::Text(json))
            .map_err(|_| TransportError::NotConnected)
    }
}

#[async_trait]
impl PubSubTransport for WebSocketTransport {
    async fn connect(
        &self,
        url: &str,
        client_id: &str,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        let (ws_stream, _) = connect_async(url).await.map_err(|e| {
            tracing::error!("Failed to connect to broker: {}", e);
            TransportError::Unreachable(format!("{url}: {e}"))
        })?;
        tracing::info!("Connected to broker at {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let closing = CancellationToken::new();

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    tracing::error!("Failed to send message: {}", e);
                    break;
                }
                if is_close {
                    break;
                }
            }
        });

        let reader_closing = closing.clone();
        tokio::spawn(async move {
            let reason = loop {
                let frame = tokio::select! {
                    _ = reader_closing.cancelled() => return,
                    frame = read.next() => frame,
                };
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if events_tx.send(parse_delivery(&text)).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!("Broker closed connection");
                        break frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by broker".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break e.to_string();
                    }
                    None => break "stream ended".to_string(),
                }
            };
            if !reader_closing.is_cancelled() {
                let _ = events_tx.send(TransportEvent::Closed { reason });
            }
        });

        if let Some(previous) = self.lock().replace(Link { tx, closing }) {
            previous.closing.cancel();
            let _ = previous.tx.send(Message::Close(None));
        }
        self.send_frame(&ControlFrame::Hello { client_id })?;
        Ok(events_rx)
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.send_frame(&ControlFrame::Subscribe { topic })
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        self.send_frame(&ControlFrame::Publish {
            topic,
            payload: &payload,
        })
        .map_err(|e| match e {
            TransportError::NotConnected => e,
            other => TransportError::PublishFailed(other.to_string()),
        })
    }

    async fn disconnect(&self) {
        if let Some(link) = self.lock().take() {
            link.closing.cancel();
            let _ = link.tx.send(Message::Close(None));
            tracing::info!("Disconnected from broker");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    const WITHIN: Duration = Duration::from_secs(5);

    #[test]
    fn deliveries_unwrap_string_payloads() {
        assert_eq!(
            parse_delivery(r#"{"topic": "t", "payload": "{\"type\":\"scroll_up\"}"}"#),
            TransportEvent::Message {
                topic: "t".to_string(),
                payload: r#"{"type":"scroll_up"}"#.to_string(),
            }
        );
        assert_eq!(
            parse_delivery(r#"{"topic": "t", "payload": {"type": "reset_game"}}"#),
            TransportEvent::Message {
                topic: "t".to_string(),
                payload: r#"{"type":"reset_game"}"#.to_string(),
            }
        );
        assert_eq!(
            parse_delivery("hello"),
            TransportEvent::Message {
                topic: String::new(),
                payload: "hello".to_string(),
            }
        );
    }

    #[test]
    fn control_frames_are_tagged_by_action() {
        let frame = serde_json::to_value(ControlFrame::Publish {
            topic: "out",
            payload: "{}",
        })
        .expect("serialize");
        assert_eq!(
            frame,
            json!({"action": "publish", "topic": "out", "payload": "{}"})
        );

        let hello = serde_json::to_value(ControlFrame::Hello { client_id: "p-1" })
            .expect("serialize");
        assert_eq!(hello, json!({"action": "hello", "clientId": "p-1"}));
    }

    #[tokio::test]
    async fn operations_need_an_open_link() {
        let transport = WebSocketTransport::new();
        assert_eq!(
            transport.subscribe("t").await,
            Err(TransportError::NotConnected)
        );
        assert_eq!(
            transport.publish("t", "{}".to_string()).await,
            Err(TransportError::NotConnected)
        );
        transport.disconnect().await;
    }

    #[tokio::test]
    async fn unreachable_broker_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let result = WebSocketTransport::new()
            .connect(&format!("ws://{addr}/mqtt"), "p-1")
            .await;
        assert!(matches!(result, Err(TransportError::Unreachable(_))));
    }

    #[tokio::test]
    async fn exchanges_frames_with_a_broker() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let broker = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake");
            let mut frames = Vec::new();
            while frames.len() < 3 {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        frames.push(serde_json::from_str::<Value>(&text).expect("json frame"))
                    }
                    Some(Ok(_)) => {}
                    other => panic!("broker lost the client: {other:?}"),
                }
            }
            let delivery = json!({"topic": "in", "payload": "{\"type\":\"scroll_up\"}"});
            ws.send(Message::Text(delivery.to_string()))
                .await
                .expect("deliver");
            ws.close(None).await.expect("close");
            frames
        });

        let transport = WebSocketTransport::new();
        let mut events = transport
            .connect(&format!("ws://{addr}/mqtt"), "p-1")
            .await
            .expect("connect");
        transport.subscribe("in").await.expect("subscribe");
        transport
            .publish("out", r#"{"type":"app_ready"}"#.to_string())
            .await
            .expect("publish");

        let first = tokio::time::timeout(WITHIN, events.recv())
            .await
            .expect("delivery in time");
        assert_eq!(
            first,
            Some(TransportEvent::Message {
                topic: "in".to_string(),
                payload: r#"{"type":"scroll_up"}"#.to_string(),
            })
        );
        let second = tokio::time::timeout(WITHIN, events.recv())
            .await
            .expect("close in time");
        assert!(matches!(second, Some(TransportEvent::Closed { .. })));

        let frames = broker.await.expect("broker task");
        assert_eq!(frames[0], json!({"action": "hello", "clientId": "p-1"}));
        assert_eq!(frames[1], json!({"action": "subscribe", "topic": "in"}));
        assert_eq!(
            frames[2],
            json!({"action": "publish", "topic": "out", "payload": "{\"type\":\"app_ready\"}"})
        );
    }
}
