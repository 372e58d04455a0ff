use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response, ErrorResponse};
use tokio_tungstenite::tungstenite::http::StatusCode;
use uuid::Uuid;
use log::{info, warn, error, debug};

use crate::config::DELIVERY_TIMEOUT_SECS;
use crate::errors::DeliveryError;
use crate::websocket::{Subscriber, SubscriberId, SubscriberRegistry};

pub const WEBSOCKET_PATH: &str = "/ws";

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Write half of an upgraded connection, as seen by the broadcaster.
pub struct WsSubscriber {
    id: SubscriberId,
    peer_addr: String,
    sink: Mutex<WsSink>,
    write_timeout: Duration,
}

impl WsSubscriber {
    pub fn new(sink: WsSink, peer_addr: String, write_timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_addr,
            sink: Mutex::new(sink),
            write_timeout,
        }
    }
}

#[async_trait]
impl Subscriber for WsSubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    async fn deliver(&self, payload: &str) -> Result<(), DeliveryError> {
        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(self.write_timeout, sink.send(Message::Text(payload.to_string()))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => Err(DeliveryError::Closed),
            Ok(Err(e)) => Err(DeliveryError::from(e)),
            Err(_) => Err(DeliveryError::Timeout),
        }
    }

    /// Closing flushes whatever is still buffered, so it gets the same bound
    /// as a write.
    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(self.write_timeout, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Error closing connection to {}: {:?}", self.peer_addr, e),
            Err(_) => warn!("Timed out closing connection to {}, dropping it", self.peer_addr),
        }
    }
}

pub struct WebSocketHandler {
    registry: SubscriberRegistry,
    peer_addr: String,
    write_timeout: Duration,
}

impl WebSocketHandler {
    pub fn new(registry: SubscriberRegistry, peer_addr: String) -> Self {
        Self {
            registry,
            peer_addr,
            write_timeout: Duration::from_secs(DELIVERY_TIMEOUT_SECS),
        }
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Upgrades the stream, registers the subscriber and reads until the
    /// client goes away.
    pub async fn handle_connection(self, stream: TcpStream) {
        let ws_stream = match accept_hdr_async(stream, |req: &Request, response: Response| {
            self.check_path(req, response)
        }).await {
            Ok(ws) => ws,
            Err(e) => {
                error!("WebSocket handshake failed for {}: {:?}", self.peer_addr, e);
                return;
            }
        };

        let (write, read) = ws_stream.split();
        let subscriber = Arc::new(WsSubscriber::new(write, self.peer_addr.clone(), self.write_timeout));
        let id = subscriber.id();

        self.registry.add(subscriber.clone()).await;
        info!("WebSocket connection established - Subscriber: {} from {}", id, self.peer_addr);

        self.read_until_closed(read, id).await;

        // The broadcaster may already have evicted this subscriber.
        if self.registry.remove(id).await.is_some() {
            subscriber.close().await;
        }

        info!("WebSocket connection closed - Subscriber: {} from {}", id, self.peer_addr);
    }

    fn check_path(&self, req: &Request, response: Response) -> Result<Response, ErrorResponse> {
        let path = req.uri().path();
        if path == WEBSOCKET_PATH {
            Ok(response)
        } else {
            warn!("Unknown WebSocket path '{}' from {}", path, self.peer_addr);
            Err(self.create_error_response(StatusCode::NOT_FOUND, "Invalid WebSocket path"))
        }
    }

    fn create_error_response(&self, status: StatusCode, message: &str) -> ErrorResponse {
        let mut response = ErrorResponse::new(Some(message.to_string()));
        *response.status_mut() = status;
        response
    }

    // Clients are not expected to send anything; only the end of the stream matters.
    async fn read_until_closed(
        &self,
        mut read: SplitStream<WebSocketStream<TcpStream>>,
        id: SubscriberId,
    ) {
        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Close(close_frame)) => {
                    info!("Received close frame from subscriber {}: {:?}", id, close_frame);
                    break;
                }
                Ok(Message::Text(text)) => {
                    debug!("Ignoring text message from subscriber {}: {}", id, text);
                }
                Ok(Message::Binary(data)) => {
                    debug!("Ignoring binary message from subscriber {}: {} bytes", id, data.len());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Error reading from subscriber {}: {:?}", id, e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::connect_async;

    use crate::pipeline::{update_channel, Broadcaster};
    use crate::quotes::StockUpdate;

    async fn spawn_server(registry: SubscriberRegistry) -> String {
        spawn_server_with_timeout(registry, Duration::from_secs(DELIVERY_TIMEOUT_SECS)).await
    }

    async fn spawn_server_with_timeout(registry: SubscriberRegistry, write_timeout: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                let handler = WebSocketHandler::new(registry.clone(), peer.to_string())
                    .with_write_timeout(write_timeout);
                tokio::spawn(handler.handle_connection(stream));
            }
        });

        addr.to_string()
    }

    async fn wait_for_len(registry: &SubscriberRegistry, expected: usize) {
        for _ in 0..100 {
            if registry.len().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("registry never reached {} subscribers", expected);
    }

    #[tokio::test]
    async fn test_subscriber_receives_updates_and_unregisters_on_close() {
        let registry = SubscriberRegistry::new();
        let addr = spawn_server(registry.clone()).await;

        let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        wait_for_len(&registry, 1).await;

        let (_tx, rx) = update_channel(4);
        let broadcaster = Broadcaster::new(rx, registry.clone());
        let update = StockUpdate {
            symbol: "AAPL".to_string(),
            price: 110.0,
            percent_change: 10.0,
        };
        let report = broadcaster.broadcast(&update).await;
        assert_eq!(report.delivered, 1);

        let message = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let received: StockUpdate = serde_json::from_str(message.to_text().unwrap()).unwrap();
        assert_eq!(received, update);

        client.close(None).await.unwrap();
        wait_for_len(&registry, 0).await;
    }

    #[tokio::test]
    async fn test_client_that_stops_reading_is_evicted() {
        let registry = SubscriberRegistry::new();
        let addr = spawn_server_with_timeout(registry.clone(), Duration::from_millis(200)).await;

        // Handshakes, then never reads again.
        let (_stalled, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        wait_for_len(&registry, 1).await;

        let (_tx, rx) = update_channel(4);
        let broadcaster = Broadcaster::new(rx, registry.clone());

        // Far larger than the socket buffers, so the write cannot complete.
        let oversized = StockUpdate {
            symbol: "X".repeat(32 * 1024 * 1024),
            price: 1.0,
            percent_change: 0.0,
        };
        let report = tokio::time::timeout(Duration::from_secs(10), broadcaster.broadcast(&oversized))
            .await
            .expect("broadcast must not hang on a stalled client");
        assert_eq!(report.evicted, 1);
        assert_eq!(registry.len().await, 0);

        // The broadcaster keeps serving clients that connect afterwards.
        let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        wait_for_len(&registry, 1).await;

        let update = StockUpdate {
            symbol: "MSFT".to_string(),
            price: 420.0,
            percent_change: 1.0,
        };
        let report = tokio::time::timeout(Duration::from_secs(2), broadcaster.broadcast(&update))
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);

        let message = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let received: StockUpdate = serde_json::from_str(message.to_text().unwrap()).unwrap();
        assert_eq!(received, update);
    }

    #[tokio::test]
    async fn test_unknown_path_is_rejected() {
        let registry = SubscriberRegistry::new();
        let addr = spawn_server(registry.clone()).await;

        assert!(connect_async(format!("ws://{}/other", addr)).await.is_err());
        assert_eq!(registry.len().await, 0);
    }
}
