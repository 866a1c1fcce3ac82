//! WebSocket/HTTP transport front-end
//!
//! One TCP listen port serves both the signaling WebSocket and the
//! plain-HTTP reporting endpoints; the first bytes of each connection
//! are peeked to tell them apart. Each WebSocket connection runs in
//! its own task and registers an outbound channel in a shared sender
//! table so router deliveries can address any connected peer. State
//! mutation happens inside the router; sends happen out here, after
//! the router has released its lock.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::messages::ClientMessage;
use crate::router::{Delivery, Event, SignalRouter};

type SenderTable = Arc<DashMap<String, UnboundedSender<Message>>>;

/// Signaling server: router state plus per-connection senders
pub struct SignalServer {
    router: Arc<SignalRouter>,
    senders: SenderTable,
}

impl SignalServer {
    pub fn new() -> Self {
        Self {
            router: Arc::new(SignalRouter::new()),
            senders: Arc::new(DashMap::new()),
        }
    }

    /// Start serving on `addr`
    pub async fn serve(&self, addr: SocketAddr) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signal server listening on {}", addr);
        self.serve_on(listener).await
    }

    /// Serve connections from an already-bound listener
    pub async fn serve_on(&self, listener: TcpListener) -> Result<(), std::io::Error> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let router = self.router.clone();
            let senders = self.senders.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, router, senders).await {
                    debug!("Connection error from {}: {:?}", peer_addr, e);
                }
            });
        }
    }

    /// The router handle (for monitoring)
    pub fn router(&self) -> &Arc<SignalRouter> {
        &self.router
    }

    /// Number of open WebSocket connections
    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }
}

impl Default for SignalServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle a single connection (HTTP or WebSocket)
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    router: Arc<SignalRouter>,
    senders: SenderTable,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // A WebSocket handshake is itself an HTTP GET, so the request
    // head has to be inspected for the upgrade headers before
    // branching; only plain GETs go to the reporting handler.
    let mut peek_buf = [0u8; 1024];
    let n = stream.peek(&mut peek_buf).await?;
    let head = String::from_utf8_lossy(&peek_buf[..n]);

    if head.starts_with("GET ") && !is_websocket_upgrade(&head) {
        return handle_http_request(&mut stream, &router).await;
    }

    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let peer_id = generate_peer_id();
    debug!("New connection from {} as {}", peer_addr, peer_id);

    // Outbound frames for this peer are funneled through a channel so
    // router deliveries from any task can reach this connection.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    senders.insert(peer_id.clone(), tx.clone());

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket error: {:?}", e);
                break;
            }
        };

        // A malformed frame fails that event only; state is untouched
        // and the connection stays up.
        let request = match ClientMessage::from_json(&text) {
            Ok(r) => r,
            Err(e) => {
                warn!("Discarding malformed frame from {}: {}", peer_id, e);
                continue;
            }
        };

        let deliveries = router.dispatch(&peer_id, Event::from(request));
        deliver(&deliveries, &senders);
    }

    // Cleanup on disconnect: explicit leave and abrupt loss land here
    // identically.
    senders.remove(&peer_id);
    let deliveries = router.dispatch(&peer_id, Event::Disconnect);
    deliver(&deliveries, &senders);

    drop(tx);
    let _ = writer.await;

    debug!("Connection closed: {}", peer_id);
    Ok(())
}

/// Send router deliveries to their recipients. A missing or closed
/// sender means the target is going away; its own disconnect event
/// will reconcile state, so the send is simply dropped.
fn deliver(deliveries: &[Delivery], senders: &SenderTable) {
    for delivery in deliveries {
        let Some(tx) = senders.get(&delivery.to) else {
            debug!("No connection for {}, dropping delivery", delivery.to);
            continue;
        };

        match delivery.message.to_json() {
            Ok(json) => {
                let _ = tx.send(Message::Text(json));
            }
            Err(e) => debug!("Failed to encode delivery for {}: {}", delivery.to, e),
        }
    }
}

/// Whether an HTTP request head carries the WebSocket upgrade headers
fn is_websocket_upgrade(head: &str) -> bool {
    head.lines().any(|line| {
        let mut parts = line.splitn(2, ':');
        matches!(
            (parts.next(), parts.next()),
            (Some(name), Some(_)) if name.trim().eq_ignore_ascii_case("sec-websocket-key")
        )
    })
}

/// Handle an HTTP request (room listing and health checks)
async fn handle_http_request(
    stream: &mut TcpStream,
    router: &SignalRouter,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let (status, body) = match path {
        "/api/rooms" => (
            "200 OK",
            serde_json::to_string(&router.list_rooms()).unwrap_or_else(|_| "[]".to_string()),
        ),
        "/health" => (
            "200 OK",
            format!(
                r#"{{"status":"healthy","rooms":{},"peers":{}}}"#,
                router.room_count(),
                router.participant_count()
            ),
        ),
        _ => ("404 Not Found", r#"{"error":"not found"}"#.to_string()),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

/// Generate a unique participant id
fn generate_peer_id() -> String {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).expect("RNG failed");
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ServerMessage;

    #[test]
    fn test_server_creation() {
        let server = SignalServer::new();
        assert_eq!(server.router().room_count(), 0);
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn test_peer_id_generation() {
        let id1 = generate_peer_id();
        let id2 = generate_peer_id();

        assert_eq!(id1.len(), 16); // 8 bytes = 16 hex chars
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_upgrade_detection() {
        let upgrade = "GET / HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";
        assert!(is_websocket_upgrade(upgrade));

        let plain = "GET /api/rooms HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
        assert!(!is_websocket_upgrade(plain));
    }

    #[tokio::test]
    async fn test_websocket_join_over_real_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Arc::new(SignalServer::new());
        let srv = server.clone();
        tokio::spawn(async move {
            let _ = srv.serve_on(listener).await;
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr))
            .await
            .unwrap();

        ws.send(Message::Text(
            r#"{"type":"join","username":"alice","roomId":"lobby"}"#.to_string(),
        ))
        .await
        .unwrap();

        let frame = ws.next().await.unwrap().unwrap();
        match frame {
            Message::Text(json) => {
                assert!(json.contains(r#""type":"roomUsers""#), "got {}", json);
            }
            other => panic!("unexpected frame: {:?}", other),
        }

        assert_eq!(server.router().room_count(), 1);
        assert_eq!(server.router().participant_count(), 1);
    }

    #[tokio::test]
    async fn test_http_rooms_listing_over_real_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Arc::new(SignalServer::new());
        let srv = server.clone();
        tokio::spawn(async move {
            let _ = srv.serve_on(listener).await;
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/rooms HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        let response = String::from_utf8_lossy(&buf);

        assert!(response.starts_with("HTTP/1.1 200 OK"), "got {}", response);
        assert!(response.ends_with("[]"), "got {}", response);
    }

    #[test]
    fn test_deliver_routes_to_registered_sender() {
        let senders: SenderTable = Arc::new(DashMap::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        senders.insert("a".to_string(), tx);

        let deliveries = vec![
            Delivery {
                to: "a".into(),
                message: ServerMessage::UserLeft {
                    user_id: "b".into(),
                },
            },
            Delivery {
                to: "gone".into(),
                message: ServerMessage::UserLeft {
                    user_id: "b".into(),
                },
            },
        ];

        deliver(&deliveries, &senders);

        let frame = rx.try_recv().unwrap();
        match frame {
            Message::Text(json) => assert!(json.contains(r#""type":"userLeft""#)),
            other => panic!("unexpected frame: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
