//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketTransport::accept`] upgrades an accepted TCP stream and captures
//! the request's query string as the connection [`Handshake`], e.g.
//! `ws://host:3536/?room=Xy12...&user=42&name=Ada`.
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is enabled
//! (it is enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), party_rooms::RoomError> {
//! use party_rooms::{Transport, WebSocketTransport};
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3536").await?;
//! let (tcp, _) = listener.accept().await?;
//! let (mut transport, handshake) = WebSocketTransport::accept(tcp).await?;
//! println!("room requested: {:?}", handshake.room_id);
//!
//! if let Some(Ok(msg)) = transport.recv().await {
//!     println!("client said: {msg}");
//! }
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::RoomError;
use crate::identity::Handshake;
use crate::transport::Transport;

/// Type alias for the underlying WebSocket stream.
pub type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A [`Transport`] backed by a server-side WebSocket connection.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any messages,
/// making it safe to use inside `tokio::select!`.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Perform the WebSocket upgrade on an accepted TCP stream.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Io`] if the upgrade fails. When the underlying
    /// error is an I/O error its [`ErrorKind`](std::io::ErrorKind) is
    /// preserved; all other errors map to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn accept(tcp: TcpStream) -> Result<(Self, Handshake), RoomError> {
        let peer = tcp.peer_addr().ok();
        let mut query: Option<String> = None;
        let capture = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            query = request.uri().query().map(str::to_owned);
            Ok(response)
        };

        let stream = tokio_tungstenite::accept_hdr_async(tcp, capture)
            .await
            .map_err(|e| {
                let kind = match &e {
                    tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                    _ => std::io::ErrorKind::Other,
                };
                RoomError::Io(std::io::Error::new(kind, e))
            })?;

        let handshake = parse_query(query.as_deref().unwrap_or_default());
        tracing::debug!(?peer, room_id = ?handshake.room_id, "WebSocket connection accepted");

        Ok((Self::from_stream(stream), handshake))
    }

    /// Wrap an already-upgraded WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

/// Decode an `application/x-www-form-urlencoded` query into a [`Handshake`].
pub fn parse_query(query: &str) -> Handshake {
    Handshake::from_pairs(
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned())),
    )
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), RoomError> {
        if self.closed {
            return Err(RoomError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| RoomError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, RoomError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(RoomError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), RoomError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| RoomError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[test]
    fn parse_query_decodes_params() {
        let handshake = parse_query("room=abc123&user=7&name=Ada%20L");
        assert_eq!(handshake.room_id.as_deref(), Some("abc123"));
        assert_eq!(handshake.param("user"), Some("7"));
        assert_eq!(handshake.param("name"), Some("Ada L"));
        assert!(parse_query("").room_id.is_none());
    }

    /// Accept one connection server-side and hand it to `handler`; returns the
    /// address to connect to.
    async fn start_server<F, Fut>(handler: F) -> std::net::SocketAddr
    where
        F: FnOnce(WebSocketTransport, Handshake) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let (transport, handshake) = WebSocketTransport::accept(tcp).await.unwrap();
            handler(transport, handshake).await;
        });
        addr
    }

    #[tokio::test]
    async fn accept_captures_handshake_and_echoes() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let addr = start_server(|mut transport, handshake| async move {
            tx.send(handshake).unwrap();
            if let Some(Ok(text)) = transport.recv().await {
                transport.send(text).await.unwrap();
            }
            transport.close().await.unwrap();
        })
        .await;

        let (mut client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}/?room=r1&user=3"))
                .await
                .unwrap();
        let handshake = rx.await.unwrap();
        assert_eq!(handshake.room_id.as_deref(), Some("r1"));
        assert_eq!(handshake.param("user"), Some("3"));

        client.send(Message::Text("hello".into())).await.unwrap();
        match client.next().await {
            Some(Ok(Message::Text(text))) => assert_eq!(text.as_str(), "hello"),
            other => panic!("expected echo, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recv_skips_binary_and_ends_on_close() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let addr = start_server(|mut transport, _| async move {
            let first = transport.recv().await.map(|r| r.unwrap());
            let second = transport.recv().await.map(|r| r.is_ok());
            tx.send((first, second)).unwrap();
        })
        .await;

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
            .await
            .unwrap();
        client
            .send(Message::Binary(vec![0xDE, 0xAD].into()))
            .await
            .unwrap();
        client.send(Message::Text("after".into())).await.unwrap();
        client.close(None).await.unwrap();

        let (first, second) = rx.await.unwrap();
        assert_eq!(first.as_deref(), Some("after"));
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let addr = start_server(|mut transport, _| async move {
            transport.close().await.unwrap();
            transport.close().await.unwrap();
            let err = transport.send("late".into()).await.unwrap_err();
            tx.send(matches!(err, RoomError::TransportClosed)).unwrap();
        })
        .await;

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
            .await
            .unwrap();
        while let Some(Ok(_)) = client.next().await {}
        assert!(rx.await.unwrap());
    }
}
