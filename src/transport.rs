//! Connection abstraction for room participants.
//!
//! The [`Transport`] trait is one accepted, bidirectional text-message
//! connection. Frames are JSON [`ClientMessage`](crate::protocol::ClientMessage)
//! in and [`ServerMessage`](crate::protocol::ServerMessage) out; framing is the
//! implementation's concern.
//!
//! Accepting a connection is not part of the trait. Accept it externally,
//! capture its [`Handshake`](crate::identity::Handshake), then hand both to
//! [`RoomRegistry::dispatch`](crate::registry::RoomRegistry::dispatch).
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use party_rooms::error::RoomError;
//! use party_rooms::transport::Transport;
//! use tokio::sync::mpsc;
//!
//! struct ChannelTransport {
//!     outbound: mpsc::UnboundedSender<String>,
//!     inbound: mpsc::UnboundedReceiver<String>,
//! }
//!
//! #[async_trait]
//! impl Transport for ChannelTransport {
//!     async fn send(&mut self, message: String) -> Result<(), RoomError> {
//!         self.outbound
//!             .send(message)
//!             .map_err(|e| RoomError::TransportSend(e.to_string()))
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, RoomError>> {
//!         self.inbound.recv().await.map(Ok)
//!     }
//!
//!     async fn close(&mut self) -> Result<(), RoomError> {
//!         self.inbound.close();
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::RoomError;

/// One participant's connection.
///
/// # Object Safety
///
/// This trait is object-safe; `Box<dyn Transport>` is itself a transport.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because the connection
/// loop polls it inside `tokio::select!` next to outbound traffic. A cancelled
/// `recv` must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one serialized server message.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::TransportSend`] if the frame could not be written.
    async fn send(&mut self, message: String) -> Result<(), RoomError>;

    /// Receive the next client frame.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the peer closed the connection
    async fn recv(&mut self) -> Option<Result<String, RoomError>>;

    /// Close the connection. Implementations release resources even if the
    /// close handshake fails.
    async fn close(&mut self) -> Result<(), RoomError>;
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&mut self, message: String) -> Result<(), RoomError> {
        (**self).send(message).await
    }

    async fn recv(&mut self) -> Option<Result<String, RoomError>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> Result<(), RoomError> {
        (**self).close().await
    }
}
