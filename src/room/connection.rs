//! Per-connection task.
//!
//! Multiplexes the room's outbound messages for one participant with the
//! participant's inbound frames. Inbound frames are parsed and range-checked
//! here; only well-formed commands reach the room.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::settings::{validate_partial, validate_settings};
use super::RoomEvent;
use crate::config::{RoomConfig, SettingsBounds};
use crate::error::Result;
use crate::error_codes::ErrorCode;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::Transport;

/// What the room asks a connection task to do.
#[derive(Debug)]
pub(crate) enum Outbound {
    Message(ServerMessage),
    /// Send `closed` with the code, if any, then drop the connection.
    Close(Option<ErrorCode>),
}

/// The room's end of a connection.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a message. A connection that is already gone is ignored.
    pub fn send(&self, message: ServerMessage) {
        if self.tx.send(Outbound::Message(message)).is_err() {
            debug!(connection_id = %self.id, "dropping message for closed connection");
        }
    }

    pub fn close(&self, code: Option<ErrorCode>) {
        let _ = self.tx.send(Outbound::Close(code));
    }
}

/// Parse one client frame and range-check its settings payloads.
///
/// # Errors
///
/// Returns [`RoomError::Serialization`](crate::RoomError::Serialization) for
/// malformed JSON or unknown commands and
/// [`RoomError::InvalidMessage`](crate::RoomError::InvalidMessage) for values
/// outside `bounds`.
pub fn parse_client_message(text: &str, bounds: &SettingsBounds) -> Result<ClientMessage> {
    let message: ClientMessage = serde_json::from_str(text)?;
    match &message {
        ClientMessage::SyncSettings(partial) => validate_partial(partial, bounds)?,
        ClientMessage::Start(settings) => validate_settings(settings, bounds)?,
        _ => {}
    }
    Ok(message)
}

/// Serialize and send one close notice, then close the transport.
pub(crate) async fn refuse(mut transport: impl Transport, code: ErrorCode) {
    debug!(?code, "refusing connection");
    if let Ok(json) = serde_json::to_string(&ServerMessage::Closed { error_code: code }) {
        let _ = transport.send(json).await;
    }
    let _ = transport.close().await;
}

/// Runs until either side closes, then reports the detach to the room.
pub(crate) async fn run(
    mut transport: impl Transport,
    connection_id: Uuid,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    room: mpsc::UnboundedSender<RoomEvent>,
    config: Arc<RoomConfig>,
) {
    debug!(%connection_id, "connection loop started");

    loop {
        tokio::select! {
            out = outbound.recv() => {
                match out {
                    Some(Outbound::Message(msg)) => {
                        let kind = msg.kind();
                        match serde_json::to_string(&msg) {
                            Ok(json) => {
                                if let Err(e) = transport.send(json).await {
                                    warn!(%connection_id, "transport send error: {e}");
                                    break;
                                }
                            }
                            Err(e) => {
                                error!(%connection_id, kind, "failed to serialize ServerMessage: {e}");
                            }
                        }
                    }
                    Some(Outbound::Close(code)) => {
                        if let Some(code) = code {
                            if let Ok(json) = serde_json::to_string(&ServerMessage::Closed { error_code: code }) {
                                let _ = transport.send(json).await;
                            }
                        }
                        debug!(%connection_id, ?code, "room closed the connection");
                        break;
                    }
                    // Room dropped its handle.
                    None => break,
                }
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match parse_client_message(&text, &config.settings_bounds) {
                        Ok(message) => {
                            if room.send(RoomEvent::Inbound { connection: connection_id, message }).is_err() {
                                debug!(%connection_id, "room is gone");
                                break;
                            }
                        }
                        Err(e) => warn!(%connection_id, "rejected client message: {e}"),
                    },
                    Some(Err(e)) => {
                        warn!(%connection_id, "transport receive error: {e}");
                        break;
                    }
                    None => {
                        debug!(%connection_id, "connection closed by peer");
                        break;
                    }
                }
            }
        }
    }

    let _ = transport.close().await;
    let _ = room.send(RoomEvent::Detached {
        connection: connection_id,
    });
    debug!(%connection_id, "connection loop exited");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::RoomError;

    #[test]
    fn parses_commands() {
        let bounds = SettingsBounds::default();
        let msg = parse_client_message(r#"{"type":"submit","data":{"cards":[1,2]}}"#, &bounds)
            .unwrap();
        assert_eq!(msg, ClientMessage::Submit { cards: vec![1, 2] });
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let bounds = SettingsBounds::default();
        let err = parse_client_message(
            r#"{"type":"sync-settings","data":{"players_limit":99}}"#,
            &bounds,
        )
        .unwrap_err();
        assert!(matches!(err, RoomError::InvalidMessage(_)));
    }

    #[test]
    fn rejects_unknown_fields_and_commands() {
        let bounds = SettingsBounds::default();
        assert!(matches!(
            parse_client_message(r#"{"type":"vote","data":{"for":true,"extra":1}}"#, &bounds),
            Err(RoomError::Serialization(_))
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"shout","data":{}}"#, &bounds),
            Err(RoomError::Serialization(_))
        ));
    }
}
