//! Close codes sent to a connection right before the server drops it.
//!
//! Codes serialize as `SCREAMING_SNAKE_CASE` strings (e.g. `"ROOM_FULL"`) inside
//! the final `closed` message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason a connection was refused or forcibly closed.
///
/// Use [`description()`](ErrorCode::description) for a human-readable explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Handshake errors
    Unauthorized,
    InvalidHandshake,

    // Room errors
    RoomNotFound,
    RoomFull,
    RoomClosed,

    // Seat errors
    Kicked,
    SessionReplaced,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Unauthorized => "The session could not be identified. Sign in and try again.",
            Self::InvalidHandshake => {
                "The connection handshake did not carry a room identifier."
            }
            Self::RoomNotFound => {
                "The requested room could not be found. It may have been closed."
            }
            Self::RoomFull => "The room has reached its player limit.",
            Self::RoomClosed => "The room was closed.",
            Self::Kicked => "You were kicked from this room and cannot rejoin it.",
            Self::SessionReplaced => {
                "This seat was taken over by a newer connection of the same user."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
