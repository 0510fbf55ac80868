//! Error types for the party rooms engine.

use thiserror::Error;

/// Rule violations reported by [`Deck`](crate::deck::Deck),
/// [`Player`](crate::player::Player) and [`Game`](crate::game::Game).
///
/// Every rule method either fully commits its mutation or returns one of these
/// and leaves the game untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    /// Submission by the tsar, of the wrong size, or with cards not in hand.
    #[error("invalid submission")]
    InvalidSubmission,

    /// A tsar-only action was attempted by another player.
    #[error("player is not the tsar")]
    NotTsar,

    /// The action is not allowed in the current phase.
    #[error("action not allowed in the current phase")]
    WrongPhase,

    /// The verdict does not match any submitted choice.
    #[error("no submission matches the verdict")]
    NoMatchingSubmission,

    /// Fewer than two players are seated.
    #[error("not enough players to start")]
    NotEnoughPlayers,

    /// The decks cannot satisfy a round for the current roster.
    #[error("not enough cards to start")]
    NotEnoughCards,

    /// The referenced player is not part of the game.
    #[error("unknown player")]
    UnknownPlayer,
}

/// Errors that can occur while hosting rooms.
#[derive(Debug, Error)]
pub enum RoomError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A command was well-formed JSON but failed shape or range validation.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A game rule rejected the command.
    #[error("game rule violation: {0}")]
    Game(#[from] GameError),

    /// The card catalog failed to resolve packs or cards.
    #[error("card catalog error: {0}")]
    Catalog(String),

    /// The session identity provider rejected or failed to identify a connection.
    #[error("identity error: {0}")]
    Identity(String),

    /// No room is registered under the given identifier.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// The room task has shut down.
    #[error("room closed")]
    RoomClosed,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for room operations.
pub type Result<T> = std::result::Result<T, RoomError>;
