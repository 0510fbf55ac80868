//! # Party Rooms
//!
//! Room and game orchestration engine for a real-time party card game in the
//! style of "fill in the blank" card games.
//!
//! Players join a room, the leader picks card packs and limits, and rounds run
//! with a rotating tsar who judges anonymous white-card submissions against a
//! black prompt card. Every room runs as its own task; clients speak JSON text
//! frames over any bidirectional [`Transport`].
//!
//! ## Features
//!
//! - **Authoritative game engine**: [`game::Game`] owns decks, hands, phases and
//!   scoring, independent of networking
//! - **Room actors**: timers, votes, kicks and reconnects handled one event at
//!   a time per room
//! - **Pluggable edges**: implement [`CardCatalog`] for card storage,
//!   [`SessionIdentity`] for authentication and [`Transport`] for the wire
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   `WebSocketTransport`
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use party_rooms::{AnonymousIdentity, RoomConfig, RoomRegistry, StaticCatalog};
//!
//! # async fn run() -> party_rooms::error::Result<()> {
//! let catalog = StaticCatalog::from_path("cards.json")?;
//! let registry = RoomRegistry::new(
//!     RoomConfig::default(),
//!     Arc::new(catalog),
//!     Arc::new(AnonymousIdentity::default()),
//! );
//! let room_id = registry.create(1).await;
//! println!("room {room_id} is open");
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod deck;
pub mod error;
pub mod error_codes;
pub mod game;
pub mod identity;
pub mod player;
pub mod protocol;
pub mod registry;
mod room;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use catalog::{CardCatalog, StaticCatalog};
pub use config::{RoomConfig, SettingsBounds};
pub use error::{GameError, RoomError};
pub use error_codes::ErrorCode;
pub use game::{Game, Phase};
pub use identity::{AnonymousIdentity, Handshake, Identity, SessionIdentity};
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::RoomRegistry;
pub use room::{parse_client_message, validate_partial, validate_settings};
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
