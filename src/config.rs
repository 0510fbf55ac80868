//! Room configuration and settings bounds.
//!
//! # Example
//!
//! ```
//! use party_rooms::config::RoomConfig;
//! use std::time::Duration;
//!
//! let config = RoomConfig::default()
//!     .with_base_hand_size(7)
//!     .with_voting_window(Duration::from_secs(30));
//! assert_eq!(config.base_hand_size, 7);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::Settings;

/// Default number of white cards a tsar holds.
const DEFAULT_BASE_HAND_SIZE: usize = 10;

/// Default lifetime of an untouched vote.
const DEFAULT_VOTING_WINDOW: Duration = Duration::from_secs(120);

/// Default slack added to every round deadline.
const DEFAULT_TIME_LIMIT_GRACE: Duration = Duration::from_secs(1);

/// Default time a room may stay without any attached connection.
const DEFAULT_IDLE_ROOM_TIMEOUT: Duration = Duration::from_secs(300);

/// Default length of generated room identifiers.
const DEFAULT_ROOM_ID_LENGTH: usize = 16;

/// Inclusive range plus the value clients preselect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl Bound {
    pub const fn new(min: u32, max: u32, default: u32) -> Self {
        Self { min, max, default }
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Allowed room name lengths, in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameBound {
    pub min_len: usize,
    pub max_len: usize,
    pub default: String,
}

/// Limits every settings change is validated against. Clients receive them in
/// the sync snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsBounds {
    pub name: NameBound,
    pub public_default: bool,
    pub players_limit: Bound,
    /// Seconds.
    pub time_limit: Bound,
    pub score_limit: Bound,
    pub round_limit: Bound,
}

impl Default for SettingsBounds {
    fn default() -> Self {
        Self {
            name: NameBound {
                min_len: 1,
                max_len: 40,
                default: "Party room".into(),
            },
            public_default: true,
            players_limit: Bound::new(2, 20, 10),
            time_limit: Bound::new(10, 300, 60),
            score_limit: Bound::new(1, 100, 10),
            round_limit: Bound::new(1, 500, 20),
        }
    }
}

impl SettingsBounds {
    /// Settings of a freshly created room: default name, visibility and player
    /// limit, no time/score/round limits and no packs.
    pub fn initial_settings(&self) -> Settings {
        Settings {
            name: self.name.default.clone(),
            public: self.public_default,
            players_limit: self.players_limit.default,
            time_limit: None,
            score_limit: None,
            round_limit: None,
            packs: Vec::new(),
        }
    }
}

/// Tunables shared by every room of a [`RoomRegistry`](crate::registry::RoomRegistry).
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Cards the tsar is dealt up to; everyone else gets the black card's
    /// `draw` on top.
    ///
    /// Defaults to **10**. Values below 1 are clamped to 1.
    pub base_hand_size: usize,
    /// How long a vote stays open.
    ///
    /// Defaults to **120 seconds**.
    pub voting_window: Duration,
    /// Added to the configured time limit before a round deadline fires.
    ///
    /// Defaults to **1 second**.
    pub time_limit_grace: Duration,
    /// A room nobody has attached to for this long is torn down.
    ///
    /// Defaults to **300 seconds**.
    pub idle_room_timeout: Duration,
    /// Length of generated room identifiers.
    ///
    /// Defaults to **16**. Values below 4 are clamped to 4.
    pub room_id_length: usize,
    pub settings_bounds: SettingsBounds,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            base_hand_size: DEFAULT_BASE_HAND_SIZE,
            voting_window: DEFAULT_VOTING_WINDOW,
            time_limit_grace: DEFAULT_TIME_LIMIT_GRACE,
            idle_room_timeout: DEFAULT_IDLE_ROOM_TIMEOUT,
            room_id_length: DEFAULT_ROOM_ID_LENGTH,
            settings_bounds: SettingsBounds::default(),
        }
    }
}

impl RoomConfig {
    #[must_use]
    pub fn with_base_hand_size(mut self, size: usize) -> Self {
        self.base_hand_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_voting_window(mut self, window: Duration) -> Self {
        self.voting_window = window;
        self
    }

    #[must_use]
    pub fn with_time_limit_grace(mut self, grace: Duration) -> Self {
        self.time_limit_grace = grace;
        self
    }

    #[must_use]
    pub fn with_idle_room_timeout(mut self, timeout: Duration) -> Self {
        self.idle_room_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_room_id_length(mut self, length: usize) -> Self {
        self.room_id_length = length.max(4);
        self
    }

    #[must_use]
    pub fn with_settings_bounds(mut self, bounds: SettingsBounds) -> Self {
        self.settings_bounds = bounds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps() {
        let config = RoomConfig::default()
            .with_base_hand_size(0)
            .with_room_id_length(1);
        assert_eq!(config.base_hand_size, 1);
        assert_eq!(config.room_id_length, 4);
    }

    #[test]
    fn initial_settings_follow_bounds() {
        let bounds = SettingsBounds::default();
        let settings = bounds.initial_settings();
        assert_eq!(settings.name, "Party room");
        assert!(settings.public);
        assert_eq!(settings.players_limit, 10);
        assert!(settings.time_limit.is_none());
        assert!(settings.packs.is_empty());
    }

    #[test]
    fn bound_is_inclusive() {
        let bound = Bound::new(2, 20, 10);
        assert!(bound.contains(2));
        assert!(bound.contains(20));
        assert!(!bound.contains(1));
        assert!(!bound.contains(21));
    }
}
