//! Wire types exchanged with game clients.
//!
//! Every frame is a JSON object `{"type": "...", "data": ...}` with kebab-case
//! type names (`sync-settings`, `new-round`, `vote-start`). Payload fields are
//! snake_case. Unknown fields in client payloads are rejected.

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::SettingsBounds;
use crate::error_codes::ErrorCode;
use crate::identity::Identity;

// ── Type aliases ────────────────────────────────────────────────────

/// Stable user identifier issued by the session identity provider.
pub type UserId = u64;

/// Unique identifier for rooms.
pub type RoomId = String;

/// Opaque card identifier issued by the card catalog.
pub type CardId = u64;

/// Card pack identifier.
pub type PackId = u64;

// ── Settings ────────────────────────────────────────────────────────

/// A selected card pack and which of its piles are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPack {
    pub id: PackId,
    pub whites: bool,
    pub blacks: bool,
}

impl SettingsPack {
    /// A pack with neither pile selected contributes nothing.
    pub fn is_used(&self) -> bool {
        self.whites || self.blacks
    }
}

/// Full room settings, as sent with `start` and broadcast with `sync-settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub name: String,
    pub public: bool,
    pub players_limit: u32,
    /// Seconds per round phase, `None` for no limit.
    pub time_limit: Option<u32>,
    pub score_limit: Option<u32>,
    /// Limit on points handed out in total.
    pub round_limit: Option<u32>,
    pub packs: Vec<SettingsPack>,
}

/// A `sync-settings` update. Absent fields are left unchanged; the nullable
/// limits distinguish "absent" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players_limit: Option<u32>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_limit: Option<Option<u32>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub score_limit: Option<Option<u32>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub round_limit: Option<Option<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packs: Option<Vec<SettingsPack>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ── Voting ──────────────────────────────────────────────────────────

/// What a vote decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Proposal {
    /// End the running game.
    End,
    /// Kick a participant from the room.
    Kick { target: UserId },
}

/// State of the active vote from one viewer's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingView {
    pub ends_in_ms: u64,
    /// Display name of the proposer.
    pub by: String,
    pub proposal: Proposal,
    #[serde(rename = "for")]
    pub votes_for: usize,
    pub against: usize,
    /// The viewer's own ballot, `None` when not cast.
    pub vote: Option<bool>,
}

// ── Cards ───────────────────────────────────────────────────────────

/// A white card resolved to display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteCardView {
    pub id: CardId,
    pub text: String,
    pub pack: String,
}

/// A black card resolved to display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackCardView {
    pub id: CardId,
    pub text: String,
    pub pack: String,
    pub pick: usize,
}

// ── Client messages ─────────────────────────────────────────────────

/// Commands sent from a client to its room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    deny_unknown_fields
)]
pub enum ClientMessage {
    /// Leader-only pre-game settings change.
    SyncSettings(PartialSettings),
    /// Leader-only: commit settings and start the game.
    Start(Settings),
    /// Submit white cards for the current black card.
    Submit { cards: Vec<CardId> },
    /// Tsar-only: pick the winning submission.
    Verdict { cards: Vec<CardId> },
    /// Propose a vote.
    VoteStart(Proposal),
    /// Cast a ballot on the active vote.
    Vote {
        #[serde(rename = "for")]
        in_favor: bool,
    },
    /// Leader-only: kick a participant.
    Kick { target: UserId },
}

// ── Server messages ─────────────────────────────────────────────────

/// One entry of the `players` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub user: Identity,
    pub leader: bool,
    pub connected: bool,
    pub tsar: bool,
    /// The player has submitted this round.
    pub ready: bool,
    pub points: u32,
}

/// Summary of the round that just finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevRound {
    /// Winner's display name.
    pub winner: String,
    pub black_card: BlackCardView,
    pub winning_cards: Vec<WhiteCardView>,
    pub im_winner: bool,
    /// The tsar ran out of time and the winner was drawn at random.
    pub randomly_picked: bool,
}

/// Payload for the `new-round` message. Personalized per viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoundPayload {
    pub black_card: BlackCardView,
    pub cards: Vec<WhiteCardView>,
    pub tsar: bool,
    /// Seconds left in the choosing phase.
    pub time_limit: Option<u64>,
    /// The round was restarted because the tsar left.
    pub round_restart: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prev_round: Option<PrevRound>,
}

/// Payload for the `choices` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoicesPayload {
    /// Submissions in reveal order. Never carries the submitter.
    pub choices: Vec<Vec<WhiteCardView>>,
    /// Cards submitted on the viewer's behalf after the choice deadline.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub picked_cards: Option<Vec<CardId>>,
    /// Seconds left for the verdict.
    pub time_limit: Option<u64>,
}

/// Round state included in a sync snapshot of a started game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRound {
    pub tsar: bool,
    pub black_card: BlackCardView,
    pub cards: Vec<WhiteCardView>,
    /// Present only while the tsar is deciding.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub choices: Option<Vec<Vec<WhiteCardView>>>,
    pub submitted: bool,
    pub voting: Option<VotingView>,
    pub time_limit: Option<u64>,
}

/// Full view sent on every attach, before any other event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub room_id: RoomId,
    pub settings_bounds: SettingsBounds,
    pub current_settings: Settings,
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub round: Option<SyncRound>,
}

/// One podium place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodiumEntry {
    pub user: Identity,
    /// 1-based.
    pub place: usize,
    pub points: u32,
}

/// Messages sent from a room to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Snapshot of the room from the viewer's perspective (boxed to reduce enum size).
    Sync(Box<SyncPayload>),
    /// Roster update.
    Players {
        players: Vec<PlayerView>,
        /// Cards the just-kicked player had submitted.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        kicked_choice: Option<Vec<CardId>>,
    },
    /// The leader changed the settings.
    SyncSettings(Settings),
    /// A round began (boxed to reduce enum size).
    NewRound(Box<NewRoundPayload>),
    /// Every submission is in; the tsar is deciding.
    Choices(ChoicesPayload),
    /// Active vote, or `null` once it is resolved or discarded.
    Voting(Option<VotingView>),
    /// The game ended.
    End { podium: Vec<PodiumEntry> },
    /// Final message before the server drops the connection.
    Closed { error_code: ErrorCode },
}

impl ServerMessage {
    /// Wire name of the message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Players { .. } => "players",
            Self::SyncSettings(_) => "sync-settings",
            Self::NewRound(_) => "new-round",
            Self::Choices(_) => "choices",
            Self::Voting(_) => "voting",
            Self::End { .. } => "end",
            Self::Closed { .. } => "closed",
        }
    }
}

// ── Room listing ────────────────────────────────────────────────────

/// Public room summary returned by
/// [`RoomRegistry::public_rooms`](crate::registry::RoomRegistry::public_rooms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub started: bool,
    pub leader: Option<Identity>,
    /// Display names of everyone but the leader.
    pub players: Vec<String>,
    pub players_limit: u32,
    pub packs: Vec<PackId>,
    /// The viewer already holds a seat in this room.
    pub rejoin: bool,
}
