//! Room actor.
//!
//! Every room is one tokio task that owns its [`Game`], settings, vote and
//! timers. Connections, timers and the card-pool lookup all reach it as
//! [`RoomEvent`]s, handled strictly one at a time. The only work that runs
//! outside the task is card-pool resolution for `start`; its result comes back
//! as an event and is re-validated before anything is committed.

mod connection;
mod settings;
mod timers;
mod view;
mod voting;

use std::collections::HashSet;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{CardCatalog, CardPool, PoolRequest};
use crate::config::RoomConfig;
use crate::error::{GameError, Result, RoomError};
use crate::error_codes::ErrorCode;
use crate::game::{Game, Phase};
use crate::identity::Identity;
use crate::player::{ChoiceKey, PlayerId, Winner};
use crate::protocol::{
    CardId, ClientMessage, PartialSettings, Proposal, RoomId, RoomSummary, ServerMessage, Settings,
    UserId,
};

pub use connection::parse_client_message;
pub use settings::{validate_partial, validate_settings};

pub(crate) use connection::{refuse, run as run_connection, ConnectionHandle};

use timers::{RoundTimer, RoundTimerKind};
use voting::Voting;

/// Room-owned data attached to every player.
#[derive(Debug)]
pub(crate) struct Seat {
    identity: Identity,
    /// `None` while the player is disconnected.
    connection: Option<ConnectionHandle>,
    joined_at: Instant,
    /// Breaks ties between equal join instants.
    join_seq: u64,
}

impl Seat {
    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn send(&self, message: ServerMessage) {
        if let Some(connection) = &self.connection {
            connection.send(message);
        }
    }
}

/// Inputs of the room actor.
#[derive(Debug)]
pub(crate) enum RoomEvent {
    Attach {
        identity: Identity,
        connection: ConnectionHandle,
    },
    Inbound {
        connection: Uuid,
        message: ClientMessage,
    },
    Detached {
        connection: Uuid,
    },
    PoolResolved {
        requested_by: UserId,
        settings: Settings,
        result: Result<CardPool>,
    },
    Describe {
        viewer: Option<UserId>,
        reply: oneshot::Sender<(bool, RoomSummary)>,
    },
    Shutdown,
}

/// Cloneable sender into a room task.
#[derive(Debug, Clone)]
pub(crate) struct RoomHandle {
    tx: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    pub fn send(&self, event: RoomEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| RoomError::RoomClosed)
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<RoomEvent> {
        self.tx.clone()
    }

    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

/// The round that a verdict just closed, for the next `new-round` message.
#[derive(Debug, Clone)]
pub(crate) struct RoundResult {
    winner: Winner,
    winner_name: String,
    randomly_picked: bool,
}

/// Create a room and return its handle plus the actor future to spawn.
pub(crate) fn open(
    id: RoomId,
    creator: UserId,
    config: Arc<RoomConfig>,
    catalog: Arc<dyn CardCatalog>,
) -> (RoomHandle, impl Future<Output = ()> + Send) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = RoomHandle { tx: tx.clone() };
    let room = Room::new(id, creator, config, catalog, tx);
    (handle, room.run(rx))
}

pub(crate) struct Room {
    id: RoomId,
    creator: UserId,
    config: Arc<RoomConfig>,
    catalog: Arc<dyn CardCatalog>,
    /// Own sender, for work that finishes outside the task.
    events: mpsc::UnboundedSender<RoomEvent>,
    settings: Settings,
    game: Game<Seat>,
    kicked: HashSet<UserId>,
    voting: Option<Voting>,
    round_timer: Option<RoundTimer>,
    /// Armed until the first connection attaches.
    idle_deadline: Option<Instant>,
    start_pending: bool,
    next_join_seq: u64,
}

impl Room {
    fn new(
        id: RoomId,
        creator: UserId,
        config: Arc<RoomConfig>,
        catalog: Arc<dyn CardCatalog>,
        events: mpsc::UnboundedSender<RoomEvent>,
    ) -> Self {
        Self {
            settings: config.settings_bounds.initial_settings(),
            game: Game::new(config.base_hand_size),
            idle_deadline: Some(Instant::now() + config.idle_room_timeout),
            id,
            creator,
            config,
            catalog,
            events,
            kicked: HashSet::new(),
            voting: None,
            round_timer: None,
            start_pending: false,
            next_join_seq: 0,
        }
    }

    async fn run(mut self, mut events: mpsc::UnboundedReceiver<RoomEvent>) {
        info!(room_id = %self.id, creator = self.creator, "room opened");

        loop {
            let round_deadline = self.round_timer.map(|t| t.deadline);
            let voting_deadline = self.voting.as_ref().map(|v| v.deadline);

            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if self.handle(event).await.is_break() {
                        break;
                    }
                }
                () = timers::sleep_until(round_deadline) => self.on_round_deadline().await,
                () = timers::sleep_until(voting_deadline) => self.on_voting_expired().await,
                () = timers::sleep_until(self.idle_deadline) => {
                    info!(room_id = %self.id, "nobody joined, closing idle room");
                    break;
                }
            }
        }

        self.close_all(Some(ErrorCode::RoomClosed));
        info!(room_id = %self.id, "room closed");
    }

    async fn handle(&mut self, event: RoomEvent) -> ControlFlow<()> {
        match event {
            RoomEvent::Attach {
                identity,
                connection,
            } => self.on_attach(identity, connection).await,
            RoomEvent::Inbound {
                connection,
                message,
            } => {
                let Some(player) = self.player_by_connection(connection) else {
                    debug!(room_id = %self.id, %connection, "message from detached connection");
                    return ControlFlow::Continue(());
                };
                if let Err(e) = self.on_message(player, message).await {
                    warn!(room_id = %self.id, player, "rejected command: {e}");
                }
            }
            RoomEvent::Detached { connection } => return self.on_detached(connection),
            RoomEvent::PoolResolved {
                requested_by,
                settings,
                result,
            } => self.on_pool_resolved(requested_by, settings, result).await,
            RoomEvent::Describe { viewer, reply } => {
                let _ = reply.send((self.settings.public, self.summary(viewer)));
            }
            RoomEvent::Shutdown => {
                info!(room_id = %self.id, "room shut down by registry");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn on_message(&mut self, player: PlayerId, message: ClientMessage) -> Result<()> {
        match message {
            ClientMessage::SyncSettings(partial) => self.on_sync_settings(player, partial),
            ClientMessage::Start(settings) => self.on_start(player, settings),
            ClientMessage::Submit { cards } => self.on_submit(player, &cards).await,
            ClientMessage::Verdict { cards } => self.on_verdict(player, &cards, false).await,
            ClientMessage::VoteStart(proposal) => self.on_vote_start(player, proposal).await,
            ClientMessage::Vote { in_favor } => self.on_vote(player, in_favor).await,
            ClientMessage::Kick { target } => self.on_kick(player, target).await,
        }
    }

    // ── Lookups ─────────────────────────────────────────────────────

    fn seat(&self, player: PlayerId) -> Option<&Seat> {
        self.game.player(player).map(|p| &p.metadata)
    }

    fn user_of(&self, player: PlayerId) -> Option<UserId> {
        self.seat(player).map(|s| s.identity.id)
    }

    fn player_by_user(&self, user: UserId) -> Option<PlayerId> {
        self.game
            .players()
            .iter()
            .find(|p| p.metadata.identity.id == user)
            .map(|p| p.id())
    }

    fn player_by_connection(&self, connection: Uuid) -> Option<PlayerId> {
        self.game
            .players()
            .iter()
            .find(|p| {
                p.metadata
                    .connection
                    .as_ref()
                    .is_some_and(|c| c.id() == connection)
            })
            .map(|p| p.id())
    }

    fn connected_count(&self) -> usize {
        self.game
            .players()
            .iter()
            .filter(|p| p.metadata.is_connected())
            .count()
    }

    /// The creator while connected, otherwise the longest-seated connected
    /// player.
    fn leader(&self) -> Option<PlayerId> {
        let connected = self
            .game
            .players()
            .iter()
            .filter(|p| p.metadata.is_connected());
        if let Some(creator) = connected
            .clone()
            .find(|p| p.metadata.identity.id == self.creator)
        {
            return Some(creator.id());
        }
        connected
            .min_by_key(|p| (p.metadata.joined_at, p.metadata.join_seq))
            .map(|p| p.id())
    }

    fn require_leader(&self, player: PlayerId) -> Result<()> {
        if self.leader() != Some(player) {
            return Err(RoomError::InvalidMessage("only the leader may do this".into()));
        }
        Ok(())
    }

    // ── Connection lifecycle ────────────────────────────────────────

    async fn on_attach(&mut self, identity: Identity, connection: ConnectionHandle) {
        self.idle_deadline = None;
        let user = identity.id;

        let player = if let Some(player) = self.player_by_user(user) {
            let Some(seat) = self.game.player_mut(player).map(|p| &mut p.metadata) else {
                return;
            };
            if let Some(previous) = seat.connection.replace(connection) {
                previous.close(Some(ErrorCode::SessionReplaced));
            }
            seat.identity = identity;
            info!(room_id = %self.id, user_id = user, "player reconnected");
            player
        } else {
            if self.kicked.contains(&user) {
                info!(room_id = %self.id, user_id = user, "kicked user refused");
                connection.close(Some(ErrorCode::Kicked));
                return;
            }
            let limit = usize::try_from(self.settings.players_limit).unwrap_or(usize::MAX);
            if self.game.players().len() >= limit {
                info!(room_id = %self.id, user_id = user, "room full");
                connection.close(Some(ErrorCode::RoomFull));
                return;
            }
            let seat = Seat {
                identity,
                connection: Some(connection),
                joined_at: Instant::now(),
                join_seq: self.next_join_seq,
            };
            self.next_join_seq += 1;
            info!(room_id = %self.id, user_id = user, started = self.game.is_started(), "player joined");
            self.game.add_player(seat)
        };

        self.send_sync(player).await;
        self.broadcast_players(None);
    }

    fn on_detached(&mut self, connection: Uuid) -> ControlFlow<()> {
        let Some(player) = self.player_by_connection(connection) else {
            return ControlFlow::Continue(());
        };
        if let Some(seat) = self.game.player_mut(player).map(|p| &mut p.metadata) {
            seat.connection = None;
            info!(room_id = %self.id, user_id = seat.identity.id, "player disconnected");
        }

        if self.connected_count() == 0 {
            info!(room_id = %self.id, "everyone left");
            return ControlFlow::Break(());
        }
        if !self.game.is_started() {
            let _ = self.game.remove_player(player);
        }
        self.broadcast_players(None);
        ControlFlow::Continue(())
    }

    fn close_all(&mut self, code: Option<ErrorCode>) {
        for player in self.game.players_mut() {
            if let Some(connection) = player.metadata.connection.take() {
                connection.close(code);
            }
        }
    }

    // ── Settings and start ──────────────────────────────────────────

    fn on_sync_settings(&mut self, player: PlayerId, partial: PartialSettings) -> Result<()> {
        if self.game.is_started() {
            return Err(RoomError::Game(GameError::WrongPhase));
        }
        self.require_leader(player)?;
        settings::apply_partial(&mut self.settings, partial);
        debug!(room_id = %self.id, "settings updated");
        self.broadcast_except(player, ServerMessage::SyncSettings(self.settings.clone()));
        Ok(())
    }

    fn on_start(&mut self, player: PlayerId, mut settings: Settings) -> Result<()> {
        if self.game.is_started() || self.start_pending {
            return Err(RoomError::Game(GameError::WrongPhase));
        }
        self.require_leader(player)?;
        let leader = self
            .user_of(player)
            .ok_or(RoomError::Game(GameError::UnknownPlayer))?;

        settings.packs = settings::used_packs(settings.packs);
        let request = PoolRequest {
            packs: settings.packs.clone(),
            leader,
            participants: self
                .game
                .players()
                .iter()
                .map(|p| p.metadata.identity.id)
                .collect(),
        };

        self.start_pending = true;
        let catalog = Arc::clone(&self.catalog);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = catalog.card_pool(&request).await;
            let _ = events.send(RoomEvent::PoolResolved {
                requested_by: leader,
                settings,
                result,
            });
        });
        debug!(room_id = %self.id, leader, "resolving card pool");
        Ok(())
    }

    async fn on_pool_resolved(
        &mut self,
        requested_by: UserId,
        mut settings: Settings,
        result: Result<CardPool>,
    ) {
        self.start_pending = false;

        let still_leader = self
            .leader()
            .and_then(|p| self.user_of(p))
            .is_some_and(|u| u == requested_by);
        if self.game.is_started() || !still_leader {
            warn!(room_id = %self.id, "start abandoned: room changed while packs were resolving");
            return;
        }

        let pool = match result {
            Ok(pool) => pool,
            Err(e) => {
                error!(room_id = %self.id, "card pool resolution failed: {e}");
                return;
            }
        };

        settings.packs = pool.packs;
        if let Err(e) = self.game.set_cards(pool.whites, pool.blacks) {
            warn!(room_id = %self.id, "cannot load cards: {e}");
            return;
        }
        if let Err(e) = self.game.start() {
            warn!(room_id = %self.id, "cannot start game: {e}");
            return;
        }

        self.settings = settings;
        self.voting = None;
        info!(room_id = %self.id, players = self.game.players().len(), "game started");
        self.arm_round_timer(RoundTimerKind::Choice);
        self.broadcast_new_round(None, false).await;
    }

    // ── Round flow ──────────────────────────────────────────────────

    fn arm_round_timer(&mut self, kind: RoundTimerKind) {
        self.round_timer = self.settings.time_limit.map(|secs| {
            RoundTimer::arm(
                kind,
                Duration::from_secs(u64::from(secs)),
                self.config.time_limit_grace,
                Instant::now(),
            )
        });
    }

    async fn on_submit(&mut self, player: PlayerId, cards: &[CardId]) -> Result<()> {
        self.game.submit(player, cards)?;
        debug!(room_id = %self.id, player, "submission accepted");
        self.broadcast_players(None);
        if self.game.phase() == Phase::TsarVerdict {
            self.enter_verdict(&[]).await;
        }
        Ok(())
    }

    async fn enter_verdict(&mut self, afk: &[PlayerId]) {
        self.arm_round_timer(RoundTimerKind::Verdict);
        self.broadcast_choices(afk).await;
    }

    async fn on_verdict(
        &mut self,
        player: PlayerId,
        cards: &[CardId],
        randomly_picked: bool,
    ) -> Result<()> {
        let winner = self.game.resolve_verdict(player, cards)?;
        self.round_timer = None;

        let winner_points = self.game.player(winner.player).map_or(0, |p| p.points());
        let winner_name = self
            .seat(winner.player)
            .map(|s| s.identity.name.clone())
            .unwrap_or_default();
        info!(room_id = %self.id, winner = winner.player, randomly_picked, "round won");
        debug!(
            room_id = %self.id,
            black_card = winner.black_card,
            cards = %ChoiceKey::new(&winner.winning_cards),
            "winning submission"
        );

        let score_reached = self
            .settings
            .score_limit
            .is_some_and(|limit| winner_points >= limit);
        let rounds_reached = self
            .settings
            .round_limit
            .is_some_and(|limit| self.game.total_points() >= limit);
        if score_reached || rounds_reached {
            self.end_game();
            return Ok(());
        }

        if self.game.advance_round()? {
            self.arm_round_timer(RoundTimerKind::Choice);
            let result = RoundResult {
                winner,
                winner_name,
                randomly_picked,
            };
            self.broadcast_new_round(Some(result), false).await;
        } else {
            info!(room_id = %self.id, "black cards exhausted");
            self.end_game();
        }
        Ok(())
    }

    async fn on_round_deadline(&mut self) {
        let Some(timer) = self.round_timer.take() else {
            return;
        };
        match (timer.kind, self.game.phase()) {
            (RoundTimerKind::Choice, Phase::Choosing) => {
                let afk = self.game.auto_submit(&mut rand::thread_rng());
                match afk {
                    Ok(afk) => {
                        info!(room_id = %self.id, afk = afk.len(), "choice deadline passed");
                        self.broadcast_players(None);
                        if self.game.phase() == Phase::TsarVerdict {
                            self.enter_verdict(&afk).await;
                        }
                    }
                    Err(e) => {
                        warn!(room_id = %self.id, "cannot fill in missing choices: {e}");
                        self.end_game();
                    }
                }
            }
            (RoundTimerKind::Verdict, Phase::TsarVerdict) => {
                let pick = self.game.random_submission(&mut rand::thread_rng());
                let (Some(tsar), Some(cards)) = (self.game.tsar(), pick) else {
                    return;
                };
                info!(room_id = %self.id, "verdict deadline passed, picking at random");
                if let Err(e) = self.on_verdict(tsar, &cards, true).await {
                    warn!(room_id = %self.id, "random verdict failed: {e}");
                }
            }
            (kind, phase) => {
                debug!(room_id = %self.id, ?kind, ?phase, "stale round deadline");
            }
        }
    }

    /// End the game, broadcast the podium and drop seats whose players are gone.
    fn end_game(&mut self) {
        let standings = self.game.end();
        self.round_timer = None;
        if self.voting.take().is_some() {
            self.broadcast(ServerMessage::Voting(None));
        }
        info!(room_id = %self.id, "game ended");
        self.broadcast_end(&standings);

        let gone: Vec<PlayerId> = self
            .game
            .players()
            .iter()
            .filter(|p| !p.metadata.is_connected())
            .map(|p| p.id())
            .collect();
        for player in gone {
            let _ = self.game.remove_player(player);
        }
        self.broadcast_players(None);
    }

    // ── Voting and kicks ────────────────────────────────────────────

    /// Settle a vote whose window has run out but whose deadline arm has not
    /// fired yet.
    async fn settle_expired_voting(&mut self) {
        let now = Instant::now();
        if self.voting.as_ref().is_some_and(|v| v.is_expired(now)) {
            self.on_voting_expired().await;
        }
    }

    async fn on_vote_start(&mut self, player: PlayerId, proposal: Proposal) -> Result<()> {
        self.settle_expired_voting().await;
        if !self.game.is_started() {
            return Err(RoomError::Game(GameError::WrongPhase));
        }
        if self.voting.is_some() {
            debug!(room_id = %self.id, "vote already running");
            return Ok(());
        }
        let proposer = self
            .seat(player)
            .map(|s| s.identity.clone())
            .ok_or(RoomError::Game(GameError::UnknownPlayer))?;

        if let Proposal::Kick { target } = proposal {
            if self.game.players().len() < 3 {
                return Err(RoomError::InvalidMessage(
                    "kick votes need at least three players".into(),
                ));
            }
            if target == proposer.id || self.player_by_user(target).is_none() {
                return Err(RoomError::InvalidMessage("invalid kick target".into()));
            }
        }

        info!(room_id = %self.id, user_id = proposer.id, ?proposal, "vote started");
        self.voting = Some(Voting::new(
            proposal,
            proposer.id,
            proposer.name,
            Instant::now(),
            self.config.voting_window,
        ));
        // A fresh kick vote can already be decided when few players are connected.
        if self.voting_decided() {
            self.resolve_voting().await;
        } else {
            self.broadcast_voting();
        }
        Ok(())
    }

    async fn on_vote(&mut self, player: PlayerId, in_favor: bool) -> Result<()> {
        self.settle_expired_voting().await;
        if !self.game.is_started() {
            return Err(RoomError::Game(GameError::WrongPhase));
        }
        let user = self
            .user_of(player)
            .ok_or(RoomError::Game(GameError::UnknownPlayer))?;
        let Some(voting) = self.voting.as_mut() else {
            return Err(RoomError::InvalidMessage("no vote is running".into()));
        };
        if !voting.cast(user, in_favor) {
            debug!(room_id = %self.id, user_id = user, "repeat ballot ignored");
            return Ok(());
        }
        if self.voting_decided() {
            self.resolve_voting().await;
        } else {
            self.broadcast_voting();
        }
        Ok(())
    }

    fn voting_decided(&self) -> bool {
        self.voting
            .as_ref()
            .is_some_and(|v| v.is_decided(self.game.players().len(), self.connected_count()))
    }

    async fn resolve_voting(&mut self) {
        let Some(voting) = self.voting.take() else {
            return;
        };
        let passed = voting.passed();
        info!(room_id = %self.id, proposal = ?voting.proposal, passed, "vote resolved");
        if passed {
            match voting.proposal {
                Proposal::End => self.end_game(),
                Proposal::Kick { target } => self.kick(target).await,
            }
        }
        self.broadcast(ServerMessage::Voting(None));
    }

    /// A vote nobody else took part in is dropped; otherwise the ballots cast
    /// so far decide it.
    async fn on_voting_expired(&mut self) {
        let Some(touched) = self.voting.as_ref().map(Voting::is_touched) else {
            return;
        };
        if touched {
            self.resolve_voting().await;
        } else {
            self.voting = None;
            info!(room_id = %self.id, "vote expired");
            self.broadcast(ServerMessage::Voting(None));
        }
    }

    async fn on_kick(&mut self, player: PlayerId, target: UserId) -> Result<()> {
        self.require_leader(player)?;
        if self.user_of(player) == Some(target) {
            return Err(RoomError::InvalidMessage("the leader cannot kick themselves".into()));
        }
        if self.player_by_user(target).is_none() {
            return Err(RoomError::InvalidMessage("invalid kick target".into()));
        }
        self.kick(target).await;
        Ok(())
    }

    /// Remove a user for the rest of the room's lifetime.
    async fn kick(&mut self, target: UserId) {
        let Some(player) = self.player_by_user(target) else {
            return;
        };
        let phase_before = self.game.phase();
        let removed = match self.game.remove_player(player) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(room_id = %self.id, "kick failed: {e}");
                return;
            }
        };
        self.kicked.insert(target);
        if let Some(connection) = &removed.player.metadata.connection {
            connection.close(Some(ErrorCode::Kicked));
        }
        info!(room_id = %self.id, user_id = target, round_restarted = removed.round_restarted, "player kicked");

        if !self.game.is_started() {
            self.broadcast_players(None);
            return;
        }
        if !removed.can_continue {
            self.end_game();
            return;
        }
        if removed.round_restarted {
            self.arm_round_timer(RoundTimerKind::Choice);
            self.broadcast_new_round(None, true).await;
            return;
        }

        let kicked_choice = Some(removed.player.choice().to_vec()).filter(|c| !c.is_empty());
        self.broadcast_players(kicked_choice);
        if phase_before == Phase::Choosing && self.game.phase() == Phase::TsarVerdict {
            self.enter_verdict(&[]).await;
        }
    }

    // ── Listing ─────────────────────────────────────────────────────

    fn summary(&self, viewer: Option<UserId>) -> RoomSummary {
        let leader = self.leader();
        RoomSummary {
            id: self.id.clone(),
            name: self.settings.name.clone(),
            started: self.game.is_started(),
            leader: leader.and_then(|p| self.seat(p)).map(|s| s.identity.clone()),
            players: self
                .game
                .players()
                .iter()
                .filter(|p| Some(p.id()) != leader)
                .map(|p| p.metadata.identity.name.clone())
                .collect(),
            players_limit: self.settings.players_limit,
            packs: self.settings.packs.iter().map(|p| p.id).collect(),
            rejoin: viewer.is_some_and(|v| self.player_by_user(v).is_some()),
        }
    }
}
