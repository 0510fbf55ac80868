//! Rendering room state into per-viewer server messages.

use tokio::time::Instant;
use tracing::{error, trace};

use super::{Room, RoundResult};
use crate::error::Result;
use crate::game::{Phase, Standing};
use crate::player::PlayerId;
use crate::protocol::{
    CardId, ChoicesPayload, NewRoundPayload, PlayerView, PodiumEntry, PrevRound, ServerMessage,
    SyncPayload, SyncRound,
};

impl Room {
    pub(super) fn send_to(&self, player: PlayerId, message: ServerMessage) {
        if let Some(seat) = self.seat(player) {
            seat.send(message);
        }
    }

    pub(super) fn broadcast(&self, message: ServerMessage) {
        trace!(room_id = %self.id, kind = message.kind(), "broadcast");
        for player in self.game.players() {
            player.metadata.send(message.clone());
        }
    }

    pub(super) fn broadcast_except(&self, except: PlayerId, message: ServerMessage) {
        for player in self.game.players().iter().filter(|p| p.id() != except) {
            player.metadata.send(message.clone());
        }
    }

    pub(super) fn broadcast_players(&self, kicked_choice: Option<Vec<CardId>>) {
        let leader = self.leader();
        let tsar = self.game.tsar();
        let players = self
            .game
            .players()
            .iter()
            .map(|p| PlayerView {
                user: p.metadata.identity.clone(),
                leader: Some(p.id()) == leader,
                connected: p.metadata.is_connected(),
                tsar: Some(p.id()) == tsar,
                ready: p.has_submitted(),
                points: p.points(),
            })
            .collect();
        self.broadcast(ServerMessage::Players {
            players,
            kicked_choice,
        });
    }

    /// Seconds left on the running round timer.
    fn time_limit(&self) -> Option<u64> {
        self.round_timer
            .as_ref()
            .map(|t| t.remaining_secs(Instant::now()))
    }

    // ── Sync ────────────────────────────────────────────────────────

    pub(super) async fn send_sync(&self, player: PlayerId) {
        match self.render_sync(player).await {
            Ok(payload) => self.send_to(player, ServerMessage::Sync(Box::new(payload))),
            Err(e) => error!(room_id = %self.id, player, "failed to render sync: {e}"),
        }
    }

    async fn render_sync(&self, player: PlayerId) -> Result<SyncPayload> {
        Ok(SyncPayload {
            room_id: self.id.clone(),
            settings_bounds: self.config.settings_bounds.clone(),
            current_settings: self.settings.clone(),
            started: self.game.is_started(),
            round: self.render_sync_round(player).await?,
        })
    }

    async fn render_sync_round(&self, player: PlayerId) -> Result<Option<SyncRound>> {
        let (Some(black), Some(me)) = (self.game.black_card(), self.game.player(player)) else {
            return Ok(None);
        };
        if !self.game.is_started() {
            return Ok(None);
        }

        let choices = if self.game.phase() == Phase::TsarVerdict {
            Some(self.catalog.white_card_groups(&self.game.choices()).await?)
        } else {
            None
        };
        let now = Instant::now();

        Ok(Some(SyncRound {
            tsar: self.game.is_tsar(player),
            black_card: self.catalog.black_card(black.id).await?,
            cards: self.catalog.white_cards(me.hand()).await?,
            choices,
            submitted: me.has_submitted(),
            voting: self
                .voting
                .as_ref()
                .map(|v| v.view(me.metadata.identity.id, now)),
            time_limit: self.time_limit(),
        }))
    }

    // ── Rounds ──────────────────────────────────────────────────────

    pub(super) async fn broadcast_new_round(&self, prev: Option<RoundResult>, round_restart: bool) {
        match self.render_new_round(prev, round_restart).await {
            Ok(messages) => {
                for (player, payload) in messages {
                    self.send_to(player, ServerMessage::NewRound(Box::new(payload)));
                }
            }
            Err(e) => error!(room_id = %self.id, "failed to render new round: {e}"),
        }
        self.broadcast_players(None);
    }

    async fn render_new_round(
        &self,
        prev: Option<RoundResult>,
        round_restart: bool,
    ) -> Result<Vec<(PlayerId, NewRoundPayload)>> {
        let Some(black) = self.game.black_card() else {
            return Ok(Vec::new());
        };
        let black_card = self.catalog.black_card(black.id).await?;

        let prev_round = match &prev {
            Some(result) => Some(PrevRound {
                winner: result.winner_name.clone(),
                black_card: self.catalog.black_card(result.winner.black_card).await?,
                winning_cards: self
                    .catalog
                    .white_cards(&result.winner.winning_cards)
                    .await?,
                im_winner: false,
                randomly_picked: result.randomly_picked,
            }),
            None => None,
        };
        let winner = prev.as_ref().map(|r| r.winner.player);
        let time_limit = self.time_limit();

        let mut messages = Vec::with_capacity(self.game.players().len());
        for player in self.game.players() {
            let prev_round = prev_round.clone().map(|mut p| {
                p.im_winner = winner == Some(player.id());
                p
            });
            messages.push((
                player.id(),
                NewRoundPayload {
                    black_card: black_card.clone(),
                    cards: self.catalog.white_cards(player.hand()).await?,
                    tsar: self.game.is_tsar(player.id()),
                    time_limit,
                    round_restart,
                    prev_round,
                },
            ));
        }
        Ok(messages)
    }

    /// Reveal every submission. `afk` players are told which cards were
    /// picked for them.
    pub(super) async fn broadcast_choices(&self, afk: &[PlayerId]) {
        let choices = match self.catalog.white_card_groups(&self.game.choices()).await {
            Ok(choices) => choices,
            Err(e) => {
                error!(room_id = %self.id, "failed to render choices: {e}");
                return;
            }
        };
        let time_limit = self.time_limit();
        for player in self.game.players() {
            let picked_cards = afk
                .contains(&player.id())
                .then(|| player.choice().to_vec());
            player.metadata.send(ServerMessage::Choices(ChoicesPayload {
                choices: choices.clone(),
                picked_cards,
                time_limit,
            }));
        }
    }

    // ── Voting and end ──────────────────────────────────────────────

    pub(super) fn broadcast_voting(&self) {
        let Some(voting) = &self.voting else {
            self.broadcast(ServerMessage::Voting(None));
            return;
        };
        let now = Instant::now();
        for player in self.game.players() {
            let view = voting.view(player.metadata.identity.id, now);
            player.metadata.send(ServerMessage::Voting(Some(view)));
        }
    }

    pub(super) fn broadcast_end(&self, standings: &[Standing]) {
        let podium = standings
            .iter()
            .enumerate()
            .filter_map(|(i, standing)| {
                self.seat(standing.player).map(|seat| PodiumEntry {
                    user: seat.identity.clone(),
                    place: i + 1,
                    points: standing.points,
                })
            })
            .collect();
        self.broadcast(ServerMessage::End { podium });
    }
}
