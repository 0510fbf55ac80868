//! The authoritative turn state machine.
//!
//! ```text
//! NotStarted ──start──▶ Choosing ──all submitted──▶ TsarVerdict
//!      ▲                   ▲                            │
//!      │                   └──────advance_round─────────┘
//!      └──────────────────────────end────────────────────┘
//! ```
//!
//! The table order is fixed by [`Game::start`]; tsar rotation and podium ties
//! follow it. Only [`Game::remove_player`] edits the roster mid-game.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::deck::{BlackCard, Deck};
use crate::error::GameError;
use crate::player::{ChoiceKey, Player, PlayerId, Winner};
use crate::protocol::CardId;

/// Hand size used when a game is built without an explicit one.
pub const DEFAULT_BASE_HAND_SIZE: usize = 10;

/// Game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    NotStarted,
    Choosing,
    TsarVerdict,
}

/// One podium entry: a player and the points they finished with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub player: PlayerId,
    pub points: u32,
}

/// Result of [`Game::remove_player`].
#[derive(Debug)]
pub struct Removed<M> {
    /// The removed player, including whatever choice they had submitted.
    pub player: Player<M>,
    /// The removed player was the tsar and the round was restarted.
    pub round_restarted: bool,
    /// The game can go on; `false` when it is started but fewer than two
    /// players remain or no black card was left for the restart.
    pub can_continue: bool,
}

#[derive(Debug, Clone)]
pub struct Game<M> {
    phase: Phase,
    deck: Deck,
    black_card: Option<BlackCard>,
    tsar: Option<PlayerId>,
    players: Vec<Player<M>>,
    /// Non-tsar players in the anonymized order their choices are revealed.
    reveal_order: Vec<PlayerId>,
    /// Set once the tsar has picked this round's winner.
    round_winner: Option<PlayerId>,
    base_hand_size: usize,
    next_player_id: PlayerId,
}

impl<M> Default for Game<M> {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_HAND_SIZE)
    }
}

impl<M> Game<M> {
    pub fn new(base_hand_size: usize) -> Self {
        Self {
            phase: Phase::NotStarted,
            deck: Deck::default(),
            black_card: None,
            tsar: None,
            players: Vec::new(),
            reveal_order: Vec::new(),
            round_winner: None,
            base_hand_size: base_hand_size.max(1),
            next_player_id: 1,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase != Phase::NotStarted
    }

    pub fn black_card(&self) -> Option<&BlackCard> {
        self.black_card.as_ref()
    }

    pub fn tsar(&self) -> Option<PlayerId> {
        self.tsar
    }

    pub fn is_tsar(&self, player: PlayerId) -> bool {
        self.tsar == Some(player)
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn base_hand_size(&self) -> usize {
        self.base_hand_size
    }

    /// Players in table order.
    pub fn players(&self) -> &[Player<M>] {
        &self.players
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player<M>> {
        self.players.iter_mut()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player<M>> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player<M>> {
        self.players.iter_mut().find(|p| p.id() == id)
    }

    pub fn total_points(&self) -> u32 {
        self.players.iter().map(Player::points).sum()
    }

    /// Submitted choices in reveal order. Empty outside [`Phase::TsarVerdict`].
    pub fn choices(&self) -> Vec<Vec<CardId>> {
        if self.phase != Phase::TsarVerdict {
            return Vec::new();
        }
        self.reveal_order
            .iter()
            .filter_map(|id| self.player(*id))
            .map(|p| p.choice().to_vec())
            .collect()
    }

    // ── Roster ──────────────────────────────────────────────────────

    /// Replace both piles. Only allowed before the game starts.
    pub fn set_cards(
        &mut self,
        whites: Vec<CardId>,
        blacks: Vec<BlackCard>,
    ) -> Result<(), GameError> {
        if self.is_started() {
            return Err(GameError::WrongPhase);
        }
        self.deck = Deck::new(whites, blacks);
        Ok(())
    }

    /// Seat a new player at the end of the table. In a running game the
    /// newcomer is dealt a hand straight away.
    pub fn add_player(&mut self, metadata: M) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id = self.next_player_id.wrapping_add(1);
        let mut player = Player::new(id, metadata);
        if self.is_started() {
            let draw = self.black_card.map_or(0, |b| b.draw);
            self.deck
                .deal_to(&mut player, self.base_hand_size.saturating_add(draw));
        }
        self.players.push(player);
        id
    }

    /// Remove a player from the table.
    ///
    /// Removing the tsar of a running game undoes the round: every submitted
    /// choice goes back to its owner, the next player in table order becomes
    /// tsar and a fresh black card is drawn. Removing anyone else is a roster
    /// edit followed by the submission completion check.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Removed<M>, GameError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id() == id)
            .ok_or(GameError::UnknownPlayer)?;
        let was_tsar = self.is_tsar(id);
        let player = self.players.remove(index);

        if !self.is_started() {
            if was_tsar {
                self.tsar = None;
            }
            return Ok(Removed {
                player,
                round_restarted: false,
                can_continue: true,
            });
        }

        self.reveal_order.retain(|p| *p != id);

        if !was_tsar {
            self.check_all_submitted();
            return Ok(Removed {
                player,
                round_restarted: false,
                can_continue: self.players.len() >= 2,
            });
        }

        for remaining in &mut self.players {
            remaining.return_choice();
        }
        self.reveal_order.clear();
        self.round_winner = None;
        self.tsar = if self.players.is_empty() {
            None
        } else {
            self.players
                .get(index % self.players.len())
                .map(Player::id)
        };

        let can_continue = match self.deck.pop_black() {
            Some(black) if self.players.len() >= 2 => {
                self.black_card = Some(black);
                self.deal();
                self.phase = Phase::Choosing;
                true
            }
            _ => false,
        };

        Ok(Removed {
            player,
            round_restarted: true,
            can_continue,
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Shuffle decks and table order and play the first round.
    pub fn start(&mut self) -> Result<(), GameError> {
        self.start_with(&mut rand::thread_rng())
    }

    pub fn start_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        if self.is_started() {
            return Err(GameError::WrongPhase);
        }
        if self.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }
        self.deck.shuffle_with(rng);
        let extra_draw = self.deck.peek_black().map_or(0, |b| b.draw);
        if !self
            .deck
            .sufficient_for(self.players.len(), self.base_hand_size, extra_draw)
        {
            return Err(GameError::NotEnoughCards);
        }

        self.players.shuffle(rng);
        self.tsar = None;
        if self.begin_round() {
            Ok(())
        } else {
            Err(GameError::NotEnoughCards)
        }
    }

    /// Move on to the next round after a verdict.
    ///
    /// Returns `Ok(false)` when the black pile is exhausted; the phase is left
    /// untouched and the caller is expected to [`end`](Self::end) the game.
    pub fn advance_round(&mut self) -> Result<bool, GameError> {
        if self.phase != Phase::TsarVerdict || self.round_winner.is_none() {
            return Err(GameError::WrongPhase);
        }
        Ok(self.begin_round())
    }

    /// Finish the game and return the podium, highest score first. Ties keep
    /// table order. Every per-game field, scores included, is reset.
    pub fn end(&mut self) -> Vec<Standing> {
        let mut podium: Vec<Standing> = self
            .players
            .iter()
            .map(|p| Standing {
                player: p.id(),
                points: p.points(),
            })
            .collect();
        podium.sort_by(|a, b| b.points.cmp(&a.points));

        self.phase = Phase::NotStarted;
        self.tsar = None;
        self.black_card = None;
        self.reveal_order.clear();
        self.round_winner = None;
        self.deck.clear();
        for player in &mut self.players {
            player.reset();
        }
        podium
    }

    // ── Round actions ───────────────────────────────────────────────

    /// Submit white cards for the current black card.
    pub fn submit(&mut self, id: PlayerId, cards: &[CardId]) -> Result<(), GameError> {
        if self.phase != Phase::Choosing {
            return Err(GameError::WrongPhase);
        }
        if self.is_tsar(id) {
            return Err(GameError::InvalidSubmission);
        }
        let pick = self
            .black_card
            .map(|b| b.pick)
            .ok_or(GameError::WrongPhase)?;
        let player = self.player_mut(id).ok_or(GameError::UnknownPlayer)?;
        player.choose(cards, pick)?;
        self.check_all_submitted();
        Ok(())
    }

    /// Auto-submit a uniformly random legal choice for every non-tsar player
    /// who has not submitted yet. Returns the players that were filled in.
    ///
    /// Fails with [`GameError::NotEnoughCards`] without touching anything when
    /// one of them holds fewer cards than the black card asks for.
    pub fn auto_submit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<PlayerId>, GameError> {
        if self.phase != Phase::Choosing {
            return Err(GameError::WrongPhase);
        }
        let pick = self
            .black_card
            .map(|b| b.pick)
            .ok_or(GameError::WrongPhase)?;
        let tsar = self.tsar;
        let pending: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| Some(p.id()) != tsar && !p.has_submitted())
            .map(Player::id)
            .collect();
        if pending
            .iter()
            .filter_map(|id| self.player(*id))
            .any(|p| p.hand().len() < pick)
        {
            return Err(GameError::NotEnoughCards);
        }

        for id in &pending {
            if let Some(player) = self.player_mut(*id) {
                let picked: Vec<CardId> =
                    player.hand().choose_multiple(rng, pick).copied().collect();
                player.choose(&picked, pick)?;
            }
        }
        self.check_all_submitted();
        Ok(pending)
    }

    /// Pick the round's winner by naming their cards in any order.
    pub fn resolve_verdict(&mut self, id: PlayerId, cards: &[CardId]) -> Result<Winner, GameError> {
        if self.player(id).is_none() {
            return Err(GameError::UnknownPlayer);
        }
        if self.phase != Phase::TsarVerdict || self.round_winner.is_some() {
            return Err(GameError::WrongPhase);
        }
        if !self.is_tsar(id) {
            return Err(GameError::NotTsar);
        }
        let black_card = self.black_card.map(|b| b.id).ok_or(GameError::WrongPhase)?;
        let key = ChoiceKey::new(cards);
        let tsar = self.tsar;
        let winner = self
            .players
            .iter_mut()
            .filter(|p| Some(p.id()) != tsar)
            .find(|p| p.choice_key().as_ref() == Some(&key))
            .ok_or(GameError::NoMatchingSubmission)?;

        winner.award_point();
        let result = Winner {
            player: winner.id(),
            black_card,
            winning_cards: winner.choice().to_vec(),
        };
        self.round_winner = Some(result.player);
        Ok(result)
    }

    /// A uniformly random submitted choice, used when the tsar runs out of time.
    pub fn random_submission<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<CardId>> {
        let submitted: Vec<&Player<M>> = self
            .players
            .iter()
            .filter(|p| !self.is_tsar(p.id()) && p.has_submitted())
            .collect();
        submitted.choose(rng).map(|p| p.choice().to_vec())
    }

    // ── Internals ───────────────────────────────────────────────────

    fn begin_round(&mut self) -> bool {
        let Some(black) = self.deck.pop_black() else {
            return false;
        };
        for player in &mut self.players {
            player.clear_choice();
        }
        self.tsar = self.next_tsar();
        self.black_card = Some(black);
        self.reveal_order.clear();
        self.round_winner = None;
        self.deal();
        self.phase = Phase::Choosing;
        true
    }

    fn next_tsar(&self) -> Option<PlayerId> {
        let current = self
            .tsar
            .and_then(|id| self.players.iter().position(|p| p.id() == id));
        let next = match current {
            Some(index) => (index + 1) % self.players.len().max(1),
            None => 0,
        };
        self.players.get(next).map(Player::id)
    }

    fn deal(&mut self) {
        let draw = self.black_card.map_or(0, |b| b.draw);
        let tsar = self.tsar;
        let base = self.base_hand_size;
        for player in &mut self.players {
            let target = if Some(player.id()) == tsar {
                base
            } else {
                base.saturating_add(draw)
            };
            self.deck.deal_to(player, target);
        }
    }

    fn check_all_submitted(&mut self) {
        if self.phase != Phase::Choosing {
            return;
        }
        let tsar = self.tsar;
        let mut contenders = self
            .players
            .iter()
            .filter(|p| Some(p.id()) != tsar)
            .peekable();
        if contenders.peek().is_none() {
            return;
        }
        if contenders.all(Player::has_submitted) {
            let mut order: Vec<PlayerId> = self
                .players
                .iter()
                .filter(|p| Some(p.id()) != tsar)
                .map(Player::id)
                .collect();
            order.shuffle(&mut rand::thread_rng());
            self.reveal_order = order;
            self.phase = Phase::TsarVerdict;
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const HAND: usize = 3;

    fn blacks(n: u64, pick: usize, draw: usize) -> Vec<BlackCard> {
        (0..n).map(|i| BlackCard::new(1000 + i, pick, draw)).collect()
    }

    fn game_with(players: usize, whites: u64, blacks: Vec<BlackCard>) -> Game<usize> {
        let mut game = Game::new(HAND);
        for seat in 0..players {
            game.add_player(seat);
        }
        game.set_cards((1..=whites).collect(), blacks).unwrap();
        game
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn non_tsars(game: &Game<usize>) -> Vec<PlayerId> {
        game.players()
            .iter()
            .map(Player::id)
            .filter(|id| !game.is_tsar(*id))
            .collect()
    }

    fn submit_first_cards(game: &mut Game<usize>, id: PlayerId) -> Vec<CardId> {
        let pick = game.black_card().unwrap().pick;
        let cards: Vec<CardId> = game.player(id).unwrap().hand()[..pick].to_vec();
        game.submit(id, &cards).unwrap();
        cards
    }

    #[test]
    fn start_requires_two_players() {
        let mut game = game_with(1, 100, blacks(5, 1, 0));
        assert_eq!(game.start_with(&mut rng()), Err(GameError::NotEnoughPlayers));
        assert_eq!(game.phase(), Phase::NotStarted);
    }

    #[test]
    fn start_requires_enough_cards() {
        let mut game = game_with(3, 8, blacks(5, 1, 0));
        assert_eq!(game.start_with(&mut rng()), Err(GameError::NotEnoughCards));
        assert_eq!(game.phase(), Phase::NotStarted);
        assert!(game.tsar().is_none());

        let mut no_blacks = game_with(2, 100, Vec::new());
        assert_eq!(no_blacks.start_with(&mut rng()), Err(GameError::NotEnoughCards));
    }

    #[test]
    fn start_deals_and_picks_first_tsar() {
        let mut game = game_with(3, 100, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        assert_eq!(game.phase(), Phase::Choosing);
        assert_eq!(game.tsar(), Some(game.players()[0].id()));
        assert!(game.black_card().is_some());
        for player in game.players() {
            assert_eq!(player.hand().len(), HAND);
        }
        assert_eq!(game.start_with(&mut rng()), Err(GameError::WrongPhase));
    }

    #[test]
    fn draw_tops_up_non_tsars_only() {
        let mut game = game_with(3, 100, blacks(5, 2, 1));
        game.start_with(&mut rng()).unwrap();
        for player in game.players() {
            let expected = if game.is_tsar(player.id()) { HAND } else { HAND + 1 };
            assert_eq!(player.hand().len(), expected);
        }
    }

    #[test]
    fn submission_pick_never_exceeds_black_card() {
        for seed in 0..20 {
            let mut game = game_with(4, 200, blacks(10, 2, 1));
            game.start_with(&mut StdRng::seed_from_u64(seed)).unwrap();
            let pick = game.black_card().unwrap().pick;
            for id in non_tsars(&game) {
                let hand = game.player(id).unwrap().hand().to_vec();
                assert_eq!(
                    game.submit(id, &hand[..pick + 1]),
                    Err(GameError::InvalidSubmission)
                );
                assert!(hand.len() >= pick);
            }
        }
    }

    #[test]
    fn phase_moves_to_verdict_only_after_every_submission() {
        let mut game = game_with(3, 100, blacks(5, 2, 1));
        game.start_with(&mut rng()).unwrap();
        let contenders = non_tsars(&game);
        assert_eq!(contenders.len(), 2);

        submit_first_cards(&mut game, contenders[0]);
        assert_eq!(game.phase(), Phase::Choosing);
        assert!(game.choices().is_empty());

        submit_first_cards(&mut game, contenders[1]);
        assert_eq!(game.phase(), Phase::TsarVerdict);
        assert_eq!(game.choices().len(), 2);
        assert!(game.choices().iter().all(|c| c.len() == 2));
    }

    #[test]
    fn tsar_cannot_submit() {
        let mut game = game_with(2, 100, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let tsar = game.tsar().unwrap();
        let card = game.player(tsar).unwrap().hand()[0];
        assert_eq!(game.submit(tsar, &[card]), Err(GameError::InvalidSubmission));
    }

    #[test]
    fn verdict_matches_any_permutation() {
        let mut game = game_with(3, 100, blacks(5, 2, 0));
        game.start_with(&mut rng()).unwrap();
        let contenders = non_tsars(&game);
        let winning = submit_first_cards(&mut game, contenders[0]);
        submit_first_cards(&mut game, contenders[1]);

        let tsar = game.tsar().unwrap();
        let reversed: Vec<CardId> = winning.iter().rev().copied().collect();
        let winner = game.resolve_verdict(tsar, &reversed).unwrap();
        assert_eq!(winner.player, contenders[0]);
        assert_eq!(winner.winning_cards, winning);
        assert_eq!(game.player(contenders[0]).unwrap().points(), 1);
    }

    #[test]
    fn verdict_errors() {
        let mut game = game_with(3, 100, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let tsar = game.tsar().unwrap();
        let contenders = non_tsars(&game);
        assert_eq!(game.resolve_verdict(tsar, &[1]), Err(GameError::WrongPhase));

        let card = submit_first_cards(&mut game, contenders[0]);
        submit_first_cards(&mut game, contenders[1]);
        assert_eq!(
            game.resolve_verdict(contenders[0], &card),
            Err(GameError::NotTsar)
        );
        assert_eq!(
            game.resolve_verdict(tsar, &[999_999]),
            Err(GameError::NoMatchingSubmission)
        );
        game.resolve_verdict(tsar, &card).unwrap();
        assert_eq!(game.resolve_verdict(tsar, &card), Err(GameError::WrongPhase));
    }

    #[test]
    fn advance_round_is_gated_by_phase() {
        let mut game = game_with(3, 100, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        assert_eq!(game.advance_round(), Err(GameError::WrongPhase));

        let contenders = non_tsars(&game);
        let card = submit_first_cards(&mut game, contenders[0]);
        submit_first_cards(&mut game, contenders[1]);
        assert_eq!(game.advance_round(), Err(GameError::WrongPhase));

        let tsar = game.tsar().unwrap();
        game.resolve_verdict(tsar, &card).unwrap();
        assert_eq!(game.advance_round(), Ok(true));
        assert_eq!(game.advance_round(), Err(GameError::WrongPhase));
    }

    #[test]
    fn tsar_rotates_in_table_order_and_wraps() {
        let mut game = game_with(3, 300, blacks(10, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let order: Vec<PlayerId> = game.players().iter().map(Player::id).collect();
        for round in 0..6 {
            assert_eq!(game.tsar(), Some(order[round % 3]));
            let contenders = non_tsars(&game);
            let card = submit_first_cards(&mut game, contenders[0]);
            submit_first_cards(&mut game, contenders[1]);
            game.resolve_verdict(game.tsar().unwrap(), &card).unwrap();
            assert!(game.advance_round().unwrap());
        }
    }

    #[test]
    fn advance_round_reports_exhausted_black_pile() {
        let mut game = game_with(2, 100, blacks(1, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let contender = non_tsars(&game)[0];
        let card = submit_first_cards(&mut game, contender);
        game.resolve_verdict(game.tsar().unwrap(), &card).unwrap();
        assert_eq!(game.advance_round(), Ok(false));
        assert_eq!(game.phase(), Phase::TsarVerdict);
    }

    #[test]
    fn podium_is_stable_on_ties() {
        let mut game = game_with(4, 100, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let order: Vec<PlayerId> = game.players().iter().map(Player::id).collect();
        let points = [1, 3, 1, 3];
        for (id, pts) in order.iter().zip(points) {
            for _ in 0..pts {
                game.player_mut(*id).unwrap().award_point();
            }
        }
        let podium = game.end();
        let ids: Vec<PlayerId> = podium.iter().map(|s| s.player).collect();
        assert_eq!(ids, vec![order[1], order[3], order[0], order[2]]);
        assert_eq!(podium[0].points, 3);

        assert_eq!(game.phase(), Phase::NotStarted);
        assert!(game.tsar().is_none());
        assert!(game.black_card().is_none());
        for player in game.players() {
            assert_eq!(player.points(), 0);
            assert!(player.hand().is_empty());
        }
    }

    #[test]
    fn removing_tsar_during_verdict_restarts_round() {
        let mut game = game_with(4, 200, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let order: Vec<PlayerId> = game.players().iter().map(Player::id).collect();
        let old_black = game.black_card().unwrap().id;
        for id in non_tsars(&game) {
            submit_first_cards(&mut game, id);
        }
        assert_eq!(game.phase(), Phase::TsarVerdict);
        let held_before: Vec<usize> = order[1..]
            .iter()
            .map(|id| game.player(*id).unwrap().held())
            .collect();

        let removed = game.remove_player(order[0]).unwrap();
        assert!(removed.round_restarted);
        assert!(removed.can_continue);
        assert_eq!(game.phase(), Phase::Choosing);
        assert_eq!(game.tsar(), Some(order[1]));
        assert_ne!(game.black_card().unwrap().id, old_black);
        for (id, before) in order[1..].iter().zip(held_before) {
            let player = game.player(*id).unwrap();
            assert!(!player.has_submitted());
            assert!(player.hand().len() >= before);
            assert_eq!(player.points(), 0);
        }
    }

    #[test]
    fn removing_last_pending_player_completes_submissions() {
        let mut game = game_with(4, 200, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let contenders = non_tsars(&game);
        submit_first_cards(&mut game, contenders[0]);
        submit_first_cards(&mut game, contenders[1]);
        assert_eq!(game.phase(), Phase::Choosing);

        let removed = game.remove_player(contenders[2]).unwrap();
        assert!(!removed.round_restarted);
        assert!(removed.can_continue);
        assert_eq!(game.phase(), Phase::TsarVerdict);
        assert_eq!(game.choices().len(), 2);
    }

    #[test]
    fn removing_down_to_one_player_cannot_continue() {
        let mut game = game_with(2, 100, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let contender = non_tsars(&game)[0];
        let removed = game.remove_player(contender).unwrap();
        assert!(!removed.can_continue);
        assert_eq!(game.remove_player(contender).unwrap_err(), GameError::UnknownPlayer);
    }

    #[test]
    fn auto_submit_fills_missing_choices() {
        let mut game = game_with(3, 100, blacks(5, 2, 0));
        game.start_with(&mut rng()).unwrap();
        let contenders = non_tsars(&game);
        submit_first_cards(&mut game, contenders[0]);
        let before: Vec<CardId> = game.player(contenders[1]).unwrap().hand().to_vec();

        let afk = game.auto_submit(&mut rng()).unwrap();
        assert_eq!(afk, vec![contenders[1]]);
        let picked = game.player(contenders[1]).unwrap().choice().to_vec();
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|c| before.contains(c)));
        assert_eq!(game.phase(), Phase::TsarVerdict);
    }

    #[test]
    fn random_submission_comes_from_a_contender() {
        let mut game = game_with(3, 100, blacks(5, 1, 0));
        game.start_with(&mut rng()).unwrap();
        let mut submitted = Vec::new();
        for id in non_tsars(&game) {
            submitted.push(submit_first_cards(&mut game, id));
        }
        let pick = game.random_submission(&mut rng()).unwrap();
        assert!(submitted.contains(&pick));
    }

    #[test]
    fn mid_game_joiner_is_dealt_in() {
        let mut game = game_with(2, 100, blacks(5, 1, 2));
        game.start_with(&mut rng()).unwrap();
        let id = game.add_player(9);
        assert_eq!(game.player(id).unwrap().hand().len(), HAND + 2);
        assert_eq!(game.phase(), Phase::Choosing);
    }
}
