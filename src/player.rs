//! Per-participant game state.
//!
//! A [`Player`] holds a hand, the current round's submitted choice and a score.
//! Room-level data (connection, identity, join time) lives in the opaque
//! `metadata` parameter; game logic never looks inside it.

use std::fmt;

use crate::error::GameError;
use crate::protocol::CardId;

/// Seat identifier, unique within one [`Game`](crate::game::Game).
pub type PlayerId = u32;

/// A participant of a game, parametrized over room-owned metadata.
#[derive(Debug, Clone)]
pub struct Player<M> {
    id: PlayerId,
    pub(crate) hand: Vec<CardId>,
    pub(crate) choice: Vec<CardId>,
    points: u32,
    pub metadata: M,
}

impl<M> Player<M> {
    pub fn new(id: PlayerId, metadata: M) -> Self {
        Self {
            id,
            hand: Vec::new(),
            choice: Vec::new(),
            points: 0,
            metadata,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Cards currently held, in delivery order.
    pub fn hand(&self) -> &[CardId] {
        &self.hand
    }

    /// Cards submitted this round, in submission order. Empty when not submitted.
    pub fn choice(&self) -> &[CardId] {
        &self.choice
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn has_submitted(&self) -> bool {
        !self.choice.is_empty()
    }

    /// Hand plus submitted choice; what dealing tops up.
    pub fn held(&self) -> usize {
        self.hand.len() + self.choice.len()
    }

    /// Take `cards` out of the hand, all or nothing.
    ///
    /// The returned ids keep the order of `cards`. Fails if any id is not held
    /// or appears twice.
    pub fn remove_cards(&mut self, cards: &[CardId]) -> Result<Vec<CardId>, GameError> {
        let mut remaining = self.hand.clone();
        for card in cards {
            let Some(pos) = remaining.iter().position(|held| held == card) else {
                return Err(GameError::InvalidSubmission);
            };
            remaining.remove(pos);
        }
        self.hand = remaining;
        Ok(cards.to_vec())
    }

    pub fn add_cards(&mut self, cards: impl IntoIterator<Item = CardId>) {
        self.hand.extend(cards);
    }

    /// Move `cards` from hand into the choice. The caller checks tsar and phase.
    pub(crate) fn choose(&mut self, cards: &[CardId], pick: usize) -> Result<(), GameError> {
        if cards.len() != pick || self.has_submitted() {
            return Err(GameError::InvalidSubmission);
        }
        self.choice = self.remove_cards(cards)?;
        Ok(())
    }

    /// Put the submitted choice back into the hand.
    pub(crate) fn return_choice(&mut self) -> Vec<CardId> {
        let returned = std::mem::take(&mut self.choice);
        self.hand.extend(returned.iter().copied());
        returned
    }

    pub(crate) fn clear_choice(&mut self) {
        self.choice.clear();
    }

    /// Order-independent key of the submitted choice, `None` when not submitted.
    pub fn choice_key(&self) -> Option<ChoiceKey> {
        if self.choice.is_empty() {
            None
        } else {
            Some(ChoiceKey::new(&self.choice))
        }
    }

    pub(crate) fn award_point(&mut self) {
        self.points = self.points.saturating_add(1);
    }

    /// Drop every per-game field.
    pub(crate) fn reset(&mut self) {
        self.hand.clear();
        self.choice.clear();
        self.points = 0;
    }
}

/// Sorted card ids of a submission, so a verdict can name the cards in any order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceKey(Vec<CardId>);

impl ChoiceKey {
    pub fn new(cards: &[CardId]) -> Self {
        let mut sorted = cards.to_vec();
        sorted.sort_unstable();
        Self(sorted)
    }
}

impl fmt::Display for ChoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for card in &self.0 {
            if !first {
                f.write_str("-")?;
            }
            write!(f, "{card}")?;
            first = false;
        }
        Ok(())
    }
}

/// Outcome of a successful verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub player: PlayerId,
    pub black_card: CardId,
    pub winning_cards: Vec<CardId>,
}
