//! White and black card decks.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::player::Player;
use crate::protocol::CardId;

/// A prompt card. Only identity and the two rule parameters flow through the
/// engine; text is resolved by the [`CardCatalog`](crate::catalog::CardCatalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackCard {
    pub id: CardId,
    /// White cards every non-tsar must submit. Always at least 1.
    pub pick: usize,
    /// Extra white cards non-tsar players are dealt for the round.
    pub draw: usize,
}

impl BlackCard {
    /// Create a black card, clamping `pick` to at least 1.
    pub fn new(id: CardId, pick: usize, draw: usize) -> Self {
        Self {
            id,
            pick: pick.max(1),
            draw,
        }
    }
}

/// The two card piles of a game. Cards are drawn from the back.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    whites: Vec<CardId>,
    blacks: Vec<BlackCard>,
}

impl Deck {
    pub fn new(whites: Vec<CardId>, blacks: Vec<BlackCard>) -> Self {
        Self { whites, blacks }
    }

    /// Uniformly permute both piles.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// Uniformly permute both piles with the given generator.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.whites.shuffle(rng);
        self.blacks.shuffle(rng);
    }

    /// Whether the piles can fill every hand to `base_hand_size + extra_draw`
    /// and still provide a black card.
    pub fn sufficient_for(
        &self,
        player_count: usize,
        base_hand_size: usize,
        extra_draw: usize,
    ) -> bool {
        let needed = player_count.saturating_mul(base_hand_size.saturating_add(extra_draw));
        !self.blacks.is_empty() && self.whites.len() >= needed
    }

    /// Pop white cards into the player's hand until hand plus choice reaches
    /// `target`. Running out of cards is not an error.
    pub fn deal_to<M>(&mut self, player: &mut Player<M>, target: usize) {
        while player.held() < target {
            let Some(card) = self.whites.pop() else {
                break;
            };
            player.hand.push(card);
        }
    }

    /// The black card that [`pop_black`](Self::pop_black) would return next.
    pub fn peek_black(&self) -> Option<&BlackCard> {
        self.blacks.last()
    }

    pub fn pop_black(&mut self) -> Option<BlackCard> {
        self.blacks.pop()
    }

    pub fn white_len(&self) -> usize {
        self.whites.len()
    }

    pub fn black_len(&self) -> usize {
        self.blacks.len()
    }

    pub fn clear(&mut self) {
        self.whites.clear();
        self.blacks.clear();
    }
}
