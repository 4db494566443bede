use crate::{Card, DealRng, GameState, Suit, ACE, DECK_SIZE, KING, TABLEAU_COLUMNS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub cards: Vec<Card>,
}

impl Deck {
    /// Unshuffled order: suits in index order, ranks Ace..King, all face down.
    pub fn standard52() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in ACE..=KING {
                cards.push(Card::face_down(rank, suit));
            }
        }
        Self { cards }
    }

    pub fn shuffled(seed: u32) -> Self {
        let mut deck = Self::standard52();
        deck.shuffle(&mut DealRng::new(seed));
        deck
    }

    /// Fisher-Yates from the last slot down.
    pub fn shuffle(&mut self, rng: &mut DealRng) {
        for idx in (1..self.cards.len()).rev() {
            let pick = rng.below(idx + 1);
            self.cards.swap(idx, pick);
        }
    }
}

/// Deals a seeded Klondike layout: columns of 1..=7 cards with only the
/// last card of each face up, the other 24 cards form the stock.
pub fn deal(seed: u32) -> GameState {
    let deck = Deck::shuffled(seed);
    let mut cards = deck.cards.into_iter();
    let mut state = GameState::empty();
    for row in 0..TABLEAU_COLUMNS {
        for col in row..TABLEAU_COLUMNS {
            if let Some(card) = cards.next() {
                state.tableau[col].push(card.flipped(row == col));
            }
        }
    }
    state.stock = cards.map(|card| card.flipped(false)).collect();
    state
}
