use klondike_core::{Card, GameState, KING};
use serde::{Deserialize, Serialize};

pub const WIN_SCORE: i32 = 1_000_000;
pub const LOSS_SCORE: i32 = -1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    H1,
    H2,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::H1, Tier::H2];

    pub fn index(self) -> usize {
        match self {
            Self::H1 => 0,
            Self::H2 => 1,
        }
    }

    /// Tier the search escalates to, `None` on the last tier.
    pub fn next(self) -> Option<Tier> {
        match self {
            Self::H1 => Some(Self::H2),
            Self::H2 => None,
        }
    }

    pub fn weights(self) -> &'static TierWeights {
        &TIER_WEIGHTS[self.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoundationWeight {
    /// `5 - (rank - 1)`: low cards are worth the most.
    ByRank,
    Flat(i32),
}

impl FoundationWeight {
    fn value(self, rank: u8) -> i32 {
        match self {
            Self::ByRank => 5 - (rank as i32 - 1),
            Self::Flat(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierWeights {
    pub foundation: FoundationWeight,
    pub waste_reachable: i32,
    pub hidden_pair: i32,
    pub blocks_suited: i32,
    pub blocks_build: i32,
}

pub const TIER_WEIGHTS: [TierWeights; 2] = [
    TierWeights {
        foundation: FoundationWeight::ByRank,
        waste_reachable: 0,
        hidden_pair: -5,
        blocks_suited: -5,
        blocks_build: -10,
    },
    TierWeights {
        foundation: FoundationWeight::Flat(5),
        waste_reachable: 1,
        hidden_pair: -1,
        blocks_suited: -1,
        blocks_build: -5,
    },
];

fn hidden_weight(card: Card) -> i32 {
    (card.rank as i32 - 1) - 13
}

/// Scores a position under `tier`. Wins map to `WIN_SCORE`, every other
/// position lands strictly between `LOSS_SCORE` and `WIN_SCORE`.
pub fn evaluate(state: &GameState, tier: Tier) -> i32 {
    if state.is_win() {
        return WIN_SCORE;
    }
    let weights = tier.weights();
    let mut score = 0i32;

    for pile in &state.foundation {
        for card in pile {
            score += weights.foundation.value(card.rank);
        }
    }

    let mut hidden_red = [0i32; KING as usize + 1];
    let mut hidden_black = [0i32; KING as usize + 1];
    for pile in &state.tableau {
        for (idx, &card) in pile.iter().enumerate() {
            if !card.face_up {
                score += hidden_weight(card);
                if card.is_red() {
                    hidden_red[card.rank as usize] += 1;
                } else {
                    hidden_black[card.rank as usize] += 1;
                }
            }
            if idx == 0 || pile[idx - 1].face_up {
                continue;
            }
            let beneath = &pile[..idx];
            if beneath
                .iter()
                .any(|below| below.suit == card.suit && below.rank < card.rank)
            {
                score += weights.blocks_suited;
            }
            if beneath
                .iter()
                .any(|below| below.rank == card.rank + 1 && below.is_red() != card.is_red())
            {
                score += weights.blocks_build;
            }
        }
    }

    for rank in 1..=KING as usize {
        score += weights.hidden_pair * hidden_red[rank] * hidden_black[rank];
    }

    if weights.waste_reachable != 0 {
        score += weights.waste_reachable * state.waste_reachable().len() as i32;
    }
    score
}
