use crate::{Card, GameState, Move, StateError, DECK_SIZE, SUIT_COUNT, TABLEAU_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Plain four-pile record of a board, the form hosts exchange with the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSnapshot {
    pub tableau: Vec<Vec<Card>>,
    pub foundation: Vec<Vec<Card>>,
    #[serde(default)]
    pub stock: Vec<Card>,
    #[serde(default)]
    pub waste: Vec<Card>,
}

impl GameState {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            tableau: self.tableau.to_vec(),
            foundation: self.foundation.to_vec(),
            stock: self.stock.clone(),
            waste: self.waste.clone(),
        }
    }

    /// Builds a state from a snapshot, rejecting anything that is not exactly
    /// one 52-card deck with well-formed foundations. Column tops come out
    /// face up.
    pub fn from_snapshot(snapshot: &GameSnapshot) -> Result<Self, StateError> {
        if snapshot.tableau.len() != TABLEAU_COLUMNS {
            return Err(StateError::ColumnCount {
                expected: TABLEAU_COLUMNS,
                found: snapshot.tableau.len(),
            });
        }
        if snapshot.foundation.len() != SUIT_COUNT {
            return Err(StateError::FoundationCount {
                expected: SUIT_COUNT,
                found: snapshot.foundation.len(),
            });
        }

        let all_cards = snapshot
            .tableau
            .iter()
            .chain(snapshot.foundation.iter())
            .chain([&snapshot.stock, &snapshot.waste])
            .flatten();
        let mut seen = HashSet::new();
        let mut total = 0usize;
        for card in all_cards {
            if !(1..=13).contains(&card.rank) {
                return Err(StateError::InvalidRank(card.rank));
            }
            if !seen.insert(card.ordinal()) {
                return Err(StateError::DuplicateCard(card.to_string()));
            }
            total += 1;
        }
        if total != DECK_SIZE {
            return Err(StateError::CardCount {
                expected: DECK_SIZE,
                found: total,
            });
        }

        for (index, pile) in snapshot.foundation.iter().enumerate() {
            for (pos, card) in pile.iter().enumerate() {
                if card.foundation_index() != index || card.rank as usize != pos + 1 {
                    return Err(StateError::FoundationOrder {
                        index,
                        card: card.to_string(),
                    });
                }
            }
        }

        let mut state = GameState::empty();
        for (col, pile) in snapshot.tableau.iter().enumerate() {
            state.tableau[col].clone_from(pile);
            state.reveal_top(col);
        }
        for (slot, pile) in state.foundation.iter_mut().zip(&snapshot.foundation) {
            *slot = pile.iter().map(|card| card.flipped(true)).collect();
        }
        state.stock = snapshot.stock.iter().map(|card| card.flipped(false)).collect();
        state.waste = snapshot.waste.iter().map(|card| card.flipped(true)).collect();
        Ok(state)
    }
}

/// Replays `moves` from `initial`, checking each one against the legal moves
/// of the position it is played from.
pub fn verify_moves(initial: &GameState, moves: &[Move]) -> Result<GameState, StateError> {
    let mut state = initial.clone();
    for (index, mv) in moves.iter().enumerate() {
        let legal = state
            .candidate_moves()
            .iter()
            .any(|candidate| candidate.same_action(mv));
        if !legal {
            return Err(StateError::IllegalMove {
                index,
                label: mv.label(),
            });
        }
        state.apply_move(mv);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Suit;

    #[test]
    fn snapshot_roundtrip_through_json() {
        let state = GameState::deal(11);
        let body = serde_json::to_string(&state.snapshot()).expect("serialize");
        let parsed: GameSnapshot = serde_json::from_str(&body).expect("parse");
        let rebuilt = GameState::from_snapshot(&parsed).expect("valid snapshot");
        assert_eq!(rebuilt, state);
        assert_eq!(rebuilt.state_hash(), state.state_hash());
    }

    #[test]
    fn rejects_wrong_column_count() {
        let mut snapshot = GameState::deal(3).snapshot();
        snapshot.tableau.pop();
        assert_eq!(
            GameState::from_snapshot(&snapshot),
            Err(StateError::ColumnCount {
                expected: 7,
                found: 6
            })
        );
    }

    #[test]
    fn rejects_missing_card() {
        let mut snapshot = GameState::deal(3).snapshot();
        snapshot.stock.pop();
        assert_eq!(
            GameState::from_snapshot(&snapshot),
            Err(StateError::CardCount {
                expected: 52,
                found: 51
            })
        );
    }

    #[test]
    fn rejects_duplicate_card() {
        let mut snapshot = GameState::deal(3).snapshot();
        let copy = snapshot.tableau[6][6];
        snapshot.stock[0] = copy;
        let err = GameState::from_snapshot(&snapshot).expect_err("duplicate must fail");
        assert_eq!(err, StateError::DuplicateCard(copy.to_string()));
    }

    #[test]
    fn rejects_bad_rank() {
        let mut snapshot = GameState::deal(3).snapshot();
        snapshot.stock[0].rank = 14;
        assert_eq!(
            GameState::from_snapshot(&snapshot),
            Err(StateError::InvalidRank(14))
        );
    }

    #[test]
    fn rejects_foundation_out_of_order() {
        let mut state = GameState::deal(3);
        let two = Card::face_up(2, Suit::Clubs);
        for pile in state.tableau.iter_mut() {
            pile.retain(|card| !card.same_identity(two));
        }
        state.stock.retain(|card| !card.same_identity(two));
        state.foundation[Suit::Clubs.index()].push(two);
        let err = GameState::from_snapshot(&state.snapshot()).expect_err("2C without AC");
        assert!(err.to_string().contains("foundation 2"));
    }

    #[test]
    fn hidden_column_tops_are_turned_up() {
        let dealt = GameState::deal(42);
        let mut snapshot = dealt.snapshot();
        for pile in snapshot.tableau.iter_mut() {
            if let Some(top) = pile.last_mut() {
                *top = top.flipped(false);
            }
        }
        let rebuilt = GameState::from_snapshot(&snapshot).expect("valid snapshot");
        assert!(rebuilt
            .tableau
            .iter()
            .all(|pile| pile.last().is_some_and(|card| card.face_up)));
        assert_eq!(rebuilt, dealt);
    }

    #[test]
    fn verify_rejects_fabricated_move() {
        let state = GameState::deal(42);
        let bogus = Move::waste_to_foundation(Card::face_up(13, Suit::Spades), 0, 2);
        let err = verify_moves(&state, &[bogus]).expect_err("king cannot go up first");
        assert!(matches!(err, StateError::IllegalMove { index: 0, .. }));
    }

    #[test]
    fn verify_accepts_generated_moves() {
        let mut state = GameState::deal(42);
        let mut played = Vec::new();
        for _ in 0..20 {
            let Some(mv) = state.candidate_moves().into_iter().next() else {
                break;
            };
            state.apply_move(&mv);
            played.push(mv);
        }
        let replayed = verify_moves(&GameState::deal(42), &played).expect("legal line");
        assert_eq!(replayed, state);
    }
}
