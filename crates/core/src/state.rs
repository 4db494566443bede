use crate::{deal, Card, Move, MoveKind, MoveSignature, RngState, DECK_SIZE, SUIT_COUNT};
use std::collections::HashSet;
use std::fmt;

pub const TABLEAU_COLUMNS: usize = 7;
pub const DRAW_COUNT: usize = 3;
/// Upper bound on simulated stock draws when looking for playable waste cards.
pub const MAX_STOCK_TURNS: u32 = 60;

pub const PRIORITY_REVEAL_TO_FOUNDATION: u8 = 1;
pub const PRIORITY_TO_FOUNDATION: u8 = 2;
pub const PRIORITY_REVEAL_BUILD: u8 = 3;
pub const PRIORITY_WASTE_BUILD: u8 = 4;
pub const PRIORITY_FOUNDATION_RETURN: u8 = 5;
pub const PRIORITY_BUILD: u8 = 6;

const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;
const COLUMN_SEPARATOR: u8 = 0xFF;
const STOCK_SEPARATOR: u8 = 0xFE;
const WASTE_SEPARATOR: u8 = 0xFD;

#[inline]
fn fnv1a_mix(h: u32, byte: u8) -> u32 {
    (h ^ byte as u32).wrapping_mul(FNV_PRIME)
}

/// One stock turn: recycle the waste when the stock is empty, then move up to
/// `DRAW_COUNT` cards onto the waste. Returns false when both piles are empty.
fn draw_cycle(stock: &mut Vec<Card>, waste: &mut Vec<Card>) -> bool {
    if stock.is_empty() {
        if waste.is_empty() {
            return false;
        }
        stock.extend(waste.drain(..).rev().map(|card| card.flipped(false)));
    }
    for _ in 0..DRAW_COUNT {
        match stock.pop() {
            Some(card) => waste.push(card.flipped(true)),
            None => break,
        }
    }
    true
}

/// A card that can become the waste top after `stock_turns` draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WasteExposure {
    pub card: Card,
    pub stock_turns: u32,
}

/// Mutable Klondike board. Piles are stored bottom to top.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameState {
    pub tableau: [Vec<Card>; TABLEAU_COLUMNS],
    pub foundation: [Vec<Card>; SUIT_COUNT],
    pub stock: Vec<Card>,
    pub waste: Vec<Card>,
}

impl GameState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn deal(seed: u32) -> Self {
        deal(seed)
    }

    pub fn is_win(&self) -> bool {
        self.foundation_cards() == DECK_SIZE
    }

    pub fn foundation_cards(&self) -> usize {
        self.foundation.iter().map(Vec::len).sum()
    }

    pub fn card_count(&self) -> usize {
        self.tableau.iter().map(Vec::len).sum::<usize>()
            + self.foundation_cards()
            + self.stock.len()
            + self.waste.len()
    }

    /// True when every card of the deck is present exactly once.
    pub fn holds_full_deck(&self) -> bool {
        let mut seen = [false; DECK_SIZE];
        let piles = self
            .tableau
            .iter()
            .chain(self.foundation.iter())
            .chain([&self.stock, &self.waste]);
        for pile in piles {
            for card in pile {
                if !(1..=13).contains(&card.rank) {
                    return false;
                }
                let slot = &mut seen[card.ordinal()];
                if *slot {
                    return false;
                }
                *slot = true;
            }
        }
        seen.iter().all(|item| *item)
    }

    /// 32-bit FNV-1a over the tableau (with orientation), foundation lengths,
    /// then stock and waste identities.
    pub fn state_hash(&self) -> u32 {
        let mut h = FNV_OFFSET_BASIS;
        for pile in &self.tableau {
            for card in pile {
                h = fnv1a_mix(h, card.hash_byte());
            }
            h = fnv1a_mix(h, COLUMN_SEPARATOR);
        }
        for pile in &self.foundation {
            h = fnv1a_mix(h, pile.len() as u8);
        }
        h = fnv1a_mix(h, STOCK_SEPARATOR);
        for card in &self.stock {
            h = fnv1a_mix(h, card.identity_byte());
        }
        h = fnv1a_mix(h, WASTE_SEPARATOR);
        for card in &self.waste {
            h = fnv1a_mix(h, card.identity_byte());
        }
        h
    }

    pub fn first_empty_column(&self) -> Option<usize> {
        self.tableau.iter().position(Vec::is_empty)
    }

    pub fn accepts_on_foundation(&self, card: Card) -> bool {
        self.foundation[card.foundation_index()].len() + 1 == card.rank as usize
    }

    /// Empty columns take kings only, and only the lowest-indexed one.
    pub fn accepts_on_column(&self, col: usize, card: Card) -> bool {
        match self.tableau[col].last() {
            Some(top) => card.builds_on(*top),
            None => card.is_king() && self.first_empty_column() == Some(col),
        }
    }

    /// A foundation top of `rank` may come back down only when another
    /// suit lags at least two ranks behind it.
    pub fn can_return(&self, foundation: usize, rank: u8) -> bool {
        if rank < 3 {
            return false;
        }
        let lagging = rank as usize - 2;
        self.foundation
            .iter()
            .enumerate()
            .any(|(idx, pile)| idx != foundation && pile.len() < lagging)
    }

    /// Simulates stock cycling without touching the real piles and lists each
    /// distinct card that can reach the waste top, with the draws it needs.
    pub fn waste_reachable(&self) -> Vec<WasteExposure> {
        let mut stock = self.stock.clone();
        let mut waste = self.waste.clone();
        let mut exposed = [false; DECK_SIZE];
        // stock + waste keep one combined order while cycling, so the split
        // point identifies the layout.
        let mut layouts: HashSet<(usize, usize)> = HashSet::new();
        let mut out = Vec::new();
        let mut turns = 0u32;
        loop {
            if let Some(&top) = waste.last() {
                let slot = &mut exposed[top.ordinal()];
                if !*slot {
                    *slot = true;
                    out.push(WasteExposure {
                        card: top.flipped(true),
                        stock_turns: turns,
                    });
                }
            }
            if turns >= MAX_STOCK_TURNS || !layouts.insert((stock.len(), waste.len())) {
                break;
            }
            if !draw_cycle(&mut stock, &mut waste) {
                break;
            }
            turns += 1;
        }
        out
    }

    /// Legal moves in search order: shuffled, then stably sorted by priority.
    pub fn legal_moves(&self, rng: &mut RngState) -> Vec<Move> {
        let mut moves = self.candidate_moves();
        rng.shuffle(&mut moves);
        moves.sort_by_key(|mv| mv.priority);
        moves
    }

    /// Every legal move in generation order.
    pub fn candidate_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.push_tableau_to_foundation(&mut moves);
        self.push_tableau_to_tableau(&mut moves);
        self.push_foundation_to_tableau(&mut moves);
        self.push_waste_moves(&mut moves);
        moves
    }

    fn push_tableau_to_foundation(&self, moves: &mut Vec<Move>) {
        for (src, pile) in self.tableau.iter().enumerate() {
            let Some(&top) = pile.last() else {
                continue;
            };
            if !top.face_up || !self.accepts_on_foundation(top) {
                continue;
            }
            let reveals = pile.len() >= 2 && !pile[pile.len() - 2].face_up;
            let priority = if reveals {
                PRIORITY_REVEAL_TO_FOUNDATION
            } else {
                PRIORITY_TO_FOUNDATION
            };
            moves.push(Move::tableau_to_foundation(src, top, priority));
        }
    }

    fn push_tableau_to_tableau(&self, moves: &mut Vec<Move>) {
        for (src, pile) in self.tableau.iter().enumerate() {
            for (idx, &card) in pile.iter().enumerate() {
                if !card.face_up {
                    continue;
                }
                let reveals = idx > 0 && !pile[idx - 1].face_up;
                let priority = if reveals {
                    PRIORITY_REVEAL_BUILD
                } else {
                    PRIORITY_BUILD
                };
                for dest in 0..TABLEAU_COLUMNS {
                    if dest != src && self.accepts_on_column(dest, card) {
                        moves.push(Move::tableau_to_tableau(
                            src,
                            dest,
                            card,
                            pile.len() - idx,
                            priority,
                        ));
                    }
                }
            }
        }
    }

    fn push_foundation_to_tableau(&self, moves: &mut Vec<Move>) {
        for (idx, pile) in self.foundation.iter().enumerate() {
            let Some(&card) = pile.last() else {
                continue;
            };
            if !self.can_return(idx, card.rank) {
                continue;
            }
            for dest in 0..TABLEAU_COLUMNS {
                if self.accepts_on_column(dest, card) {
                    moves.push(Move::foundation_to_tableau(
                        dest,
                        card,
                        PRIORITY_FOUNDATION_RETURN,
                    ));
                }
            }
        }
    }

    fn push_waste_moves(&self, moves: &mut Vec<Move>) {
        for exposure in self.waste_reachable() {
            let card = exposure.card;
            if self.accepts_on_foundation(card) {
                moves.push(Move::waste_to_foundation(
                    card,
                    exposure.stock_turns,
                    PRIORITY_TO_FOUNDATION,
                ));
            }
            for dest in 0..TABLEAU_COLUMNS {
                if self.accepts_on_column(dest, card) {
                    moves.push(Move::waste_to_tableau(
                        dest,
                        card,
                        exposure.stock_turns,
                        PRIORITY_WASTE_BUILD,
                    ));
                }
            }
        }
    }

    /// Whether a tableau-sourced move uncovers a face-down card.
    pub fn reveals(&self, mv: &Move) -> bool {
        if !mv.kind.from_tableau() {
            return false;
        }
        let Some(pile) = mv.src.and_then(|src| self.tableau.get(src)) else {
            return false;
        };
        let start = pile.len().saturating_sub(mv.num_cards);
        start > 0 && !pile[start - 1].face_up
    }

    /// Reverse signature of `mv` as played from this position.
    pub fn reverse_signature(&self, mv: &Move) -> Option<MoveSignature> {
        mv.reverse_signature(self.reveals(mv))
    }

    /// Draws the stock `stock_turns` times, then performs the transfer.
    /// The move must come from `legal_moves` on an equivalent state.
    pub fn apply_move(&mut self, mv: &Move) {
        for _ in 0..mv.stock_turns {
            let drew = draw_cycle(&mut self.stock, &mut self.waste);
            debug_assert!(drew, "stock turn requested with empty stock and waste");
        }
        match mv.kind {
            MoveKind::TableauToFoundation => {
                let src = mv.src.unwrap_or_default();
                let card = self.tableau[src].pop();
                debug_assert!(
                    card.is_some_and(|card| card.same_identity(mv.card)),
                    "tableau top does not match {mv}"
                );
                if let Some(card) = card {
                    self.foundation[card.foundation_index()].push(card);
                }
                self.reveal_top(src);
            }
            MoveKind::TableauToTableau => {
                let src = mv.src.unwrap_or_default();
                let pile = &mut self.tableau[src];
                let start = pile.len().saturating_sub(mv.num_cards);
                debug_assert!(
                    pile.get(start).is_some_and(|card| card.same_identity(mv.card)),
                    "run start does not match {mv}"
                );
                let run = pile.split_off(start);
                self.tableau[mv.dest].extend(run);
                self.reveal_top(src);
            }
            MoveKind::WasteToFoundation => {
                let card = self.waste.pop();
                debug_assert!(
                    card.is_some_and(|card| card.same_identity(mv.card)),
                    "waste top does not match {mv}"
                );
                if let Some(card) = card {
                    self.foundation[card.foundation_index()].push(card);
                }
            }
            MoveKind::WasteToTableau => {
                let card = self.waste.pop();
                debug_assert!(
                    card.is_some_and(|card| card.same_identity(mv.card)),
                    "waste top does not match {mv}"
                );
                if let Some(card) = card {
                    self.tableau[mv.dest].push(card);
                }
            }
            MoveKind::FoundationToTableau => {
                let src = mv.src.unwrap_or_else(|| mv.card.foundation_index());
                let card = self.foundation[src].pop();
                debug_assert!(
                    card.is_some_and(|card| card.same_identity(mv.card)),
                    "foundation top does not match {mv}"
                );
                if let Some(card) = card {
                    self.tableau[mv.dest].push(card);
                }
            }
        }
    }

    /// Turns the top card of column `col` face up.
    pub(crate) fn reveal_top(&mut self, col: usize) {
        if let Some(top) = self.tableau[col].last_mut() {
            if !top.face_up {
                *top = top.flipped(true);
            }
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let foundations = self
            .foundation
            .iter()
            .map(|pile| {
                pile.last()
                    .map(|card| card.to_string())
                    .unwrap_or_else(|| "--".to_string())
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(f, "foundation: {foundations}")?;
        let waste_top = self
            .waste
            .last()
            .map(|card| card.to_string())
            .unwrap_or_else(|| "--".to_string());
        writeln!(
            f,
            "stock: {} waste: {} ({})",
            self.stock.len(),
            waste_top,
            self.waste.len()
        )?;
        for (idx, pile) in self.tableau.iter().enumerate() {
            let cards = pile.iter().map(|card| card.masked()).collect::<Vec<_>>();
            writeln!(f, "t{}: {}", idx + 1, cards.join(" "))?;
        }
        Ok(())
    }
}
