use crate::Card;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MoveKind {
    TableauToFoundation,
    TableauToTableau,
    WasteToFoundation,
    WasteToTableau,
    FoundationToTableau,
}

impl MoveKind {
    fn code(self) -> u32 {
        match self {
            Self::TableauToFoundation => 0,
            Self::TableauToTableau => 1,
            Self::WasteToFoundation => 2,
            Self::WasteToTableau => 3,
            Self::FoundationToTableau => 4,
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Self::TableauToFoundation => "tableau->foundation",
            Self::TableauToTableau => "tableau->tableau",
            Self::WasteToFoundation => "waste->foundation",
            Self::WasteToTableau => "waste->tableau",
            Self::FoundationToTableau => "foundation->tableau",
        }
    }

    pub fn from_waste(self) -> bool {
        matches!(self, Self::WasteToFoundation | Self::WasteToTableau)
    }

    pub fn from_tableau(self) -> bool {
        matches!(self, Self::TableauToFoundation | Self::TableauToTableau)
    }
}

/// A move descriptor. `src` is `None` for waste moves; for foundation moves
/// `src`/`dest` hold the foundation index (the suit index).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Move {
    pub kind: MoveKind,
    pub src: Option<usize>,
    pub dest: usize,
    pub card: Card,
    pub num_cards: usize,
    /// Stock draws to perform before the transfer becomes legal.
    #[serde(default)]
    pub stock_turns: u32,
    /// Search ordering only, lower is more promising.
    #[serde(default)]
    pub priority: u8,
}

/// Packed move identity; see `Move::signature`.
pub type MoveSignature = u32;

const WASTE_SLOT: u32 = 0xF;

fn pack(kind: MoveKind, src: Option<usize>, dest: usize, card: Card, num_cards: usize) -> u32 {
    let src = src.map(|idx| idx as u32).unwrap_or(WASTE_SLOT);
    kind.code()
        | (src & 0xF) << 3
        | (dest as u32 & 0xF) << 7
        | (card.rank as u32 & 0xF) << 11
        | (card.suit.index() as u32) << 15
        | (num_cards as u32 & 0x1F) << 17
}

impl Move {
    pub fn tableau_to_foundation(src: usize, card: Card, priority: u8) -> Self {
        Self {
            kind: MoveKind::TableauToFoundation,
            src: Some(src),
            dest: card.foundation_index(),
            card,
            num_cards: 1,
            stock_turns: 0,
            priority,
        }
    }

    pub fn tableau_to_tableau(
        src: usize,
        dest: usize,
        card: Card,
        num_cards: usize,
        priority: u8,
    ) -> Self {
        Self {
            kind: MoveKind::TableauToTableau,
            src: Some(src),
            dest,
            card,
            num_cards,
            stock_turns: 0,
            priority,
        }
    }

    pub fn waste_to_foundation(card: Card, stock_turns: u32, priority: u8) -> Self {
        Self {
            kind: MoveKind::WasteToFoundation,
            src: None,
            dest: card.foundation_index(),
            card,
            num_cards: 1,
            stock_turns,
            priority,
        }
    }

    pub fn waste_to_tableau(dest: usize, card: Card, stock_turns: u32, priority: u8) -> Self {
        Self {
            kind: MoveKind::WasteToTableau,
            src: None,
            dest,
            card,
            num_cards: 1,
            stock_turns,
            priority,
        }
    }

    pub fn foundation_to_tableau(dest: usize, card: Card, priority: u8) -> Self {
        Self {
            kind: MoveKind::FoundationToTableau,
            src: Some(card.foundation_index()),
            dest,
            card,
            num_cards: 1,
            stock_turns: 0,
            priority,
        }
    }

    /// Packs `(kind, src, dest, rank, suit, num_cards)`.
    pub fn signature(&self) -> MoveSignature {
        pack(self.kind, self.src, self.dest, self.card, self.num_cards)
    }

    /// Signature of the move that would undo this one. `reveals` says whether
    /// the move uncovers a face-down tableau card; such moves have no undo.
    pub fn reverse_signature(&self, reveals: bool) -> Option<MoveSignature> {
        match self.kind {
            MoveKind::TableauToFoundation if !reveals => Some(pack(
                MoveKind::FoundationToTableau,
                Some(self.dest),
                self.src?,
                self.card,
                1,
            )),
            MoveKind::TableauToTableau if !reveals => Some(pack(
                MoveKind::TableauToTableau,
                Some(self.dest),
                self.src?,
                self.card,
                self.num_cards,
            )),
            MoveKind::FoundationToTableau => Some(pack(
                MoveKind::TableauToFoundation,
                Some(self.dest),
                self.src?,
                self.card,
                1,
            )),
            _ => None,
        }
    }

    /// Same action regardless of search priority.
    pub fn same_action(&self, other: &Move) -> bool {
        self.kind == other.kind
            && self.src == other.src
            && self.dest == other.dest
            && self.card.same_identity(other.card)
            && self.num_cards == other.num_cards
            && self.stock_turns == other.stock_turns
    }

    pub fn label(&self) -> String {
        let mut text = format!("{} {}", self.kind.short_label(), self.card);
        match self.kind {
            MoveKind::TableauToFoundation => {
                text.push_str(&format!(" t{}", self.src.unwrap_or_default() + 1));
            }
            MoveKind::TableauToTableau => {
                text.push_str(&format!(
                    " t{}->t{}",
                    self.src.unwrap_or_default() + 1,
                    self.dest + 1
                ));
                if self.num_cards > 1 {
                    text.push_str(&format!(" x{}", self.num_cards));
                }
            }
            MoveKind::WasteToTableau | MoveKind::FoundationToTableau => {
                text.push_str(&format!(" ->t{}", self.dest + 1));
            }
            MoveKind::WasteToFoundation => {}
        }
        if self.stock_turns > 0 {
            text.push_str(&format!(" turns={}", self.stock_turns));
        }
        text
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
