use serde::{Deserialize, Serialize};
use std::fmt;

pub const ACE: u8 = 1;
pub const KING: u8 = 13;
pub const RANKS_PER_SUIT: usize = 13;
pub const SUIT_COUNT: usize = 4;
pub const DECK_SIZE: usize = RANKS_PER_SUIT * SUIT_COUNT;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; SUIT_COUNT] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    /// Suit index, which is also the index of the suit's foundation pile.
    pub const fn index(self) -> usize {
        match self {
            Self::Hearts => 0,
            Self::Diamonds => 1,
            Self::Clubs => 2,
            Self::Spades => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn is_red(self) -> bool {
        matches!(self, Self::Hearts | Self::Diamonds)
    }

    pub const fn symbol(self) -> char {
        match self {
            Self::Hearts => 'H',
            Self::Diamonds => 'D',
            Self::Clubs => 'C',
            Self::Spades => 'S',
        }
    }
}

/// A playing card. Cards are plain values: flipping yields a new card.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
    #[serde(default)]
    pub face_up: bool,
}

impl Card {
    pub const fn new(rank: u8, suit: Suit, face_up: bool) -> Self {
        Self {
            rank,
            suit,
            face_up,
        }
    }

    pub const fn face_up(rank: u8, suit: Suit) -> Self {
        Self::new(rank, suit, true)
    }

    pub const fn face_down(rank: u8, suit: Suit) -> Self {
        Self::new(rank, suit, false)
    }

    pub const fn flipped(self, face_up: bool) -> Self {
        Self::new(self.rank, self.suit, face_up)
    }

    pub const fn is_red(self) -> bool {
        self.suit.is_red()
    }

    pub const fn foundation_index(self) -> usize {
        self.suit.index()
    }

    pub const fn is_king(self) -> bool {
        self.rank == KING
    }

    /// True when both cards are the same rank and suit, ignoring orientation.
    pub fn same_identity(self, other: Card) -> bool {
        self.rank == other.rank && self.suit == other.suit
    }

    /// `self` can be built on `other` in the tableau.
    pub fn builds_on(self, other: Card) -> bool {
        other.face_up && other.rank == self.rank + 1 && other.is_red() != self.is_red()
    }

    /// Index 0..52 unique to rank and suit.
    pub fn ordinal(self) -> usize {
        self.suit.index() * RANKS_PER_SUIT + (self.rank as usize - 1)
    }

    /// One-byte encoding used by state hashing.
    pub(crate) fn hash_byte(self) -> u8 {
        self.rank | ((self.suit.index() as u8) << 4) | ((self.face_up as u8) << 6)
    }

    pub(crate) fn identity_byte(self) -> u8 {
        self.rank | ((self.suit.index() as u8) << 4)
    }

    /// Display form that hides face-down cards.
    pub fn masked(self) -> String {
        if self.face_up {
            self.to_string()
        } else {
            "??".to_string()
        }
    }
}

pub fn rank_label(rank: u8) -> char {
    match rank {
        1 => 'A',
        10 => 'T',
        11 => 'J',
        12 => 'Q',
        13 => 'K',
        2..=9 => (b'0' + rank) as char,
        _ => '?',
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", rank_label(self.rank), self.suit.symbol())
    }
}
