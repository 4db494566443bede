use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("expected {expected} tableau columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("expected {expected} foundations, found {found}")]
    FoundationCount { expected: usize, found: usize },
    #[error("expected {expected} cards, found {found}")]
    CardCount { expected: usize, found: usize },
    #[error("duplicate card {0}")]
    DuplicateCard(String),
    #[error("invalid rank {0}")]
    InvalidRank(u8),
    #[error("foundation {index} out of order at {card}")]
    FoundationOrder { index: usize, card: String },
    #[error("illegal move #{index}: {label}")]
    IllegalMove { index: usize, label: String },
}
