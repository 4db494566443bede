//! Klondike rules engine: cards, seeded deals, board state and move generation.
//! Pure logic, no IO.

pub mod cards;
pub mod deck;
pub mod error;
pub mod moves;
pub mod rng;
pub mod snapshot;
pub mod state;

pub use cards::*;
pub use deck::*;
pub use error::*;
pub use moves::*;
pub use rng::*;
pub use snapshot::*;
pub use state::*;
