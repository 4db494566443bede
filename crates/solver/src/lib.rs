//! Nested rollout search over Klondike deals, guided by two heuristic tiers.

mod config;
mod error;
mod eval;
mod report;
mod rollout;

pub use config::*;
pub use error::*;
pub use eval::*;
pub use report::*;
pub use rollout::*;
