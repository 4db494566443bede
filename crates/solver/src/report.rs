use crate::{SolveOutcome, SolveStats, SolverError};
use klondike_core::{GameSnapshot, Move};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    /// Deal seed, absent when the solve started from a snapshot.
    #[serde(default)]
    pub seed: Option<u32>,
    pub tie_break_seed: u64,
    pub win: bool,
    pub value: i32,
    pub moves: Vec<Move>,
    pub foundation_cards: usize,
    pub final_state: GameSnapshot,
    pub stats: SolveStats,
}

impl SolveReport {
    pub fn from_outcome(outcome: &SolveOutcome, seed: Option<u32>) -> Self {
        Self {
            seed,
            tie_break_seed: outcome.tie_break_seed,
            win: outcome.win,
            value: outcome.value,
            moves: outcome.moves.clone(),
            foundation_cards: outcome.state.foundation_cards(),
            final_state: outcome.state.snapshot(),
            stats: outcome.stats.clone(),
        }
    }

    pub fn to_text_report(&self) -> String {
        let seed = self
            .seed
            .map(|seed| seed.to_string())
            .unwrap_or_else(|| "snapshot".to_string());
        let mut lines = vec![
            format!("result: {}", if self.win { "win" } else { "no win" }),
            format!(
                "deal: seed={} tie_break_seed={}",
                seed, self.tie_break_seed
            ),
            format!(
                "summary: moves={} foundation={}/52 nodes={} elapsed_ms={} tier_switches={}",
                self.moves.len(),
                self.foundation_cards,
                self.stats.nodes,
                self.stats.elapsed_ms,
                self.stats.tier_switches
            ),
        ];
        if self.stats.deadline_hit {
            lines.push("note: search stopped at the time limit".to_string());
        }
        lines.push(String::new());
        lines.push("moves:".to_string());
        if self.moves.is_empty() {
            lines.push("  (none)".to_string());
        }
        for (index, mv) in self.moves.iter().enumerate() {
            lines.push(format!("  {:>4} {}", index + 1, mv.label()));
        }
        lines.push(String::new());
        lines.push("final foundations:".to_string());
        for pile in &self.final_state.foundation {
            let row = pile
                .last()
                .map(|card| format!("{} ({})", card, pile.len()))
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!("  {row}"));
        }
        lines.join("\n")
    }
}

pub fn write_json(path: &Path, report: &SolveReport) -> Result<(), SolverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(report)?;
    fs::write(path, body)?;
    Ok(())
}

pub fn write_text(path: &Path, report: &SolveReport) -> Result<(), SolverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, report.to_text_report())?;
    Ok(())
}
