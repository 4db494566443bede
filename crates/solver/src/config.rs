use crate::SolverError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Rollout depth for the first heuristic tier.
    pub n0: i32,
    /// Rollout depth for the second heuristic tier.
    pub n1: i32,
    pub max_time_ms: u64,
    /// Memo entries kept per tier; the cache stops growing once full.
    pub cache_capacity: usize,
    /// Fixes intra-priority move shuffling. `None` draws a fresh seed per solve.
    pub tie_break_seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            n0: 1,
            n1: 1,
            max_time_ms: 30_000,
            cache_capacity: 1_000_000,
            tie_break_seed: None,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.max_time_ms = limit.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if self.n0 < 0 || self.n1 < 0 {
            return Err(SolverError::Config(format!(
                "rollout depths must be non-negative (n0={}, n1={})",
                self.n0, self.n1
            )));
        }
        if self.max_time_ms == 0 {
            return Err(SolverError::Config("time budget must be positive".to_string()));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<SolverConfig, SolverError> {
    let raw = fs::read_to_string(path)?;
    let config: SolverConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}
