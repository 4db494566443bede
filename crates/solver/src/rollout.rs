use crate::{evaluate, SolverConfig, SolverError, Tier, LOSS_SCORE, WIN_SCORE};
use klondike_core::{GameState, Move, MoveSignature, RngState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative stop flag shared between a solver and its host. A cancel
/// stops the running solve, or the next one if none is running; the flag is
/// cleared when that solve returns.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveStats {
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub tier_switches: u64,
    pub cache_entries: [usize; 2],
    /// The deadline or a cancel request cut the search short.
    pub deadline_hit: bool,
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub win: bool,
    pub moves: Vec<Move>,
    /// Position reached by replaying `moves` on the root.
    pub state: GameState,
    pub value: i32,
    pub tie_break_seed: u64,
    pub stats: SolveStats,
}

/// Drops candidates matching `forbidden`, unless that would leave none.
pub fn prune_reverse(moves: Vec<Move>, forbidden: Option<MoveSignature>) -> Vec<Move> {
    let Some(signature) = forbidden else {
        return moves;
    };
    let kept: Vec<Move> = moves
        .iter()
        .filter(|mv| mv.signature() != signature)
        .copied()
        .collect();
    if kept.is_empty() {
        moves
    } else {
        kept
    }
}

#[derive(Debug, Default)]
struct VisitedPath {
    order: Vec<u32>,
    members: HashSet<u32>,
}

impl VisitedPath {
    fn len(&self) -> usize {
        self.order.len()
    }

    fn contains(&self, hash: u32) -> bool {
        self.members.contains(&hash)
    }

    /// Returns false if `hash` is already on the path.
    fn push(&mut self, hash: u32) -> bool {
        if !self.members.insert(hash) {
            return false;
        }
        self.order.push(hash);
        true
    }

    fn pop(&mut self) {
        if let Some(hash) = self.order.pop() {
            self.members.remove(&hash);
        }
    }

    fn truncate(&mut self, len: usize) {
        while self.order.len() > len {
            self.pop();
        }
    }
}

#[derive(Debug)]
struct Line {
    value: i32,
    moves: Vec<Move>,
}

impl Line {
    fn leaf(value: i32) -> Self {
        Self {
            value,
            moves: Vec::new(),
        }
    }

    fn is_win(&self) -> bool {
        self.value >= WIN_SCORE
    }
}

#[derive(Debug)]
struct TierSlot {
    start_depth: i32,
    cache: HashSet<(u32, i32)>,
}

/// Nested rollout search. Each instance owns its caches, RNG and counters,
/// so separate instances can run on separate threads.
#[derive(Debug)]
pub struct Solver {
    config: SolverConfig,
    tiers: [TierSlot; 2],
    rng: RngState,
    cancel: CancelHandle,
    deadline: Instant,
    nodes: u64,
    tier_switches: u64,
    deadline_hit: bool,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Result<Self, SolverError> {
        config.validate()?;
        let tiers = [
            TierSlot {
                start_depth: config.n0,
                cache: HashSet::new(),
            },
            TierSlot {
                start_depth: config.n1,
                cache: HashSet::new(),
            },
        ];
        Ok(Self {
            rng: RngState::from_seed(config.tie_break_seed.unwrap_or_default()),
            config,
            tiers,
            cancel: CancelHandle::default(),
            deadline: Instant::now(),
            nodes: 0,
            tier_switches: 0,
            deadline_hit: false,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Handle another thread can use to stop a running solve.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Searches for a winning line from `root`. The root is never mutated;
    /// the search works on its own clones.
    pub fn solve(&mut self, root: &GameState) -> SolveOutcome {
        let started_at = Instant::now();
        self.deadline = started_at + self.config.time_limit();
        self.rng = match self.config.tie_break_seed {
            Some(seed) => RngState::from_seed(seed),
            None => RngState::from_entropy(),
        };
        self.nodes = 0;
        self.tier_switches = 0;
        self.deadline_hit = false;
        for slot in &mut self.tiers {
            slot.cache.clear();
        }
        tracing::info!(
            n0 = self.config.n0,
            n1 = self.config.n1,
            max_time_ms = self.config.max_time_ms,
            tie_break_seed = self.rng.seed(),
            "solve started"
        );

        let mut path = VisitedPath::default();
        let start_depth = self.tiers[Tier::H1.index()].start_depth;
        let line = self.search(root, Tier::H1, start_depth, &mut path, None);

        let mut state = root.clone();
        for mv in &line.moves {
            state.apply_move(mv);
        }
        let win = state.is_win();
        let stats = SolveStats {
            nodes: self.nodes,
            elapsed_ms: started_at.elapsed().as_millis() as u64,
            tier_switches: self.tier_switches,
            cache_entries: [self.tiers[0].cache.len(), self.tiers[1].cache.len()],
            deadline_hit: self.deadline_hit,
        };
        tracing::info!(
            win,
            moves = line.moves.len(),
            nodes = stats.nodes,
            elapsed_ms = stats.elapsed_ms,
            foundation = state.foundation_cards(),
            "solve finished"
        );
        self.cancel.clear();
        SolveOutcome {
            win,
            moves: line.moves,
            state,
            value: line.value,
            tie_break_seed: self.rng.seed(),
            stats,
        }
    }

    /// First move of the line a full solve finds, if any.
    pub fn hint(&mut self, state: &GameState) -> Option<Move> {
        self.solve(state).moves.first().copied()
    }

    fn out_of_time(&mut self) -> bool {
        if self.deadline_hit {
            return true;
        }
        if self.cancel.is_cancelled() || Instant::now() >= self.deadline {
            self.deadline_hit = true;
            tracing::debug!(
                nodes = self.nodes,
                cancelled = self.cancel.is_cancelled(),
                "search budget exhausted"
            );
            return true;
        }
        false
    }

    fn leaf(&self, state: &GameState, tier: Tier) -> Line {
        Line::leaf(evaluate(state, tier))
    }

    fn candidates(&mut self, state: &GameState, forbidden: Option<MoveSignature>) -> Vec<Move> {
        prune_reverse(state.legal_moves(&mut self.rng), forbidden)
    }

    fn search(
        &mut self,
        state: &GameState,
        tier: Tier,
        depth: i32,
        path: &mut VisitedPath,
        forbidden: Option<MoveSignature>,
    ) -> Line {
        self.nodes += 1;
        if state.is_win() {
            return Line::leaf(WIN_SCORE);
        }
        let hash = state.state_hash();
        if path.contains(hash) {
            return Line::leaf(LOSS_SCORE);
        }
        if self.out_of_time() {
            return self.leaf(state, tier);
        }
        let mark = path.len();
        path.push(hash);
        let line = self.advance(state, hash, tier, depth, path, forbidden);
        path.truncate(mark);
        line
    }

    /// Escalates to `next` over an unmoved position whose hash is the last
    /// entry of `path`; the entry is dropped so the switch is not seen as a cycle.
    fn switch_tier(&mut self, state: &GameState, next: Tier, path: &mut VisitedPath) -> Line {
        path.pop();
        self.tier_switches += 1;
        tracing::debug!(tier = ?next, nodes = self.nodes, "switching heuristic tier");
        let depth = self.tiers[next.index()].start_depth;
        self.search(state, next, depth, path, None)
    }

    fn advance(
        &mut self,
        state: &GameState,
        hash: u32,
        tier: Tier,
        depth: i32,
        path: &mut VisitedPath,
        forbidden: Option<MoveSignature>,
    ) -> Line {
        let mut moves = self.candidates(state, forbidden);
        if moves.is_empty() || depth < 0 {
            return self.leaf(state, tier);
        }

        let capacity = self.config.cache_capacity;
        let slot = &mut self.tiers[tier.index()];
        if slot.cache.contains(&(hash, depth)) {
            return match tier.next() {
                Some(next) => self.switch_tier(state, next, path),
                None => self.leaf(state, tier),
            };
        }
        if slot.cache.len() < capacity {
            slot.cache.insert((hash, depth));
        }

        let mut live = state.clone();
        let mut solution: Vec<Move> = Vec::new();
        loop {
            let mut best: Option<(Move, Line)> = None;
            for mv in &moves {
                let reverse = live.reverse_signature(mv);
                let mut child = live.clone();
                child.apply_move(mv);
                let line = self.search(&child, tier, depth - 1, path, reverse);
                let won = line.is_win();
                if best.as_ref().map_or(true, |(_, held)| line.value > held.value) {
                    best = Some((*mv, line));
                }
                if won {
                    break;
                }
            }
            let Some((best_move, best_line)) = best else {
                return Line {
                    value: evaluate(&live, tier),
                    moves: solution,
                };
            };

            if best_line.is_win() {
                live.apply_move(&best_move);
                solution.push(best_move);
                for mv in &best_line.moves {
                    live.apply_move(mv);
                }
                solution.extend(best_line.moves);
                if live.is_win() {
                    return Line {
                        value: WIN_SCORE,
                        moves: solution,
                    };
                }
                // Not literally solved yet: carry on from the new position.
                if !path.push(live.state_hash()) || self.out_of_time() {
                    return Line {
                        value: evaluate(&live, tier),
                        moves: solution,
                    };
                }
                moves = self.candidates(&live, None);
                if moves.is_empty() {
                    return Line {
                        value: evaluate(&live, tier),
                        moves: solution,
                    };
                }
                continue;
            }

            let current = evaluate(&live, tier);
            if best_line.value <= current {
                return match tier.next() {
                    None => Line {
                        value: current,
                        moves: solution,
                    },
                    Some(next) => {
                        let line = self.switch_tier(&live, next, path);
                        solution.extend(line.moves);
                        Line {
                            value: line.value,
                            moves: solution,
                        }
                    }
                };
            }

            let reverse = live.reverse_signature(&best_move);
            live.apply_move(&best_move);
            tracing::trace!(
                tier = ?tier,
                depth,
                value = best_line.value,
                mv = %best_move,
                "committed move"
            );
            solution.push(best_move);
            if live.is_win() {
                return Line {
                    value: WIN_SCORE,
                    moves: solution,
                };
            }
            if !path.push(live.state_hash()) || self.out_of_time() {
                return Line {
                    value: evaluate(&live, tier),
                    moves: solution,
                };
            }
            moves = self.candidates(&live, reverse);
            if moves.is_empty() {
                return Line {
                    value: evaluate(&live, tier),
                    moves: solution,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klondike_core::{Card, Suit};
    use std::time::Duration;

    fn quick_config(seed: u64) -> SolverConfig {
        SolverConfig {
            n0: 0,
            n1: 0,
            tie_break_seed: Some(seed),
            ..SolverConfig::default()
        }
        .with_time_limit(Duration::from_millis(500))
    }

    /// Foundations at queen, two kings on the tableau, one in the waste and
    /// one in the stock.
    fn kings_left() -> GameState {
        let mut state = GameState::empty();
        for suit in Suit::ALL {
            state.foundation[suit.index()] =
                (1..=12).map(|rank| Card::face_up(rank, suit)).collect();
        }
        state.tableau[0] = vec![Card::face_up(13, Suit::Hearts)];
        state.tableau[1] = vec![Card::face_up(13, Suit::Clubs)];
        state.stock = vec![Card::face_down(13, Suit::Spades)];
        state.waste = vec![Card::face_up(13, Suit::Diamonds)];
        state
    }

    fn armed_solver(seed: u64) -> Solver {
        let mut solver = Solver::new(quick_config(seed)).expect("config");
        solver.deadline = Instant::now() + Duration::from_secs(5);
        solver
    }

    #[test]
    fn prune_reverse_falls_back_to_forbidden_move() {
        // Hearts up to the jack and a lone QH on the tableau: the only legal
        // move is QH to its foundation.
        let mut state = GameState::empty();
        state.foundation[Suit::Hearts.index()] =
            (1..=11).map(|rank| Card::face_up(rank, Suit::Hearts)).collect();
        state.tableau[0] = vec![Card::face_up(12, Suit::Hearts)];
        let moves = state.legal_moves(&mut RngState::from_seed(1));
        assert_eq!(moves.len(), 1);

        let forbidden = Some(moves[0].signature());
        assert_eq!(prune_reverse(moves.clone(), forbidden), moves);
        let mut solver = armed_solver(1);
        assert_eq!(solver.candidates(&state, forbidden), moves);
    }

    #[test]
    fn prune_reverse_drops_matching_move() {
        let a = Move::tableau_to_tableau(0, 1, Card::face_up(9, Suit::Clubs), 1, 6);
        let b = Move::tableau_to_tableau(2, 1, Card::face_up(9, Suit::Spades), 1, 6);
        assert_eq!(prune_reverse(vec![a, b], Some(a.signature())), vec![b]);
        assert_eq!(prune_reverse(vec![a, b], None), vec![a, b]);
    }

    #[test]
    fn visited_path_rejects_repeats_and_unwinds() {
        let mut path = VisitedPath::default();
        assert!(path.push(1));
        assert!(path.push(2));
        assert!(!path.push(1));
        path.truncate(1);
        assert!(path.contains(1));
        assert!(!path.contains(2));
        path.pop();
        assert_eq!(path.len(), 0);
    }

    #[test]
    fn solved_position_returns_immediately() {
        let mut state = GameState::empty();
        for suit in Suit::ALL {
            state.foundation[suit.index()] =
                (1..=13).map(|rank| Card::face_up(rank, suit)).collect();
        }
        let mut solver = Solver::new(quick_config(1)).expect("config");
        let outcome = solver.solve(&state);
        assert!(outcome.win);
        assert!(outcome.moves.is_empty());
        assert_eq!(outcome.value, WIN_SCORE);
    }

    #[test]
    fn finishes_an_almost_solved_board() {
        let state = kings_left();
        let mut solver = Solver::new(quick_config(3)).expect("config");
        let outcome = solver.solve(&state);
        assert!(outcome.win);
        assert!(outcome.moves.len() >= 4);
        let replayed = klondike_core::verify_moves(&state, &outcome.moves).expect("legal line");
        assert!(replayed.is_win());
    }

    #[test]
    fn h1_local_maximum_escalates_to_h2() {
        // Under H1 a king on the foundation scores 5 - 12, so no move beats
        // standing still and the search must hand over to H2.
        let state = kings_left();
        let current = evaluate(&state, Tier::H1);
        for mv in state.candidate_moves() {
            let mut next = state.clone();
            next.apply_move(&mv);
            assert!(evaluate(&next, Tier::H1) <= current);
        }

        let mut solver = Solver::new(quick_config(8)).expect("config");
        let outcome = solver.solve(&state);
        assert!(outcome.stats.tier_switches > 0);
        assert!(outcome.win);
        let replayed = klondike_core::verify_moves(&state, &outcome.moves).expect("legal line");
        assert!(replayed.is_win());
    }

    #[test]
    fn revisited_position_scores_as_loss() {
        let state = kings_left();
        let mut solver = armed_solver(2);
        let mut path = VisitedPath::default();
        path.push(state.state_hash());
        let line = solver.search(&state, Tier::H1, 0, &mut path, None);
        assert_eq!(line.value, LOSS_SCORE);
        assert!(line.moves.is_empty());
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn memo_hit_on_first_tier_escalates() {
        let state = kings_left();
        let mut solver = armed_solver(4);
        solver.tiers[Tier::H1.index()]
            .cache
            .insert((state.state_hash(), 0));
        let mut path = VisitedPath::default();
        let line = solver.search(&state, Tier::H1, 0, &mut path, None);

        assert_eq!(solver.tier_switches, 1);
        assert_eq!(solver.tiers[Tier::H1.index()].cache.len(), 1);
        // The escalated search starts on the same position; it is not
        // mistaken for a cycle and finishes the game.
        assert!(line.is_win());
        assert_eq!(path.len(), 0);
        let replayed = klondike_core::verify_moves(&state, &line.moves).expect("legal line");
        assert!(replayed.is_win());
    }

    #[test]
    fn memo_hit_on_last_tier_returns_leaf() {
        let state = kings_left();
        let mut solver = armed_solver(5);
        solver.tiers[Tier::H2.index()]
            .cache
            .insert((state.state_hash(), 0));
        let mut path = VisitedPath::default();
        let line = solver.search(&state, Tier::H2, 0, &mut path, None);

        assert_eq!(line.value, evaluate(&state, Tier::H2));
        assert!(line.moves.is_empty());
        assert_eq!(solver.nodes, 1);
        assert_eq!(solver.tier_switches, 0);
    }

    #[test]
    fn cancel_applies_to_one_solve_only() {
        let state = kings_left();
        let mut solver = Solver::new(quick_config(6)).expect("config");
        solver.cancel_handle().cancel();
        let stopped = solver.solve(&state);
        assert!(stopped.stats.deadline_hit);
        assert!(!stopped.win);
        assert!(!solver.cancel_handle().is_cancelled());

        let resumed = solver.solve(&state);
        assert!(!resumed.stats.deadline_hit);
        assert!(resumed.win);
    }

    #[test]
    fn cancelled_solver_returns_promptly() {
        let state = GameState::deal(9);
        let mut solver = Solver::new(SolverConfig {
            n0: 2,
            n1: 2,
            tie_break_seed: Some(5),
            ..SolverConfig::default()
        })
        .expect("config");
        solver.cancel_handle().cancel();
        let started = Instant::now();
        let outcome = solver.solve(&state);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(outcome.stats.deadline_hit);
        assert!(klondike_core::verify_moves(&state, &outcome.moves).is_ok());
    }

    #[test]
    fn root_state_is_left_untouched() {
        let state = GameState::deal(17);
        let before = state.clone();
        let mut solver = Solver::new(quick_config(17)).expect("config");
        let _ = solver.solve(&state);
        assert_eq!(state, before);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = SolverConfig {
            n0: -2,
            ..SolverConfig::default()
        };
        assert!(matches!(Solver::new(config), Err(SolverError::Config(_))));
    }
}
