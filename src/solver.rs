//! `solver` — backtracking placement search.
//!
//! Given a hand and the dictionary, the solver arranges a maximal-size
//! subset of the hand (ideally all of it) into a valid connected grid. The
//! search is depth-first over attachment points: on an empty grid it seeds
//! candidate words at the origin, otherwise it tries dictionary words
//! through each occupied cell, hardest overlap letter first. Every reached
//! state is fingerprinted and duplicate states are pruned.
//!
//! The search never throws on unsolvable input; it returns the best grid
//! found under the quality metric (letters placed, then fewer words, then
//! tighter bounding box). Budgets are node counts — one node per recursion
//! entry — polled at every entry, which keeps repeated solves of the same
//! hand bit-identical. An optional wall-clock deadline can be layered on
//! top, at the cost of that reproducibility.

use std::cmp::Reverse;
use std::time::Duration;

use instant::Instant;

use crate::dictionary::Dictionary;
use crate::errors::SolverError;
use crate::grid::{Direction, Grid};
use crate::letters::{difficulty, word_difficulty, LetterCounts};
use crate::snapshot::{Canonicalization, SnapshotStore};

/// Default node budget for a top-level solve.
pub const DEFAULT_NODE_BUDGET: u64 = 200_000;

/// Below this many remaining letters, shorter candidate words are tried
/// first at an attachment point; above it, longer first.
const SMALL_HAND: usize = 5;

/// Deadline polling stride; checking the clock every node would dominate
/// small searches.
const DEADLINE_POLL_MASK: u64 = 0x3FF;

/// Search budget: a node count, optionally guarded by a wall-clock
/// deadline. One node is charged per recursion entry (and per candidate
/// probe in quick attach).
#[derive(Debug, Clone)]
pub struct Budget {
    cap: u64,
    used: u64,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl Default for Budget {
    fn default() -> Self {
        Self::nodes(DEFAULT_NODE_BUDGET)
    }
}

impl Budget {
    pub fn nodes(max_nodes: u64) -> Self {
        Self {
            cap: max_nodes,
            used: 0,
            deadline: None,
            timed_out: false,
        }
    }

    /// Add a wall-clock guard on top of the node cap. Deadlines make
    /// results dependent on machine speed; leave them off when
    /// reproducibility matters.
    #[must_use]
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }

    /// Charge one node. Returns false when the budget is already spent;
    /// the caller unwinds, keeping the best grid seen.
    pub(crate) fn tick(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        self.used += 1;
        if self.used & DEADLINE_POLL_MASK == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.timed_out = true;
                    return false;
                }
            }
        }
        true
    }

    pub fn exhausted(&self) -> bool {
        self.timed_out || self.used >= self.cap
    }

    pub fn nodes_used(&self) -> u64 {
        self.used
    }

    pub(crate) fn cap(&self) -> u64 {
        self.cap
    }

    /// Re-cap the budget; spent nodes stay spent. The incremental solver
    /// uses this to hand each cascade phase its slice.
    pub(crate) fn set_cap(&mut self, cap: u64) {
        self.cap = cap;
    }
}

/// Which strategy produced a returned grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plain top-level solve.
    FullSolve,
    /// Peel strategy A: attach the new letters to the existing grid.
    QuickAttach,
    /// Peel strategy B: rebuild after popping the last few words.
    PartialRestructure,
    /// Peel strategy C: re-solve the whole hand from scratch.
    FullResolve,
    /// Every peel strategy failed; best-effort grid returned.
    Failed,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::FullSolve => "full_solve",
            Strategy::QuickAttach => "quick_attach",
            Strategy::PartialRestructure => "partial_restructure",
            Strategy::FullResolve => "full_resolve",
            Strategy::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Diagnostics for one solve or peel call.
#[derive(Debug, Clone)]
pub struct SolveStats {
    /// Search nodes expanded.
    pub nodes: u64,
    pub elapsed: Duration,
    /// True when the search stopped on budget rather than exhaustion.
    pub budget_exhausted: bool,
    /// Distinct grid states fingerprinted.
    pub snapshots: usize,
    pub strategy: Strategy,
}

/// Result of a solve or peel: the best grid found, the letters that did
/// not make it onto it, and diagnostics. An unsolvable hand is not an
/// error — it comes back as an empty or partial grid with `unplaced`
/// filled in.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub grid: Grid,
    pub unplaced: LetterCounts,
    pub stats: SolveStats,
}

impl SolveResult {
    pub(crate) fn assemble(
        grid: Grid,
        hand: &LetterCounts,
        strategy: Strategy,
        budget: &Budget,
        started: Instant,
        snapshots: usize,
    ) -> Self {
        let unplaced = hand.saturating_sub(&grid.letters_on_grid());
        Self {
            grid,
            unplaced,
            stats: SolveStats {
                nodes: budget.nodes_used(),
                elapsed: started.elapsed(),
                budget_exhausted: budget.exhausted(),
                snapshots,
                strategy,
            },
        }
    }
}

/// Lexicographic grid quality: more letters placed beats fewer; among
/// equals fewer words wins; among those a tighter bounding box wins.
pub(crate) fn quality(grid: &Grid) -> (usize, i64, i64) {
    let letters = grid.letter_count();
    let words = grid.placed_words().len() as i64;
    let area = grid.bounds().map_or(0, |b| b.area());
    (letters, -words, -area)
}

/// Letters of `hand` that appear in no word spellable from `hand`. They
/// cannot possibly be placed, so the search drops them up front and
/// reports them back as unplaced.
pub(crate) fn dead_letters(hand: &LetterCounts, dict: &Dictionary) -> LetterCounts {
    let mut alive = [false; 26];
    for word in dict.words_from(hand, None) {
        for b in word.bytes() {
            alive[(b - b'A') as usize] = true;
        }
    }
    let mut dead = LetterCounts::new();
    for (ch, n) in hand.iter() {
        if !alive[(ch as u8 - b'A') as usize] {
            for _ in 0..n {
                dead.add(ch);
            }
        }
    }
    dead
}

pub(crate) struct SearchContext<'a> {
    pub(crate) dict: &'a Dictionary,
    pub(crate) budget: &'a mut Budget,
    pub(crate) seen: SnapshotStore,
    pub(crate) best: Option<Grid>,
    best_quality: (usize, i64, i64),
}

impl<'a> SearchContext<'a> {
    pub(crate) fn new(dict: &'a Dictionary, budget: &'a mut Budget) -> Self {
        Self {
            dict,
            budget,
            seen: SnapshotStore::new(Canonicalization::Translation),
            best: None,
            best_quality: (0, 0, 0),
        }
    }

    fn note(&mut self, grid: &Grid) {
        let q = quality(grid);
        if self.best.is_none() || q > self.best_quality {
            self.best_quality = q;
            self.best = Some(grid.clone());
        }
    }
}

/// Depth-first search. Returns true when a complete solution (empty
/// `remaining`) was reached; the winning grid is then in `cx.best` and
/// also left on `grid` itself.
///
/// Every `place` on the way down has a matching `undo` on every exit path
/// except straight up through a completed solution.
pub(crate) fn backtrack(grid: &mut Grid, remaining: &LetterCounts, cx: &mut SearchContext) -> bool {
    if !cx.budget.tick() {
        return false;
    }

    // The current grid is itself a candidate answer ("stop" move).
    cx.note(grid);

    if remaining.is_empty() {
        return true;
    }

    if grid.is_empty() {
        return seed(grid, remaining, cx);
    }

    // Attachment points: occupied cells, hardest overlap letter first.
    // Hard letters admit the fewest words, so resolving them early prunes
    // deeper.
    let mut attach: Vec<((i32, i32), char)> = grid.cells().collect();
    attach.sort_by_key(|&((r, c), ch)| (Reverse(difficulty(ch)), r, c));

    let small = remaining.total() < SMALL_HAND;

    for ((anchor_row, anchor_col), anchor_letter) in attach {
        // The overlap cell contributes its letter for free.
        let mut pool = *remaining;
        pool.add(anchor_letter);
        let mut words = cx.dict.words_from(&pool, Some(anchor_letter));
        if small {
            words.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        }

        for direction in Direction::BOTH {
            let (dr, dc) = direction.delta();
            for word in &words {
                for (i, b) in word.bytes().enumerate() {
                    if b as char != anchor_letter {
                        continue;
                    }
                    let row = anchor_row - i as i32 * dr;
                    let col = anchor_col - i as i32 * dc;
                    let Ok(placement) = grid.can_place(word, row, col, direction, cx.dict)
                    else {
                        continue;
                    };
                    let consumed = placement.consumed();
                    if !remaining.contains_all(&consumed) {
                        continue;
                    }

                    grid.place(placement);
                    if cx.seen.insert(grid) {
                        let next = remaining.saturating_sub(&consumed);
                        if backtrack(grid, &next, cx) {
                            return true;
                        }
                    }
                    grid.undo();

                    if cx.budget.exhausted() {
                        return false;
                    }
                }
            }
        }
    }

    false
}

/// Empty-grid case: place each candidate seed word horizontally at the
/// origin and recurse. Seeds run longest first, then hardest first, which
/// front-loads letters like Q/X/Z/J that otherwise strand.
fn seed(grid: &mut Grid, remaining: &LetterCounts, cx: &mut SearchContext) -> bool {
    let mut seeds = cx.dict.words_from(remaining, None);
    seeds.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| word_difficulty(b).cmp(&word_difficulty(a)))
            .then_with(|| a.cmp(b))
    });

    for word in seeds {
        let Ok(placement) = grid.can_place(&word, 0, 0, Direction::Across, cx.dict) else {
            continue;
        };
        let consumed = placement.consumed();
        grid.place(placement);
        if cx.seen.insert(grid) {
            let next = remaining.saturating_sub(&consumed);
            if backtrack(grid, &next, cx) {
                return true;
            }
        }
        grid.undo();

        if cx.budget.exhausted() {
            return false;
        }
    }
    false
}

/// Run the search for `hand` against a caller-managed budget. Returns the
/// best grid and the number of distinct states fingerprinted.
pub(crate) fn solve_inner(
    hand: &LetterCounts,
    dict: &Dictionary,
    budget: &mut Budget,
) -> (Grid, usize) {
    let dead = dead_letters(hand, dict);
    let playable = hand.saturating_sub(&dead);
    if !dead.is_empty() {
        log::debug!("dead letters pruned before search: {dead}");
    }

    let mut grid = Grid::new();
    let mut cx = SearchContext::new(dict, budget);
    backtrack(&mut grid, &playable, &mut cx);
    let snapshots = cx.seen.len();
    (cx.best.unwrap_or_default(), snapshots)
}

/// Arrange `hand` into a valid grid.
///
/// Returns the best grid found under the budget together with the letters
/// that could not be placed; an unsolvable hand yields an empty grid, not
/// an error.
///
/// # Errors
///
/// `SolverError::EmptyHand` when the hand has no letters.
pub fn solve(
    hand: &LetterCounts,
    dict: &Dictionary,
    budget: Budget,
) -> Result<SolveResult, SolverError> {
    if hand.is_empty() {
        return Err(SolverError::EmptyHand);
    }
    let started = Instant::now();
    let mut budget = budget;

    let (grid, snapshots) = solve_inner(hand, dict, &mut budget);
    let result = SolveResult::assemble(grid, hand, Strategy::FullSolve, &budget, started, snapshots);
    log::debug!(
        "solve: {}/{} letters placed, {} words, {} nodes",
        hand.total() - result.unplaced.total(),
        hand.total(),
        result.grid.placed_words().len(),
        result.stats.nodes
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dict() -> Dictionary {
        Dictionary::build([
            "CAT", "CATS", "AT", "TA", "AS", "AH", "HA", "HAT", "HATH", "WHAT", "THRAW",
            "WRATH", "THAW", "HAW", "TAW", "AW", "AHA", "RAT", "TAR", "RAW", "WAR",
        ])
        .unwrap()
    }

    fn run_is_word(d: &Dictionary, run: &str) -> bool {
        run.len() < 2 || d.contains(run)
    }

    /// Every maximal horizontal and vertical run of the grid must be a
    /// dictionary word.
    fn assert_all_runs_valid(grid: &Grid, d: &Dictionary) {
        let Some(b) = grid.bounds() else { return };
        for r in b.min_row..=b.max_row {
            let mut run = String::new();
            for c in b.min_col..=(b.max_col + 1) {
                match grid.get((r, c)) {
                    Some(ch) => run.push(ch),
                    None => {
                        assert!(run_is_word(d, &run), "bad horizontal run {run:?}");
                        run.clear();
                    }
                }
            }
        }
        for c in b.min_col..=b.max_col {
            let mut run = String::new();
            for r in b.min_row..=(b.max_row + 1) {
                match grid.get((r, c)) {
                    Some(ch) => run.push(ch),
                    None => {
                        assert!(run_is_word(d, &run), "bad vertical run {run:?}");
                        run.clear();
                    }
                }
            }
        }
    }

    #[test]
    fn test_solve_single_word_hand() {
        let d = small_dict();
        let hand = LetterCounts::parse("CAT").unwrap();
        let result = solve(&hand, &d, Budget::nodes(10_000)).unwrap();
        assert!(result.unplaced.is_empty());
        assert_eq!(result.grid.letter_count(), 3);
        assert!(result.grid.connected());
        assert_all_runs_valid(&result.grid, &d);
    }

    #[test]
    fn test_solve_empty_hand_is_error() {
        let d = small_dict();
        assert!(matches!(
            solve(&LetterCounts::new(), &d, Budget::nodes(100)),
            Err(SolverError::EmptyHand)
        ));
    }

    #[test]
    fn test_solve_places_crossing_words() {
        let d = small_dict();
        // No single word spells this hand, so the solver must cross at
        // least two.
        let hand = LetterCounts::parse("CATSA").unwrap();
        let result = solve(&hand, &d, Budget::nodes(50_000)).unwrap();
        assert!(
            result.unplaced.is_empty(),
            "unplaced: {} grid:\n{}",
            result.unplaced,
            result.grid
        );
        assert_eq!(result.grid.letter_count(), 5);
        assert!(result.grid.connected());
        assert_all_runs_valid(&result.grid, &d);
    }

    #[test]
    fn test_solve_reports_dead_letters() {
        let d = small_dict();
        let hand = LetterCounts::parse("CATQ").unwrap();
        let result = solve(&hand, &d, Budget::nodes(10_000)).unwrap();
        assert_eq!(result.unplaced, LetterCounts::parse("Q").unwrap());
        assert_eq!(result.grid.letter_count(), 3);
    }

    #[test]
    fn test_solve_hopeless_hand_returns_empty_grid() {
        let d = small_dict();
        let hand = LetterCounts::parse("QQZZ").unwrap();
        let result = solve(&hand, &d, Budget::nodes(10_000)).unwrap();
        assert!(result.grid.is_empty());
        assert_eq!(result.unplaced, hand);
    }

    #[test]
    fn test_solve_letter_conservation() {
        let d = small_dict();
        let hand = LetterCounts::parse("WHATHATTHRAW").unwrap();
        let result = solve(&hand, &d, Budget::nodes(DEFAULT_NODE_BUDGET)).unwrap();
        let mut placed = result.grid.letters_on_grid();
        placed.add_counts(&result.unplaced);
        assert_eq!(placed, hand);
        assert_all_runs_valid(&result.grid, &d);
    }

    #[test]
    fn test_zero_budget_returns_empty_best() {
        let d = small_dict();
        let hand = LetterCounts::parse("CAT").unwrap();
        let result = solve(&hand, &d, Budget::nodes(0)).unwrap();
        assert!(result.stats.budget_exhausted);
        assert!(result.grid.is_empty());
        assert_eq!(result.unplaced, hand);
    }

    #[test]
    fn test_solve_is_deterministic() {
        let d = small_dict();
        let hand = LetterCounts::parse("WHATHATTHRAW").unwrap();
        let a = solve(&hand, &d, Budget::nodes(DEFAULT_NODE_BUDGET)).unwrap();
        let b = solve(&hand, &d, Budget::nodes(DEFAULT_NODE_BUDGET)).unwrap();
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.unplaced, b.unplaced);
        assert_eq!(a.stats.nodes, b.stats.nodes);
    }

    #[test]
    fn test_quality_prefers_more_letters() {
        let d = small_dict();
        let mut a = Grid::new();
        let p = a.can_place("CAT", 0, 0, Direction::Across, &d).unwrap();
        a.place(p);
        let mut b = Grid::new();
        let p = b.can_place("CATS", 0, 0, Direction::Across, &d).unwrap();
        b.place(p);
        assert!(quality(&b) > quality(&a));
    }

    #[test]
    fn test_dead_letters() {
        let d = small_dict();
        let hand = LetterCounts::parse("CATQQ").unwrap();
        assert_eq!(dead_letters(&hand, &d), LetterCounts::parse("QQ").unwrap());
        let hand = LetterCounts::parse("CAT").unwrap();
        assert!(dead_letters(&hand, &d).is_empty());
    }
}
