//! `incremental` — the three-tier solver behind the peel loop.
//!
//! When new letters arrive on an already-solved grid, tearing the whole
//! thing down is usually overkill. Three strategies run in order under one
//! shared node budget: quick attach (first 20% of the nodes), partial
//! restructure (through 50%), full re-solve (the remainder). The first
//! strategy that absorbs the new letters wins; if all three fail the best
//! grid seen is returned with the stragglers reported unplaced.

use instant::Instant;

use crate::dictionary::Dictionary;
use crate::errors::SolverError;
use crate::grid::{Direction, Grid};
use crate::letters::LetterCounts;
use crate::solver::{
    backtrack, dead_letters, quality, solve_inner, Budget, SearchContext, SolveResult, Strategy,
};

/// Cumulative node-budget checkpoints for the cascade, in percent.
const QUICK_ATTACH_CAP_PCT: u64 = 20;
const RESTRUCTURE_CAP_PCT: u64 = 50;

/// Quick attach only considers words this short.
const QUICK_ATTACH_MAX_LEN: usize = 3;

/// Partial restructure pops at most this many words off the grid.
const MAX_RESTRUCTURE_POPS: usize = 3;

/// Incorporate `new_letters` into a grid that previously placed (some of)
/// `prev_hand`.
///
/// The returned stats name the strategy that succeeded, or
/// [`Strategy::Failed`] when none did — in which case the grid is the best
/// candidate by quality and `unplaced` holds what would not fit.
///
/// # Errors
///
/// `SolverError::EmptyHand` when the combined hand is empty.
pub fn peel(
    prev_grid: &Grid,
    prev_hand: &LetterCounts,
    new_letters: &LetterCounts,
    dict: &Dictionary,
    budget: Budget,
) -> Result<SolveResult, SolverError> {
    let mut full_hand = *prev_hand;
    full_hand.add_counts(new_letters);
    if full_hand.is_empty() {
        return Err(SolverError::EmptyHand);
    }

    let started = Instant::now();
    let mut budget = budget;
    let total_nodes = budget.cap();

    // Letters that were already unplaced before this peel; a strategy
    // "succeeds" only if it leaves no worse a remainder.
    let prev_unplaced = prev_hand.saturating_sub(&prev_grid.letters_on_grid());

    // --- Strategy A: quick attach -------------------------------------
    budget.set_cap(total_nodes * QUICK_ATTACH_CAP_PCT / 100);
    let mut grid = prev_grid.clone();
    if quick_attach(&mut grid, &full_hand, new_letters, dict, &mut budget) {
        log::debug!("peel: quick attach placed {new_letters}");
        budget.set_cap(total_nodes);
        return Ok(SolveResult::assemble(
            grid,
            &full_hand,
            Strategy::QuickAttach,
            &budget,
            started,
            0,
        ));
    }

    // Fallback candidate: the untouched previous grid.
    let mut best = prev_grid.clone();
    let mut snapshots = 0;

    // --- Strategy B: partial restructure ------------------------------
    budget.set_cap(total_nodes * RESTRUCTURE_CAP_PCT / 100);
    match partial_restructure(prev_grid, &full_hand, &prev_unplaced, dict, &mut budget) {
        Restructure::Solved(grid, snaps) => {
            log::debug!("peel: partial restructure absorbed {new_letters}");
            budget.set_cap(total_nodes);
            return Ok(SolveResult::assemble(
                grid,
                &full_hand,
                Strategy::PartialRestructure,
                &budget,
                started,
                snaps,
            ));
        }
        Restructure::Partial(candidate, snaps) => {
            snapshots += snaps;
            if let Some(g) = candidate {
                if quality(&g) > quality(&best) {
                    best = g;
                }
            }
        }
    }

    // --- Strategy C: full re-solve -------------------------------------
    budget.set_cap(total_nodes);
    let (resolved, snaps) = solve_inner(&full_hand, dict, &mut budget);
    snapshots += snaps;
    let resolved_unplaced = full_hand.saturating_sub(&resolved.letters_on_grid());
    if prev_unplaced.contains_all(&resolved_unplaced) {
        log::debug!("peel: full re-solve absorbed {new_letters}");
        return Ok(SolveResult::assemble(
            resolved,
            &full_hand,
            Strategy::FullResolve,
            &budget,
            started,
            snapshots,
        ));
    }
    if quality(&resolved) > quality(&best) {
        best = resolved;
    }

    log::debug!("peel: all strategies failed for {new_letters}");
    Ok(SolveResult::assemble(
        best,
        &full_hand,
        Strategy::Failed,
        &budget,
        started,
        snapshots,
    ))
}

/// Strategy A. Place 2–3 letter words so that each commits exactly one new
/// cell (everything else overlaps), repeating until every peeled letter is
/// down. Leaves successfully attached words on `grid` even when it
/// ultimately returns false; the caller discards the grid in that case.
fn quick_attach(
    grid: &mut Grid,
    full_hand: &LetterCounts,
    new_letters: &LetterCounts,
    dict: &Dictionary,
    budget: &mut Budget,
) -> bool {
    let mut delta_left = *new_letters;

    'progress: loop {
        if delta_left.is_empty() {
            return true;
        }
        if grid.is_empty() {
            // Nothing to attach to; that is restructure/re-solve territory.
            return false;
        }
        let unplaced = full_hand.saturating_sub(&grid.letters_on_grid());

        for target in delta_left.letters().collect::<Vec<_>>() {
            let mut candidates: Vec<String> = dict
                .words_from(full_hand, Some(target))
                .into_iter()
                .filter(|w| w.len() <= QUICK_ATTACH_MAX_LEN)
                .collect();
            // Shortest first: minimal disturbance.
            candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

            for word in &candidates {
                if !budget.tick() {
                    return false;
                }
                if let Some(written) = attach_once(grid, word, &unplaced, dict) {
                    delta_left.remove(written);
                    continue 'progress;
                }
            }
        }
        return false;
    }
}

/// Try every position where `word` crosses an existing cell and writes
/// exactly one new cell whose letter the unplaced set can pay for. Commits
/// and returns the written letter on the first hit.
fn attach_once(
    grid: &mut Grid,
    word: &str,
    unplaced: &LetterCounts,
    dict: &Dictionary,
) -> Option<char> {
    let mut cells: Vec<((i32, i32), char)> = grid.cells().collect();
    cells.sort_unstable_by_key(|&(cell, _)| cell);

    for ((r, c), letter) in cells {
        for (i, b) in word.bytes().enumerate() {
            if b as char != letter {
                continue;
            }
            for direction in Direction::BOTH {
                let (dr, dc) = direction.delta();
                let row = r - i as i32 * dr;
                let col = c - i as i32 * dc;
                let Ok(placement) = grid.can_place(word, row, col, direction, dict) else {
                    continue;
                };
                if placement.new_cell_count() != 1 {
                    continue;
                }
                let consumed = placement.consumed();
                if !unplaced.contains_all(&consumed) {
                    continue;
                }
                let written = consumed.letters().next()?;
                grid.place(placement);
                return Some(written);
            }
        }
    }
    None
}

enum Restructure {
    /// A popped-and-rebuilt grid that absorbed everything.
    Solved(Grid, usize),
    /// No k worked; carries the best partial grid found, if any.
    Partial(Option<Grid>, usize),
}

/// Strategy B. Pop the last k placed words (k = 1..=3), returning their
/// freshly-written letters to the hand, and re-run the core search from
/// the reduced grid. The first k whose rebuild leaves no worse a remainder
/// than before the peel wins.
fn partial_restructure(
    prev_grid: &Grid,
    full_hand: &LetterCounts,
    prev_unplaced: &LetterCounts,
    dict: &Dictionary,
    budget: &mut Budget,
) -> Restructure {
    let placed_count = prev_grid.placed_words().len();
    let mut best_partial: Option<Grid> = None;
    let mut snapshots = 0;

    for k in 1..=MAX_RESTRUCTURE_POPS.min(placed_count) {
        if budget.exhausted() {
            break;
        }

        let mut grid = prev_grid.clone();
        for _ in 0..k {
            grid.undo();
        }

        // Freed letters rejoin the unplaced pile implicitly: anything in
        // the hand not on the reduced grid needs placing.
        let to_place = full_hand.saturating_sub(&grid.letters_on_grid());
        let playable = to_place.saturating_sub(&dead_letters(&to_place, dict));

        let mut cx = SearchContext::new(dict, budget);
        let done = backtrack(&mut grid, &playable, &mut cx);
        snapshots += cx.seen.len();

        if done {
            let unplaced = full_hand.saturating_sub(&grid.letters_on_grid());
            if prev_unplaced.contains_all(&unplaced) {
                return Restructure::Solved(grid, snapshots);
            }
        }
        if let Some(candidate) = cx.best {
            if best_partial
                .as_ref()
                .map_or(true, |b| quality(&candidate) > quality(b))
            {
                best_partial = Some(candidate);
            }
        }
    }

    Restructure::Partial(best_partial, snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{solve, Budget};

    fn small_dict() -> Dictionary {
        Dictionary::build([
            "CAT", "CATS", "AT", "TA", "AS", "AH", "HA", "HAT", "HELLO", "WE", "HE", "LO",
            "OW", "HOW", "LOW", "HEW", "OWE",
        ])
        .unwrap()
    }

    #[test]
    fn test_peel_quick_attach_single_letter() {
        let d = small_dict();
        let hand = LetterCounts::parse("CAT").unwrap();
        let solved = solve(&hand, &d, Budget::nodes(10_000)).unwrap();
        assert!(solved.unplaced.is_empty());

        let delta = LetterCounts::parse("S").unwrap();
        let result = peel(&solved.grid, &hand, &delta, &d, Budget::nodes(50_000)).unwrap();
        assert_eq!(result.stats.strategy, Strategy::QuickAttach);
        assert!(result.unplaced.is_empty());
        assert_eq!(result.grid.letter_count(), 4);
        assert!(result.grid.connected());
    }

    #[test]
    fn test_peel_keeps_existing_grid_cells() {
        let d = small_dict();
        let hand = LetterCounts::parse("HELLO").unwrap();
        let solved = solve(&hand, &d, Budget::nodes(10_000)).unwrap();
        assert!(solved.unplaced.is_empty());

        let delta = LetterCounts::parse("W").unwrap();
        let result = peel(&solved.grid, &hand, &delta, &d, Budget::nodes(50_000)).unwrap();
        assert!(result.unplaced.is_empty());
        assert_eq!(result.grid.letter_count(), 6);
        // The original word survives somewhere on the grid.
        assert!(result
            .grid
            .placed_words()
            .iter()
            .any(|pw| pw.word == "HELLO"));
    }

    #[test]
    fn test_peel_impossible_letter_reports_failure() {
        let d = small_dict();
        let hand = LetterCounts::parse("CATHA").unwrap();
        let solved = solve(&hand, &d, Budget::nodes(50_000)).unwrap();
        assert!(solved.unplaced.is_empty());

        let delta = LetterCounts::parse("Q").unwrap();
        let result = peel(&solved.grid, &hand, &delta, &d, Budget::nodes(100_000)).unwrap();
        assert_eq!(result.stats.strategy, Strategy::Failed);
        assert_eq!(result.unplaced, LetterCounts::parse("Q").unwrap());
        // The rest of the hand is still fully placed.
        assert_eq!(result.grid.letter_count(), 5);
    }

    #[test]
    fn test_peel_conserves_letters() {
        let d = small_dict();
        let hand = LetterCounts::parse("CAT").unwrap();
        let solved = solve(&hand, &d, Budget::nodes(10_000)).unwrap();

        let delta = LetterCounts::parse("SQ").unwrap();
        let result = peel(&solved.grid, &hand, &delta, &d, Budget::nodes(100_000)).unwrap();
        let mut full_hand = hand;
        full_hand.add_counts(&delta);
        let mut accounted = result.grid.letters_on_grid();
        accounted.add_counts(&result.unplaced);
        assert_eq!(accounted, full_hand);
    }

    #[test]
    fn test_peel_empty_delta_succeeds_trivially() {
        let d = small_dict();
        let hand = LetterCounts::parse("CAT").unwrap();
        let solved = solve(&hand, &d, Budget::nodes(10_000)).unwrap();

        let result = peel(
            &solved.grid,
            &hand,
            &LetterCounts::new(),
            &d,
            Budget::nodes(10_000),
        )
        .unwrap();
        assert_eq!(result.stats.strategy, Strategy::QuickAttach);
        assert_eq!(result.grid, solved.grid);
    }
}
