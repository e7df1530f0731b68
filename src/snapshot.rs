//! `snapshot` — canonical grid fingerprints for search deduplication.
//!
//! During the backtracking search, different placement orders frequently
//! reach the same grid. Each reached state is reduced to a canonical,
//! translation-invariant u64 key; the solver skips recursion into any state
//! whose key it has already seen along a sibling branch.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::grid::{Direction, Grid};

// A constant to split up items in our hashes
const HASH_SPLIT: u16 = 0xFFFFu16;

/// How far a snapshot key collapses equivalent grids.
///
/// `Translation` treats two grids as equal when the same words sit in the
/// same relative geometry anywhere on the plane. `Dihedral` additionally
/// collapses the 8 rotations/reflections of the whole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Canonicalization {
    #[default]
    Translation,
    Dihedral,
}

/// One placed word reduced to hashable form: normalized start cell,
/// direction tag, word text.
type WordTuple = (i32, i32, u8, String);

fn direction_tag(d: Direction) -> u8 {
    match d {
        Direction::Across => 0,
        Direction::Down => 1,
    }
}

/// The identity placed-word tuples, untransformed and unnormalized.
fn base_tuples(grid: &Grid) -> Vec<(i32, i32, Direction, String)> {
    grid.placed_words()
        .iter()
        .map(|pw| (pw.row, pw.col, pw.direction, pw.word.clone()))
        .collect()
}

/// Shift all tuples so the minimum start row/col becomes zero, then sort
/// for order independence.
fn normalize(mut tuples: Vec<WordTuple>) -> Vec<WordTuple> {
    // Words only extend right/down from their start, so the minimum start
    // coordinate equals the minimum occupied coordinate.
    let min_row = tuples.iter().map(|t| t.0).min().unwrap_or(0);
    let min_col = tuples.iter().map(|t| t.1).min().unwrap_or(0);
    for t in &mut tuples {
        t.0 -= min_row;
        t.1 -= min_col;
    }
    tuples.sort_unstable();
    tuples
}

fn hash_tuples(tuples: &[WordTuple]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for (row, col, dir, word) in tuples {
        row.hash(&mut hasher);
        col.hash(&mut hasher);
        dir.hash(&mut hasher);
        word.hash(&mut hasher);
        // Separator between placements to avoid ambiguity
        HASH_SPLIT.hash(&mut hasher);
    }
    hasher.finish()
}

/// Apply one dihedral transform to a placed word and re-derive its tuple.
/// When the transform reverses the word's axis, the start moves to the
/// other end and the text reads backwards.
fn transform_word(
    (row, col, direction, word): &(i32, i32, Direction, String),
    transform: fn(i32, i32) -> (i32, i32),
) -> WordTuple {
    let (dr, dc) = direction.delta();
    let cells: Vec<(i32, i32)> = (0..word.len() as i32)
        .map(|i| transform(row + i * dr, col + i * dc))
        .collect();

    // Words are length ≥ 2, so orientation is read off the first step.
    let first = cells[0];
    let second = cells[1];
    let new_dir = if first.0 == second.0 {
        Direction::Across
    } else {
        Direction::Down
    };
    let reversed = second < first;

    let start = if reversed { *cells.last().unwrap_or(&first) } else { first };
    let text = if reversed {
        word.chars().rev().collect()
    } else {
        word.clone()
    };
    (start.0, start.1, direction_tag(new_dir), text)
}

/// The 8 symmetries of the square grid.
const DIHEDRAL: [fn(i32, i32) -> (i32, i32); 8] = [
    |r, c| (r, c),
    |r, c| (r, -c),
    |r, c| (-r, c),
    |r, c| (-r, -c),
    |r, c| (c, r),
    |r, c| (c, -r),
    |r, c| (-c, r),
    |r, c| (-c, -r),
];

/// Canonical key for a grid under the given canonicalization mode.
pub fn key(grid: &Grid, mode: Canonicalization) -> u64 {
    let base = base_tuples(grid);
    match mode {
        Canonicalization::Translation => {
            let tuples = normalize(
                base.iter()
                    .map(|t| (t.0, t.1, direction_tag(t.2), t.3.clone()))
                    .collect(),
            );
            hash_tuples(&tuples)
        }
        Canonicalization::Dihedral => DIHEDRAL
            .iter()
            .map(|&transform| {
                let tuples =
                    normalize(base.iter().map(|t| transform_word(t, transform)).collect());
                hash_tuples(&tuples)
            })
            .min()
            .unwrap_or(0),
    }
}

/// The set of grid states seen during one top-level solve.
///
/// Append-only for the lifetime of the solve, discarded with it; in
/// practice bounded by the search pruning rather than by any cap here.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    seen: HashSet<u64>,
    mode: Canonicalization,
}

impl SnapshotStore {
    pub fn new(mode: Canonicalization) -> Self {
        Self {
            seen: HashSet::new(),
            mode,
        }
    }

    /// Record the grid's current state; returns false when this state was
    /// already seen (the caller should backtrack out of it).
    pub fn insert(&mut self, grid: &Grid) -> bool {
        self.seen.insert(key(grid, self.mode))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
