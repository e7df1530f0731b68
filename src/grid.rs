//! `grid` — sparse signed-coordinate crossword grid.
//!
//! Cells live in a hash map keyed by `(row, col)`; the grid is unbounded and
//! only the actual placements define its extent. Placements are validated
//! without mutating (`can_place`), committed (`place`), and rolled back in
//! LIFO order (`undo`); each placement records exactly the cells it newly
//! wrote, so an undo restores the previous state bit-for-bit, bounds
//! included.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::dictionary::Dictionary;
use crate::letters::LetterCounts;
use crate::snapshot::{self, Canonicalization};

/// A grid coordinate: `(row, col)`. Rows grow downward, columns rightward.
pub type Cell = (i32, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Across, Direction::Down];

    /// Per-step `(row, col)` delta along this direction.
    pub(crate) fn delta(self) -> (i32, i32) {
        match self {
            Direction::Across => (0, 1),
            Direction::Down => (1, 0),
        }
    }

    pub(crate) fn perpendicular(self) -> Self {
        match self {
            Direction::Across => Direction::Down,
            Direction::Down => Direction::Across,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Bounding box of the occupied cells, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_row: i32,
    pub max_row: i32,
    pub min_col: i32,
    pub max_col: i32,
}

impl Bounds {
    fn of(cell: Cell) -> Self {
        Self {
            min_row: cell.0,
            max_row: cell.0,
            min_col: cell.1,
            max_col: cell.1,
        }
    }

    fn include(&mut self, cell: Cell) {
        self.min_row = self.min_row.min(cell.0);
        self.max_row = self.max_row.max(cell.0);
        self.min_col = self.min_col.min(cell.1);
        self.max_col = self.max_col.max(cell.1);
    }

    pub fn area(&self) -> i64 {
        i64::from(self.max_row - self.min_row + 1) * i64::from(self.max_col - self.min_col + 1)
    }
}

/// A placement validated by [`Grid::can_place`] but not yet committed.
///
/// Holds the cells the placement would newly write; it is only valid
/// against the grid state it was validated on, so place it before mutating
/// the grid any further.
#[derive(Debug, Clone)]
pub struct Placement {
    pub word: String,
    pub row: i32,
    pub col: i32,
    pub direction: Direction,
    new_cells: Vec<(Cell, char)>,
    overlaps: usize,
}

impl Placement {
    /// Letters the hand must supply: only newly written cells count,
    /// overlap cells reuse what is already on the grid.
    pub fn consumed(&self) -> LetterCounts {
        let mut counts = LetterCounts::new();
        for &(_, ch) in &self.new_cells {
            counts.add(ch);
        }
        counts
    }

    pub fn new_cell_count(&self) -> usize {
        self.new_cells.len()
    }

    pub fn overlap_count(&self) -> usize {
        self.overlaps
    }
}

/// Why [`Grid::can_place`] refused a placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The word is not in the dictionary.
    NotAWord,
    /// The in-axis cell just before the start or just after the end is
    /// occupied, so the word would merge into a longer run.
    EndCellOccupied,
    /// An overlap cell holds a different letter.
    LetterConflict {
        cell: Cell,
        existing: char,
        wanted: char,
    },
    /// A non-empty grid requires at least one overlap cell.
    NoOverlap,
    /// Every cell overlaps; the placement would write nothing.
    NoNewCells,
    /// A perpendicular run through a newly written cell is not a word.
    InvalidCrossRun { run: String },
}

/// Record of one committed placement, kept on the grid's undo stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedWord {
    pub word: String,
    pub row: i32,
    pub col: i32,
    pub direction: Direction,
    cells_added: Vec<Cell>,
    prev_bounds: Option<Bounds>,
}

impl PlacedWord {
    /// Cells this placement newly wrote (its overlap cells belong to
    /// earlier placements).
    pub fn cells_added(&self) -> &[Cell] {
        &self.cells_added
    }

    /// The letters sitting on the newly written cells; these return to the
    /// hand when the placement is undone.
    pub fn added_letters(&self) -> LetterCounts {
        let mut counts = LetterCounts::new();
        for &(r, c) in &self.cells_added {
            // One of the two terms is always zero, so this is the index
            // along the word's axis.
            let i = ((r - self.row) + (c - self.col)) as usize;
            counts.add(self.word.as_bytes()[i] as char);
        }
        counts
    }
}

/// Sparse grid with place/undo and full cross-word validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    cells: HashMap<Cell, char>,
    placed: Vec<PlacedWord>,
    bounds: Option<Bounds>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, cell: Cell) -> Option<char> {
        self.cells.get(&cell).copied()
    }

    /// Number of occupied cells, i.e. letters placed.
    pub fn letter_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> impl Iterator<Item = (Cell, char)> + '_ {
        self.cells.iter().map(|(&cell, &ch)| (cell, ch))
    }

    pub fn placed_words(&self) -> &[PlacedWord] {
        &self.placed
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// The multiset of letters currently on the grid.
    pub fn letters_on_grid(&self) -> LetterCounts {
        let mut counts = LetterCounts::new();
        for &ch in self.cells.values() {
            counts.add(ch);
        }
        counts
    }

    /// The perpendicular run that would pass through `cell` if it held
    /// `ch`: existing letters before, the written letter, existing letters
    /// after. Cells of the placement itself never appear here because they
    /// all lie on the main axis.
    fn perpendicular_run(&self, cell: Cell, ch: char, perp: Direction) -> String {
        let (dr, dc) = perp.delta();
        let mut prefix: Vec<char> = Vec::new();
        let (mut r, mut c) = (cell.0 - dr, cell.1 - dc);
        while let Some(&existing) = self.cells.get(&(r, c)) {
            prefix.push(existing);
            r -= dr;
            c -= dc;
        }
        prefix.reverse();

        let mut run: String = prefix.into_iter().collect();
        run.push(ch);

        let (mut r, mut c) = (cell.0 + dr, cell.1 + dc);
        while let Some(&existing) = self.cells.get(&(r, c)) {
            run.push(existing);
            r += dr;
            c += dc;
        }
        run
    }

    /// Validate placing `word` with its first letter at `(row, col)` along
    /// `direction`, without mutating the grid.
    ///
    /// A valid placement must: be a dictionary word; have empty in-axis
    /// cells immediately before and after it; agree with every overlap
    /// cell; overlap at least one occupied cell unless the grid is empty
    /// (and write at least one new cell regardless); and every
    /// perpendicular run created through a newly written cell must either
    /// stay length 1 or spell a dictionary word.
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] encountered.
    pub fn can_place(
        &self,
        word: &str,
        row: i32,
        col: i32,
        direction: Direction,
        dictionary: &Dictionary,
    ) -> Result<Placement, Rejection> {
        if !dictionary.contains(word) {
            return Err(Rejection::NotAWord);
        }

        let (dr, dc) = direction.delta();
        let len = word.len() as i32;

        // End neighbors must be empty or the word would merge into a
        // longer in-axis run.
        let before = (row - dr, col - dc);
        let after = (row + len * dr, col + len * dc);
        if self.cells.contains_key(&before) || self.cells.contains_key(&after) {
            return Err(Rejection::EndCellOccupied);
        }

        let mut new_cells: Vec<(Cell, char)> = Vec::new();
        let mut overlaps = 0;
        for (i, b) in word.bytes().enumerate() {
            let ch = b as char;
            let cell = (row + i as i32 * dr, col + i as i32 * dc);
            match self.cells.get(&cell) {
                Some(&existing) if existing == ch => overlaps += 1,
                Some(&existing) => {
                    return Err(Rejection::LetterConflict {
                        cell,
                        existing,
                        wanted: ch,
                    })
                }
                None => new_cells.push((cell, ch)),
            }
        }

        if !self.is_empty() && overlaps == 0 {
            return Err(Rejection::NoOverlap);
        }
        if new_cells.is_empty() {
            return Err(Rejection::NoNewCells);
        }

        let perp = direction.perpendicular();
        for &(cell, ch) in &new_cells {
            let run = self.perpendicular_run(cell, ch, perp);
            if run.len() > 1 && !dictionary.contains(&run) {
                return Err(Rejection::InvalidCrossRun { run });
            }
        }

        Ok(Placement {
            word: word.to_string(),
            row,
            col,
            direction,
            new_cells,
            overlaps,
        })
    }

    /// Commit a placement validated against the current grid state.
    /// Returns the letters consumed from the hand (newly written cells
    /// only).
    pub fn place(&mut self, placement: Placement) -> LetterCounts {
        let consumed = placement.consumed();
        let prev_bounds = self.bounds;

        let mut cells_added = Vec::with_capacity(placement.new_cells.len());
        for (cell, ch) in placement.new_cells {
            self.cells.insert(cell, ch);
            self.bounds = Some(match self.bounds {
                Some(mut b) => {
                    b.include(cell);
                    b
                }
                None => Bounds::of(cell),
            });
            cells_added.push(cell);
        }

        self.placed.push(PlacedWord {
            word: placement.word,
            row: placement.row,
            col: placement.col,
            direction: placement.direction,
            cells_added,
            prev_bounds,
        });
        consumed
    }

    /// Remove the most recently placed word, clearing only the cells it
    /// newly wrote. The grid returns bit-exactly to its state before that
    /// placement.
    pub fn undo(&mut self) -> Option<PlacedWord> {
        let placed = self.placed.pop()?;
        for cell in &placed.cells_added {
            self.cells.remove(cell);
        }
        self.bounds = placed.prev_bounds;
        Some(placed)
    }

    /// Every empty cell 4-adjacent to an occupied cell, sorted for
    /// deterministic iteration; the origin alone when the grid is empty.
    pub fn anchors(&self) -> Vec<Cell> {
        if self.is_empty() {
            return vec![(0, 0)];
        }
        let mut anchors: Vec<Cell> = self
            .cells
            .keys()
            .flat_map(|&(r, c)| [(r - 1, c), (r + 1, c), (r, c - 1), (r, c + 1)])
            .filter(|cell| !self.cells.contains_key(cell))
            .collect();
        anchors.sort_unstable();
        anchors.dedup();
        anchors
    }

    /// All occupied cells reachable from one another through 4-adjacency.
    /// Holds by construction in steady state (every placement overlaps an
    /// existing cell); exposed for tests and debugging.
    pub fn connected(&self) -> bool {
        let Some((&start, _)) = self.cells.iter().next() else {
            return true;
        };
        let mut seen: HashSet<Cell> = HashSet::with_capacity(self.cells.len());
        let mut stack = vec![start];
        seen.insert(start);
        while let Some((r, c)) = stack.pop() {
            for next in [(r - 1, c), (r + 1, c), (r, c - 1), (r, c + 1)] {
                if self.cells.contains_key(&next) && seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen.len() == self.cells.len()
    }

    /// Canonical fingerprint of the placed words, translation-invariant
    /// (and symmetry-invariant under [`Canonicalization::Dihedral`]).
    pub fn snapshot_key(&self, mode: Canonicalization) -> u64 {
        snapshot::key(self, mode)
    }
}

impl Display for Grid {
    /// ASCII rendering: one row per line, `.` for empty cells.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Some(b) = self.bounds else {
            return write!(f, "(empty grid)");
        };
        for r in b.min_row..=b.max_row {
            for c in b.min_col..=b.max_col {
                match self.cells.get(&(r, c)) {
                    Some(&ch) => write!(f, "{ch}")?,
                    None => write!(f, ".")?,
                }
            }
            if r < b.max_row {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
