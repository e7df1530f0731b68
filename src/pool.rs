//! `pool` — the bag of undrawn tiles.
//!
//! The pool starts from the standard 144-tile distribution minus the
//! initial hand, shuffled with a seeded RNG so game flows are
//! reproducible. The solver itself never touches the RNG; randomness stops
//! at the bag.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::errors::SolverError;
use crate::letters::{index_to_letter, letter_index, LetterCounts, ALPHABET_SIZE, TILE_DISTRIBUTION};

/// Tiles drawn when swapping one letter back, per the game rules.
pub const SWAP_DRAW: usize = 3;

#[derive(Debug, Clone)]
pub struct TilePool {
    tiles: Vec<char>,
    rng: StdRng,
}

impl TilePool {
    /// Build the pool for a game in progress: the full distribution minus
    /// the tiles already in hand, shuffled.
    pub fn new(initial_hand: &LetterCounts, seed: u64) -> Self {
        let mut tiles: Vec<char> = Vec::with_capacity(144);
        for i in 0..ALPHABET_SIZE {
            let held = initial_hand.count(index_to_letter(i));
            let available = TILE_DISTRIBUTION[i].saturating_sub(held);
            for _ in 0..available {
                tiles.push(index_to_letter(i));
            }
        }
        let mut rng = StdRng::seed_from_u64(seed);
        tiles.shuffle(&mut rng);
        Self { tiles, rng }
    }

    /// Draw up to `n` tiles; a short vec means the bag ran dry.
    pub fn draw(&mut self, n: usize) -> Vec<char> {
        let take = n.min(self.tiles.len());
        self.tiles.split_off(self.tiles.len() - take)
    }

    /// Return `letter` to the bag, reshuffle, and draw `draw_n` tiles.
    ///
    /// Atomic: when fewer than `draw_n` tiles would be available the pool
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidLetter` for a non-tile character;
    /// `SolverError::PoolExhausted` when the bag cannot cover the draw.
    pub fn swap(&mut self, letter: char, draw_n: usize) -> Result<Vec<char>, SolverError> {
        let letter = letter.to_ascii_uppercase();
        if letter_index(letter).is_none() {
            return Err(SolverError::InvalidLetter {
                invalid_char: letter,
            });
        }
        if self.tiles.len() + 1 < draw_n {
            return Err(SolverError::PoolExhausted {
                requested: draw_n,
                available: self.tiles.len() + 1,
            });
        }
        self.tiles.push(letter);
        self.tiles.shuffle(&mut self.rng);
        Ok(self.draw(draw_n))
    }

    /// Number of tiles left in the bag.
    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The bag contents as a multiset (order is the bag's secret).
    pub fn counts(&self) -> LetterCounts {
        let mut counts = LetterCounts::new();
        for &ch in &self.tiles {
            counts.add(ch);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_subtracts_hand() {
        let hand = LetterCounts::parse("CAT").unwrap();
        let pool = TilePool::new(&hand, 7);
        assert_eq!(pool.remaining(), 141);
        let counts = pool.counts();
        assert_eq!(counts.count('C'), 2); // 3 in the bag, 1 in hand
        assert_eq!(counts.count('E'), 18);
    }

    #[test]
    fn test_draw_reduces_pool() {
        let hand = LetterCounts::new();
        let mut pool = TilePool::new(&hand, 7);
        let drawn = pool.draw(5);
        assert_eq!(drawn.len(), 5);
        assert_eq!(pool.remaining(), 139);
    }

    #[test]
    fn test_draw_short_when_dry() {
        let hand = LetterCounts::new();
        let mut pool = TilePool::new(&hand, 7);
        pool.draw(143);
        let last = pool.draw(5);
        assert_eq!(last.len(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_seeded_draws_reproducible() {
        let hand = LetterCounts::parse("CAT").unwrap();
        let mut a = TilePool::new(&hand, 42);
        let mut b = TilePool::new(&hand, 42);
        assert_eq!(a.draw(10), b.draw(10));
    }

    #[test]
    fn test_swap_conserves_letters() {
        let mut hand = LetterCounts::parse("QAT").unwrap();
        let mut pool = TilePool::new(&hand, 42);
        let total_before = pool.counts().total() + hand.total();

        hand.remove('Q');
        let drawn = pool.swap('Q', SWAP_DRAW).unwrap();
        assert_eq!(drawn.len(), SWAP_DRAW);
        for ch in drawn {
            hand.add(ch);
        }

        assert_eq!(pool.counts().total() + hand.total(), total_before);
        assert_eq!(hand.total(), 5); // 3 - 1 + 3
    }

    #[test]
    fn test_swap_rejects_when_nearly_empty() {
        let hand = LetterCounts::new();
        let mut pool = TilePool::new(&hand, 7);
        pool.draw(143); // one tile left
        let err = pool.swap('A', SWAP_DRAW).unwrap_err();
        assert!(matches!(
            err,
            SolverError::PoolExhausted { requested: 3, available: 2 }
        ));
        // Atomic: the rejected letter was not added.
        assert_eq!(pool.remaining(), 1);
    }

    #[test]
    fn test_swap_rejects_non_letter() {
        let hand = LetterCounts::new();
        let mut pool = TilePool::new(&hand, 7);
        assert!(matches!(
            pool.swap('?', SWAP_DRAW),
            Err(SolverError::InvalidLetter { .. })
        ));
    }
}
