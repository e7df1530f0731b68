//! `swap` — which unplaced letter to trade back to the pool.
//!
//! Each letter in the hand that is not on the grid gets a swap score;
//! higher means "better to trade away". The score is a fixed-weight sum:
//! the letter's base difficulty, minus a penalty for every short word the
//! letter could still make from the unplaced letters, plus a bonus when
//! the letter is provably dead. A Q held without a U gets an extra push
//! when none of the Q-without-U words is playable either.

use crate::dictionary::Dictionary;
use crate::grid::Grid;
use crate::letters::{difficulty, LetterCounts, Q_WITHOUT_U_WORDS};
use crate::solver::dead_letters;

const DIFFICULTY_WEIGHT: f64 = 0.1;
const SHORT_WORD_PENALTY: f64 = 0.05;
const DEAD_LETTER_BONUS: f64 = 0.5;
const UNUSABLE_Q_BONUS: f64 = 0.5;

/// "Short" words for the availability penalty: 2–4 letters.
const SHORT_WORD_MAX_LEN: usize = 4;

/// One entry of the swap ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRecommendation {
    pub letter: char,
    pub score: f64,
}

/// Can any of the Q-without-U words be spelled from this hand?
fn q_without_u_playable(hand: &LetterCounts, dict: &Dictionary) -> bool {
    Q_WITHOUT_U_WORDS
        .iter()
        .any(|w| dict.contains(w) && hand.contains_all(&LetterCounts::from_word(w)))
}

/// Score every unplaced letter, strongest swap candidate first.
///
/// Ties break by letter difficulty, then alphabetically, so the ranking is
/// deterministic. Never fails; an empty list means everything is placed.
pub fn swap_scores(
    hand: &LetterCounts,
    grid: &Grid,
    dict: &Dictionary,
) -> Vec<SwapRecommendation> {
    let unplaced = hand.saturating_sub(&grid.letters_on_grid());
    if unplaced.is_empty() {
        return Vec::new();
    }

    let dead = dead_letters(hand, dict);
    let q_is_stuck = hand.count('Q') > 0
        && hand.count('U') == 0
        && !q_without_u_playable(hand, dict);

    let mut recommendations: Vec<SwapRecommendation> = unplaced
        .letters()
        .map(|letter| {
            let short_words = dict
                .words_from(&unplaced, Some(letter))
                .iter()
                .filter(|w| w.len() <= SHORT_WORD_MAX_LEN)
                .count();

            let mut score = DIFFICULTY_WEIGHT * f64::from(difficulty(letter))
                - SHORT_WORD_PENALTY * short_words as f64;
            if dead.count(letter) > 0 {
                score += DEAD_LETTER_BONUS;
            }
            if letter == 'Q' && q_is_stuck {
                score += UNUSABLE_Q_BONUS;
            }
            SwapRecommendation { letter, score }
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| difficulty(b.letter).cmp(&difficulty(a.letter)))
            .then_with(|| a.letter.cmp(&b.letter))
    });
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dict() -> Dictionary {
        Dictionary::build(["CAT", "AT", "TA", "AS", "QI", "ES", "SET"]).unwrap()
    }

    #[test]
    fn test_empty_when_everything_placed() {
        let d = small_dict();
        let mut grid = Grid::new();
        let hand = LetterCounts::parse("CAT").unwrap();
        let p = grid
            .can_place("CAT", 0, 0, crate::grid::Direction::Across, &d)
            .unwrap();
        grid.place(p);
        assert!(swap_scores(&hand, &grid, &d).is_empty());
    }

    #[test]
    fn test_hard_dead_letters_rank_first() {
        let d = small_dict();
        let hand = LetterCounts::parse("QJXZQJXZ").unwrap();
        let recs = swap_scores(&hand, &Grid::new(), &d);
        assert_eq!(recs.len(), 4);
        // Q(10) with the unusable-Q bonus, then X(9), Z(9), J(8);
        // the X/Z tie breaks alphabetically.
        let order: Vec<char> = recs.iter().map(|r| r.letter).collect();
        assert_eq!(order, vec!['Q', 'X', 'Z', 'J']);
        assert!(recs[0].score > recs[1].score);
    }

    #[test]
    fn test_short_word_availability_lowers_score() {
        let d = small_dict();
        // S and Z both unplaced; S can still make AS/ES from the hand,
        // Z can make nothing.
        let hand = LetterCounts::parse("ASEZ").unwrap();
        let recs = swap_scores(&hand, &Grid::new(), &d);
        let s = recs.iter().find(|r| r.letter == 'S').unwrap();
        let z = recs.iter().find(|r| r.letter == 'Z').unwrap();
        assert!(z.score > s.score);
        assert_eq!(recs[0].letter, 'Z');
    }

    #[test]
    fn test_q_with_qi_playable_gets_no_stuck_bonus() {
        let d = small_dict();
        let with_i = LetterCounts::parse("QIZ").unwrap();
        let without_i = LetterCounts::parse("QZ").unwrap();
        let q_with = swap_scores(&with_i, &Grid::new(), &d)
            .into_iter()
            .find(|r| r.letter == 'Q')
            .unwrap();
        let q_without = swap_scores(&without_i, &Grid::new(), &d)
            .into_iter()
            .find(|r| r.letter == 'Q')
            .unwrap();
        // With an I in hand, QI is playable: no unusable-Q bonus and Q is
        // not dead either.
        assert!(q_without.score > q_with.score);
    }

    #[test]
    fn test_deterministic_ordering() {
        let d = small_dict();
        let hand = LetterCounts::parse("QJXZ").unwrap();
        let a = swap_scores(&hand, &Grid::new(), &d);
        let b = swap_scores(&hand, &Grid::new(), &d);
        assert_eq!(a, b);
    }
}
