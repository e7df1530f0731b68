//! `dictionary` — trie-backed word dictionary for the solver.
//!
//! The dictionary is built once from a word list (one word per line, A-Z
//! only, blank lines ignored) and never mutated afterwards; a solve borrows
//! it read-only. Besides plain membership and prefix queries it supports the
//! solver's workhorse: enumerating every word spellable from a letter
//! multiset, optionally constrained to contain one required letter (the
//! overlap letter of an attachment point).
//!
//! Words shorter than two letters are not words in this game and are
//! skipped at load time; a non-letter character anywhere fails construction.

use std::path::Path;

use crate::errors::SolverError;
use crate::letters::{letter_index, LetterCounts, ALPHABET_SIZE};

#[derive(Debug, Default)]
struct TrieNode {
    children: [Option<Box<TrieNode>>; ALPHABET_SIZE],
    terminal: bool,
}

impl TrieNode {
    /// DFS over the trie, spending letters from `remaining` on the way down
    /// and restoring them on the way back. A branch is pruned as soon as the
    /// required letter can no longer be reached: not on the current path and
    /// no copy left in the multiset.
    fn collect(
        &self,
        remaining: &mut LetterCounts,
        require: Option<usize>,
        have_required: bool,
        path: &mut Vec<u8>,
        out: &mut Vec<String>,
    ) {
        if let Some(req) = require {
            if !have_required && remaining.count_idx(req) == 0 {
                return;
            }
        }
        if self.terminal && (require.is_none() || have_required) {
            // Path bytes are always ASCII uppercase.
            out.push(String::from_utf8_lossy(path).into_owned());
        }
        for i in 0..ALPHABET_SIZE {
            if remaining.count_idx(i) == 0 {
                continue;
            }
            let Some(child) = self.children[i].as_deref() else {
                continue;
            };
            remaining.dec_idx(i);
            path.push(b'A' + i as u8);
            child.collect(
                remaining,
                require,
                have_required || require == Some(i),
                path,
                out,
            );
            path.pop();
            remaining.inc_idx(i);
        }
    }
}

/// Trie over uppercase words with letter-constrained enumeration.
#[derive(Debug, Default)]
pub struct Dictionary {
    root: TrieNode,
    word_count: usize,
}

impl Dictionary {
    /// Build a dictionary from an iterator of word-list lines.
    ///
    /// Lines are trimmed; blank lines are ignored; lowercase input is
    /// uppercased. Single-letter lines are skipped (words are length ≥ 2).
    ///
    /// # Errors
    ///
    /// Returns `SolverError::MalformedDictionary` on the first line
    /// containing anything other than ASCII letters.
    pub fn build<I, S>(lines: I) -> Result<Self, SolverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::default();
        for (line_no, line) in lines.into_iter().enumerate() {
            let word = line.as_ref().trim();
            if word.is_empty() {
                continue;
            }
            let upper = word.to_ascii_uppercase();
            if let Some(bad) = upper.chars().find(|ch| !ch.is_ascii_uppercase()) {
                return Err(SolverError::MalformedDictionary {
                    line: line_no + 1,
                    invalid_char: bad,
                });
            }
            if upper.len() < 2 {
                continue;
            }
            dict.insert(&upper);
        }
        Ok(dict)
    }

    /// Parse a whole word-list file held in memory.
    ///
    /// # Errors
    ///
    /// Same as [`Dictionary::build`].
    pub fn parse_from_str(contents: &str) -> Result<Self, SolverError> {
        Self::build(contents.lines())
    }

    /// Convenience method: read a word list from a file path and build.
    ///
    /// # Errors
    ///
    /// Will return an error if the file cannot be read, or if a line is
    /// malformed.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, SolverError> {
        let path_ref = path.as_ref();
        let data = std::fs::read_to_string(path_ref).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("failed to read word list from '{}': {}", path_ref.display(), e),
            )
        })?;
        let dict = Self::parse_from_str(&data)?;
        log::info!("loaded {} words from {}", dict.word_count, path_ref.display());
        Ok(dict)
    }

    fn insert(&mut self, word: &str) {
        let mut node = &mut self.root;
        for &b in word.as_bytes() {
            let i = (b - b'A') as usize;
            let next = node.children[i].get_or_insert_with(Box::default);
            node = &mut **next;
        }
        if !node.terminal {
            node.terminal = true;
            self.word_count += 1;
        }
    }

    /// Walk the trie along `s` (case-insensitive); `None` when the path
    /// leaves the trie or hits a non-letter.
    fn walk(&self, s: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for ch in s.chars() {
            let i = letter_index(ch.to_ascii_uppercase())?;
            node = node.children[i].as_deref()?;
        }
        Some(node)
    }

    /// Is `word` a complete dictionary word?
    pub fn contains(&self, word: &str) -> bool {
        self.walk(word).is_some_and(|n| n.terminal)
    }

    /// Does some dictionary word start with `s`?
    pub fn is_prefix(&self, s: &str) -> bool {
        self.walk(s).is_some()
    }

    /// Letters `c` such that some word begins with `prefix + c`, in
    /// alphabetical order.
    pub fn continuations(&self, prefix: &str) -> Vec<char> {
        match self.walk(prefix) {
            Some(node) => (0..ALPHABET_SIZE)
                .filter(|&i| node.children[i].is_some())
                .map(|i| (b'A' + i as u8) as char)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every word spellable from `letters` (each copy usable once), ordered
    /// by descending length then ascending lexicographic.
    ///
    /// With `require` set, only words containing that letter at least once
    /// are returned; a required letter absent from `letters` yields the
    /// empty list.
    pub fn words_from(&self, letters: &LetterCounts, require: Option<char>) -> Vec<String> {
        let require_idx = match require {
            Some(ch) => match letter_index(ch) {
                Some(i) => Some(i),
                None => return Vec::new(),
            },
            None => None,
        };
        if let Some(i) = require_idx {
            if letters.count_idx(i) == 0 {
                return Vec::new();
            }
        }

        let mut remaining = *letters;
        let mut path: Vec<u8> = Vec::new();
        let mut out: Vec<String> = Vec::new();
        self.root
            .collect(&mut remaining, require_idx, false, &mut path, &mut out);

        out.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        out
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}
