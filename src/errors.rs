use std::io;

/// Custom error type for input parsing, dictionary construction, and pool
/// operations.
///
/// "Unsolvable" is deliberately not here: a solve that cannot place every
/// letter is a normal result (the grid comes back with `unplaced` filled
/// in), not an error.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("invalid letter '{invalid_char}' (only A-Z tiles exist)")]
    InvalidLetter { invalid_char: char },

    #[error("empty hand")]
    EmptyHand,

    #[error("dictionary line {line}: invalid character '{invalid_char}' (expected A-Z)")]
    MalformedDictionary { line: usize, invalid_char: char },

    #[error("pool has {available} tiles, cannot draw {requested}")]
    PoolExhausted { requested: usize, available: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<SolverError> for io::Error {
    fn from(e: SolverError) -> Self {
        // String version is the least fragile (no Send/Sync bounds issues)
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    }
}
