//! Recoverable errors reported by the solver library

use thiserror::Error;

/// Errors that abort a single request without affecting the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not parse '{character}' as a valid move (ply {ply})")]
    InvalidCharacter { character: char, ply: usize },

    #[error("Invalid move, column {column} out of range. Columns must be between 1 and {width} (ply {ply})")]
    ColumnOutOfRange {
        column: usize,
        width: usize,
        ply: usize,
    },

    #[error("Invalid move, column {column} full (ply {ply})")]
    ColumnFull { column: usize, ply: usize },

    #[error("Invalid position, game is over after ply {ply}")]
    GameOver { ply: usize },

    #[error("table size 2^{log_size} is outside 2^{min}..=2^{max}")]
    TableSize { log_size: u32, min: u32, max: u32 },

    #[error("failed to allocate a transposition table of {entries} entries")]
    TableAllocation {
        entries: usize,
        #[source]
        source: std::collections::TryReserveError,
    },

    #[error("malformed opening book: {0}")]
    MalformedBook(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
