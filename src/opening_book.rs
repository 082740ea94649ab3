//! Precomputed best moves for early-game positions
//!
//! A book file is a sequence of 17-byte records, each a little-endian `u128`
//! [`BitBoard::book_key`] followed by the 0-indexed best column, sorted by key.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    bitboard::BitBoard, solver::Solver, transposition_table::TranspositionTable, Error, Result,
    WIDTH,
};

pub const DEFAULT_BOOK_PATH: &str = "book.bin";
/// The book is consulted for positions with fewer moves than this
pub const BOOK_DEPTH: usize = 7;
/// Size of a single key/move record in a book file
pub const RECORD_SIZE: usize = 17;

// positions solved by one worker before it picks up more work
const GENERATION_CHUNK: usize = 16;

/// A read-only opening book, cheap to clone
#[derive(Clone)]
pub struct OpeningBook(Arc<OpeningBookStorage>);

pub struct OpeningBookStorage {
    keys: Vec<u128>,
    moves: Vec<u8>,
}

impl OpeningBook {
    /// Loads a book file, returning `Ok(None)` if it doesn't exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    "opening book {} not found, continuing without it",
                    path.display()
                );
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let len = file.metadata()?.len() as usize;
        if len % RECORD_SIZE != 0 {
            return Err(Error::MalformedBook(format!(
                "{} is {} bytes, not a multiple of {}",
                path.display(),
                len,
                RECORD_SIZE
            )));
        }

        let count = len / RECORD_SIZE;
        let mut file = BufReader::new(file);
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let key = file.read_u128::<LittleEndian>()?;
            let column = file.read_u8()?;
            entries.push((key, column));
        }

        let book = Self::from_sorted(entries)?;
        info!(
            "loaded opening book {} with {} entries",
            path.display(),
            book.len()
        );
        Ok(Some(book))
    }

    /// Builds a book from `(key, column)` pairs in any order
    pub fn from_entries(mut entries: Vec<(u128, u8)>) -> Result<Self> {
        entries.sort_unstable_by_key(|&(key, _)| key);
        Self::from_sorted(entries)
    }

    fn from_sorted(entries: Vec<(u128, u8)>) -> Result<Self> {
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 >= pair[1].0) {
            return Err(Error::MalformedBook(format!(
                "key {:#x} is not strictly ascending",
                pair[1].0
            )));
        }
        if let Some(&(key, column)) = entries.iter().find(|&&(_, column)| column as usize >= WIDTH) {
            return Err(Error::MalformedBook(format!(
                "column {} for key {:#x} is out of range",
                column, key
            )));
        }

        let (keys, moves): (Vec<u128>, Vec<u8>) = entries.into_iter().unzip();
        Ok(Self(Arc::new(OpeningBookStorage { keys, moves })))
    }

    /// Writes the book in the file format described in the module docs
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = BufWriter::new(
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        );
        for (key, column) in self.keys.iter().zip(self.moves.iter()) {
            file.write_u128::<LittleEndian>(*key)?;
            file.write_u8(*column)?;
        }
        file.flush()?;
        Ok(())
    }

    /// Solves the best move of every distinct position within `depth` plies of `root`
    ///
    /// Finished games and positions with an immediate win are left out. Each
    /// worker owns a solver with a table of `table_log_size`.
    pub fn generate(
        root: &BitBoard,
        depth: usize,
        table_log_size: u32,
        show_progress: bool,
    ) -> Result<Self> {
        let start = Instant::now();

        let mut visited = HashSet::new();
        let mut positions = Vec::new();
        collect_positions(root, depth, &mut visited, &mut positions);
        info!(
            "found {} positions within {} moves of the root",
            positions.len(),
            depth
        );

        let progress = if show_progress {
            ProgressBar::new(positions.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_style(
            ProgressStyle::default_bar()
                .template("Solving openings: {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")
                .progress_chars("█▓▒░  "),
        );

        let entries = positions
            .par_chunks(GENERATION_CHUNK)
            .map(|chunk| -> Result<Vec<(u128, u8)>> {
                let table = TranspositionTable::with_log_size(table_log_size)?;
                let mut solver = Solver::with_transposition_table(table);
                let mut entries = Vec::with_capacity(chunk.len());
                for board in chunk {
                    if let Some(column) = solver.find_best_move(board) {
                        entries.push((board.book_key(), column as u8));
                    }
                    progress.inc(1);
                }
                Ok(entries)
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        progress.finish();
        info!(
            "opening book generation completed in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        Self::from_entries(entries)
    }

    /// The stored best column for `board`, if the position is in the book
    pub fn get(&self, board: &BitBoard) -> Option<usize> {
        self.keys
            .binary_search(&board.book_key())
            .ok()
            .map(|i| self.moves[i] as usize)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over the `(key, column)` pairs in key order
    pub fn entries(&self) -> impl Iterator<Item = (u128, usize)> + '_ {
        self.keys
            .iter()
            .copied()
            .zip(self.moves.iter().map(|&column| column as usize))
    }
}

impl std::ops::Deref for OpeningBook {
    type Target = OpeningBookStorage;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn collect_positions(
    board: &BitBoard,
    depth: usize,
    visited: &mut HashSet<u128>,
    positions: &mut Vec<BitBoard>,
) {
    // positions reached through different move orders are only expanded once
    if depth == 0 || board.is_draw() || !visited.insert(board.book_key()) {
        return;
    }
    // the solver answers next-move wins without searching
    if !board.can_win_next() {
        positions.push(*board);
    }
    for column in 0..WIDTH {
        if board.can_play(column) && !board.is_winning_move(column) {
            let mut next = *board;
            next.play(column);
            collect_positions(&next, depth - 1, visited, positions);
        }
    }
}

/// Rebuilds the position a book key was computed from
pub fn board_from_key(key: u128) -> BitBoard {
    let board_mask = (key >> 64) as u64;
    let player_mask = key as u64;
    BitBoard::from_masks(player_mask, board_mask, board_mask.count_ones() as usize)
}
