//! An exact solver for the board game 'Connect 4'
//!
//! The solver uses an optimised game tree search to find the
//! game-theoretic value of any position, and the mathematically optimal move.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_solver::{bitboard::BitBoard, solver::Solver};
//!
//!# fn main() -> connect4_solver::Result<()> {
//! let board = BitBoard::from_moves("112233")?;
//! let mut solver = Solver::new()?;
//!
//! assert_eq!(solver.solve(&board, false), 18);
//! assert_eq!(solver.find_best_move(&board), Some(3));
//!# Ok(())
//!# }
//! ```

use static_assertions::*;

pub mod bitboard;

pub mod error;

pub mod move_sorter;

pub mod opening_book;

pub mod solver;

pub mod transposition_table;


pub use error::{Error, Result};

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

/// The number of playable cells on the board
pub const TOTAL_CELLS: usize = WIDTH * HEIGHT;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
// the move string format uses a single digit per column
const_assert!(WIDTH <= 9);
