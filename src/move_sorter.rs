//! Best-first ordering of candidate moves

use crate::WIDTH;

/// A fixed-capacity container returning moves by descending score
///
/// Moves with equal scores come out in reverse insertion order.
pub struct MoveSorter {
    size: usize,
    // move bitmap, column and score, sorted by ascending score
    moves: [(u64, usize, i32); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0, 0); WIDTH],
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Inserts a move, keeping the entries sorted
    ///
    /// # Panics
    /// Panics if more than `WIDTH` moves are added.
    pub fn push(&mut self, new_move: u64, column: usize, score: i32) {
        assert!(self.size < WIDTH, "more than {} moves added", WIDTH);
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].2 > score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (new_move, column, score);
    }

    /// Removes the highest scored move, returning its bitmap and column
    pub fn pop_best(&mut self) -> Option<(u64, usize)> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some((self.moves[self.size].0, self.moves[self.size].1))
            }
        }
    }
}

impl Default for MoveSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for MoveSorter {
    type Item = (u64, usize);

    fn next(&mut self) -> Option<Self::Item> {
        self.pop_best()
    }
}

/// Returns the columns ordered from the middle outwards, as
/// the middle columns are often better moves
pub const fn move_order() -> [usize; WIDTH] {
    let mut move_order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        move_order[i] = (WIDTH / 2) + (i % 2) * (i / 2 + 1) - (1 - i % 2) * (i / 2);
        i += 1;
    }
    move_order
}
