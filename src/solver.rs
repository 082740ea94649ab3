//! An agent to solve the game of Connect 4

use log::{debug, warn};

use std::cmp::Ordering;

use crate::{
    bitboard::BitBoard,
    move_sorter::{move_order, MoveSorter},
    opening_book::{OpeningBook, BOOK_DEPTH},
    transposition_table::{Bound, TranspositionTable},
    Result, TOTAL_CELLS, WIDTH,
};

/// The minimum possible score of a position
pub const MIN_SCORE: i32 = -(TOTAL_CELLS as i32) / 2 + 3;
/// The maximum possible score of a postion
pub const MAX_SCORE: i32 = (TOTAL_CELLS as i32 + 1) / 2 - 3;

/// Score of a position where the current player wins with their next tile
pub fn win_score(num_moves: usize) -> i32 {
    (TOTAL_CELLS as i32 + 1 - num_moves as i32) / 2
}

/// Score of a position where the opponent wins with their next tile
pub fn loss_score(num_moves: usize) -> i32 {
    -(TOTAL_CELLS as i32 - num_moves as i32) / 2
}

/// Picks the highest scored column, the leftmost one on ties
pub fn best_column(scores: &[Option<i32>; WIDTH]) -> Option<(usize, i32)> {
    let mut best: Option<(usize, i32)> = None;
    for (column, score) in scores.iter().enumerate() {
        if let Some(score) = *score {
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((column, score));
            }
        }
    }
    best
}

/// An agent to solve Connect 4 positions
///
/// # Notes
/// This agent uses a classical game tree search with various optimisations to
/// find the mathematically best move(s) in any position, thus 'solving' the game
///
/// # Position Scoring
/// A position is scored from the point of view of the player to move, by how
/// early the game ends. Winning with your last possible tile (your 21st tile in a
/// 7x6 board) scores 1, losing to the opponent's last tile scores -1. Earlier
/// wins and losses have scores further from 0, a drawn position has a score of 0
pub struct Solver {
    node_count: u64,
    transposition_table: TranspositionTable,
    opening_book: Option<OpeningBook>,
}

impl Solver {
    /// Creates a new `Solver` with a default-sized transposition table
    pub fn new() -> Result<Self> {
        Ok(Self::with_transposition_table(TranspositionTable::new()?))
    }

    /// Creates a new `Solver` using the given transposition table
    pub fn with_transposition_table(transposition_table: TranspositionTable) -> Self {
        Self {
            node_count: 0,
            transposition_table,
            opening_book: None,
        }
    }

    /// Adds an opening book to an existing `Solver`
    pub fn with_opening_book(mut self, opening_book: OpeningBook) -> Self {
        self.opening_book = Some(opening_book);
        self
    }

    pub fn opening_book(&self) -> Option<&OpeningBook> {
        self.opening_book.as_ref()
    }

    /// The number of nodes searched since creation or the last [`reset`](Self::reset)
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Clears the node counter and the transposition table
    pub fn reset(&mut self) {
        self.node_count = 0;
        self.transposition_table.reset();
    }

    /// Performs game tree search
    ///
    /// The current player must not have an immediate win. Returns the exact score
    /// if it lies within `alpha..beta`, otherwise a bound on the side of the window
    /// it falls on (see [Position Scoring])
    ///
    /// [Position Scoring]: #position-scoring
    fn negamax(&mut self, board: &BitBoard, mut alpha: i32, mut beta: i32) -> i32 {
        debug_assert!(alpha < beta);
        debug_assert!(!board.can_win_next());
        self.node_count += 1;

        // check for draw
        if board.is_draw() {
            return 0;
        }

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = board.possible_non_losing_moves();
        if non_losing_moves == 0 {
            return loss_score(board.num_moves());
        }

        let remaining = (TOTAL_CELLS - board.num_moves()) as i32;

        // the opponent cannot win with their next tile
        let min = (-(remaining - 2) / 2).max(MIN_SCORE);
        if alpha < min {
            alpha = min;
            if alpha >= beta {
                return alpha;
            }
        }

        // we cannot win with this tile
        let max = ((remaining - 1) / 2).min(MAX_SCORE);
        if beta > max {
            beta = max;
            if alpha >= beta {
                return beta;
            }
        }

        // try to fetch the upper/lower bound of the score from the transposition table
        let key = board.key();
        match self.transposition_table.get_bound(key) {
            Some(Bound::Lower(min)) if alpha < min => {
                alpha = min;
                if alpha >= beta {
                    // prune the exploration
                    return alpha;
                }
            }
            Some(Bound::Upper(max)) if beta > max => {
                beta = max;
                if alpha >= beta {
                    // prune the exploration
                    return beta;
                }
            }
            _ => {}
        }

        let mut moves = MoveSorter::new();
        // reversing move order to put edges first reduces the amount of sorting
        // as these moves are worse on average
        for &column in move_order().iter().rev() {
            let candidate = non_losing_moves & BitBoard::column_mask(column);
            if candidate != 0 {
                moves.push(candidate, column, board.move_score(candidate));
            }
        }

        // search the next level of the tree
        for (move_bitmap, _column) in moves {
            let mut next = *board;
            next.play_move(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(&next, -beta, -alpha);
            // if a child node's score is better than beta, we can prune the tree
            // here because a perfect opponent will not pick this branch
            if score >= beta {
                self.transposition_table.set_bound(key, Bound::Lower(score));
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        self.transposition_table.set_bound(key, Bound::Upper(alpha));
        alpha
    }

    /// Calculates the score of a position with a series of null-window searches
    ///
    /// A `weak` solve only finds the outcome, returning -1, 0 or 1.
    /// The transposition table is cleared first.
    pub fn solve(&mut self, board: &BitBoard, weak: bool) -> i32 {
        if board.can_win_next() {
            return if weak { 1 } else { win_score(board.num_moves()) };
        }
        self.transposition_table.reset();

        let (mut min, mut max) = if weak {
            (-1, 1)
        } else {
            (loss_score(board.num_moves()), win_score(board.num_moves()))
        };

        // iteratively narrow the search window
        while min < max {
            let mut mid = min + (max - min) / 2;
            // bias the search value towards 0 for both negative and positive searches
            if mid <= 0 && min / 2 < mid {
                mid = min / 2
            } else if mid >= 0 && max / 2 > mid {
                mid = max / 2
            }

            debug!(
                "searching {} (window {}..={}, {} nodes so far)",
                mid, min, max, self.node_count
            );

            // use a null-window to determine if the actual score is greater or less than mid
            let r = self.negamax(board, mid, mid + 1);

            // r is not necessarily the exact true score, but its value indicates
            // whether the true score is above or below the search target
            if r <= mid {
                max = r
            } else {
                min = r;
            }
        }

        if weak {
            min.signum()
        } else {
            min
        }
    }

    /// Looks up the current position in the opening book, if one is loaded
    pub fn book_move(&self, board: &BitBoard) -> Option<usize> {
        if board.num_moves() >= BOOK_DEPTH {
            return None;
        }
        let column = self.opening_book.as_ref()?.get(board)?;
        if board.can_play(column) {
            debug!("book move {} after {} moves", column + 1, board.num_moves());
            Some(column)
        } else {
            warn!("ignoring unplayable book move {}", column + 1);
            None
        }
    }

    /// Scores every column from the point of view of the current player,
    /// `None` for full columns
    pub fn analyze(&mut self, board: &BitBoard) -> [Option<i32>; WIDTH] {
        let mut scores = [None; WIDTH];
        for (column, score) in scores.iter_mut().enumerate() {
            if !board.can_play(column) {
                continue;
            }
            *score = Some(if board.is_winning_move(column) {
                win_score(board.num_moves())
            } else {
                let mut next = *board;
                next.play(column);
                -self.solve(&next, false)
            });
        }
        scores
    }

    /// Finds an optimal column to play, `None` if the board is full
    ///
    /// Ties go to the leftmost column.
    pub fn find_best_move(&mut self, board: &BitBoard) -> Option<usize> {
        if let Some(column) = self.book_move(board) {
            return Some(column);
        }

        // take an immediate win without searching
        if let Some(column) =
            (0..WIDTH).find(|&column| board.can_play(column) && board.is_winning_move(column))
        {
            return Some(column);
        }

        best_column(&self.analyze(board)).map(|(column, _)| column)
    }

    /// Converts a position score to a win distance in a single player's moves
    pub fn score_to_win_distance(board: &BitBoard, score: i32) -> usize {
        match score.cmp(&0) {
            Ordering::Equal => TOTAL_CELLS - board.num_moves(),
            Ordering::Greater => (TOTAL_CELLS / 2 + 1 - score as usize) - board.num_moves() / 2,
            Ordering::Less => (TOTAL_CELLS / 2 + 1) - (-score as usize) - board.num_moves() / 2,
        }
    }
}
