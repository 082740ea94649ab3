//! Bitboard representation of a Connect 4 position
//!
//! Each column uses `HEIGHT + 1` bits, the extra guard bit on top keeps the
//! carry of `board_mask + bottom_mask` inside its own column:
//!
//! ```text
//! .  .  .  .  .  .  .   <- guard row
//! 5 12 19 26 33 40 47
//! 4 11 18 25 32 39 46
//! 3 10 17 24 31 38 45
//! 2  9 16 23 30 37 44
//! 1  8 15 22 29 36 43
//! 0  7 14 21 28 35 42
//! ```

use std::fmt;

use crate::{Error, Result, HEIGHT, TOTAL_CELLS, WIDTH};

/// Shift between vertically adjacent cells
pub const VERTICAL: usize = 1;
/// Shift between horizontally adjacent cells
pub const HORIZONTAL: usize = HEIGHT + 1;
/// Shift between cells on a rising (`/`) diagonal
pub const DIAGONAL_UP: usize = HEIGHT + 2;
/// Shift between cells on a falling (`\`) diagonal
pub const DIAGONAL_DOWN: usize = HEIGHT;

mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
}

/// Number of meaningful bits in a [`BitBoard::key`]
pub const KEY_BITS: usize = WIDTH * (HEIGHT + 1);

/// Returns true if `mask` contains four aligned tiles in any direction
pub fn has_alignment(mask: u64) -> bool {
    for &shift in &[HORIZONTAL, DIAGONAL_DOWN, DIAGONAL_UP, VERTICAL] {
        // mark all runs of 2
        let m = mask & (mask >> shift);
        // check for runs of 2 * (runs of 2)
        if m & (m >> (2 * shift)) != 0 {
            return true;
        }
    }
    false
}

// open ends and holes of 3-alignments along a horizontal or diagonal direction
fn alignment_ends(mask: u64, shift: usize) -> u64 {
    let mut p = (mask << shift) & (mask << (2 * shift));
    // find the right ends of 3-alignments
    let mut r = p & (mask << (3 * shift));
    // find holes of the type ...O O _ O...
    r |= p & (mask >> shift);

    p = (mask >> shift) & (mask >> (2 * shift));
    // find the left ends of 3-alignments
    r |= p & (mask >> (3 * shift));
    // find holes of the type ...O _ O O...
    r |= p & (mask << shift);
    r
}

/// One of the two players, in turn order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Player {
    First,
    Second,
}

impl Player {
    pub fn number(self) -> usize {
        match self {
            Player::First => 1,
            Player::Second => 2,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }
}

/// A Connect 4 position
///
/// `BitBoard` is `Copy`: the search plays moves on copies rather than undoing them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitBoard {
    // mask of the current player's tiles
    player_mask: u64,
    // mask of all tiles
    board_mask: u64,
    num_moves: usize,
}

impl BitBoard {
    pub fn new() -> Self {
        Self {
            player_mask: 0,
            board_mask: 0,
            num_moves: 0,
        }
    }

    /// Builds a position from a string of 1-indexed columns, e.g. `"4453"`
    ///
    /// Fails on any character that is not a column digit, on a move into a full
    /// column, and on a move that ends the game.
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut board = Self::new();

        for (ply, column_char) in moves.as_ref().chars().enumerate() {
            let column = match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => column - 1,
                Some(column) => {
                    return Err(Error::ColumnOutOfRange {
                        column,
                        width: WIDTH,
                        ply,
                    })
                }
                None => {
                    return Err(Error::InvalidCharacter {
                        character: column_char,
                        ply,
                    })
                }
            };
            if !board.can_play(column) {
                return Err(Error::ColumnFull {
                    column: column + 1,
                    ply,
                });
            }
            // abort if the position is won at any point
            if board.is_winning_move(column) {
                return Err(Error::GameOver { ply });
            }
            board.play(column);
        }
        Ok(board)
    }

    pub fn from_masks(player_mask: u64, board_mask: u64, num_moves: usize) -> Self {
        debug_assert_eq!(player_mask & !board_mask, 0);
        debug_assert_eq!(board_mask.count_ones() as usize, num_moves);
        Self {
            player_mask,
            board_mask,
            num_moves,
        }
    }

    pub fn player_mask(&self) -> u64 {
        self.player_mask
    }

    pub fn board_mask(&self) -> u64 {
        self.board_mask
    }

    pub const fn top_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    pub const fn bottom_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    pub const fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    pub fn num_moves(&self) -> usize {
        self.num_moves
    }

    pub fn can_play(&self, column: usize) -> bool {
        Self::top_mask(column) & self.board_mask == 0
    }

    /// Drops a tile for the current player into `column`
    ///
    /// # Panics
    /// Panics if the column is full or out of range.
    pub fn play(&mut self, column: usize) {
        assert!(
            column < WIDTH && self.can_play(column),
            "column {} is not playable",
            column
        );
        let move_bitmap = (self.board_mask + Self::bottom_mask(column)) & Self::column_mask(column);
        self.play_move(move_bitmap);
    }

    /// Plays a move given as the single landing cell bit
    pub fn play_move(&mut self, move_bitmap: u64) {
        debug_assert_eq!(move_bitmap.count_ones(), 1);
        debug_assert_ne!(move_bitmap & self.possible_moves(), 0);
        // switch the current player
        self.player_mask ^= self.board_mask;
        // add a cell of the previous player to the correct column
        self.board_mask |= move_bitmap;
        self.num_moves += 1;
    }

    /// The player whose turn it is
    pub fn current_player(&self) -> Player {
        if self.num_moves % 2 == 0 {
            Player::First
        } else {
            Player::Second
        }
    }

    /// The owner of the tile at `column` and `row`, counting rows from the bottom
    pub fn owner(&self, column: usize, row: usize) -> Option<Player> {
        let cell = Self::bottom_mask(column) << row;
        if self.board_mask & cell == 0 {
            None
        } else if self.player_mask & cell != 0 {
            Some(self.current_player())
        } else {
            Some(self.current_player().other())
        }
    }

    pub fn is_draw(&self) -> bool {
        self.num_moves == TOTAL_CELLS
    }

    /// Checks whether the current player wins by playing `column`
    pub fn is_winning_move(&self, column: usize) -> bool {
        let mut pos = self.player_mask;
        // play the move on a copy of the mask, keeping the current player
        pos |= (self.board_mask + Self::bottom_mask(column)) & Self::column_mask(column);
        has_alignment(pos)
    }

    /// Checks whether the current player has any immediately winning move
    pub fn can_win_next(&self) -> bool {
        self.winning_positions(self.player_mask) & self.possible_moves() != 0
    }

    /// Bitmap of the cells the current player can play into
    pub fn possible_moves(&self) -> u64 {
        (self.board_mask + static_masks::bottom_mask()) & static_masks::full_board_mask()
    }

    /// Bitmap of the playable moves that don't hand the opponent a win next turn
    ///
    /// Must only be called when the current player cannot win immediately.
    /// Returns 0 when every move loses.
    pub fn possible_non_losing_moves(&self) -> u64 {
        debug_assert!(!self.can_win_next());
        let mut possible_moves = self.possible_moves();
        let opponent_winning_positions = self.opponent_winning_positions();
        let forced_moves = possible_moves & opponent_winning_positions;

        if forced_moves != 0 {
            // if more than one forced move exists, you can't prevent the opponent winning
            if forced_moves & (forced_moves - 1) != 0 {
                return 0;
            } else {
                possible_moves = forced_moves
            }
        }
        // avoid playing below an opponent's winning move
        possible_moves & !(opponent_winning_positions >> VERTICAL)
    }

    // create a bitmap of open squares that complete alignments for the opponent
    fn opponent_winning_positions(&self) -> u64 {
        let opp_mask = self.player_mask ^ self.board_mask;
        self.winning_positions(opp_mask)
    }

    // open squares that would complete an alignment of `player_mask`,
    // playable or not
    fn winning_positions(&self, player_mask: u64) -> u64 {
        // vertical: find the top ends of 3-alignments
        let mut r = (player_mask << VERTICAL)
            & (player_mask << (2 * VERTICAL))
            & (player_mask << (3 * VERTICAL));

        r |= alignment_ends(player_mask, HORIZONTAL);
        r |= alignment_ends(player_mask, DIAGONAL_DOWN);
        r |= alignment_ends(player_mask, DIAGONAL_UP);

        r & (static_masks::full_board_mask() ^ self.board_mask)
    }

    /// Heuristic value of a candidate move: the number of open
    /// 3-alignment ends the current player owns after playing it
    pub fn move_score(&self, candidate: u64) -> i32 {
        self.winning_positions(self.player_mask | candidate)
            .count_ones() as i32
    }

    /// Key for the transposition table, unique per position
    pub fn key(&self) -> u64 {
        self.player_mask + self.board_mask
    }

    /// Exact 128-bit key for the opening book
    pub fn book_key(&self) -> u128 {
        ((self.board_mask as u128) << 64) | self.player_mask as u128
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BitBoard {
    /// Renders the grid with `X` for the first player and `O` for the second
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..HEIGHT).rev() {
            write!(f, "|")?;
            for column in 0..WIDTH {
                let symbol = match self.owner(column, row) {
                    Some(Player::First) => 'X',
                    Some(Player::Second) => 'O',
                    None => '.',
                };
                write!(f, " {}", symbol)?;
            }
            writeln!(f, " |")?;
        }
        write!(f, "|")?;
        for column in 1..=WIDTH {
            write!(f, " {}", column)?;
        }
        writeln!(f, " |")
    }
}
