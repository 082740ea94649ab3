//! Fixed-size transposition table storing one score bound per slot
//!
//! Keys are truncated to their low 32 bits. Since a slot index is `key % capacity`
//! and the capacity is a prime above `2^(KEY_BITS - 32)`, the pair
//! (slot index, truncated key) identifies a full key uniquely, so a
//! matching truncated key is never a false hit. Smaller tables are rejected.

use static_assertions::const_assert;

use crate::{
    bitboard::KEY_BITS,
    solver::{MAX_SCORE, MIN_SCORE},
    Error, Result,
};

/// log2 of the default table size
pub const DEFAULT_LOG_SIZE: u32 = 23;
/// Smallest table size keeping truncated keys exact
pub const MIN_LOG_SIZE: u32 = (KEY_BITS - 32) as u32;
/// Largest accepted table size, 5 bytes per slot
pub const MAX_LOG_SIZE: u32 = 40;

/// Number of distinct scores a bound can take
const SCORE_SPAN: i32 = MAX_SCORE - MIN_SCORE + 1;

// both bound ranges must fit in the non-zero values of a byte
const_assert!(2 * SCORE_SPAN <= u8::MAX as i32);
const_assert!(MIN_LOG_SIZE <= DEFAULT_LOG_SIZE && DEFAULT_LOG_SIZE <= MAX_LOG_SIZE);

/// A bound on the true score of a position
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bound {
    /// The true score is at most this value (fail-low)
    Upper(i32),
    /// The true score is at least this value (fail-high)
    Lower(i32),
}

impl Bound {
    /// Packs the bound into `1..=2 * SCORE_SPAN`, leaving 0 for empty slots
    pub fn encode(self) -> u8 {
        match self {
            Bound::Upper(score) => {
                debug_assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
                (score - MIN_SCORE + 1) as u8
            }
            Bound::Lower(score) => {
                debug_assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
                (score - MIN_SCORE + 1 + SCORE_SPAN) as u8
            }
        }
    }

    pub fn decode(value: u8) -> Option<Self> {
        let value = value as i32;
        match value {
            0 => None,
            v if v > SCORE_SPAN => Some(Bound::Lower(v - SCORE_SPAN + MIN_SCORE - 1)),
            v => Some(Bound::Upper(v + MIN_SCORE - 1)),
        }
    }
}

fn is_prime(n: usize) -> bool {
    if n <= 3 {
        return n > 1;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5;
    while i * i <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Smallest prime greater than or equal to `n`
pub fn next_prime(mut n: usize) -> usize {
    while !is_prime(n) {
        n += 1;
    }
    n
}

#[derive(Clone)]
pub struct TranspositionTable {
    // truncated keys and encoded values are kept in separate arrays,
    // 5 bytes per slot instead of 8 for a padded struct
    keys: Vec<u32>,
    values: Vec<u8>,
}

impl TranspositionTable {
    /// Allocates a table with [`DEFAULT_LOG_SIZE`]
    pub fn new() -> Result<Self> {
        Self::with_log_size(DEFAULT_LOG_SIZE)
    }

    /// Allocates a table with the smallest prime capacity `>= 2^log_size`
    ///
    /// `log_size` must lie in `MIN_LOG_SIZE..=MAX_LOG_SIZE`.
    pub fn with_log_size(log_size: u32) -> Result<Self> {
        let size = 1usize
            .checked_shl(log_size)
            .filter(|_| (MIN_LOG_SIZE..=MAX_LOG_SIZE).contains(&log_size))
            .ok_or(Error::TableSize {
                log_size,
                min: MIN_LOG_SIZE,
                max: MAX_LOG_SIZE,
            })?;
        let capacity = next_prime(size);

        let mut keys = Vec::new();
        keys.try_reserve_exact(capacity)
            .map_err(|source| Error::TableAllocation {
                entries: capacity,
                source,
            })?;
        keys.resize(capacity, 0);

        let mut values = Vec::new();
        values
            .try_reserve_exact(capacity)
            .map_err(|source| Error::TableAllocation {
                entries: capacity,
                source,
            })?;
        values.resize(capacity, 0);

        Ok(Self { keys, values })
    }

    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Empties every slot
    pub fn reset(&mut self) {
        self.keys.fill(0);
        self.values.fill(0);
    }

    fn index(&self, key: u64) -> usize {
        debug_assert_eq!(key >> KEY_BITS, 0);
        (key % self.keys.len() as u64) as usize
    }

    /// Stores `value` for `key`, overwriting whatever occupied the slot
    pub fn set(&mut self, key: u64, value: u8) {
        debug_assert_ne!(value, 0, "0 is reserved for empty slots");
        let i = self.index(key);
        self.keys[i] = key as u32;
        self.values[i] = value;
    }

    /// Fetches the value stored for `key`, if the slot holds this key
    pub fn get(&self, key: u64) -> Option<u8> {
        let i = self.index(key);
        if self.keys[i] == key as u32 && self.values[i] != 0 {
            Some(self.values[i])
        } else {
            None
        }
    }

    pub fn set_bound(&mut self, key: u64, bound: Bound) {
        self.set(key, bound.encode());
    }

    pub fn get_bound(&self, key: u64) -> Option<Bound> {
        self.get(key).and_then(Bound::decode)
    }
}
