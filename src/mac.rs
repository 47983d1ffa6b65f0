//! A mutable 48-bit MAC identity with a freshness history.
//!
//! The attack depends on every probe packet installing a *new* flow-table
//! entry; any repeated source MAC hits an existing rule and confounds the
//! RTT-difference test. `MacIdentity` tracks every value it has ever taken
//! so `flip` can guarantee it never repeats one.

use indexmap::IndexMap;
use rand::Rng;

use crate::error::ProbeError;

const BITS: u8 = 48;
const MASK: u64 = (1u64 << BITS) - 1;

/// How a history entry's value was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Initial value or an explicit `set`, matching the reference's `-1` sentinel.
    Set,
    /// Reached by flipping this bit of the previous value.
    Flip(u8),
}

/// A single history record: how this value was reached, and what it replaced.
pub type HistoryEntry = (Mutation, Option<u64>);

pub struct MacIdentity {
    value: u64,
    history: IndexMap<u64, HistoryEntry>,
}

impl MacIdentity {
    /// Builds from a colon-separated hex string (17 characters).
    pub fn new(s: &str) -> Result<Self, ProbeError> {
        if s.len() != 17 {
            return Err(ProbeError::InvalidLength(s.len()));
        }
        let digits: String = s.chars().filter(|c| *c != ':').collect();
        let value = u64::from_str_radix(&digits, 16).map_err(|_| ProbeError::InvalidLength(s.len()))? & MASK;
        Ok(Self::from_bits(value))
    }

    /// Builds from a 48-bit integer (higher bits are masked off).
    pub fn from_bits(value: u64) -> Self {
        let value = value & MASK;
        let mut history = IndexMap::new();
        history.insert(value, (Mutation::Set, None));
        Self { value, history }
    }

    /// Draws a fresh random 48-bit value.
    pub fn random() -> Self {
        let value = rand::thread_rng().gen_range(0..=MASK);
        Self::from_bits(value)
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn history(&self) -> &IndexMap<u64, HistoryEntry> {
        &self.history
    }

    pub fn to_bytes(&self) -> [u8; 6] {
        let v = self.value;
        [
            ((v >> 40) & 0xff) as u8,
            ((v >> 32) & 0xff) as u8,
            ((v >> 24) & 0xff) as u8,
            ((v >> 16) & 0xff) as u8,
            ((v >> 8) & 0xff) as u8,
            (v & 0xff) as u8,
        ]
    }

    fn render(value: u64) -> String {
        format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            (value >> 40) & 0xff,
            (value >> 32) & 0xff,
            (value >> 24) & 0xff,
            (value >> 16) & 0xff,
            (value >> 8) & 0xff,
            value & 0xff,
        )
    }

    /// Toggles `bit`, returning the resulting string form.
    ///
    /// If the flipped value has already appeared in `history` and `retry` is
    /// set, draws fresh random bits until an unseen value emerges, bounded at
    /// `BITS` attempts (spec.md §9.4 flags the unbounded reference version as
    /// a bug to fix). With `retry` unset, a collision leaves `value`
    /// unchanged and returns it as-is.
    pub fn flip(&mut self, bit: u8, retry: bool) -> Result<String, ProbeError> {
        if bit >= BITS {
            return Err(ProbeError::BitOutOfRange(bit));
        }

        let mut candidate_bit = bit;
        let mut flipped = self.value ^ (1u64 << candidate_bit);

        if self.history.contains_key(&flipped) {
            if !retry {
                return Ok(Self::render(self.value));
            }
            let mut attempts = 0u8;
            while self.history.contains_key(&flipped) {
                attempts += 1;
                if attempts > BITS {
                    return Err(ProbeError::MeasurementDegenerate);
                }
                candidate_bit = rand::thread_rng().gen_range(0..BITS);
                flipped = self.value ^ (1u64 << candidate_bit);
            }
        }

        self.history.insert(flipped, (Mutation::Flip(candidate_bit), Some(self.value)));
        self.value = flipped;
        Ok(Self::render(self.value))
    }

    /// Unconditionally replaces `value`, recording `(Set, previous)`.
    pub fn set(&mut self, value: u64) -> String {
        let value = value & MASK;
        let previous = self.value;
        self.history.insert(value, (Mutation::Set, Some(previous)));
        self.value = value;
        Self::render(self.value)
    }
}

impl std::fmt::Display for MacIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Self::render(self.value))
    }
}
