//! Mutable permutation table shared by the handshake and the cipher.
//!
//! The table is a partial assignment of slot index to symbol value over a
//! fixed alphabet of [`TABLE_SIZE`] symbols. The handshake fills it one
//! cell at a time until it is a total permutation; afterwards the scramble
//! step mutates it in bulk. A parallel used-value map gives O(1) filtering
//! when sampling an unused value, and a fill counter tracks completeness.

use crate::random::EngineRng;
use crate::utils::rotate;

/// Number of symbols in the alphabet. Slot indices and values both range
/// over `[0, TABLE_SIZE)`.
pub const TABLE_SIZE: usize = 256;

/// Slot-to-value permutation under construction.
///
/// `slots` holds `None` for unset cells. `used[v]` is true once value `v`
/// has been assigned to some slot; it is redundant with `slots` but kept
/// for cheap "pick an unused value" sampling. `inverse` is only valid
/// immediately after [`rebuild_inverse`](Self::rebuild_inverse) and is not
/// maintained by other mutations.
pub(crate) struct PermutationTable {
    slots: [Option<u8>; TABLE_SIZE],
    used: [bool; TABLE_SIZE],
    filled: u16,
    inverse: [u8; TABLE_SIZE],
    version: u64,
}

impl PermutationTable {
    pub(crate) fn new() -> Self {
        PermutationTable {
            slots: [None; TABLE_SIZE],
            used: [false; TABLE_SIZE],
            filled: 0,
            inverse: [0; TABLE_SIZE],
            version: 0,
        }
    }

    /// Returns the table to the freshly constructed shape: every cell
    /// unset, every value unused, fill counter and version at zero.
    pub(crate) fn reset(&mut self) {
        self.slots = [None; TABLE_SIZE];
        self.used = [false; TABLE_SIZE];
        self.filled = 0;
        self.inverse = [0; TABLE_SIZE];
        self.version = 0;
    }

    /// Assigns `value` to slot `key` iff the slot is unset and the value
    /// unused. Returns false (and mutates nothing) on collision.
    pub(crate) fn try_assign(&mut self, key: u8, value: u8) -> bool {
        if self.slots[key as usize].is_none() && !self.used[value as usize] {
            self.slots[key as usize] = Some(value);
            self.used[value as usize] = true;
            self.filled += 1;
            true
        } else {
            false
        }
    }

    /// Recomputes `inverse[slots[c]] = c` for every set cell. Unset cells
    /// are skipped; their inverse entries keep whatever they held before.
    /// Must be called with the current table before reading the inverse.
    pub(crate) fn rebuild_inverse(&mut self) {
        for c in 0..TABLE_SIZE {
            if let Some(v) = self.slots[c] {
                self.inverse[v as usize] = c as u8;
            }
        }
    }

    /// Picks a uniformly random unset slot index, or `None` once every
    /// slot is assigned.
    pub(crate) fn pick_unset_key(&self, rng: &mut EngineRng) -> Option<u8> {
        rng.find_random_match(&self.slots, &None).map(|i| i as u8)
    }

    /// Picks a uniformly random unused value, or `None` once every value
    /// is taken.
    pub(crate) fn pick_unused_value(&self, rng: &mut EngineRng) -> Option<u8> {
        rng.find_random_match(&self.used, &false).map(|i| i as u8)
    }

    /// Value stored at slot `c`, treating unset cells as 0. The cipher
    /// paths only run on a total table, where every cell is set.
    pub(crate) fn value_at(&self, c: usize) -> u8 {
        self.slots[c].unwrap_or(0)
    }

    /// Inverse lookup; only meaningful right after
    /// [`rebuild_inverse`](Self::rebuild_inverse).
    pub(crate) fn inverse_at(&self, v: usize) -> u8 {
        self.inverse[v]
    }

    pub(crate) fn filled(&self) -> u16 {
        self.filled
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Deterministically fills the table with `slots[(11 * c) % 256] = c`,
    /// marking every value used. Debug/test shortcut; the stride-11 layout
    /// matches the original simulated connection.
    pub(crate) fn fill_insecure(&mut self) {
        for c in 0..TABLE_SIZE {
            self.slots[(11 * c) % TABLE_SIZE] = Some(c as u8);
            self.used[c] = true;
        }
        self.filled = TABLE_SIZE as u16;
        self.version = (TABLE_SIZE + 1) as u64;
    }

    /// Space-separated values in slot order, `_` for unset cells.
    pub(crate) fn dump(&self) -> String {
        let mut out = String::with_capacity(TABLE_SIZE * 4);
        for (c, slot) in self.slots.iter().enumerate() {
            if c > 0 {
                out.push(' ');
            }
            match slot {
                Some(v) => out.push_str(&v.to_string()),
                None => out.push('_'),
            }
        }
        out
    }

    // Scramble primitives. Each is one leg of the composite `omega`
    // mutation the ratchet applies per (i, j) pair.

    /// Swaps the contents of slots `a` and `b`. No-op when `a == b`.
    pub(crate) fn swap_slots(&mut self, a: u8, b: u8) {
        if a != b {
            self.slots.swap(a as usize, b as usize);
        }
    }

    /// Rotates the whole slot array left by `m` positions.
    pub(crate) fn rotate_left(&mut self, m: u8) {
        rotate(&mut self.slots, i64::from(m));
    }

    /// Composes the permutation with itself: every set cell `c` whose value
    /// is `v` is replaced by the value currently stored at slot `v`. Unset
    /// cells are left alone.
    pub(crate) fn compose_self(&mut self) {
        let mut scratch = self.slots;
        for c in 0..TABLE_SIZE {
            if let Some(v) = self.slots[c] {
                scratch[c] = self.slots[v as usize];
            }
        }
        self.slots = scratch;
    }

    /// One composite scramble mutation: swap slots `a` and `b`, rotate the
    /// table by `m`, then compose the permutation with itself.
    pub(crate) fn omega(&mut self, a: u8, b: u8, m: u8) {
        self.swap_slots(a, b);
        self.rotate_left(m);
        self.compose_self();
    }
}
