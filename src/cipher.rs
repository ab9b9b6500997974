//! Round transforms over a permutation table.
//!
//! Encryption runs `rounds` substitution-rotation passes over the message.
//! Each pass complements every byte, adds the slot value at its position,
//! substitutes through the table, and accumulates a running offset (seeded
//! at 1) over the freshly transformed bytes; the pass ends with a cyclic
//! left rotation of the whole message by that offset. Decryption undoes the
//! passes in the mirror order, reading each round's offset from the message
//! as received for that round, before undoing the rotation.
//!
//! The scramble is the ratchet: a deterministic, message-dependent bulk
//! mutation of the table that both peers apply to the same plaintext bytes
//! after a successful exchange, keeping their tables in lockstep.

use crate::table::{PermutationTable, TABLE_SIZE};
use crate::utils::rotate;

/// Applies `rounds` substitution-rotation passes to `message` in place.
///
/// Expects a total table; the caller gates on connection state.
pub(crate) fn encrypt_rounds(table: &PermutationTable, rounds: u8, message: &mut [u8]) {
    for _ in 0..rounds {
        let mut offset: u64 = 1;
        for (p, byte) in message.iter_mut().enumerate() {
            let mut v = (TABLE_SIZE - 1) as u8 - *byte;
            v = ((u16::from(v) + u16::from(table.value_at(p % TABLE_SIZE)))
                % TABLE_SIZE as u16) as u8;
            v = table.value_at(v as usize);
            *byte = v;
            offset += u64::from(v);
        }
        if offset != 0 {
            rotate(message, offset as i64);
        }
    }
}

/// Inverts [`encrypt_rounds`] in place.
///
/// Rebuilds the inverse permutation from the current table up front, so the
/// caller never has to keep it live. Each round first recomputes the
/// offset from the incoming bytes, undoes the rotation, then undoes the
/// substitutions.
pub(crate) fn decrypt_rounds(table: &mut PermutationTable, rounds: u8, message: &mut [u8]) {
    table.rebuild_inverse();
    for _ in 0..rounds {
        let offset = 1 + message.iter().map(|&b| u64::from(b)).sum::<u64>();
        if offset != 0 {
            rotate(message, -(offset as i64));
        }
        for (p, byte) in message.iter_mut().enumerate() {
            let mut v = table.inverse_at(*byte as usize);
            v = ((u16::from(v) + TABLE_SIZE as u16
                - u16::from(table.value_at(p % TABLE_SIZE)))
                % TABLE_SIZE as u16) as u8;
            *byte = (TABLE_SIZE - 1) as u8 - v;
        }
    }
}

/// Ratchets the table from the plaintext bytes of the last message.
///
/// For every pair `(i, j)` with `i in [0, 64)` and `j in [i+1, 128)`, three
/// composite mutations run, each with its own index formula (`j^3 mod 256`,
/// `255 - j` with `j^2 mod 256`, and message-byte-indexed slots with
/// `(i + j) mod 256`). Intentionally expensive and data dependent: tables
/// scrambled with different messages diverge unpredictably, while the same
/// starting table and message always produce the same result. Bumps the
/// diagnostic version counter once per completed call.
pub(crate) fn scramble_table(table: &mut PermutationTable, message: &[u8]) {
    if message.is_empty() {
        return;
    }
    let len = message.len();
    for i in 0..64usize {
        for j in (i + 1)..128usize {
            table.omega(
                j as u8,
                ((j * j * j) % TABLE_SIZE) as u8,
                message[i % len],
            );
            table.omega(
                (TABLE_SIZE - 1 - j) as u8,
                ((j * j) % TABLE_SIZE) as u8,
                message[len / 2],
            );
            table.omega(
                message[i % len],
                message[j % len],
                ((i + j) % TABLE_SIZE) as u8,
            );
        }
    }
    table.bump_version();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_table() -> PermutationTable {
        let mut table = PermutationTable::new();
        table.fill_insecure();
        table
    }

    #[test]
    fn test_encrypt_changes_message() {
        let table = total_table();
        let original: Vec<u8> = (0..150u8).collect();
        let mut message = original.clone();
        encrypt_rounds(&table, 8, &mut message);
        assert_ne!(message, original);
    }

    #[test]
    fn test_roundtrip_single_round() {
        let mut table = total_table();
        let original: Vec<u8> = vec![0, 1, 2, 254, 255, 17];
        let mut message = original.clone();
        encrypt_rounds(&table, 1, &mut message);
        decrypt_rounds(&mut table, 1, &mut message);
        assert_eq!(message, original);
    }

    #[test]
    fn test_roundtrip_many_rounds() {
        let mut table = total_table();
        let original: Vec<u8> = (0..=255u8).cycle().take(150).collect();
        let mut message = original.clone();
        encrypt_rounds(&table, 16, &mut message);
        decrypt_rounds(&mut table, 16, &mut message);
        assert_eq!(message, original);
    }

    #[test]
    fn test_roundtrip_single_byte_message() {
        let mut table = total_table();
        let mut message = vec![200u8];
        encrypt_rounds(&table, 8, &mut message);
        decrypt_rounds(&mut table, 8, &mut message);
        assert_eq!(message, vec![200]);
    }

    #[test]
    fn test_mismatched_round_count_fails_roundtrip() {
        let mut table = total_table();
        let original: Vec<u8> = (0..100u8).collect();
        let mut message = original.clone();
        encrypt_rounds(&table, 8, &mut message);
        decrypt_rounds(&mut table, 7, &mut message);
        assert_ne!(message, original);
    }

    #[test]
    fn test_encrypt_deterministic() {
        let table = total_table();
        let mut a: Vec<u8> = (0..120u8).collect();
        let mut b = a.clone();
        encrypt_rounds(&table, 8, &mut a);
        encrypt_rounds(&table, 8, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_scramble_deterministic_across_tables() {
        let mut a = total_table();
        let mut b = total_table();
        let message: Vec<u8> = (0..150u8).map(|x| x.wrapping_mul(37)).collect();
        scramble_table(&mut a, &message);
        scramble_table(&mut b, &message);
        assert_eq!(a.dump(), b.dump());
    }

    #[test]
    fn test_scramble_diverges_for_different_messages() {
        let mut a = total_table();
        let mut b = total_table();
        scramble_table(&mut a, &[1, 2, 3, 4, 5]);
        scramble_table(&mut b, &[1, 2, 3, 4, 6]);
        assert_ne!(a.dump(), b.dump());
    }

    #[test]
    fn test_scramble_changes_table_and_bumps_version() {
        let mut table = total_table();
        let before = table.dump();
        let version = table.version();
        scramble_table(&mut table, &[9, 8, 7]);
        assert_ne!(table.dump(), before);
        assert_eq!(table.version(), version + 1);
    }

    #[test]
    fn test_scramble_empty_message_is_noop() {
        let mut table = total_table();
        let before = table.dump();
        let version = table.version();
        scramble_table(&mut table, &[]);
        assert_eq!(table.dump(), before);
        assert_eq!(table.version(), version);
    }

    #[test]
    fn test_scramble_keeps_permutation_total() {
        let mut table = total_table();
        scramble_table(&mut table, &[42, 17, 255, 0, 3]);
        let mut seen = [false; TABLE_SIZE];
        for c in 0..TABLE_SIZE {
            seen[table.value_at(c) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_roundtrip_after_scramble() {
        let mut table = total_table();
        scramble_table(&mut table, &[5, 4, 3, 2, 1]);
        let original: Vec<u8> = (0..77u8).collect();
        let mut message = original.clone();
        encrypt_rounds(&table, 8, &mut message);
        decrypt_rounds(&mut table, 8, &mut message);
        assert_eq!(message, original);
    }
}
