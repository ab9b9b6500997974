//! Handshake convergence tests.
//!
//! Two independently owned engines are driven through the caller-side
//! exchange loop until both report connected, mirroring the connection
//! self-test embedded in the original implementation. A high probability
//! decay locks the peers into complementary proposal roles quickly, so a
//! negotiation normally completes within a few hundred rounds; collision
//! resets can stretch that, so the driver carries a generous bound and
//! reports failure instead of spinning forever.

use tessrchain::{ConnectionState, TessrChain, TABLE_SIZE};

const MAX_ROUNDS: usize = 200_000;

/// Drives both peers until both are connected, or the round bound runs
/// out. Returns whether both connected.
fn drive_to_connection(alice: &mut TessrChain, bob: &mut TessrChain) -> bool {
    for _ in 0..MAX_ROUNDS {
        if alice.state() == ConnectionState::Connected
            && bob.state() == ConnectionState::Connected
        {
            return true;
        }
        alice.generate_next();
        bob.generate_next();
        let from_bob = bob.next_outgoing();
        let from_alice = alice.next_outgoing();
        alice.accept(from_bob);
        bob.accept(from_alice);
    }
    alice.state() == ConnectionState::Connected && bob.state() == ConnectionState::Connected
}

/// Builds a seeded peer pair with the decay the original self-test uses.
fn seeded_pair(seed: u64) -> (TessrChain, TessrChain) {
    let mut alice = TessrChain::with_seed(seed);
    let mut bob = TessrChain::with_seed(seed.wrapping_add(0x9E37_79B9));
    alice.set_prob_decay(1000.0).unwrap();
    bob.set_prob_decay(1000.0).unwrap();
    (alice, bob)
}

/// Scans seeds for a converged pair whose final tables are identical.
fn converged_identical_pair() -> Option<(TessrChain, TessrChain)> {
    for seed in 0..20u64 {
        let (mut alice, mut bob) = seeded_pair(seed);
        if drive_to_connection(&mut alice, &mut bob) && alice.dump_table() == bob.dump_table() {
            return Some((alice, bob));
        }
    }
    None
}

#[test]
fn test_handshake_converges_and_tables_mostly_agree() {
    let mut converged = 0;
    let mut same = 0;
    let mut not_same = 0;
    for seed in 100..110u64 {
        let (mut alice, mut bob) = seeded_pair(seed);
        if drive_to_connection(&mut alice, &mut bob) {
            converged += 1;
            if alice.dump_table() == bob.dump_table() {
                same += 1;
            } else {
                not_same += 1;
            }
        }
    }
    assert!(
        converged * 2 >= 10,
        "only {} of 10 negotiations converged",
        converged
    );
    // Same majority criterion as the original self-test.
    assert!(
        same * 2 > not_same,
        "mirrored tables in the minority: {} same vs {} divergent",
        same,
        not_same
    );
}

#[test]
fn test_connected_table_is_total_permutation() {
    let (alice, _bob) = converged_identical_pair().expect("no negotiation converged");
    assert_eq!(alice.filled_cells() as usize, TABLE_SIZE);

    let dump = alice.dump_table();
    let cells: Vec<&str> = dump.split(' ').collect();
    assert_eq!(cells.len(), TABLE_SIZE);
    let mut seen = [false; TABLE_SIZE];
    for cell in cells {
        let value: usize = cell.parse().expect("unset cell in connected table");
        assert!(!seen[value], "duplicate value {} in connected table", value);
        seen[value] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_outgoing_is_none_once_connected() {
    let (alice, bob) = converged_identical_pair().expect("no negotiation converged");
    assert_eq!(alice.next_outgoing(), None);
    assert_eq!(bob.next_outgoing(), None);
}

#[test]
fn test_negotiated_tables_support_message_exchange() {
    let (mut alice, mut bob) = converged_identical_pair().expect("no negotiation converged");

    let original: Vec<u8> = (0..150u8).map(|x| x.wrapping_mul(31)).collect();
    let mut message = original.clone();
    alice.encrypt(&mut message);
    assert_ne!(message, original);
    bob.decrypt(&mut message);
    assert_eq!(message, original);

    alice.scramble(&original);
    bob.scramble(&original);
    assert_eq!(alice.dump_table(), bob.dump_table());

    // The evolved tables still round-trip.
    let mut second = original.clone();
    bob.encrypt(&mut second);
    alice.decrypt(&mut second);
    assert_eq!(second, original);
}

#[test]
fn test_configuration_locked_after_negotiation() {
    let (mut alice, _bob) = converged_identical_pair().expect("no negotiation converged");
    assert!(alice.set_round_count(4).is_err());
    assert!(alice.set_prob_decay(2.0).is_err());
}
