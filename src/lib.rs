//! TessrChain permutation-handshake symmetric cipher engine.
//!
//! TessrChain is a self-contained, non-standard symmetric cipher built
//! around a mutable permutation of a 256-symbol alphabet. Two peers
//! collaboratively construct identical random permutations one scalar at a
//! time, without ever exchanging the permutation itself; the agreed table
//! then drives a multi-round substitution-rotation cipher plus a
//! table-scrambling ratchet that evolves the shared secret after every
//! message.
//!
//! This crate is a faithful port of the original C++ implementation. It
//! makes no cryptographic security claims: the scheme is ad hoc, and the
//! port reproduces its exact mechanical behavior.
//!
//! # Architecture
//!
//! ```text
//! EngineRng         (scalar sampling + random-start cyclic slot search)
//!     ↑ used by
//! PermutationTable  (slot→value cells, used-value map, scramble primitives)
//!     ↑ read/written by
//! cipher rounds     (substitution-rotation passes + message-driven ratchet)
//!     ↑ orchestrated by
//! TessrChain        (handshake state machine + public cipher surface)
//! ```
//!
//! # Driving the handshake
//!
//! The caller owns the transport. Each round, both peers stage a scalar and
//! each feeds the counterpart's scalar back in; the loop runs until both
//! report connected:
//!
//! ```no_run
//! use tessrchain::{ConnectionState, TessrChain};
//!
//! let mut alice = TessrChain::new();
//! let mut bob = TessrChain::new();
//! alice.set_prob_decay(1000.0).unwrap();
//! bob.set_prob_decay(1000.0).unwrap();
//!
//! while alice.state() == ConnectionState::NotConnected
//!     || bob.state() == ConnectionState::NotConnected
//! {
//!     alice.generate_next();
//!     bob.generate_next();
//!     let from_bob = bob.next_outgoing();
//!     let from_alice = alice.next_outgoing();
//!     alice.accept(from_bob);
//!     bob.accept(from_alice);
//! }
//! ```
//!
//! Once connected, encrypt on one side, decrypt on the other, then apply
//! the same scramble with the shared plaintext on both sides:
//!
//! ```
//! use tessrchain::TessrChain;
//!
//! let mut alice = TessrChain::with_seed(1);
//! let mut bob = TessrChain::with_seed(2);
//! alice.simulate_insecure_connect();
//! bob.simulate_insecure_connect();
//!
//! let plaintext = vec![10u8, 200, 33, 97];
//! let mut message = plaintext.clone();
//! alice.encrypt(&mut message);
//! bob.decrypt(&mut message);
//! assert_eq!(message, plaintext);
//!
//! alice.scramble(&plaintext);
//! bob.scramble(&plaintext);
//! assert_eq!(alice.dump_table(), bob.dump_table());
//! ```
//!
//! # Protocol quirks
//!
//! Two behaviors of the original protocol are preserved as-is and worth
//! knowing about when integrating:
//!
//! - A peer that receives `None` while still negotiating resets entirely
//!   rather than connecting. A peer that connects stops emitting scalars,
//!   so a laggard counterpart interprets the silence as a terminate signal.
//! - Incoming scalars fill the pending pair with value-before-key
//!   priority; if both halves are somehow already set, the stale pair is
//!   retried as-is, which normally forces a collision reset.

#![deny(clippy::all)]

pub mod error;
pub mod sink;

pub(crate) mod cipher;
pub(crate) mod random;
pub(crate) mod table;
mod tessrchain;
pub(crate) mod utils;

pub use table::TABLE_SIZE;
pub use tessrchain::{ConnectionState, TessrChain};
