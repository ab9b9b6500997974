//! TessrChain: permutation-handshake cipher engine.
//!
//! Orchestrates the handshake state machine, the round-based cipher, and
//! the post-message table scramble over one engine-owned
//! [`PermutationTable`](crate::table::PermutationTable). One instance is
//! one peer; the caller is the transport, ferrying scalars between peers.

use log::{debug, trace};

use crate::cipher::{decrypt_rounds, encrypt_rounds, scramble_table};
use crate::error::TessrChainError;
use crate::random::EngineRng;
use crate::sink::{Role, TraceEvent, TraceSink};
use crate::table::PermutationTable;

/// Default number of encryption/decryption rounds per message.
const DEFAULT_ROUND_COUNT: u8 = 16;

/// Default decay rate for the key-proposal probability.
const DEFAULT_PROB_DECAY: f64 = 2.0;

/// Handshake state of one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Still negotiating the permutation table.
    NotConnected,
    /// Table complete; the cipher operations are live. Terminal, except
    /// for the full internal reset triggered by protocol failures.
    Connected,
}

/// One peer of the permutation-handshake cipher.
///
/// The engine starts in [`ConnectionState::NotConnected`] with an empty
/// table. The caller drives the handshake by alternating
/// [`generate_next`](Self::generate_next) /
/// [`next_outgoing`](Self::next_outgoing) on each peer and feeding the
/// result into the counterpart's [`accept`](Self::accept), until both
/// peers report [`ConnectionState::Connected`]. Once connected, either
/// peer may [`encrypt`](Self::encrypt) or [`decrypt`](Self::decrypt); after
/// every successful exchange both peers must [`scramble`](Self::scramble)
/// with the same plaintext bytes to keep their tables in lockstep.
///
/// # Examples
///
/// Encrypt and decrypt a message between two connected peers:
///
/// ```
/// use tessrchain::TessrChain;
///
/// let mut alice = TessrChain::with_seed(1);
/// let mut bob = TessrChain::with_seed(2);
/// alice.simulate_insecure_connect();
/// bob.simulate_insecure_connect();
///
/// let original = b"attack at dawn".to_vec();
/// let mut message = original.clone();
///
/// alice.encrypt(&mut message);
/// assert_ne!(message, original);
///
/// bob.decrypt(&mut message);
/// assert_eq!(message, original);
///
/// // Ratchet both tables with the shared plaintext.
/// alice.scramble(&original);
/// bob.scramble(&original);
/// assert_eq!(alice.dump_table(), bob.dump_table());
/// ```
pub struct TessrChain {
    state: ConnectionState,
    table: PermutationTable,
    rng: EngineRng,
    round_count: u8,
    prob_decay: f64,
    prob_to_gen_key: f64,
    key: Option<u8>,
    value: Option<u8>,
    to_send: Option<u8>,
    sink: Option<Box<dyn TraceSink>>,
}

impl Default for TessrChain {
    fn default() -> Self {
        Self::new()
    }
}

impl TessrChain {
    /// Creates a peer seeded from OS entropy.
    pub fn new() -> Self {
        Self::build(EngineRng::from_entropy())
    }

    /// Creates a peer with a fixed base seed. Every decision the engine
    /// makes, across resets included, is a pure function of this seed and
    /// the scalars fed to [`accept`](Self::accept).
    pub fn with_seed(seed: u64) -> Self {
        Self::build(EngineRng::with_seed(seed))
    }

    fn build(rng: EngineRng) -> Self {
        let mut engine = TessrChain {
            state: ConnectionState::NotConnected,
            table: PermutationTable::new(),
            rng,
            round_count: DEFAULT_ROUND_COUNT,
            prob_decay: DEFAULT_PROB_DECAY,
            prob_to_gen_key: 0.5,
            key: None,
            value: None,
            to_send: None,
            sink: None,
        };
        engine.reset();
        engine
    }

    /// Discards all negotiated state and restarts the handshake: fresh
    /// empty table, key-proposal probability back to 0.5, state back to
    /// not connected. The random source is re-derived with the reseed
    /// perturbation so rapid successive resets do not repeat.
    fn reset(&mut self) {
        self.rng.reseed();
        trace!("resetting handshake state");
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&TraceEvent::Reset);
        }
        self.table.reset();
        self.state = ConnectionState::NotConnected;
        self.prob_to_gen_key = 0.5;
        self.key = None;
        self.value = None;
        self.to_send = None;
    }

    /// Sets the number of substitution-rotation rounds per message.
    ///
    /// # Errors
    /// [`TessrChainError::AlreadyConnected`] once the engine is connected;
    /// [`TessrChainError::InvalidRoundCount`] for a round count of 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessrchain::TessrChain;
    ///
    /// let mut engine = TessrChain::with_seed(7);
    /// engine.set_round_count(8).unwrap();
    /// engine.simulate_insecure_connect();
    /// assert!(engine.set_round_count(4).is_err());
    /// ```
    pub fn set_round_count(&mut self, rounds: u8) -> Result<(), TessrChainError> {
        if self.state == ConnectionState::Connected {
            return Err(TessrChainError::AlreadyConnected);
        }
        if rounds == 0 {
            return Err(TessrChainError::InvalidRoundCount);
        }
        self.round_count = rounds;
        Ok(())
    }

    /// Sets the decay rate applied to the key-proposal probability after
    /// every successful assignment. Larger values push the probability
    /// toward 0 or 1 faster, locking the two peers into complementary
    /// proposal roles.
    ///
    /// # Errors
    /// [`TessrChainError::AlreadyConnected`] once the engine is connected.
    pub fn set_prob_decay(&mut self, decay: f64) -> Result<(), TessrChainError> {
        if self.state == ConnectionState::Connected {
            return Err(TessrChainError::AlreadyConnected);
        }
        self.prob_decay = decay;
        Ok(())
    }

    /// Installs or removes the activity trace sink. `None` disables
    /// tracing entirely; no event records are built without a sink.
    pub fn set_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.sink = sink;
    }

    /// Decides and stages this peer's next outgoing scalar.
    ///
    /// With probability equal to the current key-proposal probability the
    /// peer proposes an unset slot index, otherwise an unused value; one
    /// of the two per round, never both. When the chosen side has nothing
    /// left to propose the local table is full: the peer advances to
    /// [`ConnectionState::Connected`] and clears its outgoing scalar.
    /// No-op once connected.
    pub fn generate_next(&mut self) {
        if self.state == ConnectionState::Connected {
            return;
        }
        let mut exhausted = false;
        if self.rng.uniform01() < self.prob_to_gen_key {
            // Propose a key, listen for a value.
            match self.table.pick_unset_key(&mut self.rng) {
                Some(key) => {
                    self.key = Some(key);
                    self.to_send = Some(key);
                    if let Some(sink) = self.sink.as_mut() {
                        sink.record(&TraceEvent::Proposed {
                            table: self.table.dump(),
                            scalar: key,
                            role: Role::Key,
                        });
                    }
                }
                None => {
                    self.key = None;
                    exhausted = true;
                }
            }
            self.value = None;
        } else {
            // Propose a value, listen for a key.
            match self.table.pick_unused_value(&mut self.rng) {
                Some(value) => {
                    self.value = Some(value);
                    self.to_send = Some(value);
                    if let Some(sink) = self.sink.as_mut() {
                        sink.record(&TraceEvent::Proposed {
                            table: self.table.dump(),
                            scalar: value,
                            role: Role::Value,
                        });
                    }
                }
                None => {
                    self.value = None;
                    exhausted = true;
                }
            }
            self.key = None;
        }
        if exhausted {
            self.state = ConnectionState::Connected;
            self.to_send = None;
            debug!("table exhausted, peer connected");
            if let Some(sink) = self.sink.as_mut() {
                sink.record(&TraceEvent::Connected {
                    table: self.table.dump(),
                });
            }
        }
    }

    /// The scalar staged by the last [`generate_next`](Self::generate_next),
    /// or `None` once connected.
    pub fn next_outgoing(&self) -> Option<u8> {
        self.to_send
    }

    /// Processes the counterpart's outgoing scalar.
    ///
    /// `None` while still negotiating is the counterpart's connect or
    /// terminate signal; the peer responds by resetting entirely, not by
    /// connecting. Otherwise the scalar fills whichever of the pending
    /// key/value is unset (value first), and once both halves are present
    /// the pair is assigned into the table. A successful assignment adapts
    /// the key-proposal probability; a collision resets the whole
    /// handshake. No-op once connected.
    pub fn accept(&mut self, received: Option<u8>) {
        if self.state == ConnectionState::Connected {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&TraceEvent::Incoming { scalar: received });
        }
        let Some(scalar) = received else {
            trace!("terminate signal received while negotiating");
            self.reset();
            return;
        };

        let mut key_this_time = false;
        if self.value.is_none() {
            self.value = Some(scalar);
            key_this_time = true;
        }
        if self.key.is_none() {
            self.key = Some(scalar);
            key_this_time = false;
        }

        if let (Some(key), Some(value)) = (self.key, self.value) {
            if self.table.try_assign(key, value) {
                let denominator = self.prob_decay + f64::from(value % 2);
                if key_this_time {
                    self.prob_to_gen_key /= denominator;
                } else {
                    self.prob_to_gen_key = 1.0 - (1.0 - self.prob_to_gen_key) / denominator;
                }
                trace!(
                    "assigned slot {} = {}, filled {}",
                    key,
                    value,
                    self.table.filled()
                );
                if let Some(sink) = self.sink.as_mut() {
                    sink.record(&TraceEvent::Assigned {
                        table: self.table.dump(),
                        key,
                        value,
                        filled: self.table.filled(),
                        prob_to_gen_key: self.prob_to_gen_key,
                    });
                }
            } else {
                debug!("collision on slot {} value {}, resetting", key, value);
                if let Some(sink) = self.sink.as_mut() {
                    sink.record(&TraceEvent::Collision);
                }
                self.reset();
            }
        }
    }

    /// Encrypts `message` in place with the configured round count.
    ///
    /// No-op on an empty message or while not connected; no partial
    /// mutation occurs in either case.
    pub fn encrypt(&self, message: &mut [u8]) {
        if message.is_empty() || self.state != ConnectionState::Connected {
            return;
        }
        encrypt_rounds(&self.table, self.round_count, message);
    }

    /// Decrypts `message` in place, inverting [`encrypt`](Self::encrypt)
    /// for an identical table and round count. The inverse permutation is
    /// rebuilt from the current table on every call, so no separate
    /// rebuild step is needed between scrambles.
    ///
    /// No-op on an empty message or while not connected.
    pub fn decrypt(&mut self, message: &mut [u8]) {
        if message.is_empty() || self.state != ConnectionState::Connected {
            return;
        }
        decrypt_rounds(&mut self.table, self.round_count, message);
    }

    /// Ratchets the table from the plaintext bytes of the last exchanged
    /// message. Sender and receiver both hold the plaintext after a
    /// successful exchange; applying the same scramble on both sides keeps
    /// the two tables bit-identical for all subsequent messages.
    ///
    /// No-op on an empty message.
    pub fn scramble(&mut self, plaintext: &[u8]) {
        if plaintext.is_empty() {
            return;
        }
        scramble_table(&mut self.table, plaintext);
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&TraceEvent::Scrambled {
                version: self.table.version(),
            });
        }
    }

    /// Bypasses the handshake and fills the table with the fixed stride-11
    /// layout, marking the engine connected.
    ///
    /// Both peers calling this end up with identical tables, which makes
    /// it a convenient test and debug shortcut. It is exactly as insecure
    /// as it sounds: never a substitute for the real handshake.
    pub fn simulate_insecure_connect(&mut self) {
        self.state = ConnectionState::Connected;
        self.table.fill_insecure();
        debug!("simulated insecure connection");
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&TraceEvent::Connected {
                table: self.table.dump(),
            });
        }
    }

    /// Textual table snapshot: space-separated values in slot order, `_`
    /// for unset cells. Used for peer equality checks in tests and for
    /// diagnostics.
    pub fn dump_table(&self) -> String {
        self.table.dump()
    }

    /// Current handshake state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Diagnostic table version: bumped once per completed scramble, set
    /// past the table size by the simulated connect.
    pub fn version(&self) -> u64 {
        self.table.version()
    }

    /// Number of table cells assigned so far.
    pub fn filled_cells(&self) -> u16 {
        self.table.filled()
    }
}
