//! Error types for the TessrChain library.

use thiserror::Error;

/// Errors produced by the TessrChain library.
///
/// The surface is deliberately small: the protocol recovers from its own
/// failures (collisions, premature terminate signals) by resetting, and
/// malformed cipher input is a documented no-op. Only configuration misuse
/// is reported to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TessrChainError {
    /// Configuration was attempted after the engine reached the connected
    /// state; round count and probability decay are fixed once connected.
    #[error("Engine is already connected; configuration is rejected")]
    AlreadyConnected,
    /// Round count must be at least 1.
    #[error("Round count must be at least 1")]
    InvalidRoundCount,
}
