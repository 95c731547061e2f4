//! Error types for the DKG core

use thiserror::Error;

use crate::dkg::Phase;
use crate::types::PartyId;

/// Result type alias for DKG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a DKG instance
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid threshold/committee configuration; the instance is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Party identity could not be derived from the member index
    #[error("identity derivation failed: {0}")]
    Identity(String),

    /// The field arithmetic rejected the polynomial inputs; fatal to the instance
    #[error("polynomial evaluation failed: {0}")]
    Evaluation(String),

    /// No share has been computed yet for this recipient; compute it and retry
    #[error("no share computed for recipient {recipient}")]
    ShareNotFound { recipient: PartyId },

    /// A received share does not match the sender's published commitments
    #[error("share from {sender} does not match its verification vector")]
    VerificationFailed { sender: PartyId },

    /// Aggregation requested before every expected contribution arrived
    #[error("aggregation incomplete: expected {expected} contributions, got {got}")]
    IncompleteAggregation { expected: usize, got: usize },

    /// Operation called while the instance is in the wrong phase
    #[error("{operation} is not valid in phase {actual:?}")]
    OutOfPhase {
        operation: &'static str,
        actual: Phase,
    },

    /// A sender contributed twice within the same epoch
    #[error("duplicate contribution from {sender}")]
    DuplicateContribution { sender: PartyId },

    /// The sender is not a committee member, or published no verification vector
    #[error("unknown sender {sender}")]
    UnknownSender { sender: PartyId },

    /// Hex/decimal decoding of a scalar or group element failed
    #[error("decode error: {0}")]
    Decode(String),
}
