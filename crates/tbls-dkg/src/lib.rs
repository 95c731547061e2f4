//! # tbls-dkg
//!
//! Threshold BLS distributed key generation for rotating committees.
//!
//! Each committee member runs one [`Dkg`] instance per epoch:
//! - a random degree t-1 polynomial is drawn at construction, its constant
//!   term being the member's contribution to the group secret
//! - Feldman commitments to the coefficients form the member's
//!   [`VerificationVector`], published to the committee
//! - the polynomial is evaluated at every member's [`PartyId`] to produce
//!   the outgoing secret shares
//! - received shares are checked against the sender's commitments and summed
//!   into the member's long-term share of the group secret
//! - the combined verification vector yields the group public key, and a
//!   [`DkgSummary`] records the epoch's key material for persistence
//!
//! ## Example
//!
//! ```rust,ignore
//! use tbls_dkg::{CryptoBackend, Dkg, DkgConfig};
//!
//! let backend = CryptoBackend::new();
//! let config = DkgConfig::new(3, 5, 42, 0)?;
//! let mut dkg = Dkg::new(&backend, config, &mut rng)?;
//! ```
//!
//! Share transport, committee membership and epoch scheduling belong to the
//! caller; this crate is synchronous, CPU-bound field and group arithmetic.

pub mod backend;
pub mod dkg;
pub mod error;
pub mod messages;
pub mod poly;
pub mod types;
pub mod vvec;

pub use backend::CryptoBackend;
pub use dkg::{Dkg, Phase};
pub use error::{Error, Result};
pub use messages::{KeyShareMessage, VvecMessage};
pub use poly::{combine_shares, Polynomial};
pub use types::{DkgConfig, DkgSummary, PartyId};
pub use vvec::VerificationVector;

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
