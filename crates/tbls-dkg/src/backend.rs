//! Cryptographic backend handle and scalar/point codecs
//!
//! The pairing library needs no process-wide setup of its own, but callers
//! treat the curve as an injected capability: construct a [`CryptoBackend`]
//! and pass it wherever key material is created. `ensure_initialized` is
//! idempotent and cheap after the first call.

use bls12_381::{G2Affine, G2Projective, Scalar};
use ff::Field;
use group::Curve;
use std::sync::Once;
use tracing::debug;

use crate::error::{Error, Result};

static INIT: Once = Once::new();

/// Handle to the pairing-curve arithmetic capability
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoBackend {
    _private: (),
}

impl CryptoBackend {
    /// Create a backend handle
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Run the one-time backend sanity check; subsequent calls are no-ops
    pub fn ensure_initialized(&self) {
        INIT.call_once(|| {
            let generator = G2Affine::generator();
            assert!(
                bool::from(generator.is_torsion_free()),
                "pairing backend generator failed the subgroup check"
            );
            debug!("pairing curve backend initialized");
        });
    }
}

/// Encode a scalar as fixed-width big-endian hex
pub fn scalar_to_hex(scalar: &Scalar) -> String {
    let mut bytes = scalar.to_bytes();
    bytes.reverse();
    hex::encode(bytes)
}

/// Decode a scalar from big-endian hex
pub fn scalar_from_hex(s: &str) -> Result<Scalar> {
    let raw = hex::decode(s).map_err(|e| Error::Decode(format!("scalar hex: {e}")))?;
    let mut bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| Error::Decode("scalar hex must encode 32 bytes".into()))?;
    bytes.reverse();
    Option::from(Scalar::from_bytes(&bytes))
        .ok_or_else(|| Error::Decode("scalar is not a canonical field element".into()))
}

/// Decode a decimal digit string into a field element
pub fn scalar_from_decimal(s: &str) -> Result<Scalar> {
    if s.is_empty() {
        return Err(Error::Decode("empty decimal string".into()));
    }
    let ten = Scalar::from(10u64);
    let mut acc = Scalar::ZERO;
    for c in s.chars() {
        let digit = c
            .to_digit(10)
            .ok_or_else(|| Error::Decode(format!("invalid decimal digit {c:?}")))?;
        acc = acc * ten + Scalar::from(u64::from(digit));
    }
    Ok(acc)
}

/// Encode a group element as compressed hex
pub fn g2_to_hex(point: &G2Projective) -> String {
    hex::encode(point.to_affine().to_compressed())
}

/// Decode a group element from compressed hex
pub fn g2_from_hex(s: &str) -> Result<G2Projective> {
    let raw = hex::decode(s).map_err(|e| Error::Decode(format!("group element hex: {e}")))?;
    let bytes: [u8; 96] = raw
        .try_into()
        .map_err(|_| Error::Decode("group element hex must encode 96 bytes".into()))?;
    let affine: G2Affine = Option::from(G2Affine::from_compressed(&bytes))
        .ok_or_else(|| Error::Decode("group element is not a valid compressed point".into()))?;
    Ok(G2Projective::from(affine))
}
