//! Core types for the DKG protocol

use bls12_381::Scalar;
use ff::Field;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::backend;
use crate::error::{Error, Result};

/// Scalar evaluation point identifying a committee member.
///
/// Derived from the member's agreed ordinal index, so all committee members
/// arrive at the same assignment without discovery. The zero point is
/// forbidden: evaluating a share polynomial at zero would hand out the
/// sender's master secret.
#[derive(Clone, Copy)]
pub struct PartyId(Scalar);

impl PartyId {
    /// Derive the id for a 0-based member index
    pub fn from_index(index: usize) -> Result<Self> {
        let ordinal = index
            .checked_add(1)
            .ok_or_else(|| Error::Identity("member index overflow".into()))?;
        let scalar = backend::scalar_from_decimal(&ordinal.to_string())
            .map_err(|e| Error::Identity(e.to_string()))?;
        Self::from_scalar(scalar)
    }

    /// Wrap an already-derived evaluation point
    pub fn from_scalar(scalar: Scalar) -> Result<Self> {
        if bool::from(scalar.is_zero()) {
            return Err(Error::Identity("party id must be nonzero".into()));
        }
        Ok(Self(scalar))
    }

    /// Parse from the big-endian hex wire form
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_scalar(backend::scalar_from_hex(s).map_err(|e| Error::Identity(e.to_string()))?)
    }

    /// The ids of an n-member committee, in index order
    pub fn committee(n: usize) -> Result<Vec<PartyId>> {
        (0..n).map(Self::from_index).collect()
    }

    /// The underlying evaluation point
    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    /// Big-endian hex wire form
    pub fn to_hex(&self) -> String {
        backend::scalar_to_hex(&self.0)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartyId({})", self.to_hex())
    }
}

impl PartialEq for PartyId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for PartyId {}

impl Ord for PartyId {
    fn cmp(&self, other: &Self) -> Ordering {
        // to_bytes is little-endian; compare from the most significant end
        let a = self.0.to_bytes();
        let b = other.0.to_bytes();
        a.iter().rev().cmp(b.iter().rev())
    }
}

impl PartialOrd for PartyId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for PartyId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PartyId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PartyId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for scalar fields on wire messages (big-endian hex)
pub(crate) mod scalar_hex {
    use bls12_381::Scalar;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::backend;

    pub fn serialize<S>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&backend::scalar_to_hex(scalar))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Scalar, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        backend::scalar_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Parameters for one DKG epoch
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DkgConfig {
    /// Threshold: shares needed to use the group secret
    pub t: usize,

    /// Committee size
    pub n: usize,

    /// Epoch identifier (magic block number)
    pub magic_block_number: i64,

    /// This member's 0-based index in the committee
    pub member_index: usize,
}

impl DkgConfig {
    /// Validate and build an epoch configuration
    pub fn new(t: usize, n: usize, magic_block_number: i64, member_index: usize) -> Result<Self> {
        if t == 0 {
            return Err(Error::InvalidConfig("threshold must be positive".into()));
        }
        if t > n {
            return Err(Error::InvalidConfig(format!(
                "threshold {t} exceeds committee size {n}"
            )));
        }
        if member_index >= n {
            return Err(Error::InvalidConfig(format!(
                "member index {member_index} out of range for committee size {n}"
            )));
        }
        Ok(Self {
            t,
            n,
            magic_block_number,
            member_index,
        })
    }
}

/// Persisted record of a completed epoch, keyed by magic block number.
///
/// Written once when the instance summarizes; superseded only by the next
/// epoch's record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct DkgSummary {
    /// Epoch identifier, the store key
    pub magic_block_number: i64,

    /// Hex of this member's aggregated share of the group secret
    pub secret_key_group_str: String,

    /// View-change random seed supplied by the orchestrator
    pub random_seed_vc: i64,
}

impl DkgSummary {
    /// Store key
    pub fn key(&self) -> i64 {
        self.magic_block_number
    }

    /// Decode the aggregated share back into scalar form
    pub fn group_secret_share(&self) -> Result<Scalar> {
        backend::scalar_from_hex(&self.secret_key_group_str)
    }
}
