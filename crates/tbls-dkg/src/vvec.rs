//! Feldman verification vectors
//!
//! The public image of a secret polynomial: one commitment g2*a_k per
//! coefficient. Element 0 is the member's public-key contribution.
//! Committee-wide, the element-wise sum of all members' vectors commits to
//! the sum polynomial, and its element 0 is the group public key.

use bls12_381::{G2Projective, Scalar};
use ff::Field;

use crate::backend;
use crate::error::{Error, Result};
use crate::types::PartyId;

/// Ordered Feldman commitments to a polynomial's coefficients
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationVector {
    elements: Vec<G2Projective>,
}

impl VerificationVector {
    /// Commit to a coefficient vector
    pub(crate) fn commit(coefficients: &[Scalar]) -> Self {
        Self {
            elements: coefficients
                .iter()
                .map(|coeff| G2Projective::generator() * coeff)
                .collect(),
        }
    }

    /// The all-identity vector, the accumulation starting point
    pub fn identity(t: usize) -> Self {
        Self {
            elements: vec![G2Projective::identity(); t],
        }
    }

    /// Number of committed coefficients (the threshold)
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True for a zero-length vector
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The member's public-key contribution (commitment to the constant term)
    pub fn public_key(&self) -> G2Projective {
        self.elements[0]
    }

    /// Evaluate the committed polynomial at a party's point.
    ///
    /// Returns g2*f(x): the public image every share sent to that party must
    /// match.
    pub fn evaluate(&self, at: &PartyId) -> G2Projective {
        let x = at.scalar();
        let mut acc = G2Projective::identity();
        let mut x_power = Scalar::ONE;
        for element in &self.elements {
            acc += element * x_power;
            x_power *= x;
        }
        acc
    }

    /// Fold another member's vector in, element-wise.
    ///
    /// Caller guarantees matching lengths; the DKG instance checks this on
    /// receipt.
    pub fn accumulate(&mut self, other: &VerificationVector) {
        for (mine, theirs) in self.elements.iter_mut().zip(&other.elements) {
            *mine += theirs;
        }
    }

    /// Hex strings for transport
    pub fn to_hex(&self) -> Vec<String> {
        self.elements.iter().map(backend::g2_to_hex).collect()
    }

    /// Rebuild from transported hex strings
    pub fn from_hex(strings: &[String]) -> Result<Self> {
        if strings.is_empty() {
            return Err(Error::Decode("empty verification vector".into()));
        }
        let elements = strings
            .iter()
            .map(|s| backend::g2_from_hex(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { elements })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::Polynomial;
    use rand::rngs::OsRng;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_hex_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let vvec = Polynomial::random(4, &mut rng).unwrap().commitments();
        let strings = vvec.to_hex();
        assert_eq!(strings.len(), 4);
        assert_eq!(VerificationVector::from_hex(&strings).unwrap(), vvec);
    }

    #[test]
    fn test_from_hex_rejects_empty_and_garbage() {
        assert!(VerificationVector::from_hex(&[]).is_err());
        assert!(VerificationVector::from_hex(&["beef".into()]).is_err());
    }

    #[test]
    fn test_evaluate_matches_share_image() {
        let mut rng = OsRng;
        let poly = Polynomial::random(3, &mut rng).unwrap();
        let vvec = poly.commitments();
        for index in 0..5 {
            let id = PartyId::from_index(index).unwrap();
            let share = poly.evaluate(&id);
            assert_eq!(vvec.evaluate(&id), G2Projective::generator() * share);
        }
    }

    #[test]
    fn test_accumulation_commits_to_summed_secrets() {
        let mut rng = OsRng;
        let polys: Vec<Polynomial> = (0..4)
            .map(|_| Polynomial::random(2, &mut rng).unwrap())
            .collect();

        let mut group = VerificationVector::identity(2);
        for poly in &polys {
            group.accumulate(&poly.commitments());
        }

        let secret_sum: Scalar = polys.iter().map(|p| *p.secret()).sum();
        assert_eq!(group.public_key(), G2Projective::generator() * secret_sum);
    }
}
