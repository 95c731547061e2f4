//! Secret polynomials over the scalar field
//!
//! A member's contribution to the group secret is the constant term of a
//! random polynomial f(x) = a_0 + a_1*x + ... + a_{t-1}*x^{t-1}; shares are
//! evaluations of f at other members' party ids.

use bls12_381::Scalar;
use ff::Field;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::types::PartyId;
use crate::vvec::VerificationVector;

/// Degree t-1 polynomial whose constant term is the member's master secret.
///
/// Generated once per DKG instance and immutable afterwards.
#[derive(Clone)]
pub struct Polynomial {
    coefficients: Vec<Scalar>,
}

impl Polynomial {
    /// Draw a fresh polynomial: the master secret plus t-1 random coefficients
    pub fn random<R: RngCore + CryptoRng>(t: usize, rng: &mut R) -> Result<Self> {
        if t == 0 {
            return Err(Error::InvalidConfig("threshold must be positive".into()));
        }
        let mut coefficients = Vec::with_capacity(t);
        for _ in 0..t {
            coefficients.push(Scalar::random(&mut *rng));
        }
        Ok(Self { coefficients })
    }

    /// Threshold this polynomial was drawn for
    pub fn threshold(&self) -> usize {
        self.coefficients.len()
    }

    /// The master secret (constant term)
    pub fn secret(&self) -> &Scalar {
        &self.coefficients[0]
    }

    /// Evaluate at a party's point via Horner's rule
    pub fn evaluate(&self, at: &PartyId) -> Scalar {
        let x = at.scalar();
        let mut acc = Scalar::ZERO;
        for coeff in self.coefficients.iter().rev() {
            acc = acc * x + coeff;
        }
        acc
    }

    /// Feldman commitments to the coefficients
    pub fn commitments(&self) -> VerificationVector {
        VerificationVector::commit(&self.coefficients)
    }
}

impl Zeroize for Polynomial {
    fn zeroize(&mut self) {
        // Scalar offers no Zeroize impl; dropping the coefficient storage is
        // the strongest scrub available here
        self.coefficients.clear();
        self.coefficients.shrink_to_fit();
    }
}

impl Drop for Polynomial {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Reconstruct the secret from threshold shares by Lagrange interpolation
/// at zero.
///
/// Evaluation points must be pairwise distinct; fewer than threshold shares
/// interpolate to an unrelated value, not an error this function can detect.
pub fn combine_shares(shares: &[(PartyId, Scalar)]) -> Result<Scalar> {
    if shares.is_empty() {
        return Err(Error::Evaluation("no shares to combine".into()));
    }

    let mut acc = Scalar::ZERO;
    for (i, (x_i, y_i)) in shares.iter().enumerate() {
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for (j, (x_j, _)) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator *= x_j.scalar();
            denominator *= x_j.scalar() - x_i.scalar();
        }
        let inverted: Scalar = Option::from(denominator.invert()).ok_or_else(|| {
            Error::Evaluation("duplicate evaluation points in share set".into())
        })?;
        acc += y_i * numerator * inverted;
    }
    Ok(acc)
}
