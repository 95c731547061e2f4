//! Wire payloads exchanged between committee members
//!
//! Framing, routing and encryption are transport concerns; these types only
//! fix the logical payload and its hex encoding.

use bls12_381::{G2Projective, Scalar};
use serde::{Deserialize, Serialize};

use crate::backend;
use crate::error::Result;
use crate::types::{scalar_hex, PartyId};
use crate::vvec::VerificationVector;

/// A secret share routed from one member to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyShareMessage {
    /// Recipient's party id
    pub recipient: PartyId,
    /// The sender's polynomial evaluated at the recipient's point
    #[serde(with = "scalar_hex")]
    pub share: Scalar,
    /// Public image of the share (g2*share), if the sender published one
    pub public_image: Option<String>,
}

impl KeyShareMessage {
    /// Decode the public image back into group-element form
    pub fn public_image_point(&self) -> Result<Option<G2Projective>> {
        self.public_image
            .as_deref()
            .map(backend::g2_from_hex)
            .transpose()
    }
}

/// A member's published verification vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VvecMessage {
    /// Publishing member
    pub sender: PartyId,
    /// Commitments as compressed hex, constant term first
    pub vvec: Vec<String>,
}

impl VvecMessage {
    /// Wrap a vector for transport
    pub fn new(sender: PartyId, vvec: &VerificationVector) -> Self {
        Self {
            sender,
            vvec: vvec.to_hex(),
        }
    }

    /// Rebuild the group-element form
    pub fn decode(&self) -> Result<VerificationVector> {
        VerificationVector::from_hex(&self.vvec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::Polynomial;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_share_message_serde_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let poly = Polynomial::random(2, &mut rng).unwrap();
        let recipient = PartyId::from_index(1).unwrap();
        let share = poly.evaluate(&recipient);

        let msg = KeyShareMessage {
            recipient,
            share,
            public_image: Some(backend::g2_to_hex(
                &(G2Projective::generator() * share),
            )),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: KeyShareMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(back.recipient, msg.recipient);
        assert_eq!(back.share, msg.share);
        assert_eq!(
            back.public_image_point().unwrap(),
            Some(G2Projective::generator() * share)
        );
    }

    #[test]
    fn test_share_message_without_image() {
        let msg = KeyShareMessage {
            recipient: PartyId::from_index(0).unwrap(),
            share: Scalar::from(77u64),
            public_image: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: KeyShareMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.public_image_point().unwrap(), None);
    }

    #[test]
    fn test_vvec_message_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let vvec = Polynomial::random(3, &mut rng).unwrap().commitments();
        let msg = VvecMessage::new(PartyId::from_index(2).unwrap(), &vvec);

        let json = serde_json::to_string(&msg).unwrap();
        let back: VvecMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.decode().unwrap(), vvec);
    }
}
