//! Per-epoch DKG instance
//!
//! One [`Dkg`] is created per committee member per epoch and driven through
//! an explicit phase tag; operations called out of order are rejected rather
//! than left to caller discipline. The instance holds no locks and performs
//! no I/O — a node runs it from a single control flow, and the orchestrator
//! owns timeouts and epoch aborts (dropping the instance is the abort).

use bls12_381::{G2Projective, Scalar};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::backend::{self, CryptoBackend};
use crate::error::{Error, Result};
use crate::messages::KeyShareMessage;
use crate::poly::Polynomial;
use crate::types::{DkgConfig, DkgSummary, PartyId};
use crate::vvec::VerificationVector;

/// Progress of a DKG instance through its epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Polynomial and verification vector drawn, nothing exchanged yet
    Constructed,
    /// At least one outgoing share computed
    SharesComputed,
    /// At least one peer share received
    SharesReceived,
    /// Group secret share aggregated
    Aggregated,
    /// Summary emitted; the instance is spent
    Summarized,
}

/// A committee member's DKG state for one epoch
pub struct Dkg {
    config: DkgConfig,
    id: PartyId,
    committee: Vec<PartyId>,
    phase: Phase,
    poly: Polynomial,
    vvec: VerificationVector,
    outgoing: BTreeMap<PartyId, Scalar>,
    received_vvecs: BTreeMap<PartyId, VerificationVector>,
    group_vvec: VerificationVector,
    received_shares: BTreeMap<PartyId, Scalar>,
    group_share: Option<Scalar>,
    random_seed_vc: i64,
}

impl Dkg {
    /// Construct a fresh instance for one epoch.
    ///
    /// Draws the master secret and the full coefficient vector from `rng`;
    /// the verification vector is derived immediately and never changes.
    #[instrument(skip(backend, rng))]
    pub fn new<R: rand_core::RngCore + rand_core::CryptoRng>(
        backend: &CryptoBackend,
        config: DkgConfig,
        rng: &mut R,
    ) -> Result<Self> {
        backend.ensure_initialized();

        let id = PartyId::from_index(config.member_index)?;
        let committee = PartyId::committee(config.n)?;
        let poly = Polynomial::random(config.t, rng)?;
        let vvec = poly.commitments();

        info!(
            t = config.t,
            n = config.n,
            magic_block_number = config.magic_block_number,
            member_index = config.member_index,
            "dkg instance constructed"
        );

        Ok(Self {
            config,
            id,
            committee,
            phase: Phase::Constructed,
            poly,
            vvec,
            outgoing: BTreeMap::new(),
            received_vvecs: BTreeMap::new(),
            group_vvec: VerificationVector::identity(config.t),
            received_shares: BTreeMap::new(),
            group_share: None,
            random_seed_vc: 0,
        })
    }

    /// This member's party id
    pub fn id(&self) -> PartyId {
        self.id
    }

    /// Threshold for this epoch
    pub fn threshold(&self) -> usize {
        self.config.t
    }

    /// Committee size for this epoch
    pub fn members(&self) -> usize {
        self.config.n
    }

    /// Epoch identifier
    pub fn magic_block_number(&self) -> i64 {
        self.config.magic_block_number
    }

    /// Current phase tag
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// This member's published verification vector
    pub fn vvec(&self) -> &VerificationVector {
        &self.vvec
    }

    /// The verification vector in transport form
    pub fn vvec_hex(&self) -> Vec<String> {
        self.vvec.to_hex()
    }

    /// This member's public-key contribution to the group key
    pub fn public_contribution(&self) -> G2Projective {
        self.vvec.public_key()
    }

    /// Evaluate the local polynomial at `recipient` and record the share.
    ///
    /// Recomputing for the same recipient overwrites with the same value;
    /// the polynomial is fixed for the life of the instance.
    pub fn compute_share_for(&mut self, recipient: &PartyId) -> Result<Scalar> {
        self.require_phase(
            "share computation",
            &[Phase::Constructed, Phase::SharesComputed],
        )?;
        let share = self.poly.evaluate(recipient);
        self.outgoing.insert(*recipient, share);
        self.phase = Phase::SharesComputed;
        debug!(recipient = %recipient, "outgoing share computed");
        Ok(share)
    }

    /// Fetch the share previously computed for `recipient`, with its public
    /// image, ready for transport.
    pub fn share_for(&self, recipient: &PartyId) -> Result<KeyShareMessage> {
        let share = self
            .outgoing
            .get(recipient)
            .copied()
            .ok_or(Error::ShareNotFound {
                recipient: *recipient,
            })?;
        Ok(KeyShareMessage {
            recipient: *recipient,
            share,
            public_image: Some(backend::g2_to_hex(&(G2Projective::generator() * share))),
        })
    }

    /// Record a committee member's published verification vector and fold it
    /// into the group vector.
    pub fn receive_vvec(&mut self, sender: PartyId, vvec: VerificationVector) -> Result<()> {
        self.require_phase(
            "verification vector receipt",
            &[
                Phase::Constructed,
                Phase::SharesComputed,
                Phase::SharesReceived,
            ],
        )?;
        if !self.committee.contains(&sender) {
            return Err(Error::UnknownSender { sender });
        }
        if vvec.len() != self.config.t {
            return Err(Error::Decode(format!(
                "verification vector length {}, expected {}",
                vvec.len(),
                self.config.t
            )));
        }
        if self.received_vvecs.contains_key(&sender) {
            return Err(Error::DuplicateContribution { sender });
        }
        self.group_vvec.accumulate(&vvec);
        self.received_vvecs.insert(sender, vvec);
        debug!(sender = %sender, collected = self.received_vvecs.len(), "verification vector recorded");
        Ok(())
    }

    /// Buffer a share sent to this member, one per committee member.
    ///
    /// Verification is a separate call: the orchestrator chooses whether to
    /// check before or after buffering, and what to do with the sender on a
    /// mismatch.
    pub fn receive_share(&mut self, sender: PartyId, share: Scalar) -> Result<()> {
        self.require_phase(
            "share receipt",
            &[Phase::SharesComputed, Phase::SharesReceived],
        )?;
        if !self.committee.contains(&sender) {
            return Err(Error::UnknownSender { sender });
        }
        if self.received_shares.contains_key(&sender) {
            return Err(Error::DuplicateContribution { sender });
        }
        self.received_shares.insert(sender, share);
        self.phase = Phase::SharesReceived;
        debug!(sender = %sender, collected = self.received_shares.len(), "share received");
        Ok(())
    }

    /// Feldman check: the sender's committed polynomial, evaluated at this
    /// member's point, must equal the public image of the received share.
    ///
    /// A mismatch is security-relevant and always returned as an error for
    /// the orchestrator to act on; exclusion policy is not decided here.
    pub fn verify_share(&self, sender: &PartyId, share: &Scalar) -> Result<()> {
        let vvec = self
            .received_vvecs
            .get(sender)
            .ok_or(Error::UnknownSender { sender: *sender })?;
        let expected = vvec.evaluate(&self.id);
        let actual = G2Projective::generator() * share;
        if expected != actual {
            warn!(sender = %sender, "share failed verification against sender's commitments");
            return Err(Error::VerificationFailed { sender: *sender });
        }
        Ok(())
    }

    /// Sum the received shares into this member's share of the group secret.
    ///
    /// Requires every committee member's share to be present: summing a
    /// partial buffer would silently produce a share of the wrong secret.
    pub fn aggregate(&mut self) -> Result<()> {
        self.require_phase("aggregation", &[Phase::SharesReceived])?;
        if self.received_shares.len() != self.config.n {
            return Err(Error::IncompleteAggregation {
                expected: self.config.n,
                got: self.received_shares.len(),
            });
        }
        let aggregated: Scalar = self.received_shares.values().sum();
        self.group_share = Some(aggregated);
        self.phase = Phase::Aggregated;
        info!(
            magic_block_number = self.config.magic_block_number,
            "group secret share aggregated"
        );
        Ok(())
    }

    /// This member's aggregated share of the group secret
    pub fn aggregated_share(&self) -> Result<Scalar> {
        self.require_phase(
            "aggregated share access",
            &[Phase::Aggregated, Phase::Summarized],
        )?;
        Ok(self.group_share.expect("aggregated phase implies a share"))
    }

    /// The combined verification vector, complete only once every committee
    /// member's vector has been folded in.
    pub fn group_vvec(&self) -> Result<&VerificationVector> {
        if self.received_vvecs.len() != self.config.n {
            return Err(Error::IncompleteAggregation {
                expected: self.config.n,
                got: self.received_vvecs.len(),
            });
        }
        Ok(&self.group_vvec)
    }

    /// The committee's group public key
    pub fn group_public_key(&self) -> Result<G2Projective> {
        Ok(self.group_vvec()?.public_key())
    }

    /// Record the view-change random seed for the epoch summary
    pub fn set_random_seed_vc(&mut self, seed: i64) -> Result<()> {
        if self.phase == Phase::Summarized {
            return Err(Error::OutOfPhase {
                operation: "seed update",
                actual: self.phase,
            });
        }
        self.random_seed_vc = seed;
        Ok(())
    }

    /// Emit the epoch's persistable record and spend the instance.
    ///
    /// Valid exactly once, after aggregation.
    pub fn summarize(&mut self) -> Result<DkgSummary> {
        self.require_phase("summary production", &[Phase::Aggregated])?;
        let share = self.group_share.expect("aggregated phase implies a share");
        let summary = DkgSummary {
            magic_block_number: self.config.magic_block_number,
            secret_key_group_str: backend::scalar_to_hex(&share),
            random_seed_vc: self.random_seed_vc,
        };
        self.phase = Phase::Summarized;
        info!(
            magic_block_number = summary.magic_block_number,
            "epoch summary produced"
        );
        Ok(summary)
    }

    fn require_phase(&self, operation: &'static str, allowed: &[Phase]) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(Error::OutOfPhase {
                operation,
                actual: self.phase,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::combine_shares;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn build_committee(t: usize, n: usize, epoch: i64, seed: u64) -> Vec<Dkg> {
        let backend = CryptoBackend::new();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let config = DkgConfig::new(t, n, epoch, i).unwrap();
                Dkg::new(&backend, config, &mut rng).unwrap()
            })
            .collect()
    }

    /// Run a full epoch: vvec broadcast, pairwise share exchange with
    /// verification, aggregation.
    fn run_epoch(t: usize, n: usize, epoch: i64, seed: u64) -> Vec<Dkg> {
        let mut members = build_committee(t, n, epoch, seed);
        let ids: Vec<PartyId> = members.iter().map(|m| m.id()).collect();

        let vvecs: Vec<(PartyId, VerificationVector)> = members
            .iter()
            .map(|m| (m.id(), m.vvec().clone()))
            .collect();
        for member in members.iter_mut() {
            for (sender, vvec) in &vvecs {
                member.receive_vvec(*sender, vvec.clone()).unwrap();
            }
        }

        for member in members.iter_mut() {
            for id in &ids {
                member.compute_share_for(id).unwrap();
            }
        }

        for recipient in 0..n {
            let recipient_id = ids[recipient];
            let inbound: Vec<(PartyId, Scalar)> = members
                .iter()
                .map(|sender| (sender.id(), sender.share_for(&recipient_id).unwrap().share))
                .collect();
            for (sender, share) in inbound {
                members[recipient].verify_share(&sender, &share).unwrap();
                members[recipient].receive_share(sender, share).unwrap();
            }
        }

        for member in members.iter_mut() {
            member.aggregate().unwrap();
        }
        members
    }

    #[test]
    fn test_full_epoch_three_of_five() {
        let mut members = run_epoch(3, 5, 42, 7);

        let group_key = members[0].group_public_key().unwrap();
        for member in &members {
            assert_eq!(member.group_public_key().unwrap(), group_key);
        }

        // any threshold subset of aggregated shares reconstructs the same
        // group secret, whose public image is the combined vector's head
        let shares: Vec<(PartyId, Scalar)> = members
            .iter()
            .map(|m| (m.id(), m.aggregated_share().unwrap()))
            .collect();
        let first = combine_shares(&shares[..3]).unwrap();
        let last = combine_shares(&shares[2..]).unwrap();
        let spread = combine_shares(&[shares[0], shares[2], shares[4]]).unwrap();
        assert_eq!(first, last);
        assert_eq!(first, spread);
        assert_eq!(G2Projective::generator() * first, group_key);

        for member in members.iter_mut() {
            member.set_random_seed_vc(991).unwrap();
            let summary = member.summarize().unwrap();
            assert_eq!(summary.magic_block_number, 42);
            assert_eq!(summary.random_seed_vc, 991);
            assert_eq!(
                summary.group_secret_share().unwrap(),
                member.aggregated_share().unwrap()
            );
            assert_eq!(member.phase(), Phase::Summarized);
            // the record is produced exactly once
            assert!(matches!(
                member.summarize(),
                Err(Error::OutOfPhase { .. })
            ));
        }
    }

    #[test]
    fn test_tampered_share_fails_only_its_sender() {
        let mut members = build_committee(2, 3, 9, 13);
        let ids: Vec<PartyId> = members.iter().map(|m| m.id()).collect();

        let vvecs: Vec<(PartyId, VerificationVector)> = members
            .iter()
            .map(|m| (m.id(), m.vvec().clone()))
            .collect();
        for member in members.iter_mut() {
            for (sender, vvec) in &vvecs {
                member.receive_vvec(*sender, vvec.clone()).unwrap();
            }
            let own = member.id();
            member.compute_share_for(&own).unwrap();
        }

        let recipient = ids[2];
        let mut inbound: Vec<(PartyId, Scalar)> = members
            .iter()
            .map(|sender| (sender.id(), sender.poly.evaluate(&recipient)))
            .collect();

        // flip one bit of the first sender's share in transit
        let mut bytes = inbound[0].1.to_bytes();
        bytes[0] ^= 1;
        inbound[0].1 = Option::from(Scalar::from_bytes(&bytes))
            .expect("tampered scalar still canonical");

        let receiver = &members[2];
        assert!(matches!(
            receiver.verify_share(&inbound[0].0, &inbound[0].1),
            Err(Error::VerificationFailed { .. })
        ));
        for (sender, share) in &inbound[1..] {
            receiver.verify_share(sender, share).unwrap();
        }
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let mut rng = ChaCha20Rng::seed_from_u64(29);
        let backend = CryptoBackend::new();
        let ids = PartyId::committee(5).unwrap();
        let shares: Vec<Scalar> = (0..5).map(|_| <Scalar as ff::Field>::random(&mut rng)).collect();

        let mut aggregated = Vec::new();
        for order in [[0usize, 1, 2, 3, 4], [4, 2, 0, 3, 1]] {
            let config = DkgConfig::new(3, 5, 1, 0).unwrap();
            let mut dkg = Dkg::new(&backend, config, &mut rng).unwrap();
            let own = dkg.id();
            dkg.compute_share_for(&own).unwrap();
            for &i in &order {
                dkg.receive_share(ids[i], shares[i]).unwrap();
            }
            dkg.aggregate().unwrap();
            aggregated.push(dkg.aggregated_share().unwrap());
        }
        assert_eq!(aggregated[0], aggregated[1]);
    }

    #[test]
    fn test_share_recomputation_is_idempotent() {
        let mut members = build_committee(3, 4, 2, 17);
        let target = members[1].id();
        let first = members[0].compute_share_for(&target).unwrap();
        let second = members[0].compute_share_for(&target).unwrap();
        assert_eq!(first, second);
        assert_eq!(members[0].share_for(&target).unwrap().share, first);
    }

    #[test]
    fn test_share_not_found_is_recoverable() {
        let mut members = build_committee(2, 3, 3, 19);
        let target = members[1].id();
        assert!(matches!(
            members[0].share_for(&target),
            Err(Error::ShareNotFound { .. })
        ));
        members[0].compute_share_for(&target).unwrap();
        assert!(members[0].share_for(&target).is_ok());
    }

    #[test]
    fn test_out_of_phase_calls_are_rejected() {
        let mut members = build_committee(2, 3, 4, 23);
        let own = members[0].id();

        // nothing received yet
        assert!(matches!(
            members[0].aggregate(),
            Err(Error::OutOfPhase { .. })
        ));
        assert!(matches!(
            members[0].summarize(),
            Err(Error::OutOfPhase { .. })
        ));
        // shares cannot arrive before this member computed its own
        assert!(matches!(
            members[0].receive_share(own, Scalar::from(3u64)),
            Err(Error::OutOfPhase { .. })
        ));
    }

    #[test]
    fn test_incomplete_aggregation_is_an_error() {
        let mut members = build_committee(2, 3, 5, 37);
        let ids: Vec<PartyId> = members.iter().map(|m| m.id()).collect();
        let own = members[0].id();
        members[0].compute_share_for(&own).unwrap();
        members[0].receive_share(ids[0], Scalar::from(1u64)).unwrap();
        members[0].receive_share(ids[1], Scalar::from(2u64)).unwrap();

        match members[0].aggregate() {
            Err(Error::IncompleteAggregation { expected, got }) => {
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
            }
            other => panic!("expected incomplete aggregation, got {other:?}"),
        }

        // the guard also protects the group key
        assert!(matches!(
            members[0].group_public_key(),
            Err(Error::IncompleteAggregation { .. })
        ));
    }

    #[test]
    fn test_duplicate_and_unknown_contributions_are_rejected() {
        let mut members = build_committee(2, 3, 6, 41);
        let ids: Vec<PartyId> = members.iter().map(|m| m.id()).collect();
        let outsider = PartyId::from_index(7).unwrap();

        let vvec = members[1].vvec().clone();
        members[0].receive_vvec(ids[1], vvec.clone()).unwrap();
        assert!(matches!(
            members[0].receive_vvec(ids[1], vvec),
            Err(Error::DuplicateContribution { .. })
        ));
        let vvec2 = members[2].vvec().clone();
        assert!(matches!(
            members[0].receive_vvec(outsider, vvec2),
            Err(Error::UnknownSender { .. })
        ));

        let own = members[0].id();
        members[0].compute_share_for(&own).unwrap();
        members[0].receive_share(ids[1], Scalar::from(8u64)).unwrap();
        assert!(matches!(
            members[0].receive_share(ids[1], Scalar::from(8u64)),
            Err(Error::DuplicateContribution { .. })
        ));
        assert!(matches!(
            members[0].receive_share(outsider, Scalar::from(8u64)),
            Err(Error::UnknownSender { .. })
        ));

        // verifying against a sender with no recorded vector
        assert!(matches!(
            members[0].verify_share(&ids[2], &Scalar::from(8u64)),
            Err(Error::UnknownSender { .. })
        ));
    }

    #[test]
    fn test_vvec_length_mismatch_is_rejected() {
        let mut members = build_committee(3, 4, 8, 43);
        let short = build_committee(2, 4, 8, 44);
        let sender = short[1].id();
        assert!(matches!(
            members[0].receive_vvec(sender, short[1].vvec().clone()),
            Err(Error::Decode(_))
        ));
    }
}
