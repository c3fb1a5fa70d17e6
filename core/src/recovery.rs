// Copyright (c) 2026 The Chip Auth Authors

//! Recovery resolver, finds the recovery id binding a normalised signature and
//! digest to the chip's public key.
//!
//! Candidates are tried in ascending order and the first accepted candidate is
//! returned. [resolve] drives an arbitrary verdict over the candidates,
//! [resolve_cryptographic] instantiates it with local secp256k1 recovery.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::{ChipPublicKey, Digest};

/// Recovery id candidate, in `0..=3`
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecoveryCandidate(u8);

impl RecoveryCandidate {
    /// All candidates in evaluation order
    pub const ALL: [RecoveryCandidate; 4] = [
        RecoveryCandidate(0),
        RecoveryCandidate(1),
        RecoveryCandidate(2),
        RecoveryCandidate(3),
    ];

    /// Create a candidate from a raw value
    pub fn new(v: u8) -> Option<Self> {
        match v {
            0..=3 => Some(Self(v)),
            _ => None,
        }
    }

    /// Fetch the raw candidate value
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for RecoveryCandidate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of evaluating a single candidate
#[derive(Copy, Clone, Debug, PartialEq, strum::Display)]
pub enum Verdict {
    /// Candidate binds the signature to the expected key
    Accept,
    /// Candidate does not match, try the next
    Reject,
}

/// Evaluate candidates in order, returning the first accepted
pub fn resolve<F>(mut verdict: F) -> Result<RecoveryCandidate, RecoveryError>
where
    F: FnMut(RecoveryCandidate) -> Verdict,
{
    for c in RecoveryCandidate::ALL {
        let v = verdict(c);

        #[cfg(feature = "log")]
        log::debug!("recovery candidate {}: {}", c, v);

        if v == Verdict::Accept {
            return Ok(c);
        }
    }

    Err(RecoveryError::NotFound)
}

/// Recover the uncompressed public key for a digest, signature and candidate.
///
/// Returns `None` where the candidate does not yield a valid point.
pub fn recover_key(
    digest: &Digest,
    signature: &[u8; 64],
    candidate: RecoveryCandidate,
) -> Option<ChipPublicKey> {
    let sig = Signature::from_slice(signature).ok()?;
    let id = RecoveryId::from_byte(candidate.value())?;

    let key = VerifyingKey::recover_from_prehash(digest, &sig, id).ok()?;
    let point = key.to_encoded_point(false);

    let mut out = [0u8; 65];
    out.copy_from_slice(point.as_bytes());

    Some(out)
}

/// Resolve the recovery candidate by recovering each candidate key locally
/// and comparing it with the chip public key.
///
/// `signature` must be normalised (low-s) `r ∥ s`.
pub fn resolve_cryptographic(
    digest: &Digest,
    signature: &[u8; 64],
    public_key: &ChipPublicKey,
) -> Result<RecoveryCandidate, RecoveryError> {
    resolve(|c| match recover_key(digest, signature, c) {
        Some(k) if &k == public_key => Verdict::Accept,
        _ => Verdict::Reject,
    })
}

/// Recovery errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum RecoveryError {
    /// No candidate matched
    #[cfg_attr(
        feature = "thiserror",
        error("no recovery id binds the signature to the chip key")
    )]
    NotFound,
}
