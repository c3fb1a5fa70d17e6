// Copyright (c) 2026 The Chip Auth Authors

//! Auth message builder, produces the message passed to the contract and the
//! digest signed by the chip.
//!
//! ```text
//! message = SHA256(network passphrase) ∥ CONTRACT_ID (32) ∥ FUNCTION ∥ XDR(args)...
//! digest  = SHA256(message ∥ XDR(U32(nonce)))
//! ```
//!
//! The nonce is excluded from the message so the verifier can check it against
//! its stored value before appending it to compute the digest.

use alloc::vec::Vec;

use encdec::Encode;
use sha2::{Digest as _, Sha256};

use crate::{
    xdr::{ScVal, XdrError, SCV_U32},
    Digest,
};

/// Auth message and the digest to be signed
#[derive(Clone, Debug, PartialEq)]
pub struct AuthMessage {
    /// Message bytes, passed to the contract
    pub message: Vec<u8>,
    /// Digest over the message and nonce, signed by the chip
    pub digest: Digest,
    /// Nonce included in the digest
    pub nonce: u32,
}

/// Compute the network id for a network passphrase
pub fn network_id(passphrase: &str) -> Digest {
    Sha256::digest(passphrase.as_bytes()).into()
}

/// Encode a nonce as the verifier does (`U32` value)
pub fn nonce_xdr(nonce: u32) -> [u8; 8] {
    let mut b = [0u8; 8];
    b[..4].copy_from_slice(&SCV_U32.to_be_bytes());
    b[4..].copy_from_slice(&nonce.to_be_bytes());
    b
}

/// Compute the digest for a message and nonce
pub fn message_digest(message: &[u8], nonce: u32) -> Digest {
    let mut h = Sha256::new();
    h.update(message);
    h.update(nonce_xdr(nonce));
    h.finalize().into()
}

/// Build the auth message and digest for a contract call.
///
/// `nonce` is the value to be submitted, callers fetch the stored nonce and
/// pass `stored + 1`.
pub fn build(
    contract_id: &[u8; 32],
    function: &str,
    args: &[ScVal],
    nonce: u32,
    network_passphrase: &str,
) -> Result<AuthMessage, MessageError> {
    if function.is_empty() {
        return Err(MessageError::EmptyFunction);
    }

    let mut args_len = 0;
    for a in args {
        args_len += a.encode_len()?;
    }

    let mut message = Vec::with_capacity(32 + 32 + function.len() + args_len);
    message.extend_from_slice(&network_id(network_passphrase));
    message.extend_from_slice(contract_id);
    message.extend_from_slice(function.as_bytes());

    let mut index = message.len();
    message.resize(index + args_len, 0);
    for a in args {
        index += a.encode(&mut message[index..])?;
    }

    let digest = message_digest(&message, nonce);

    #[cfg(feature = "log")]
    log::debug!("built {} byte auth message for '{}' (nonce: {})", message.len(), function, nonce);

    Ok(AuthMessage {
        message,
        digest,
        nonce,
    })
}

/// Auth message errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum MessageError {
    /// Function name must not be empty
    #[cfg_attr(feature = "thiserror", error("empty function name"))]
    EmptyFunction,

    /// Argument encoding failed
    #[cfg_attr(feature = "thiserror", error("argument encoding failed: {0}"))]
    Encoding(XdrError),
}

impl From<XdrError> for MessageError {
    fn from(e: XdrError) -> Self {
        MessageError::Encoding(e)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::xdr::{to_xdr, ScAddress};

    #[test]
    fn digest_vector() {
        // Message and hash signed by a physical chip for contract testing
        let d = message_digest(b"test message for minting", 0);

        assert_eq!(
            hex::encode(d),
            "53d79d1d1cdcb175a480d34dddf359d3bf9f441d35d5e86b8a3ea78afba9491b"
        );
    }

    #[test]
    fn nonce_encoding() {
        assert_eq!(nonce_xdr(0x0102_0304), [0, 0, 0, 3, 1, 2, 3, 4]);
    }

    #[test]
    fn message_layout() {
        let contract = [0x42u8; 32];
        let claimant = ScAddress::Account([0x07; 32]);
        let passphrase = "Test SDF Network ; September 2015";

        let m = build(&contract, "claim", &[claimant.into()], 5, passphrase).unwrap();

        let claimant_xdr = to_xdr(&ScVal::from(claimant)).unwrap();

        assert_eq!(m.message.len(), 32 + 32 + 5 + claimant_xdr.len());
        assert_eq!(&m.message[..32], &network_id(passphrase));
        assert_eq!(&m.message[32..64], &contract);
        assert_eq!(&m.message[64..69], b"claim");
        assert_eq!(&m.message[69..], &claimant_xdr[..]);

        assert_eq!(m.nonce, 5);
        assert_eq!(m.digest, message_digest(&m.message, 5));
    }

    #[test]
    fn message_without_args() {
        let m = build(&[0u8; 32], "mint", &[], 1, "net").unwrap();

        assert_eq!(m.message.len(), 32 + 32 + 4);
        assert_eq!(&m.message[64..], b"mint");
    }

    #[test]
    fn transfer_args_in_order() {
        let from = ScAddress::Account([0x01; 32]);
        let to = ScAddress::Account([0x02; 32]);
        let args = [from.into(), to.into(), ScVal::U64(9)];

        let m = build(&[0u8; 32], "transfer", &args, 3, "net").unwrap();

        let mut expected = Vec::new();
        for a in &args {
            expected.extend_from_slice(&to_xdr(a).unwrap());
        }
        assert_eq!(&m.message[64 + 8..], &expected[..]);
    }

    #[test]
    fn nonce_changes_digest_only() {
        let a = build(&[0u8; 32], "mint", &[], 1, "net").unwrap();
        let b = build(&[0u8; 32], "mint", &[], 2, "net").unwrap();

        assert_eq!(a.message, b.message);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn empty_function() {
        assert_eq!(
            build(&[0u8; 32], "", &[], 1, "net"),
            Err(MessageError::EmptyFunction)
        );
    }
}
