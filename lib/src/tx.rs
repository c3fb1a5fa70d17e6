// Copyright (c) 2026 The Chip Auth Authors

//! Transaction model for single contract invocations
//!
//! Transactions are encoded in XDR and hashed together with the network id,
//! the resulting [TxHash] is signed by the submitting account and used to
//! track the transaction once submitted.

use byteorder::{BigEndian, ByteOrder};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use encdec::Encode;
use sha2::{Digest as _, Sha256};

use chip_auth_core::{
    message::network_id,
    xdr::{encode_opaque, opaque_len, ScAddress, ScVal, XdrError},
};

/// Contract hash
pub type ContractId = [u8; 32];

/// ed25519 account public key
pub type AccountId = [u8; 32];

/// Envelope type for transaction signatures
pub const ENVELOPE_TYPE_TX: u32 = 2;

/// Operation type for contract invocation
pub const OP_INVOKE_HOST_FUNCTION: u32 = 24;

/// Host function type for contract invocation
pub const HOST_FUNCTION_INVOKE_CONTRACT: u32 = 0;

/// Transaction hash
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

/// Contract invocation
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub contract: ContractId,
    pub function: String,
    pub args: Vec<ScVal>,
}

/// Transaction containing a single contract invocation
///
/// ## Encoding:
/// ```text
/// SOURCE (ed25519 account) ∥ FEE (u32) ∥ SEQ (u64) ∥ COND (none) ∥ MEMO (none)
/// ∥ OPS (1) ∥ INVOKE_HOST_FUNCTION(CONTRACT, FUNCTION, ARGS, AUTH (empty))
/// ∥ EXT (0 | 1 ∥ RESOURCE_FEE (u64))
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub source: AccountId,
    pub fee: u32,
    pub sequence: u64,
    pub invocation: Invocation,
    /// Resource fee from simulation, once known
    pub resource_fee: Option<u32>,
}

impl Transaction {
    /// Compute the hash signed by the source account
    pub fn hash(&self, network_passphrase: &str) -> Result<TxHash, XdrError> {
        let mut buff = vec![0u8; self.encode_len()?];
        let n = self.encode(&mut buff)?;

        let mut h = Sha256::new();
        h.update(network_id(network_passphrase));
        h.update(ENVELOPE_TYPE_TX.to_be_bytes());
        h.update(&buff[..n]);

        Ok(TxHash(h.finalize().into()))
    }

    /// Sign the transaction with the source account key
    pub fn sign(
        self,
        network_passphrase: &str,
        key: &SigningKey,
    ) -> Result<SignedTransaction, XdrError> {
        let hash = self.hash(network_passphrase)?;
        let signature = key.sign(&hash.0);

        Ok(SignedTransaction {
            hint: signature_hint(&key.verifying_key().to_bytes()),
            signature: signature.to_bytes(),
            hash,
            tx: self,
        })
    }
}

impl Encode for Transaction {
    type Error = XdrError;

    fn encode_len(&self) -> Result<usize, XdrError> {
        let mut n = 4 + 32 + 4 + 8 + 4 + 4 + 4;

        // Operation header
        n += 4 + 4 + 4;
        n += ScAddress::Contract(self.invocation.contract).encode_len()?;
        n += opaque_len(self.invocation.function.len())?;
        n += 4;
        for a in &self.invocation.args {
            n += a.encode_len()?;
        }
        n += 4;

        // Extension
        n += 4 + self.resource_fee.map_or(0, |_| 8);

        Ok(n)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, XdrError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(XdrError::BufferLength);
        }

        let mut index = 0;

        // Source account
        put_u32(buff, &mut index, 0);
        buff[index..][..32].copy_from_slice(&self.source);
        index += 32;

        put_u32(buff, &mut index, self.fee);
        BigEndian::write_u64(&mut buff[index..], self.sequence);
        index += 8;

        // No preconditions or memo, single operation
        put_u32(buff, &mut index, 0);
        put_u32(buff, &mut index, 0);
        put_u32(buff, &mut index, 1);

        // Operation without source, invoking a contract
        put_u32(buff, &mut index, 0);
        put_u32(buff, &mut index, OP_INVOKE_HOST_FUNCTION);
        put_u32(buff, &mut index, HOST_FUNCTION_INVOKE_CONTRACT);
        index += ScAddress::Contract(self.invocation.contract).encode(&mut buff[index..])?;
        index += encode_opaque(self.invocation.function.as_bytes(), &mut buff[index..])?;

        put_u32(buff, &mut index, self.invocation.args.len() as u32);
        for a in &self.invocation.args {
            index += a.encode(&mut buff[index..])?;
        }

        // Authorisation is carried in the call arguments
        put_u32(buff, &mut index, 0);

        match self.resource_fee {
            Some(f) => {
                put_u32(buff, &mut index, 1);
                BigEndian::write_u64(&mut buff[index..], f as u64);
                index += 8;
            }
            None => put_u32(buff, &mut index, 0),
        }

        Ok(index)
    }
}

/// Signed transaction ready for submission
#[derive(Clone, Debug, PartialEq)]
pub struct SignedTransaction {
    pub tx: Transaction,
    /// Last four bytes of the signing public key
    pub hint: [u8; 4],
    pub signature: [u8; 64],
    /// Hash computed prior to signing
    pub hash: TxHash,
}

impl SignedTransaction {
    /// Verify the signature against the transaction source account
    pub fn verify(&self, network_passphrase: &str) -> bool {
        let key = match VerifyingKey::from_bytes(&self.tx.source) {
            Ok(k) => k,
            Err(_) => return false,
        };

        match self.tx.hash(network_passphrase) {
            Ok(h) if h == self.hash => (),
            _ => return false,
        }

        key.verify(&self.hash.0, &Signature::from_bytes(&self.signature))
            .is_ok()
    }
}

fn put_u32(buff: &mut [u8], index: &mut usize, v: u32) {
    BigEndian::write_u32(&mut buff[*index..], v);
    *index += 4;
}

/// Signature hint for a public key
pub fn signature_hint(public_key: &[u8; 32]) -> [u8; 4] {
    let mut h = [0u8; 4];
    h.copy_from_slice(&public_key[28..]);
    h
}
