// Copyright (c) 2026 The Chip Auth Authors

//! Collaborator interfaces for ledger access, chain queries and credential
//! storage.
//!
//! These are implemented by network clients in applications and by
//! `chip-auth-sim` for testing.

use async_trait::async_trait;

use chip_auth_core::{xdr::ScVal, ChipPublicKey};

use crate::{
    tx::{AccountId, ContractId, SignedTransaction, Transaction, TxHash},
    Error,
};

/// Query result distinguishing a missing entry from a stored value
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    /// Convert to an [Option], discarding the distinction
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

/// Ledger RPC errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RpcError {
    /// Contract rejected the call with an error code
    #[error("contract error {0}")]
    Contract(u32),

    /// Request could not be completed
    #[error("{0}")]
    Transport(String),
}

/// Simulation result for an unsigned transaction
#[derive(Clone, Debug, PartialEq)]
pub struct Simulation {
    /// Resource fee to be added to the base fee
    pub resource_fee: u32,
    /// Value returned by the simulated call
    pub return_value: Option<ScVal>,
}

/// Submission status for a signed transaction
#[derive(Clone, Debug, PartialEq, strum::Display)]
pub enum SendStatus {
    /// Accepted for inclusion
    Pending,
    /// Already submitted
    Duplicate,
    /// Not accepted, resubmit later
    TryAgainLater,
    /// Rejected, with a contract error code where available
    Error(Option<u32>),
}

/// On-chain status for a submitted transaction
#[derive(Clone, Debug, PartialEq, strum::Display)]
pub enum TxStatus {
    /// Not yet visible to the ledger
    NotFound,
    /// Visible but not yet applied
    Pending,
    /// Applied, with the call return value
    Success(Option<ScVal>),
    /// Applied and failed, with a contract error code where available
    Failed(Option<u32>),
}

/// Ledger RPC for simulating, submitting and tracking transactions
#[async_trait]
pub trait LedgerRpc {
    /// Simulate a transaction without submitting it
    async fn simulate(&self, tx: &Transaction) -> Result<Simulation, RpcError>;

    /// Submit a signed transaction
    async fn send(&self, tx: &SignedTransaction) -> Result<SendStatus, RpcError>;

    /// Fetch the status of a submitted transaction
    async fn get_status(&self, hash: &TxHash) -> Result<TxStatus, RpcError>;
}

/// Read-only chain queries against the verifying contract and ledger
#[async_trait]
pub trait ChainQuery {
    /// Fetch the stored nonce for a chip key
    async fn nonce(&self, contract: &ContractId, key: &ChipPublicKey)
        -> Result<Lookup<u32>, RpcError>;

    /// Fetch the token id bound to a chip key
    async fn token_id(
        &self,
        contract: &ContractId,
        key: &ChipPublicKey,
    ) -> Result<Lookup<u64>, RpcError>;

    /// Fetch the current sequence number for an account
    async fn account_sequence(&self, account: &AccountId) -> Result<u64, RpcError>;
}

/// Scoped access to the ed25519 secret key of the submitting account.
///
/// The key is only exposed for the duration of the callback, implementations
/// must zeroize any decrypted copy once the callback returns.
pub trait SecretStore {
    fn with_signing_key<R, F>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&[u8; 32]) -> R;
}
