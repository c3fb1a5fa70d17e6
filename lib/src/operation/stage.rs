// Copyright (c) 2026 The Chip Auth Authors

//! Operation stages, in execution order

use crate::error::ErrorKind;

/// Stage of an authorised operation
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum Stage {
    /// Reading the chip public key (and for transfers, checking the token id)
    ReadingChip,
    /// Fetching the stored nonce for the chip key
    FetchingNonce,
    /// Building the auth message and digest
    BuildingMessage,
    /// Requesting a chip signature over the digest
    Signing,
    /// Parsing and low-s normalising the chip signature
    Normalizing,
    /// Resolving the recovery id for the signature
    ResolvingRecovery,
    /// Assembling and simulating the contract call transaction
    BuildingTransaction,
    /// Signing the transaction with the source account
    SigningTransaction,
    /// Submitting the signed transaction
    Submitting,
    /// Polling for the transaction outcome
    Confirming,
    /// Writing the token reference to the chip record
    UpdatingRecord,
    Done,
    Failed(ErrorKind),
}

impl Stage {
    /// Check whether this stage ends an operation
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed(_))
    }
}
