// Copyright (c) 2026 The Chip Auth Authors

//! Error taxonomy for chip and operation failures

use chip_auth_apdu::{ndef::RecordError, status::StatusWord, ApduError};
use chip_auth_core::{
    message::MessageError, recovery::RecoveryError, signature::SignatureError, xdr::XdrError,
};
use num_enum::TryFromPrimitive;
use tokio::time::error::Elapsed;

use crate::{ledger::RpcError, tx::TxHash};

/// Chip authorisation error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Chip returned a non-success status word
    #[error("chip command failed with status {0}")]
    ChipStatus(StatusWord),

    /// Chip did not respond in time
    #[error("timeout waiting for chip response")]
    ChipTimeout,

    /// Chip transport failed
    #[error("chip communication failed: {0}")]
    ChipTransport(String),

    /// APDU encoding or response decoding failed
    #[error("invalid chip command or response: {0}")]
    Apdu(#[from] ApduError),

    /// Stored record could not be encoded or decoded
    #[error("invalid chip record: {0}")]
    Record(#[from] RecordError),

    /// Chip signature could not be parsed
    #[error("invalid chip signature: {0}")]
    Signature(#[from] SignatureError),

    /// No recovery id matched the chip key
    #[error("signature recovery failed: {0}")]
    Recovery(#[from] RecoveryError),

    /// Nonce query failed
    #[error("could not fetch chip nonce: {0}")]
    NonceFetch(RpcError),

    /// Auth message could not be built
    #[error("could not build auth message: {0}")]
    Message(#[from] MessageError),

    /// Transaction could not be assembled
    #[error("could not build transaction: {0}")]
    TransactionBuild(String),

    /// Contract rejected the call
    #[error("contract rejected call: {}", describe_contract_error(.code))]
    ContractRejection {
        code: u32,
        reason: Option<ContractError>,
    },

    /// Network request failed
    #[error("network request failed: {0}")]
    Transport(String),

    /// Transaction was submitted but its outcome is unknown
    #[error("transaction {0} not confirmed, outcome unknown")]
    ConfirmationTimeout(TxHash),

    /// Caller supplied values do not match the chip
    #[error("validation failed: {0}")]
    Validation(String),

    /// Signing credential unavailable
    #[error("signing credential unavailable: {0}")]
    Credential(String),

    /// Transaction failed on chain without a contract error
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
}

impl Error {
    /// Build a contract rejection for the provided code
    pub fn contract(code: u32) -> Self {
        Error::ContractRejection {
            code,
            reason: ContractError::try_from(code).ok(),
        }
    }

    /// Fetch the machine readable kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ChipStatus(_) | Error::ChipTimeout | Error::ChipTransport(_) | Error::Apdu(_) => {
                ErrorKind::ChipCommand
            }
            Error::Record(_) => ErrorKind::RecordDecode,
            Error::Signature(_) => ErrorKind::SignatureParse,
            Error::Recovery(_) => ErrorKind::RecoveryNotFound,
            Error::NonceFetch(_) => ErrorKind::NonceFetch,
            Error::Message(_) => ErrorKind::MessageBuild,
            Error::TransactionBuild(_) => ErrorKind::TransactionBuild,
            Error::ContractRejection { code, .. } => ErrorKind::ContractRejection(*code),
            Error::Transport(_) => ErrorKind::NetworkTransport,
            Error::ConfirmationTimeout(_) => ErrorKind::ConfirmationTimeout,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Credential(_) => ErrorKind::Credential,
            Error::TransactionFailed(_) => ErrorKind::TransactionFailed,
        }
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::ChipTimeout
    }
}

impl From<XdrError> for Error {
    fn from(e: XdrError) -> Self {
        Error::TransactionBuild(e.to_string())
    }
}

/// Map RPC failures outside the nonce path
impl From<RpcError> for Error {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Contract(code) => Error::contract(code),
            RpcError::Transport(e) => Error::Transport(e),
        }
    }
}

/// Stable error kinds
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    ChipCommand,
    RecordDecode,
    SignatureParse,
    RecoveryNotFound,
    NonceFetch,
    MessageBuild,
    TransactionBuild,
    /// Contract rejection with the contract error code
    ContractRejection(u32),
    NetworkTransport,
    ConfirmationTimeout,
    Validation,
    Credential,
    TransactionFailed,
}

/// Error codes reported by the verifying contract
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display, TryFromPrimitive)]
#[repr(u32)]
pub enum ContractError {
    #[strum(serialize = "token does not exist")]
    NonExistentToken = 200,
    #[strum(serialize = "caller does not own the token")]
    IncorrectOwner = 201,
    #[strum(serialize = "insufficient approval")]
    InsufficientApproval = 202,
    #[strum(serialize = "invalid approver")]
    InvalidApprover = 203,
    #[strum(serialize = "invalid live-until ledger")]
    InvalidLiveUntilLedger = 204,
    #[strum(serialize = "arithmetic overflow")]
    MathOverflow = 205,
    #[strum(serialize = "no token ids remaining")]
    TokenIDsAreDepleted = 206,
    #[strum(serialize = "invalid amount")]
    InvalidAmount = 207,
    #[strum(serialize = "token not found in owner list")]
    TokenNotFoundInOwnerList = 208,
    #[strum(serialize = "token not found in global list")]
    TokenNotFoundInGlobalList = 209,
    #[strum(serialize = "token already minted or claimed")]
    TokenAlreadyMinted = 210,
    #[strum(serialize = "base URI too long")]
    BaseUriMaxLenExceeded = 211,
    #[strum(serialize = "invalid royalty amount")]
    InvalidRoyaltyAmount = 212,
    #[strum(serialize = "metadata not set")]
    UnsetMetadata = 213,
    #[strum(serialize = "signature does not match chip key")]
    InvalidSignature = 214,
}

fn describe_contract_error(code: &u32) -> String {
    match ContractError::try_from(*code) {
        Ok(e) => format!("{} (code {})", e, code),
        Err(_) => format!("unknown contract error (code {})", code),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contract_reasons() {
        let e = Error::contract(210);

        assert_eq!(e.kind(), ErrorKind::ContractRejection(210));
        assert!(matches!(
            e,
            Error::ContractRejection {
                reason: Some(ContractError::TokenAlreadyMinted),
                ..
            }
        ));
        assert_eq!(
            e.to_string(),
            "contract rejected call: token already minted or claimed (code 210)"
        );

        let e = Error::contract(999);
        assert!(matches!(e, Error::ContractRejection { reason: None, .. }));
        assert_eq!(
            e.to_string(),
            "contract rejected call: unknown contract error (code 999)"
        );
    }

    #[test]
    fn rpc_mapping() {
        assert_eq!(
            Error::from(RpcError::Contract(214)).kind(),
            ErrorKind::ContractRejection(214)
        );
        assert_eq!(
            Error::from(RpcError::Transport("reset".into())).kind(),
            ErrorKind::NetworkTransport
        );
    }
}
