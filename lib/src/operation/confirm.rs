// Copyright (c) 2026 The Chip Auth Authors

//! Confirmation polling for submitted transactions

use log::{debug, warn};

use chip_auth_core::xdr::ScVal;

use crate::{
    config::ConfirmPolicy,
    ledger::{LedgerRpc, RpcError, TxStatus},
    tx::TxHash,
    Error,
};

/// Poll for the outcome of a submitted transaction, returning the call return
/// value on success.
///
/// Waits `initial_delay` before the first poll and `interval` between polls.
/// Transport errors count as attempts. Exhausting `max_attempts` without an
/// outcome is a [Error::ConfirmationTimeout].
pub async fn await_confirmation<L: LedgerRpc + ?Sized>(
    ledger: &L,
    hash: &TxHash,
    policy: &ConfirmPolicy,
) -> Result<Option<ScVal>, Error> {
    tokio::time::sleep(policy.initial_delay()).await;

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.interval()).await;
        }

        match ledger.get_status(hash).await {
            Ok(TxStatus::Success(v)) => {
                debug!("Transaction {} confirmed (attempt {})", hash, attempt);
                return Ok(v);
            }
            Ok(TxStatus::Failed(Some(code))) => return Err(Error::contract(code)),
            Ok(TxStatus::Failed(None)) => {
                return Err(Error::TransactionFailed(format!(
                    "transaction {} failed on chain",
                    hash
                )))
            }
            Ok(s) => debug!(
                "Transaction {} status: {} ({}/{})",
                hash, s, attempt, policy.max_attempts
            ),
            Err(RpcError::Contract(code)) => return Err(Error::contract(code)),
            Err(RpcError::Transport(e)) => warn!(
                "Status request for {} failed: {} ({}/{})",
                hash, e, attempt, policy.max_attempts
            ),
        }
    }

    Err(Error::ConfirmationTimeout(*hash))
}
