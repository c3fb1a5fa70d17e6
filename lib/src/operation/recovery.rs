// Copyright (c) 2026 The Chip Auth Authors

//! Simulation based recovery id resolution

use log::debug;

use chip_auth_core::recovery::{RecoveryCandidate, RecoveryError};

use crate::{
    error::ContractError,
    ledger::{LedgerRpc, RpcError},
    tx::Transaction,
    Error,
};

/// Resolve the recovery candidate by simulating the contract call for each
/// candidate in order.
///
/// An invalid signature rejection moves to the next candidate, any other
/// simulation outcome accepts the candidate. Transport failures abort
/// resolution.
pub async fn resolve_by_simulation<L, F>(
    ledger: &L,
    mut build: F,
) -> Result<RecoveryCandidate, Error>
where
    L: LedgerRpc + ?Sized,
    F: FnMut(RecoveryCandidate) -> Transaction,
{
    for c in RecoveryCandidate::ALL {
        let tx = build(c);

        match ledger.simulate(&tx).await {
            Err(RpcError::Contract(code)) if code == ContractError::InvalidSignature as u32 => {
                debug!("recovery candidate {}: rejected by verifier", c);
            }
            Err(RpcError::Transport(e)) => return Err(Error::Transport(e)),
            Ok(_) | Err(RpcError::Contract(_)) => {
                debug!("recovery candidate {}: accepted", c);
                return Ok(c);
            }
        }
    }

    Err(RecoveryError::NotFound.into())
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use chip_auth_core::xdr::ScVal;

    use super::*;
    use crate::{
        ledger::{SendStatus, Simulation},
        tx::{Invocation, SignedTransaction, TxHash},
        ErrorKind,
    };

    /// Ledger answering simulations by the recovery id argument
    struct ById<F: Fn(u32) -> Result<Simulation, RpcError> + Sync> {
        f: F,
        seen: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl<F: Fn(u32) -> Result<Simulation, RpcError> + Send + Sync> LedgerRpc for ById<F> {
        async fn simulate(&self, tx: &Transaction) -> Result<Simulation, RpcError> {
            let id = match tx.invocation.args.first() {
                Some(ScVal::U32(v)) => *v,
                _ => return Err(RpcError::Transport("missing id".into())),
            };
            self.seen.lock().unwrap().push(id);
            (self.f)(id)
        }

        async fn send(&self, _tx: &SignedTransaction) -> Result<SendStatus, RpcError> {
            Err(RpcError::Transport("unsupported".into()))
        }

        async fn get_status(&self, _hash: &TxHash) -> Result<crate::ledger::TxStatus, RpcError> {
            Err(RpcError::Transport("unsupported".into()))
        }
    }

    fn ledger<F: Fn(u32) -> Result<Simulation, RpcError> + Send + Sync>(f: F) -> ById<F> {
        ById {
            f,
            seen: Mutex::new(vec![]),
        }
    }

    fn build(c: RecoveryCandidate) -> Transaction {
        Transaction {
            source: [0u8; 32],
            fee: 100,
            sequence: 1,
            invocation: Invocation {
                contract: [1u8; 32],
                function: "mint".to_string(),
                args: vec![ScVal::U32(c.value() as u32)],
            },
            resource_fee: None,
        }
    }

    fn ok() -> Result<Simulation, RpcError> {
        Ok(Simulation {
            resource_fee: 10,
            return_value: None,
        })
    }

    #[tokio::test]
    async fn first_accepted_candidate() {
        let l = ledger(|id| match id {
            2 => ok(),
            _ => Err(RpcError::Contract(214)),
        });

        let c = resolve_by_simulation(&l, build).await.unwrap();

        assert_eq!(c.value(), 2);
        assert_eq!(*l.seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn distinct_error_accepts() {
        let l = ledger(|id| match id {
            0 => Err(RpcError::Contract(214)),
            _ => Err(RpcError::Contract(210)),
        });

        let c = resolve_by_simulation(&l, build).await.unwrap();

        assert_eq!(c.value(), 1);
    }

    #[tokio::test]
    async fn exhausted_candidates() {
        let l = ledger(|_| Err(RpcError::Contract(214)));

        let r = resolve_by_simulation(&l, build).await;

        assert_eq!(r.map_err(|e| e.kind()), Err(ErrorKind::RecoveryNotFound));
        assert_eq!(*l.seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn transport_error_aborts() {
        let l = ledger(|_| Err(RpcError::Transport("unreachable".into())));

        let r = resolve_by_simulation(&l, build).await;

        assert_eq!(r.map_err(|e| e.kind()), Err(ErrorKind::NetworkTransport));
        assert_eq!(l.seen.lock().unwrap().len(), 1);
    }
}
