// Copyright (c) 2026 The Chip Auth Authors

//! Simulated ledger and verifying contract
//!
//! Implements [LedgerRpc] and [ChainQuery] over in-memory state. Calls are
//! verified as the on-chain verifier does: the nonce must be strictly greater
//! than the stored nonce and the signature over `sha256(message ∥ nonce)` must
//! recover to the supplied chip key. Token rules follow the contract's error
//! codes.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use log::{debug, info};

use chip_auth::{
    ledger::{ChainQuery, LedgerRpc, Lookup, RpcError, SendStatus, Simulation, TxStatus},
    tx::{AccountId, ContractId, SignedTransaction, Transaction, TxHash},
    ContractError,
};
use chip_auth_core::{
    message::message_digest,
    recovery::{recover_key, RecoveryCandidate},
    xdr::{ScAddress, ScVal},
    ChipPublicKey,
};

/// Resource fee charged for each call
pub const DEFAULT_RESOURCE_FEE: u32 = 1_000;

/// Submission fault injected on the next `send`
#[derive(Copy, Clone, Debug, PartialEq, strum::Display)]
pub enum SendFault {
    /// Accept the transaction then report a transport failure
    DropResponse,
    /// Report a transport failure without accepting the transaction
    Unreachable,
    /// Respond with [SendStatus::TryAgainLater]
    TryAgainLater,
}

/// Simulated ledger, clones share ledger state
#[derive(Clone)]
pub struct SimLedger {
    state: Arc<Mutex<LedgerState>>,
}

struct LedgerState {
    contract: ContractId,
    network_passphrase: String,
    resource_fee: u32,
    max_tokens: u64,

    contract_state: ContractState,
    sequences: HashMap<AccountId, u64>,
    txs: HashMap<TxHash, TxRecord>,

    pending_polls: u32,
    send_fault: Option<SendFault>,
    query_fault: bool,

    simulations: usize,
    polls: HashMap<TxHash, usize>,
}

#[derive(Clone, Default)]
struct ContractState {
    next_token: u64,
    nonces: HashMap<ChipPublicKey, u32>,
    tokens: HashMap<ChipPublicKey, u64>,
    keys: HashMap<u64, ChipPublicKey>,
    owners: HashMap<u64, ScAddress>,
}

struct TxRecord {
    pending: u32,
    status: TxStatus,
}

/// Chip authorisation arguments trailing each call
struct ChipAuth<'a> {
    message: &'a [u8],
    signature: [u8; 64],
    recovery_id: u32,
    public_key: ChipPublicKey,
    nonce: u32,
}

impl SimLedger {
    /// Create a ledger hosting the verifying contract `contract`
    pub fn new(contract: ContractId, network_passphrase: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                contract,
                network_passphrase: network_passphrase.to_string(),
                resource_fee: DEFAULT_RESOURCE_FEE,
                max_tokens: 1_000,
                contract_state: ContractState::default(),
                sequences: HashMap::new(),
                txs: HashMap::new(),
                pending_polls: 0,
                send_fault: None,
                query_fault: false,
                simulations: 0,
                polls: HashMap::new(),
            })),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        match self.state.lock() {
            Ok(s) => s,
            Err(e) => e.into_inner(),
        }
    }

    /// Create an account with the provided sequence number
    pub fn add_account(&self, account: AccountId, sequence: u64) {
        self.state().sequences.insert(account, sequence);
    }

    /// Set the number of `Pending` responses before a transaction outcome
    /// is visible
    pub fn set_pending_polls(&self, n: u32) {
        self.state().pending_polls = n;
    }

    /// Inject a fault on the next submission
    pub fn set_send_fault(&self, fault: Option<SendFault>) {
        self.state().send_fault = fault;
    }

    /// Fail chain queries at the transport level
    pub fn set_query_fault(&self, fail: bool) {
        self.state().query_fault = fail;
    }

    /// Set the token supply
    pub fn set_max_tokens(&self, n: u64) {
        self.state().max_tokens = n;
    }

    /// Fetch the stored nonce for a chip key
    pub fn nonce_of(&self, key: &ChipPublicKey) -> Option<u32> {
        self.state().contract_state.nonces.get(key).copied()
    }

    /// Fetch the owner of a token
    pub fn owner_of(&self, token_id: u64) -> Option<ScAddress> {
        self.state().contract_state.owners.get(&token_id).copied()
    }

    /// Number of transactions accepted
    pub fn submitted(&self) -> usize {
        self.state().txs.len()
    }

    /// Number of simulations performed
    pub fn simulations(&self) -> usize {
        self.state().simulations
    }

    /// Number of status polls for a transaction
    pub fn polls(&self, hash: &TxHash) -> usize {
        self.state().polls.get(hash).copied().unwrap_or(0)
    }
}

#[async_trait]
impl LedgerRpc for SimLedger {
    async fn simulate(&self, tx: &Transaction) -> Result<Simulation, RpcError> {
        let mut s = self.state();
        s.simulations += 1;

        // Apply to a copy, simulations never change state
        let mut c = s.contract_state.clone();
        let return_value = s.invoke(&mut c, tx)?;

        Ok(Simulation {
            resource_fee: s.resource_fee,
            return_value,
        })
    }

    async fn send(&self, tx: &SignedTransaction) -> Result<SendStatus, RpcError> {
        let mut s = self.state();

        match s.send_fault.take() {
            Some(SendFault::Unreachable) => {
                return Err(RpcError::Transport("connection refused".to_string()))
            }
            Some(SendFault::TryAgainLater) => return Ok(SendStatus::TryAgainLater),
            Some(SendFault::DropResponse) => {
                s.accept(tx)?;
                return Err(RpcError::Transport("connection reset".to_string()));
            }
            None => (),
        }

        s.accept(tx)
    }

    async fn get_status(&self, hash: &TxHash) -> Result<TxStatus, RpcError> {
        let mut s = self.state();
        *s.polls.entry(*hash).or_default() += 1;

        let r = match s.txs.get_mut(hash) {
            Some(r) if r.pending > 0 => {
                r.pending -= 1;
                TxStatus::Pending
            }
            Some(r) => r.status.clone(),
            None => TxStatus::NotFound,
        };

        Ok(r)
    }
}

#[async_trait]
impl ChainQuery for SimLedger {
    async fn nonce(
        &self,
        contract: &ContractId,
        key: &ChipPublicKey,
    ) -> Result<Lookup<u32>, RpcError> {
        let s = self.state();
        s.check_query(contract)?;

        Ok(s.contract_state.nonces.get(key).copied().into())
    }

    async fn token_id(
        &self,
        contract: &ContractId,
        key: &ChipPublicKey,
    ) -> Result<Lookup<u64>, RpcError> {
        let s = self.state();
        s.check_query(contract)?;

        Ok(s.contract_state.tokens.get(key).copied().into())
    }

    async fn account_sequence(&self, account: &AccountId) -> Result<u64, RpcError> {
        let s = self.state();
        if s.query_fault {
            return Err(RpcError::Transport("query failed".to_string()));
        }

        s.sequences
            .get(account)
            .copied()
            .ok_or_else(|| RpcError::Transport(format!("account {} not found", hex::encode(account))))
    }
}

impl LedgerState {
    fn check_query(&self, contract: &ContractId) -> Result<(), RpcError> {
        if self.query_fault {
            return Err(RpcError::Transport("query failed".to_string()));
        }
        if contract != &self.contract {
            return Err(RpcError::Transport("contract not found".to_string()));
        }
        Ok(())
    }

    /// Accept a signed transaction, applying the call if it succeeds
    fn accept(&mut self, signed: &SignedTransaction) -> Result<SendStatus, RpcError> {
        if self.txs.contains_key(&signed.hash) {
            return Ok(SendStatus::Duplicate);
        }

        if !signed.verify(&self.network_passphrase) {
            debug!("rejecting {}: bad signature", signed.hash);
            return Ok(SendStatus::Error(None));
        }

        let tx = &signed.tx;
        match self.sequences.get(&tx.source) {
            Some(seq) if tx.sequence == seq + 1 => (),
            _ => {
                debug!("rejecting {}: bad sequence", signed.hash);
                return Ok(SendStatus::Error(None));
            }
        }
        if tx.fee < self.resource_fee {
            return Ok(SendStatus::Error(None));
        }

        self.sequences.insert(tx.source, tx.sequence);

        let mut c = self.contract_state.clone();
        let status = match self.invoke(&mut c, tx) {
            Ok(v) => {
                self.contract_state = c;
                TxStatus::Success(v)
            }
            Err(RpcError::Contract(code)) => TxStatus::Failed(Some(code)),
            Err(RpcError::Transport(_)) => TxStatus::Failed(None),
        };

        info!("accepted {} ({})", signed.hash, status);

        self.txs.insert(
            signed.hash,
            TxRecord {
                pending: self.pending_polls,
                status,
            },
        );

        Ok(SendStatus::Pending)
    }

    /// Execute a contract call against `c`
    fn invoke(&self, c: &mut ContractState, tx: &Transaction) -> Result<Option<ScVal>, RpcError> {
        let inv = &tx.invocation;
        if inv.contract != self.contract {
            return Err(RpcError::Transport("contract not found".to_string()));
        }

        let args = &inv.args;
        let n = args.len();

        match (inv.function.as_str(), n) {
            ("mint", 5) => {
                let auth = chip_auth(args)?;
                verify(c, &auth)?;

                if c.tokens.contains_key(&auth.public_key) {
                    return Err(contract_error(ContractError::TokenAlreadyMinted));
                }
                let token_id = c.next_token;
                if token_id >= self.max_tokens {
                    return Err(contract_error(ContractError::TokenIDsAreDepleted));
                }

                c.next_token += 1;
                c.tokens.insert(auth.public_key, token_id);
                c.keys.insert(token_id, auth.public_key);

                Ok(Some(ScVal::U64(token_id)))
            }
            ("claim", 6) => {
                let claimant = address(&args[0])?;
                let auth = chip_auth(&args[1..])?;
                verify(c, &auth)?;

                let token_id = *c
                    .tokens
                    .get(&auth.public_key)
                    .ok_or_else(|| contract_error(ContractError::NonExistentToken))?;
                if c.owners.contains_key(&token_id) {
                    return Err(contract_error(ContractError::TokenAlreadyMinted));
                }

                c.owners.insert(token_id, claimant);

                Ok(Some(ScVal::U64(token_id)))
            }
            ("transfer", 8) => {
                let from = address(&args[0])?;
                let to = address(&args[1])?;
                let token_id = args[2].as_u64().ok_or_else(invalid_args)?;
                let auth = chip_auth(&args[3..])?;
                verify(c, &auth)?;

                let key = c
                    .keys
                    .get(&token_id)
                    .ok_or_else(|| contract_error(ContractError::NonExistentToken))?;
                if key != &auth.public_key {
                    return Err(contract_error(ContractError::InvalidSignature));
                }
                match c.owners.get(&token_id) {
                    Some(owner) if owner == &from => (),
                    Some(_) => return Err(contract_error(ContractError::IncorrectOwner)),
                    None => return Err(contract_error(ContractError::NonExistentToken)),
                }

                c.owners.insert(token_id, to);

                Ok(None)
            }
            (f, _) => Err(RpcError::Transport(format!(
                "invalid call: {} with {} arguments",
                f, n
            ))),
        }
    }
}

/// Verify chip authorisation, updating the stored nonce
fn verify(c: &mut ContractState, auth: &ChipAuth) -> Result<(), RpcError> {
    let stored = c.nonces.get(&auth.public_key).copied().unwrap_or(0);
    if auth.nonce <= stored {
        debug!("nonce {} not above stored {}", auth.nonce, stored);
        return Err(contract_error(ContractError::InvalidSignature));
    }

    let digest = message_digest(auth.message, auth.nonce);

    let recovered = u8::try_from(auth.recovery_id)
        .ok()
        .and_then(RecoveryCandidate::new)
        .and_then(|id| recover_key(&digest, &auth.signature, id));

    if recovered != Some(auth.public_key) {
        return Err(contract_error(ContractError::InvalidSignature));
    }

    c.nonces.insert(auth.public_key, auth.nonce);

    Ok(())
}

/// Parse trailing chip authorisation arguments
fn chip_auth(args: &[ScVal]) -> Result<ChipAuth<'_>, RpcError> {
    match args {
        [ScVal::Bytes(message), ScVal::Bytes(signature), ScVal::U32(recovery_id), ScVal::Bytes(public_key), ScVal::U32(nonce)] => {
            Ok(ChipAuth {
                message,
                signature: signature.as_slice().try_into().map_err(|_| invalid_args())?,
                recovery_id: *recovery_id,
                public_key: public_key.as_slice().try_into().map_err(|_| invalid_args())?,
                nonce: *nonce,
            })
        }
        _ => Err(invalid_args()),
    }
}

fn address(v: &ScVal) -> Result<ScAddress, RpcError> {
    match v {
        ScVal::Address(a) => Ok(*a),
        _ => Err(invalid_args()),
    }
}

fn invalid_args() -> RpcError {
    RpcError::Transport("invalid call arguments".to_string())
}

fn contract_error(e: ContractError) -> RpcError {
    RpcError::Contract(e as u32)
}
