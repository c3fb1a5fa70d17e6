// Copyright (c) 2026 The Chip Auth Authors

//! Operation orchestrator
//!
//! Sequences chip interaction, auth message construction, signature handling
//! and transaction submission for claim, mint and transfer operations. Each
//! operation runs through [Stage]s in order, recording an audit trail, and
//! fails fast on any error other than record update.

use ed25519_dalek::SigningKey;
use log::{debug, info, warn};

use chip_auth_core::{
    message::{self, AuthMessage},
    recovery::{resolve_cryptographic, RecoveryCandidate},
    signature::SignatureComponents,
    xdr::{ScAddress, ScVal},
    ChipPublicKey,
};

use crate::{
    config::{EngineConfig, RecoveryStrategy},
    handle::ChipHandle,
    ledger::{ChainQuery, LedgerRpc, Lookup, RpcError, SecretStore, SendStatus},
    transport::Exchange,
    tx::{Invocation, SignedTransaction, Transaction, TxHash},
    Error,
};

mod confirm;
pub use confirm::await_confirmation;

mod recovery;
pub use recovery::resolve_by_simulation;

mod stage;
pub use stage::Stage;

/// Chip authorised contract operation
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Claim the token bound to the chip for `claimant`
    Claim { claimant: ScAddress },
    /// Mint the token bound to the chip
    Mint,
    /// Transfer the token bound to the chip
    Transfer {
        from: ScAddress,
        to: ScAddress,
        token_id: u64,
    },
}

impl Operation {
    /// Contract function invoked by this operation
    pub fn function(&self) -> &'static str {
        match self {
            Operation::Claim { .. } => "claim",
            Operation::Mint => "mint",
            Operation::Transfer { .. } => "transfer",
        }
    }

    /// Arguments covered by the chip signature
    pub fn auth_args(&self) -> Vec<ScVal> {
        match self {
            Operation::Claim { claimant } => vec![ScVal::Address(*claimant)],
            Operation::Mint => vec![],
            Operation::Transfer { from, to, token_id } => vec![
                ScVal::Address(*from),
                ScVal::Address(*to),
                ScVal::U64(*token_id),
            ],
        }
    }

    /// Whether the chip record is updated on success
    pub fn updates_record(&self) -> bool {
        !matches!(self, Operation::Transfer { .. })
    }
}

/// Full contract call arguments, the auth arguments followed by the chip
/// authorisation
pub fn call_args(
    op: &Operation,
    auth: &AuthMessage,
    signature: &[u8; 64],
    candidate: RecoveryCandidate,
    public_key: &ChipPublicKey,
) -> Vec<ScVal> {
    let mut args = op.auth_args();
    args.extend([
        ScVal::Bytes(auth.message.clone()),
        ScVal::from(*signature),
        ScVal::U32(candidate.value() as u32),
        ScVal::from(*public_key),
        ScVal::U32(auth.nonce),
    ]);
    args
}

/// Completed operation
#[derive(Clone, Debug, PartialEq)]
pub struct OperationResult {
    /// Submitted transaction hash
    pub hash: TxHash,
    /// Token id bound to the chip, `None` where it could not be resolved after
    /// confirmation
    pub token_id: Option<u64>,
    /// Chip public key used for authorisation
    pub public_key: ChipPublicKey,
    /// Stages visited
    pub trail: Vec<Stage>,
    /// Best-effort step failures
    pub warnings: Vec<String>,
}

/// Failed operation
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {error}")]
pub struct OperationFailure {
    /// Stage at which the operation failed
    pub stage: Stage,
    /// Cause of failure
    #[source]
    pub error: Error,
    /// Stages visited, ending with [Stage::Failed]
    pub trail: Vec<Stage>,
}

/// Operation engine, generic over the chip transport and collaborators
pub struct Engine<T: Exchange, L, Q, S> {
    chip: ChipHandle<T>,
    ledger: L,
    query: Q,
    secrets: S,
    config: EngineConfig,

    stage: Stage,
    trail: Vec<Stage>,
}

impl<T, L, Q, S> Engine<T, L, Q, S>
where
    T: Exchange + Send + Sync,
    L: LedgerRpc + Send + Sync,
    Q: ChainQuery + Send + Sync,
    S: SecretStore,
{
    /// Create a new engine using the provided chip transport and collaborators
    pub fn new(transport: T, ledger: L, query: Q, secrets: S, config: EngineConfig) -> Self {
        Self {
            chip: ChipHandle::from(transport).with_timeout(config.chip_timeout()),
            ledger,
            query,
            secrets,
            config,
            stage: Stage::Done,
            trail: vec![],
        }
    }

    /// Fetch the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fetch the chip handle
    pub fn chip(&self) -> &ChipHandle<T> {
        &self.chip
    }

    /// Claim the chip token for `claimant`
    pub async fn claim(&mut self, claimant: ScAddress) -> Result<OperationResult, OperationFailure> {
        self.run(&Operation::Claim { claimant }).await
    }

    /// Mint the chip token
    pub async fn mint(&mut self) -> Result<OperationResult, OperationFailure> {
        self.run(&Operation::Mint).await
    }

    /// Transfer the chip token, `token_id` must match the chip's token
    pub async fn transfer(
        &mut self,
        from: ScAddress,
        to: ScAddress,
        token_id: u64,
    ) -> Result<OperationResult, OperationFailure> {
        self.run(&Operation::Transfer { from, to, token_id }).await
    }

    /// Execute an operation
    pub async fn run(&mut self, op: &Operation) -> Result<OperationResult, OperationFailure> {
        self.trail.clear();

        info!("Starting {} operation", op.function());

        let mut warnings = vec![];

        match self.execute(op, &mut warnings).await {
            Ok((hash, token_id, public_key)) => {
                self.enter(Stage::Done);

                info!("Completed {} operation (tx: {})", op.function(), hash);

                Ok(OperationResult {
                    hash,
                    token_id,
                    public_key,
                    trail: self.trail.clone(),
                    warnings,
                })
            }
            Err(error) => {
                let stage = self.stage;
                self.enter(Stage::Failed(error.kind()));

                warn!("{} operation failed at {}: {}", op.function(), stage, error);

                Err(OperationFailure {
                    stage,
                    error,
                    trail: self.trail.clone(),
                })
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!("Stage: {}", stage);

        self.stage = stage;
        self.trail.push(stage);
    }

    async fn execute(
        &mut self,
        op: &Operation,
        warnings: &mut Vec<String>,
    ) -> Result<(TxHash, Option<u64>, ChipPublicKey), Error> {
        let config = self.config.clone();
        let contract = config.contract_id;

        self.enter(Stage::ReadingChip);

        let public_key = self.chip.key_info(config.key_index).await?.public_key;

        if let Operation::Transfer { token_id, .. } = op {
            self.check_token(&public_key, *token_id).await?;
        }

        self.enter(Stage::FetchingNonce);

        let stored = match self.query.nonce(&contract, &public_key).await {
            Ok(Lookup::Found(n)) => n,
            Ok(Lookup::NotFound) => 0,
            Err(e) => return Err(Error::NonceFetch(e)),
        };
        let nonce = stored
            .checked_add(1)
            .ok_or_else(|| Error::Validation("chip nonce exhausted".to_string()))?;

        debug!("Stored nonce: {}, signing with {}", stored, nonce);

        self.enter(Stage::BuildingMessage);

        let auth = message::build(
            &contract,
            op.function(),
            &op.auth_args(),
            nonce,
            &config.network_passphrase,
        )?;

        self.enter(Stage::Signing);

        let sig = self.chip.sign(config.key_index, &auth.digest).await?;

        debug!(
            "Chip signature: {} (counters: {} / {})",
            hex::encode(&sig.der),
            sig.global_counter,
            sig.key_counter
        );

        self.enter(Stage::Normalizing);

        let signature = SignatureComponents::parse(&sig.der)?.normalize().concat();

        self.enter(Stage::ResolvingRecovery);

        let sequence = self
            .query
            .account_sequence(&config.source_account)
            .await?
            .checked_add(1)
            .ok_or_else(|| Error::TransactionBuild("account sequence exhausted".to_string()))?;
        let unsigned = |c: RecoveryCandidate| Transaction {
            source: config.source_account,
            fee: config.base_fee,
            sequence,
            invocation: Invocation {
                contract,
                function: op.function().to_string(),
                args: call_args(op, &auth, &signature, c, &public_key),
            },
            resource_fee: None,
        };

        let candidate = match config.recovery {
            RecoveryStrategy::Cryptographic => {
                resolve_cryptographic(&auth.digest, &signature, &public_key)?
            }
            RecoveryStrategy::Simulation => resolve_by_simulation(&self.ledger, &unsigned).await?,
        };

        debug!("Recovery id: {}", candidate);

        self.enter(Stage::BuildingTransaction);

        let mut tx = unsigned(candidate);
        let sim = self.ledger.simulate(&tx).await?;

        tx.fee = config
            .base_fee
            .checked_add(sim.resource_fee)
            .ok_or_else(|| Error::TransactionBuild("fee overflow".to_string()))?;
        tx.resource_fee = Some(sim.resource_fee);

        self.enter(Stage::SigningTransaction);

        let signed = self.sign_transaction(tx)?;
        let hash = signed.hash;

        info!("Submitting transaction {}", hash);

        self.enter(Stage::Submitting);

        match self.ledger.send(&signed).await {
            Ok(SendStatus::Pending) | Ok(SendStatus::Duplicate) => (),
            Ok(SendStatus::TryAgainLater) => {
                return Err(Error::TransactionFailed(
                    "ledger busy, submission not accepted".to_string(),
                ))
            }
            Ok(SendStatus::Error(Some(code))) | Err(RpcError::Contract(code)) => {
                return Err(Error::contract(code))
            }
            Ok(SendStatus::Error(None)) => {
                return Err(Error::TransactionFailed(
                    "submission rejected by ledger".to_string(),
                ))
            }
            Err(RpcError::Transport(e)) => {
                warn!("Submission of {} failed ({}), awaiting confirmation", hash, e);
            }
        }

        self.enter(Stage::Confirming);

        let ret = await_confirmation(&self.ledger, &hash, &config.confirm).await?;

        // Failures past confirmation only warn
        let token_id = match op {
            Operation::Transfer { token_id, .. } => Some(*token_id),
            _ => match self.token_id(ret.as_ref(), &public_key).await {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Token id for {} unavailable: {}", hash, e);
                    warnings.push(format!("token id unavailable: {}", e));
                    None
                }
            },
        };

        if let (true, Some(base), Some(id)) =
            (op.updates_record(), &config.record_base_url, token_id)
        {
            self.enter(Stage::UpdatingRecord);

            let uri = format!(
                "{}/{}/{}",
                base.trim_end_matches('/'),
                hex::encode(contract),
                id
            );

            if let Err(e) = self.chip.write_record(&uri).await {
                warn!("Record update failed: {}", e);
                warnings.push(format!("record update failed: {}", e));
            }
        }

        Ok((hash, token_id, public_key))
    }

    /// Check the caller supplied token id matches the chip's token
    async fn check_token(&self, public_key: &ChipPublicKey, token_id: u64) -> Result<(), Error> {
        match self.query.token_id(&self.config.contract_id, public_key).await? {
            Lookup::Found(id) if id == token_id => Ok(()),
            Lookup::Found(id) => Err(Error::Validation(format!(
                "token {} does not match chip token {}",
                token_id, id
            ))),
            Lookup::NotFound => Err(Error::Validation("chip has no token".to_string())),
        }
    }

    /// Resolve the token id from the call return value, or the chain
    async fn token_id(
        &self,
        ret: Option<&ScVal>,
        public_key: &ChipPublicKey,
    ) -> Result<u64, Error> {
        if let Some(id) = ret.and_then(|v| v.as_u64()) {
            return Ok(id);
        }

        match self.query.token_id(&self.config.contract_id, public_key).await? {
            Lookup::Found(id) => Ok(id),
            Lookup::NotFound => Err(Error::TransactionBuild(
                "token id unavailable after confirmation".to_string(),
            )),
        }
    }

    /// Sign a transaction within the credential scope
    fn sign_transaction(&self, tx: Transaction) -> Result<SignedTransaction, Error> {
        let passphrase = &self.config.network_passphrase;

        self.secrets.with_signing_key(|secret| {
            let key = SigningKey::from_bytes(secret);

            if key.verifying_key().to_bytes() != tx.source {
                return Err(Error::Credential(
                    "signing key does not match source account".to_string(),
                ));
            }

            tx.sign(passphrase, &key).map_err(Error::from)
        })?
    }
}
