// Copyright (c) 2026 The Chip Auth Authors

use clap::Parser;
use log::{info, LevelFilter};

use chip_auth::{
    config::{ConfirmPolicy, RecoveryStrategy},
    EngineConfig, Engine,
};
use chip_auth_core::xdr::ScAddress;
use chip_auth_sim::*;

/// Chip authorisation simulator
///
/// Runs a mint, claim and transfer against a software chip and simulated
/// ledger, logging each operation stage.
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Args {
    /// Recovery id resolution strategy
    #[clap(long, value_enum, default_value = "cryptographic")]
    recovery: RecoveryStrategy,

    /// Base URL for chip record updates
    #[clap(long, env = "RECORD_BASE_URL")]
    record_base_url: Option<String>,

    /// Number of pending status polls before confirmation
    #[clap(long, default_value = "2")]
    pending_polls: u32,

    /// Log level
    #[clap(long, default_value = "debug")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging
    let mut c = simplelog::ConfigBuilder::new();
    c.add_filter_allow_str("chip_auth");

    let _ = simplelog::SimpleLogger::init(args.log_level, c.build());

    // Setup simulated chip, ledger and submitting account
    let secrets = MemorySecretStore::random();
    let config = EngineConfig {
        contract_id: rand::random(),
        source_account: secrets.account(),
        recovery: args.recovery,
        record_base_url: args.record_base_url,
        confirm: ConfirmPolicy {
            initial_delay_ms: 200,
            interval_ms: 100,
            max_attempts: 10,
        },
        ..Default::default()
    };

    let chip = SimChip::random();
    let ledger = SimLedger::new(config.contract_id, &config.network_passphrase);
    ledger.add_account(config.source_account, 0);
    ledger.set_pending_polls(args.pending_polls);

    let mut engine = Engine::new(chip.clone(), ledger.clone(), ledger.clone(), secrets, config);

    let owner = ScAddress::Account(rand::random());
    let recipient = ScAddress::Account(rand::random());

    info!("Minting...");
    let r = engine.mint().await?;
    let token_id = r.token_id.unwrap_or_default();
    info!("Minted token {} (tx: {})", token_id, r.hash);

    info!("Claiming...");
    let r = engine.claim(owner).await?;
    info!("Claimed token {} (tx: {})", token_id, r.hash);

    info!("Transferring...");
    let r = engine.transfer(owner, recipient, token_id).await?;
    info!("Transferred token {} (tx: {})", token_id, r.hash);

    for w in &r.warnings {
        info!("warning: {}", w);
    }

    if let Some(uri) = chip.record()? {
        info!("Chip record: {}", uri);
    }

    Ok(())
}
