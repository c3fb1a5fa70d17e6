use std::str::FromStr;

use log::LevelFilter;
use simplelog::SimpleLogger;

use chip_auth::{
    config::{ConfirmPolicy, RecoveryStrategy},
    Engine, EngineConfig,
};
use chip_auth_sim::*;

/// Simulated engine and collaborators
pub struct Setup {
    pub engine: Engine<SimChip, SimLedger, SimLedger, MemorySecretStore>,
    pub chip: SimChip,
    pub ledger: SimLedger,
}

// Setup logging, a simulated chip and ledger, and an engine using these
pub fn setup(recovery: RecoveryStrategy, record_base_url: Option<&str>) -> Setup {
    // Setup logging
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());

    let secrets = MemorySecretStore::random();
    let config = EngineConfig {
        contract_id: rand::random(),
        source_account: secrets.account(),
        recovery,
        record_base_url: record_base_url.map(String::from),
        confirm: ConfirmPolicy {
            initial_delay_ms: 2_000,
            interval_ms: 1_000,
            max_attempts: 10,
        },
        ..Default::default()
    };

    let chip = SimChip::random();
    let ledger = SimLedger::new(config.contract_id, &config.network_passphrase);
    ledger.add_account(config.source_account, 100);

    let engine = Engine::new(chip.clone(), ledger.clone(), ledger.clone(), secrets, config);

    Setup {
        engine,
        chip,
        ledger,
    }
}
