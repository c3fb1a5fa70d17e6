// Copyright (c) 2026 The Chip Auth Authors

//! Engine configuration, loadable from TOML

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::tx::{AccountId, ContractId};

/// Recovery id resolution strategy
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RecoveryStrategy {
    /// Recover candidate keys locally and compare with the chip key
    #[default]
    Cryptographic,
    /// Simulate the contract call for each candidate
    Simulation,
}

/// Confirmation polling policy
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmPolicy {
    /// Delay before the first status poll
    pub initial_delay_ms: u64,
    /// Delay between status polls
    pub interval_ms: u64,
    /// Maximum number of status polls
    pub max_attempts: u32,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2_000,
            interval_ms: 1_000,
            max_attempts: 30,
        }
    }
}

impl ConfirmPolicy {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Network passphrase, hashed to form the network id
    pub network_passphrase: String,

    /// Verifying contract id
    #[serde(with = "hex")]
    pub contract_id: ContractId,

    /// Submitting account public key
    #[serde(with = "hex")]
    pub source_account: AccountId,

    /// Chip key slot used for signing
    pub key_index: u8,

    /// Base transaction fee
    pub base_fee: u32,

    /// Recovery id resolution strategy
    pub recovery: RecoveryStrategy,

    /// Base URL for the chip record, the record is not updated if unset
    pub record_base_url: Option<String>,

    /// Chip request timeout
    pub chip_timeout_ms: u64,

    /// Confirmation polling policy
    pub confirm: ConfirmPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network_passphrase: "Test SDF Network ; September 2015".to_string(),
            contract_id: [0u8; 32],
            source_account: [0u8; 32],
            key_index: 1,
            base_fee: 100,
            recovery: RecoveryStrategy::Cryptographic,
            record_base_url: None,
            chip_timeout_ms: 2_000,
            confirm: ConfirmPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        let c = toml::from_str(&s)?;
        Ok(c)
    }

    pub fn chip_timeout(&self) -> Duration {
        Duration::from_millis(self.chip_timeout_ms)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
