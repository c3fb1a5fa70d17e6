// Copyright (c) 2026 The Chip Auth Authors

//! Simulated chip and ledger for exercising chip authorised operations
//!
//! [SimChip] answers the chip command set over an in-memory NDEF file and
//! secp256k1 key slots, [SimLedger] verifies and applies contract calls as
//! the verifying contract does, and [MemorySecretStore] provides the
//! submitting account key.

mod chip;
pub use chip::{encode_public_key, SignatureForm, SimChip, SimError, DEFAULT_COUNTER, NDEF_FILE_LEN};

mod ledger;
pub use ledger::{SendFault, SimLedger, DEFAULT_RESOURCE_FEE};

mod secrets;
pub use secrets::MemorySecretStore;
