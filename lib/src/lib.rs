// Copyright (c) 2026 The Chip Auth Authors

//! Chip authenticated transaction assembly library (and CLI)
//!
//! Builds contract calls authorised by an authentication chip: the chip public
//! key and a signature over the auth message digest are bound into the call
//! arguments, the transaction is signed by a submitting account and tracked
//! until confirmed.
//!
//! See [Engine] for operation execution and [ChipHandle] for direct chip
//! access.

/// Re-export `chip-auth-apdu` for consumers
pub use chip_auth_apdu::{self as apdu};

/// Re-export `chip-auth-core` for consumers
pub use chip_auth_core::{self as primitives};

pub mod config;
pub use config::EngineConfig;

mod error;
pub use error::{ContractError, Error, ErrorKind};

mod handle;
pub use handle::{ChipHandle, ChipSignature};

pub mod ledger;

pub mod operation;
pub use operation::{Engine, Operation, OperationFailure, OperationResult, Stage};

pub mod transport;
pub use transport::Exchange;

pub mod tx;
