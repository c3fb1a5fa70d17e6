// Copyright (c) 2026 The Chip Auth Authors

//! Chip authorisation core
//!
//! This provides the `no_std` primitives used to turn a raw chip signature into
//! an authorised contract call:
//!
//! - [signature] parses the chip's DER signature envelope and canonicalises it
//!   to low-s form
//! - [xdr] encodes the contract values carried in auth messages and invocations
//! - [message] builds the auth message and the digest the chip signs
//! - [recovery] resolves the recovery id binding a signature to the chip key
//!
//! See [chip_auth_apdu] for the chip command set and wire encodings.
//!
//! ## Authorising a call
//!
//! 1. Fetch the chip public key via [`KeyInfoReq`][apdu::key_info::KeyInfoReq]
//! 2. Fetch the current nonce for the key and build the auth message with
//!    [message::build] using `nonce + 1`
//! 3. Issue [`SignReq`][apdu::sign::SignReq] with the returned digest
//! 4. Parse and normalise the returned signature with [signature::SignatureComponents]
//! 5. Resolve the recovery id with [recovery::resolve_cryptographic]
//! 6. Pass message, signature, recovery id, public key and nonce to the contract

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use chip_auth_apdu::{self as apdu};

pub mod message;
pub mod recovery;
pub mod signature;
pub mod xdr;

/// Uncompressed secp256k1 public key as held by the chip
pub type ChipPublicKey = [u8; apdu::key_info::PUBLIC_KEY_LEN];

/// SHA-256 digest
pub type Digest = [u8; 32];
