// Copyright (c) 2026 The Chip Auth Authors

//! Command line utility for offline chip authorisation helpers

use std::path::Path;

use clap::Parser;
use log::{debug, info, LevelFilter};
use serde::Serialize;

use chip_auth::{
    apdu::ndef::UriRecord,
    primitives::{
        message,
        recovery::{recover_key, resolve_cryptographic, RecoveryCandidate},
        signature::SignatureComponents,
    },
    operation::Operation,
    EngineConfig,
};
use encdec::Encode;

mod helpers;
use helpers::*;

/// Chip authorisation command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Engine configuration file (TOML)
    #[clap(long)]
    config: Option<String>,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Build the auth message and digest for an operation
    Digest {
        /// Nonce to be signed (stored nonce + 1)
        #[clap(long)]
        nonce: u32,

        /// Override the configured contract id
        #[clap(long)]
        contract: Option<HexData<32>>,

        /// Write message and digest to a `.json` file
        #[clap(long)]
        output: Option<String>,

        #[clap(subcommand)]
        op: OperationArgs,
    },

    /// Parse and normalise a DER signature
    Signature {
        /// Hex encoded DER signature
        der: HexBytes,
    },

    /// Resolve the recovery id for a digest, signature and chip public key
    Recover {
        /// Signed digest
        #[clap(long)]
        digest: HexData<32>,

        /// DER or 64-byte `r ∥ s` signature
        #[clap(long)]
        signature: HexBytes,

        /// Uncompressed chip public key
        #[clap(long)]
        public_key: HexData<65>,
    },

    /// Encode a URI as an NDEF record
    RecordEncode {
        uri: String,
    },

    /// Decode an NDEF URI record
    RecordDecode {
        data: HexBytes,
    },

    /// Print the active configuration
    ShowConfig,
}

#[derive(Clone, PartialEq, Debug, Parser)]
enum OperationArgs {
    /// Claim for an account or contract address
    Claim { claimant: Address },
    /// Mint
    Mint,
    /// Transfer a token
    Transfer {
        from: Address,
        to: Address,
        token_id: u64,
    },
}

impl From<OperationArgs> for Operation {
    fn from(a: OperationArgs) -> Self {
        match a {
            OperationArgs::Claim { claimant } => Operation::Claim {
                claimant: claimant.0,
            },
            OperationArgs::Mint => Operation::Mint,
            OperationArgs::Transfer { from, to, token_id } => Operation::Transfer {
                from: from.0,
                to: to.0,
                token_id,
            },
        }
    }
}

/// Auth message output
#[derive(Clone, Debug, Serialize)]
struct DigestOutput {
    function: String,
    nonce: u32,
    #[serde(with = "hex")]
    message: Vec<u8>,
    #[serde(with = "hex")]
    digest: [u8; 32],
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    // Load configuration
    let config = match &args.config {
        Some(p) => {
            debug!("Loading configuration from '{}'", p);
            EngineConfig::load(p)?
        }
        None => EngineConfig::default(),
    };

    debug!("Executing command: {:?}", args.cmd);

    match args.cmd {
        Actions::Digest {
            nonce,
            contract,
            output,
            op,
        } => {
            let op = Operation::from(op);
            let contract = contract.map(|c| c.0).unwrap_or(config.contract_id);

            let m = message::build(
                &contract,
                op.function(),
                &op.auth_args(),
                nonce,
                &config.network_passphrase,
            )?;

            info!("message: {}", hex::encode(&m.message));
            info!("digest: {}", hex::encode(m.digest));

            if let Some(o) = output {
                let d = DigestOutput {
                    function: op.function().to_string(),
                    nonce,
                    message: m.message,
                    digest: m.digest,
                };
                write_output(&o, &d)?;
            }
        }
        Actions::Signature { der } => {
            let c = SignatureComponents::parse(der.as_ref())?;
            let n = c.normalize();

            info!("r: {}", hex::encode(c.r));
            info!("s: {} (low-s: {})", hex::encode(c.s), c.is_low_s());
            info!("normalised: {}", hex::encode(n.concat()));
        }
        Actions::Recover {
            digest,
            signature,
            public_key,
        } => {
            let c = match signature.0.len() {
                64 => {
                    let mut b = [0u8; 64];
                    b.copy_from_slice(&signature.0);
                    SignatureComponents::from_bytes(&b)
                }
                _ => SignatureComponents::parse(&signature.0)?,
            };
            let sig = c.normalize().concat();

            for id in RecoveryCandidate::ALL {
                match recover_key(&digest.0, &sig, id) {
                    Some(k) => debug!("candidate {}: {}", id, hex::encode(k)),
                    None => debug!("candidate {}: no point", id),
                }
            }

            let id = resolve_cryptographic(&digest.0, &sig, &public_key.0)?;

            info!("recovery id: {}", id);
        }
        Actions::RecordEncode { uri } => {
            let r = UriRecord::new(&uri);
            let mut buff = vec![0u8; r.encode_len()?];
            let n = r.encode(&mut buff)?;

            info!("record: {}", hex::encode(&buff[..n]));
        }
        Actions::RecordDecode { data } => match UriRecord::decode(data.as_ref())? {
            Some(r) => info!("uri: {}", r),
            None => info!("no stored record"),
        },
        Actions::ShowConfig => {
            println!("{}", toml::to_string(&config)?);
        }
    }

    Ok(())
}

/// Helper to write output files
fn write_output(file_name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", file_name);

    // Determine format from file name
    let p = Path::new(file_name);
    match p.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let s = serde_json::to_string_pretty(value)?;
            std::fs::write(p, s)?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}
