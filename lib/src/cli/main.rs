// Copyright (c) 2024 The Alephium Ledger App Developers

//! Command line utility for interacting with the Ledger Alephium App

use std::{path::Path, time::Duration};

use clap::Parser;
use log::{debug, info, LevelFilter};
use serde::Serialize;

use ledger_alph::{
    apdu::{account::KeyType, path::DerivationPath},
    connect,
    verify::verify,
    DeviceHandle, Error, Exchange, Target, TcpOptions,
};
use ledger_alph_core::{
    address::{group_of, LockupScript},
    tx::UnsignedTx,
};

mod helpers;
use helpers::*;

/// Ledger command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Device transport
    #[clap(long, value_enum, default_value = "tcp")]
    target: Target,

    /// TCP (speculos) connection options
    #[clap(flatten)]
    tcp: TcpOptions,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Timeout for user interaction
    #[clap(long, default_value = "60")]
    timeout_s: u64,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Fetch application info
    AppInfo,

    /// Derive an account
    Account {
        /// BIP44 derivation path
        #[clap(long, default_value = "m/44'/1234'/0'/0/0")]
        path: DerivationPath,

        /// Target group, the final path index is advanced to reach this
        #[clap(long)]
        group: Option<u8>,

        /// Key type
        #[clap(long, default_value = "default")]
        key_type: KeyType,

        /// Show the address on the device for confirmation
        #[clap(long)]
        display: bool,

        /// Output file (`.json`)
        #[clap(long)]
        output: Option<String>,
    },

    /// Sign a serialised unsigned transaction
    Sign {
        /// BIP44 derivation path for the signing account
        #[clap(long, default_value = "m/44'/1234'/0'/0/0")]
        path: DerivationPath,

        /// Hex encoded unsigned transaction
        #[clap(long, conflicts_with = "input")]
        tx: Option<HexVec>,

        /// File containing the hex encoded unsigned transaction
        #[clap(long)]
        input: Option<String>,

        /// Output file (`.json`)
        #[clap(long)]
        output: Option<String>,
    },

    /// Sign a 32-byte hash
    SignHash {
        /// BIP44 derivation path for the signing account
        #[clap(long, default_value = "m/44'/1234'/0'/0/0")]
        path: DerivationPath,

        /// Hex encoded hash
        #[clap(long)]
        hash: HexData<32>,

        /// Output file (`.json`)
        #[clap(long)]
        output: Option<String>,
    },

    /// Compute the group of an address
    GroupOf {
        /// Base58 encoded address
        address: String,
    },

    /// Verify a transaction signature
    Verify {
        /// Transaction id
        #[clap(long)]
        tx_id: HexData<32>,

        /// Compressed public key
        #[clap(long)]
        public_key: HexData<33>,

        /// Compact signature
        #[clap(long)]
        signature: HexData<64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    // Handle offline commands
    match &args.cmd {
        Actions::GroupOf { address } => {
            let g = group_of(address).map_err(|e| anyhow::anyhow!("invalid address: {}", e))?;
            info!("group: {}", g);
            return Ok(());
        }
        Actions::Verify {
            tx_id,
            public_key,
            signature,
        } => {
            match verify(tx_id.as_ref(), public_key.as_ref(), signature.as_ref()) {
                true => info!("signature OK"),
                false => return Err(anyhow::anyhow!("signature verification failed")),
            }
            return Ok(());
        }
        _ => (),
    }

    // Connect to ledger device
    debug!("Using transport: {} ({:?})", args.target, args.tcp);
    let t = connect(args.target, &args.tcp).await?;

    // Execute command
    execute(t, args.cmd, Duration::from_secs(args.timeout_s)).await?;

    Ok(())
}

/// Execute a command with the provided transport
async fn execute<T>(t: DeviceHandle<T>, cmd: Actions, timeout: Duration) -> anyhow::Result<()>
where
    T: Exchange + Sync + Send,
    T::Error: Into<Error>,
{
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::AppInfo => {
            let i = t.app_info().await?;

            info!("app info: {:#?}", i);
        }
        Actions::Account {
            path,
            group,
            key_type,
            display,
            output,
        } => {
            info!("requesting account for path: {}", path);

            let a = match display {
                true => {
                    info!("confirm the address on the device");
                    t.account_verified(&path, group, key_type, timeout).await?
                }
                false => t.account(&path, group, key_type).await?,
            };

            info!("path: {}", a.path);
            info!("group: {}", a.group);
            info!("address: {}", a.address());
            info!("public key: {}", hex::encode(a.public_key));

            if let Some(o) = output {
                let v = AccountOutput {
                    path: a.path.to_string(),
                    index: a.index,
                    group: a.group,
                    address: a.address(),
                    public_key: hex::encode(a.public_key),
                };
                write_output(&o, &v).await?;
            }
        }
        Actions::Sign {
            path,
            tx,
            input,
            output,
        } => {
            // Load unsigned transaction
            let tx = match (tx, input) {
                (Some(v), _) => v.0,
                (None, Some(f)) => read_input(&f).await?,
                (None, None) => return Err(anyhow::anyhow!("--tx or --input required")),
            };

            // Decode locally to display and check the transaction
            let (utx, tx_id) = UnsignedTx::decode(&tx)
                .map_err(|e| anyhow::anyhow!("malformed transaction: {:?}", e))?;
            info!(
                "signing transaction {} ({} inputs, {} outputs, network: {})",
                tx_id,
                utx.inputs.len(),
                utx.outputs.len(),
                utx.network
            );

            // Execute signing, awaiting user review
            let signed = t.sign_unsigned_tx(&path, &tx, timeout).await?;

            info!("tx id: {}", hex::encode(signed.tx_id.0));
            info!("signature: {}", hex::encode(signed.signature));

            if let Some(o) = output {
                let v = SignedOutput {
                    path: path.to_string(),
                    address: LockupScript::p2pkh(&signed.public_key).address(),
                    public_key: hex::encode(signed.public_key),
                    tx_id: hex::encode(signed.tx_id.0),
                    signature: hex::encode(signed.signature),
                };
                write_output(&o, &v).await?;
            }
        }
        Actions::SignHash { path, hash, output } => {
            info!("signing hash {}", hash);

            let signed = t.sign_hash(&path, hash.as_ref(), timeout).await?;

            info!("signature: {}", hex::encode(signed.signature));

            if let Some(o) = output {
                let v = SignedOutput {
                    path: path.to_string(),
                    address: LockupScript::p2pkh(&signed.public_key).address(),
                    public_key: hex::encode(signed.public_key),
                    tx_id: hex::encode(signed.tx_id.0),
                    signature: hex::encode(signed.signature),
                };
                write_output(&o, &v).await?;
            }
        }
        _ => unreachable!(),
    }

    Ok(())
}

/// Helper to read hex encoded transaction files
async fn read_input(file_name: &str) -> anyhow::Result<Vec<u8>> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;
    let v = hex::decode(s.trim().trim_start_matches("0x"))?;

    Ok(v)
}

/// Helper to write output files if `--output` argument is provided
async fn write_output(file_name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", file_name);

    // Determine format from file name
    let p = Path::new(file_name);
    match p.extension().and_then(|e| e.to_str()) {
        // Encode to JSON for `.json` files
        Some("json") => {
            let s = serde_json::to_string_pretty(value)?;
            tokio::fs::write(p, s).await?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}
