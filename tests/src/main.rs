// Copyright (c) 2024 The Alephium Ledger App Developers

use bip39::Mnemonic;
use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use strum::{Display, EnumString, EnumVariantNames};

use ledger_alph::{transport::GenericTransport, Target, TcpOptions};
use ledger_alph_tests::{
    account, mnemonic,
    transaction::{self, SCENARIOS},
    MNEMONIC,
};

/// Test CLI arguments
#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub test: Tests,

    /// Device transport
    #[clap(long, value_enum, default_value = "tcp")]
    pub target: Target,

    /// Speculos TCP target
    #[clap(flatten)]
    pub tcp: TcpOptions,

    /// bip39 Mnemonic (must be shared between test util and target)
    #[clap(long, env, default_value = MNEMONIC, value_parser = mnemonic)]
    pub mnemonic: Mnemonic,

    /// Log level
    #[clap(long, default_value = "debug", env)]
    pub log_level: LevelFilter,

    /// Enable logging for transports
    #[clap(long)]
    pub log_transports: bool,
}

/// Test modes
#[derive(Clone, PartialEq, Debug, Subcommand, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum Tests {
    /// Test account derivation with group search
    Accounts,
    /// Test invalid account requests are rejected
    Invalid,
    /// Test requests are rejected while a transaction is in flight
    Busy,
    /// Test malformed transactions are rejected
    Malformed,
    /// Test transaction signing (approve on the device)
    Tx {
        /// Scenario name, all scenarios are run if omitted
        #[clap(long)]
        scenario: Option<String>,
    },
    /// Test transaction rejection (reject on the device)
    Reject,
    /// Test hash signing (approve on the device)
    SignHash,
    /// Test address confirmation (approve on the device)
    VerifyAddress,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load command line options
    let opts = Opts::parse();

    // Setup logging
    let mut c = simplelog::ConfigBuilder::new();
    if !opts.log_transports {
        c.add_filter_ignore_str("ledger_alph::transport");
    }

    let _ = simplelog::SimpleLogger::init(opts.log_level, c.build());

    debug!("options: {:?}", opts);

    info!("Running test '{}' via {}", opts.test, opts.target);

    execute(opts).await?;

    log::info!("Test OK!");

    Ok(())
}

/// Connect to the selected target
async fn connect(opts: &Opts) -> anyhow::Result<GenericTransport> {
    let t = ledger_alph::open(opts.target, &opts.tcp).await?;
    Ok(t)
}

/// Execute a test against the selected target
async fn execute(opts: Opts) -> anyhow::Result<()> {
    let m = &opts.mnemonic;

    match &opts.test {
        Tests::Accounts => {
            account::test(connect(&opts).await?, m.clone()).await?;
        }
        Tests::Invalid => account::invalid(connect(&opts).await?).await?,
        Tests::Busy => transaction::busy(connect(&opts).await?, m).await?,
        Tests::Malformed => transaction::malformed(connect(&opts).await?, m).await?,
        Tests::Tx { scenario } => {
            let scenarios = SCENARIOS
                .iter()
                .filter(|s| scenario.as_deref().map(|n| n == s.name).unwrap_or(true));

            // One connection per scenario
            let mut n = 0;
            for s in scenarios {
                transaction::test(connect(&opts).await?, || async {}, m, s).await?;
                n += 1;
            }

            if n == 0 {
                return Err(anyhow::anyhow!("unknown scenario: {:?}", scenario));
            }
        }
        Tests::Reject => transaction::reject(connect(&opts).await?, || async {}, m).await?,
        Tests::SignHash => transaction::sign_hash(connect(&opts).await?, || async {}, m).await?,
        Tests::VerifyAddress => {
            account::verify_address(connect(&opts).await?, || async {}, m.clone()).await?
        }
    }

    Ok(())
}
