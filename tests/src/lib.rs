// Copyright (c) 2024 The Alephium Ledger App Developers

//! Tests for Alephium wallet integration.
//!
//! Generic over [ledger_alph::Exchange] for reuse.
//!

use bip39::{Language, Mnemonic, Seed};

use ledger_alph_core::engine::SeedDriver;

pub mod account;

pub mod transaction;

/// Default test mnemonic
pub const MNEMONIC: &str = "duck deal pretty pen thunder economy wide common goose fit engine main aisle curtain choose cube claim snake enroll detect brief history float unit";

/// Parse a BIP39 mnemonic phrase
pub fn mnemonic(phrase: &str) -> anyhow::Result<Mnemonic> {
    let m = Mnemonic::from_phrase(phrase, Language::English)?;
    Ok(m)
}

/// Build a [SeedDriver] for local derivation of expected values
pub fn driver(mnemonic: &Mnemonic) -> SeedDriver {
    let mut b = [0u8; 64];
    b.copy_from_slice(Seed::new(mnemonic, "").as_bytes());
    SeedDriver::new(b)
}
