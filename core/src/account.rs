// Copyright (c) 2024 The Alephium Ledger App Developers

//! Account derivation
//!
//! Accounts use BIP44 paths of the form `m/44'/1234'/<account>'/<change>/<index>`, with
//! the final index optionally advanced to reach an address in the requested group.

use alloc::string::String;

use k256::{ecdsa::SigningKey, elliptic_curve::sec1::ToEncodedPoint};

use ledger_alph_apdu::{
    account::KeyType,
    app_info::KeyTypes,
    path::{DerivationPath, HARDENED},
};

use crate::{
    address::{LockupScript, GROUP_NUM},
    engine::{Driver, Error},
};

/// BIP44 purpose
pub const PURPOSE: u32 = 44 | HARDENED;

/// Alephium coin type
pub const COIN_TYPE: u32 = 1234 | HARDENED;

/// Alephium derivation path depth
pub const PATH_DEPTH: usize = 5;

/// Key types available for derivation, reported via `GetVersion`
pub const KEY_TYPES: KeyTypes = KeyTypes::DEFAULT;

/// Derived account
#[derive(Clone, PartialEq, Debug)]
pub struct Account {
    /// Derivation path, with the reached index substituted
    pub path: DerivationPath,
    /// Final path index
    pub index: u32,
    /// Account group
    pub group: u8,
    /// Key type
    pub key_type: KeyType,
    /// Compressed secp256k1 public key
    pub public_key: [u8; 33],
}

impl Account {
    /// P2PKH lockup script for the account
    pub fn lockup(&self) -> LockupScript {
        LockupScript::p2pkh(&self.public_key)
    }

    /// Base58 address for the account
    pub fn address(&self) -> String {
        self.lockup().address()
    }
}

/// Check a path is a valid Alephium account path
pub fn check_path(path: &DerivationPath) -> Result<(), Error> {
    let p = path.as_slice();

    if p.len() != PATH_DEPTH || p[0] != PURPOSE || p[1] != COIN_TYPE {
        return Err(Error::InvalidPath);
    }

    // Account hardened, change and index not
    if p[2] & HARDENED == 0 || p[3] & HARDENED != 0 || p[4] & HARDENED != 0 {
        return Err(Error::InvalidPath);
    }

    Ok(())
}

/// Compressed public key for a signing key
pub fn public_key(key: &SigningKey) -> [u8; 33] {
    let p = key.verifying_key().to_encoded_point(true);

    let mut o = [0u8; 33];
    o.copy_from_slice(p.as_bytes());
    o
}

/// Derive an account (and signing key) for the provided path, searching forward from
/// the final path index where a `group` is specified.
#[cfg_attr(feature = "noinline", inline(never))]
pub fn derive<DRV: Driver>(
    drv: &DRV,
    path: &DerivationPath,
    group: Option<u8>,
    key_type: KeyType,
) -> Result<(Account, SigningKey), Error> {
    // Reject unsupported schemes prior to any derivation
    if !KEY_TYPES.supports(key_type) {
        return Err(Error::UnsupportedKeyType);
    }

    check_path(path)?;

    if let Some(g) = group {
        if g >= GROUP_NUM {
            return Err(Error::InvalidPath);
        }
    }

    let base = path.last().ok_or(Error::InvalidPath)?;

    for index in base..HARDENED {
        let p = path.with_last(index);

        let key = drv.bip32_derive_secp256k1(p.as_slice())?;
        let public_key = public_key(&key);
        let g = LockupScript::p2pkh(&public_key).group();

        match group {
            Some(v) if v != g => continue,
            _ => (),
        }

        #[cfg(feature = "log")]
        log::debug!("derived account {} (group {})", p, g);

        let a = Account {
            path: p,
            index,
            group: g,
            key_type,
            public_key,
        };

        return Ok((a, key));
    }

    Err(Error::InvalidPath)
}
