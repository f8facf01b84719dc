// Copyright (c) 2024 The Alephium Ledger App Developers

//! [Account] objects returned by the device

use ledger_alph_apdu::{
    account::{AccountResp, KeyType},
    path::DerivationPath,
};
use ledger_alph_core::address::LockupScript;

use crate::Error;

/// Account derived on the device
#[derive(Clone, PartialEq, Debug)]
pub struct Account {
    /// Derivation path, with the index reached by the device
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
    /// Build an account from a device response, checking the reported group
    /// matches the group of the returned key and the requested group (if any)
    pub(crate) fn from_resp(
        path: &DerivationPath,
        group: Option<u8>,
        resp: AccountResp,
    ) -> Result<Self, Error> {
        let lockup = LockupScript::p2pkh(&resp.public_key);

        if lockup.group() != resp.group {
            return Err(Error::InvalidKey);
        }
        if group.map(|g| g != resp.group).unwrap_or(false) {
            return Err(Error::UnexpectedResponse);
        }
        if resp.index < path.last().unwrap_or(0) {
            return Err(Error::UnexpectedResponse);
        }

        Ok(Self {
            path: path.with_last(resp.index),
            index: resp.index,
            group: resp.group,
            key_type: resp.key_type,
            public_key: resp.public_key,
        })
    }

    /// P2PKH lockup script for the account
    pub fn lockup(&self) -> LockupScript {
        LockupScript::p2pkh(&self.public_key)
    }

    /// Base58 address for the account
    pub fn address(&self) -> String {
        self.lockup().address()
    }
}
