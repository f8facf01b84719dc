// Copyright (c) 2024 The Alephium Ledger App Developers

use k256::ecdsa::SigningKey;

use super::Error;

/// [`Driver`] trait provides platform support for [`Engine`][super::Engine] instances
pub trait Driver {
    /// BIP32 derivation for secp256k1 keys
    fn bip32_derive_secp256k1(&self, path: &[u32]) -> Result<SigningKey, Error>;
}

impl<T: Driver> Driver for &T {
    fn bip32_derive_secp256k1(&self, path: &[u32]) -> Result<SigningKey, Error> {
        T::bip32_derive_secp256k1(self, path)
    }
}

impl<T: Driver> Driver for &mut T {
    fn bip32_derive_secp256k1(&self, path: &[u32]) -> Result<SigningKey, Error> {
        T::bip32_derive_secp256k1(self, path)
    }
}

/// [Driver] deriving keys from an in-memory BIP39 seed, for hosts and tests
#[cfg(feature = "seed")]
pub struct SeedDriver {
    seed: [u8; 64],
}

#[cfg(feature = "seed")]
impl SeedDriver {
    /// Create a driver from a 64 byte BIP39 seed
    pub fn new(seed: [u8; 64]) -> Self {
        Self { seed }
    }

    /// Create a driver from a BIP39 seed slice
    pub fn from_slice(seed: &[u8]) -> Option<Self> {
        let seed: [u8; 64] = seed.try_into().ok()?;
        Some(Self { seed })
    }
}

#[cfg(feature = "seed")]
impl Driver for SeedDriver {
    fn bip32_derive_secp256k1(&self, path: &[u32]) -> Result<SigningKey, Error> {
        use bip32::{ChildNumber, XPrv};
        use ledger_alph_apdu::path::HARDENED;

        let mut xprv = XPrv::new(self.seed).map_err(|_| Error::InvalidPath)?;

        for i in path {
            let child = ChildNumber::new(i & !HARDENED, i & HARDENED != 0)
                .map_err(|_| Error::InvalidPath)?;

            xprv = xprv.derive_child(child).map_err(|_| Error::InvalidPath)?;
        }

        Ok(xprv.private_key().clone())
    }
}

#[cfg(feature = "seed")]
impl Drop for SeedDriver {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.seed.zeroize();
    }
}
