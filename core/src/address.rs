// Copyright (c) 2024 The Alephium Ledger App Developers

//! Lockup scripts, addresses and group arithmetic
//!
//! Addresses are the base58 encoding of a type-tagged lockup script, and
//! every script maps to one of [GROUP_NUM] groups via its 4 byte hint.

use alloc::{string::String, vec::Vec};

use blake2b_simd::Params;

use crate::tx::{
    compact::{put_i32, Reader},
    TxError,
};

/// Number of groups in the network
pub const GROUP_NUM: u8 = 4;

/// Maximum keys in a multi-signature lockup
pub const MAX_MULTISIG_KEYS: usize = 16;

const P2PKH: u8 = 0x00;
const P2MPKH: u8 = 0x01;
const P2SH: u8 = 0x02;
const P2C: u8 = 0x03;

/// Compute a BLAKE2b hash with 32 byte output
pub fn blake2b256(d: &[u8]) -> [u8; 32] {
    let h = Params::new().hash_length(32).hash(d);

    let mut o = [0u8; 32];
    o.copy_from_slice(h.as_bytes());
    o
}

/// Public key hash for a compressed secp256k1 key
pub fn pubkey_hash(public_key: &[u8; 33]) -> [u8; 32] {
    blake2b256(public_key)
}

/// DJB hash over the provided bytes
pub fn djb_hash(d: &[u8]) -> i32 {
    d.iter().fold(5381i32, |h, b| {
        (h << 5).wrapping_add(h).wrapping_add(*b as i32)
    })
}

/// Script hint for an asset lockup hash
pub fn script_hint(hash: &[u8; 32]) -> u32 {
    (djb_hash(hash) | 1) as u32
}

/// Group for a script hint
pub fn group_of_hint(hint: u32) -> u8 {
    let x = hint.to_be_bytes().iter().fold(0u8, |a, b| a ^ b);
    x % GROUP_NUM
}

/// Group of a base58 encoded address
pub fn group_of(address: &str) -> Result<u8, AddressError> {
    LockupScript::from_address(address).map(|l| l.group())
}

/// Address decoding errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum AddressError {
    /// Invalid base58 encoding
    #[cfg_attr(feature = "thiserror", error("invalid base58 encoding"))]
    Base58,

    /// Contract addresses do not hold assets
    #[cfg_attr(feature = "thiserror", error("contract address"))]
    Contract,

    /// Malformed lockup script
    #[cfg_attr(feature = "thiserror", error("malformed lockup script: {0}"))]
    Malformed(TxError),
}

impl From<TxError> for AddressError {
    fn from(e: TxError) -> Self {
        Self::Malformed(e)
    }
}

/// Asset lockup script
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LockupScript {
    /// Pay to public key hash
    P2PKH([u8; 32]),

    /// Pay to `m` of the listed public key hashes
    P2MPKH {
        /// Key hashes
        hashes: Vec<[u8; 32]>,
        /// Required signatures
        m: usize,
    },

    /// Pay to script hash
    P2SH([u8; 32]),
}

impl LockupScript {
    /// Create a P2PKH lockup for a compressed public key
    pub fn p2pkh(public_key: &[u8; 33]) -> Self {
        Self::P2PKH(pubkey_hash(public_key))
    }

    /// Script hint, for multi-signature lockups this uses the first key
    pub fn hint(&self) -> u32 {
        match self {
            Self::P2PKH(h) | Self::P2SH(h) => script_hint(h),
            Self::P2MPKH { hashes, .. } => match hashes.first() {
                Some(h) => script_hint(h),
                None => 0,
            },
        }
    }

    /// Group of the lockup script
    pub fn group(&self) -> u8 {
        group_of_hint(self.hint())
    }

    /// Base58 address for the lockup script
    pub fn address(&self) -> String {
        let mut b = Vec::with_capacity(34);
        self.write(&mut b);
        bs58::encode(b).into_string()
    }

    /// Parse a base58 address
    pub fn from_address(address: &str) -> Result<Self, AddressError> {
        let b = bs58::decode(address)
            .into_vec()
            .map_err(|_| AddressError::Base58)?;

        if b.first() == Some(&P2C) {
            return Err(AddressError::Contract);
        }

        let mut r = Reader::new(&b);
        let l = Self::read(&mut r)?;

        if r.remaining() != 0 {
            return Err(AddressError::Malformed(TxError::TrailingBytes));
        }

        Ok(l)
    }

    /// Read an encoded lockup script
    pub fn read(r: &mut Reader) -> Result<Self, TxError> {
        match r.u8()? {
            P2PKH => Ok(Self::P2PKH(r.array()?)),
            P2MPKH => {
                let n = r.len(32)?;
                if n == 0 || n > MAX_MULTISIG_KEYS {
                    return Err(TxError::InvalidMultisig);
                }

                let mut hashes = Vec::with_capacity(n);
                for _ in 0..n {
                    hashes.push(r.array()?);
                }

                let m = r.i32()?;
                if m < 1 || m as usize > n {
                    return Err(TxError::InvalidMultisig);
                }

                Ok(Self::P2MPKH {
                    hashes,
                    m: m as usize,
                })
            }
            P2SH => Ok(Self::P2SH(r.array()?)),
            _ => Err(TxError::InvalidLockupScript),
        }
    }

    /// Append the encoded lockup script
    pub fn write(&self, buff: &mut Vec<u8>) {
        match self {
            Self::P2PKH(h) => {
                buff.push(P2PKH);
                buff.extend_from_slice(h);
            }
            Self::P2MPKH { hashes, m } => {
                buff.push(P2MPKH);
                put_i32(buff, hashes.len() as i32);
                for h in hashes {
                    buff.extend_from_slice(h);
                }
                put_i32(buff, *m as i32);
            }
            Self::P2SH(h) => {
                buff.push(P2SH);
                buff.extend_from_slice(h);
            }
        }
    }
}
