// Copyright (c) 2024 The Alephium Ledger App Developers

//! Unsigned transaction model and codec
//!
//! ## Encoding
//! ```text
//! UnsignedTx   := version:u8 networkId:u8 scriptOpt:u8(=0) gasAmount:I32c gasPrice:U256c
//!                 inputs:Vec<AssetInput> fixedOutputs:Vec<AssetOutput>
//! Vec<T>       := len:I32c T*
//! AssetInput   := hint:[u8;4] key:[u8;32] unlock:UnlockScript
//! UnlockScript := 0x00 pubkey:[u8;33] | 0x03
//! AssetOutput  := amount:U256c lockup:LockupScript lockTime:u64be
//!                 tokens:Vec<(id:[u8;32], amount:U256c)> additionalData:ByteString
//! ByteString   := len:I32c bytes
//! ```
//!
//! See [compact] for compact integer (`I32c`, `U256c`) encodings.

use alloc::vec::Vec;

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

use ledger_alph_apdu::state::TxId;

use crate::address::{blake2b256, pubkey_hash, LockupScript};

pub mod compact;

mod decode;

mod encode;

mod u256;
pub use u256::{U256, U256_MAX_DIGITS};

/// Supported transaction version
pub const TX_VERSION: u8 = 0;

/// Transaction decoding errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum TxError {
    /// Buffer ended early, or a length exceeds the remaining buffer
    #[cfg_attr(feature = "thiserror", error("truncated"))]
    Truncated,

    /// Bytes remain following the transaction
    #[cfg_attr(feature = "thiserror", error("trailing bytes"))]
    TrailingBytes,

    /// Compact integer is not minimally encoded
    #[cfg_attr(feature = "thiserror", error("non-canonical integer"))]
    NonCanonical,

    /// Integer exceeds its type
    #[cfg_attr(feature = "thiserror", error("integer overflow"))]
    Overflow,

    /// Negative or out of range length
    #[cfg_attr(feature = "thiserror", error("invalid length"))]
    InvalidLength,

    /// Unsupported transaction version
    #[cfg_attr(feature = "thiserror", error("unsupported version"))]
    InvalidVersion,

    /// Unknown network identifier
    #[cfg_attr(feature = "thiserror", error("unknown network"))]
    UnknownNetwork,

    /// Transaction carries a script
    #[cfg_attr(feature = "thiserror", error("scripts are not supported"))]
    UnsupportedScript,

    /// Gas amount is not positive
    #[cfg_attr(feature = "thiserror", error("invalid gas amount"))]
    InvalidGas,

    /// Transaction has no inputs
    #[cfg_attr(feature = "thiserror", error("no inputs"))]
    NoInputs,

    /// Unlock script is unknown or unsupported
    #[cfg_attr(feature = "thiserror", error("unsupported unlock script"))]
    InvalidUnlockScript,

    /// First input refers to a previous unlock script
    #[cfg_attr(feature = "thiserror", error("first input has no previous unlock script"))]
    SameAsPreviousFirst,

    /// Output reference hint does not match the unlocking key
    #[cfg_attr(feature = "thiserror", error("input hint does not match unlock key"))]
    HintMismatch,

    /// Inputs span multiple groups
    #[cfg_attr(feature = "thiserror", error("inputs from multiple groups"))]
    MixedGroups,

    /// Unknown or contract lockup script
    #[cfg_attr(feature = "thiserror", error("invalid lockup script"))]
    InvalidLockupScript,

    /// Invalid multi-signature parameters
    #[cfg_attr(feature = "thiserror", error("invalid multisig lockup"))]
    InvalidMultisig,

    /// Token listed more than once in an output
    #[cfg_attr(feature = "thiserror", error("duplicate token"))]
    DuplicateToken,
}

/// Network identifiers
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum Network {
    /// Main network
    #[strum(serialize = "mainnet")]
    Mainnet = 0,
    /// Test network
    #[strum(serialize = "testnet")]
    Testnet = 1,
    /// Local development network
    #[strum(serialize = "devnet")]
    Devnet = 4,
}

/// Reference to a previous output
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct OutputRef {
    /// Script hint of the referenced output
    pub hint: u32,
    /// Output key
    pub key: [u8; 32],
}

/// Input unlock script
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum UnlockScript {
    /// Public key for a P2PKH lockup
    P2PKH([u8; 33]),
    /// Same unlock script as the previous input
    SameAsPrevious,
}

/// Transaction input
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AssetInput {
    /// Spent output
    pub output_ref: OutputRef,
    /// Unlock script
    pub unlock: UnlockScript,
}

/// Token transfer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Token {
    /// Token identifier
    pub id: [u8; 32],
    /// Raw token amount
    pub amount: U256,
}

/// Transaction output
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AssetOutput {
    /// ALPH amount (18 decimals)
    pub amount: U256,
    /// Recipient
    pub lockup: LockupScript,
    /// Lock time in milliseconds since the epoch, zero where unlocked
    pub lock_time: u64,
    /// Token transfers
    pub tokens: Vec<Token>,
    /// Additional data (message)
    pub additional_data: Vec<u8>,
}

/// Unsigned transaction
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UnsignedTx {
    /// Transaction version
    pub version: u8,
    /// Target network
    pub network: Network,
    /// Gas amount
    pub gas_amount: i32,
    /// Gas price
    pub gas_price: U256,
    /// Inputs
    pub inputs: Vec<AssetInput>,
    /// Fixed outputs
    pub outputs: Vec<AssetOutput>,
}

/// Compute the identifier for a serialised transaction
pub fn tx_id(bytes: &[u8]) -> TxId {
    TxId(blake2b256(bytes))
}

impl UnsignedTx {
    /// Decode and validate a serialised transaction, returning the
    /// transaction and its identifier
    pub fn decode(bytes: &[u8]) -> Result<(Self, TxId), TxError> {
        let tx = decode::decode_tx(bytes)?;
        Ok((tx, tx_id(bytes)))
    }

    /// Serialise the transaction
    pub fn encode(&self) -> Vec<u8> {
        encode::encode_tx(self)
    }

    /// Transaction identifier
    pub fn id(&self) -> TxId {
        tx_id(&self.encode())
    }

    /// Fee, `gas_amount * gas_price`
    pub fn fee(&self) -> Option<U256> {
        let gas = U256::from_u64(self.gas_amount.max(0) as u64);
        gas.checked_mul(&self.gas_price)
    }

    /// Resolve the public key unlocking the input at `index`
    pub fn input_key(&self, index: usize) -> Option<&[u8; 33]> {
        self.inputs
            .get(..=index)?
            .iter()
            .rev()
            .find_map(|i| match &i.unlock {
                UnlockScript::P2PKH(k) => Some(k),
                UnlockScript::SameAsPrevious => None,
            })
    }

    /// Index of the change output, the final output where it pays the
    /// signer and more than one output is present
    pub fn change_index(&self, signer: &[u8; 33]) -> Option<usize> {
        if self.outputs.len() < 2 {
            return None;
        }

        let last = self.outputs.len() - 1;
        match &self.outputs[last].lockup {
            LockupScript::P2PKH(h) if *h == pubkey_hash(signer) => Some(last),
            _ => None,
        }
    }
}
