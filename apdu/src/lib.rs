// Copyright (c) 2024 The Alephium Ledger App Developers

//! Protocol / APDU definitions for Alephium app communication
//!
//! This module provides a protocol specification and reference implementation for communication
//! with Alephium hardware wallets.
//!
//! Requests are carried in ISO7816-style APDUs (`CLA INS P1 P2 LC DATA`), with messages larger
//! than a single APDU split into chunks by the [frame] module. Responses carry their payload
//! followed by a two byte status word, see [status].
//!
//! Fixed-size fields are encoded little-endian, with the exception of the unsigned transaction
//! payload which is passed through in the network's own serialisation.

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

pub mod account;
pub mod app_info;
pub mod frame;
pub mod path;
pub mod prelude;
pub mod state;
pub mod status;
pub mod tx;

mod helpers;

/// Alephium APDU Class
pub const ALPH_APDU_CLA: u8 = 0x80;

/// Protocol version reported by [app_info::AppInfoResp]
pub const ALPH_PROTO_VERSION: u8 = 0x01;

/// Alephium APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch application name / version
    GetVersion = 0x00,

    /// Derive an account for a path and optional group
    GetAccount = 0x01,

    /// Load an unsigned transaction (chunked) for review
    SignTx = 0x02,

    /// Fetch transaction state
    TxGetInfo = 0x03,

    /// Fetch signature for an approved transaction
    TxGetSignature = 0x04,

    /// Complete a transaction
    TxComplete = 0x05,

    /// Load a 32-byte hash for review and signing
    SignHash = 0x06,
}

/// APDU encode / decode errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum ApduError {
    /// Buffer too short or length field mismatch
    #[cfg_attr(feature = "thiserror", error("invalid length"))]
    InvalidLength,

    /// Field value could not be decoded
    #[cfg_attr(feature = "thiserror", error("invalid encoding"))]
    InvalidEncoding,

    /// String field is not valid utf8
    #[cfg_attr(feature = "thiserror", error("invalid utf8"))]
    Utf8,

    /// Derivation path depth exceeded or path truncated
    #[cfg_attr(feature = "thiserror", error("invalid derivation path"))]
    InvalidPath,
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            #[allow(unreachable_patterns)]
            _ => ApduError::InvalidEncoding,
        }
    }
}

/// Static class / instruction binding for request APDUs
pub trait ApduStatic {
    /// APDU class
    const CLA: u8;

    /// APDU instruction
    const INS: u8;
}
