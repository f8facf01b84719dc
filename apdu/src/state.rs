// Copyright (c) 2024 The Alephium Ledger App Developers

//! Transaction state and identifier types
//!

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::{helpers::fmt_hex, ApduError};

/// Engine state enumeration
/// used in [`TxInfo`][crate::tx::TxInfo] to communicate transaction progress
#[derive(
    Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum TxState {
    /// No transaction in flight
    Init = 0x00,
    /// Receiving transaction chunks
    Loading = 0x01,
    /// Pending on-device review
    Review = 0x10,
    /// Transaction approved and signed
    Signed = 0x20,
    /// Transaction rejected by the user or aborted by the host
    Rejected = 0x21,
    /// Address confirmed by the user
    Verified = 0x22,
    /// Transaction complete, signature released
    Complete = 0x40,
    /// Transaction failed
    Error = 0xFF,
}

impl Encode for TxState {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }
        buff[0] = *self as u8;
        Ok(1)
    }
}

impl DecodeOwned for TxState {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match Self::try_from(buff[0]) {
            Ok(v) => Ok((v, 1)),
            Err(_) => Err(ApduError::InvalidEncoding),
        }
    }
}

/// Transaction identifier, the blake2b-256 hash of the serialised
/// unsigned transaction. Returned with transaction state so the host
/// can check the device decoded the transaction it sent.
#[derive(Copy, Clone, PartialEq, Eq, Default, Hash)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Create an empty (all zero) identifier
    pub const fn new() -> Self {
        Self([0u8; 32])
    }

    /// Check whether the identifier is unset
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for TxId {
    fn from(v: [u8; 32]) -> Self {
        Self(v)
    }
}

impl AsRef<[u8; 32]> for TxId {
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Debug format [TxId] as hex
impl core::fmt::Debug for TxId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_hex(&self.0, f)
    }
}

/// Display [TxId] as hex
impl core::fmt::Display for TxId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl Encode for TxId {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(32)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 32 {
            return Err(ApduError::InvalidLength);
        }
        buff[..32].copy_from_slice(&self.0);
        Ok(32)
    }
}

impl DecodeOwned for TxId {
    type Output = TxId;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 32 {
            return Err(ApduError::InvalidLength);
        }

        let mut d = [0u8; 32];
        d.copy_from_slice(&buff[..32]);
        Ok((Self(d), 32))
    }
}
