// Copyright (c) 2024 The Alephium Ledger App Developers

//! `GetVersion` APDUs, reporting the application version along with the
//! group count and key types used when deriving accounts.

use encdec::{Decode, DecodeOwned, Encode};

use crate::{account::KeyType, ApduError, ApduStatic, Instruction, ALPH_APDU_CLA};

/// Fetch application info APDU (0 length)
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct AppInfoReq {}

impl ApduStatic for AppInfoReq {
    const CLA: u8 = ALPH_APDU_CLA;
    const INS: u8 = Instruction::GetVersion as u8;
}

impl Encode for AppInfoReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl DecodeOwned for AppInfoReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self {}, 0))
    }
}

bitflags::bitflags! {
    /// Application state and capability flags
    pub struct AppFlags: u8 {
        /// A signing or address review is in flight
        const BUSY = 1 << 0;

        /// `SignHash` is available
        const SIGN_HASH = 1 << 1;

        /// Accounts may be shown on the device for confirmation
        const VERIFY_ADDRESS = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Key types accepted by `GetAccount`
    pub struct KeyTypes: u8 {
        /// secp256k1 ECDSA
        const DEFAULT = 1 << KeyType::Default as u8;

        /// BIP340 schnorr
        const BIP340_SCHNORR = 1 << KeyType::Bip340Schnorr as u8;
    }
}

impl KeyTypes {
    /// Check whether a key type is supported
    pub fn supports(&self, key_type: KeyType) -> bool {
        self.bits() & (1 << key_type as u8) != 0
    }
}

/// Application information response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   PROTO_VER   |    GROUPS     |   KEY_TYPES   |     FLAGS     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   NAME_LEN    |                    NAME...                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  VERSION_LEN  |                   VERSION...                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AppInfoResp<'a> {
    /// Protocol version
    pub proto: u8,

    /// Number of address groups targeted by account derivation
    pub groups: u8,

    /// Supported key types
    pub key_types: KeyTypes,

    /// Application flags
    pub flags: AppFlags,

    /// Application name
    pub name: &'a str,

    /// Application version
    pub version: &'a str,
}

const HEADER_LEN: usize = 4;

impl<'a> Encode for AppInfoResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(HEADER_LEN + 1 + self.name.len() + 1 + self.version.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        buff[..HEADER_LEN].copy_from_slice(&[
            self.proto,
            self.groups,
            self.key_types.bits(),
            self.flags.bits(),
        ]);

        let mut n = HEADER_LEN;
        n += put_str(&mut buff[n..], self.name)?;
        n += put_str(&mut buff[n..], self.version)?;

        Ok(n)
    }
}

impl<'a> Decode<'a> for AppInfoResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        if buff.len() < HEADER_LEN {
            return Err(ApduError::InvalidLength);
        }

        // Unknown bits are reserved
        let key_types = KeyTypes::from_bits(buff[2]).ok_or(ApduError::InvalidEncoding)?;
        let flags = AppFlags::from_bits_truncate(buff[3]);

        let mut n = HEADER_LEN;
        let (name, m) = take_str(&buff[n..])?;
        n += m;
        let (version, m) = take_str(&buff[n..])?;
        n += m;

        Ok((
            Self {
                proto: buff[0],
                groups: buff[1],
                key_types,
                flags,
                name,
                version,
            },
            n,
        ))
    }
}

/// Write a length-prefixed string
fn put_str(buff: &mut [u8], s: &str) -> Result<usize, ApduError> {
    let len = u8::try_from(s.len()).map_err(|_| ApduError::InvalidLength)?;
    if buff.len() < 1 + s.len() {
        return Err(ApduError::InvalidLength);
    }

    buff[0] = len;
    buff[1..][..s.len()].copy_from_slice(s.as_bytes());

    Ok(1 + s.len())
}

/// Read a length-prefixed string
fn take_str(buff: &[u8]) -> Result<(&str, usize), ApduError> {
    let len = *buff.first().ok_or(ApduError::InvalidLength)? as usize;
    let d = buff.get(1..1 + len).ok_or(ApduError::InvalidLength)?;

    let s = core::str::from_utf8(d).map_err(|_| ApduError::Utf8)?;

    Ok((s, 1 + len))
}
