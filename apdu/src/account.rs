// Copyright (c) 2024 The Alephium Ledger App Developers

//! Account derivation APDUs

use encdec::{Decode, DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

use crate::{
    helpers::arr, path::DerivationPath, ApduError, ApduStatic, Instruction, ALPH_APDU_CLA,
};

/// Group value used on the wire when no group is requested
pub const GROUP_NONE: u8 = 0xff;

/// Key / signature scheme for account derivation
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum KeyType {
    /// secp256k1 ECDSA
    #[strum(serialize = "default")]
    Default = 0x00,

    /// BIP340 schnorr (not supported by the device)
    #[strum(serialize = "bip340-schnorr")]
    Bip340Schnorr = 0x01,
}

impl Default for KeyType {
    fn default() -> Self {
        Self::Default
    }
}

impl Encode for KeyType {
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

impl DecodeOwned for KeyType {
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

/// Request an account for the provided derivation path,
/// optionally searching forward from the final path index for
/// an account in the requested group.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     GROUP     |   KEY_TYPE    |            PATH...            /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /   DISPLAY?    |
/// +-+-+-+-+-+-+-+-+
/// ```
///
/// `GROUP` is [GROUP_NONE] where no group is requested. The optional
/// `DISPLAY` byte (`0x01`) asks the device to show the derived address for
/// confirmation, a missing byte is treated as `0x00`.
#[derive(Clone, PartialEq, Debug)]
pub struct AccountReq {
    /// Base derivation path
    pub path: DerivationPath,

    /// Target group
    pub group: Option<u8>,

    /// Key type
    pub key_type: KeyType,

    /// Show the address on the device for confirmation
    pub display: bool,
}

impl AccountReq {
    /// Create a new account request
    pub fn new(path: DerivationPath, group: Option<u8>, key_type: KeyType) -> Self {
        Self {
            path,
            group,
            key_type,
            display: false,
        }
    }

    /// Request on-device address confirmation
    pub fn with_display(mut self) -> Self {
        self.display = true;
        self
    }
}

impl ApduStatic for AccountReq {
    const CLA: u8 = ALPH_APDU_CLA;
    const INS: u8 = Instruction::GetAccount as u8;
}

impl Encode for AccountReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(2 + self.path.encode_len()? + self.display as usize)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.group.unwrap_or(GROUP_NONE);
        self.key_type.encode(&mut buff[1..])?;

        let mut n = 2 + self.path.encode(&mut buff[2..])?;

        if self.display {
            buff[n] = 0x01;
            n += 1;
        }

        Ok(n)
    }
}

impl DecodeOwned for AccountReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        if buff.len() < 2 {
            return Err(ApduError::InvalidLength);
        }

        let group = match buff[0] {
            GROUP_NONE => None,
            g => Some(g),
        };
        let (key_type, _) = KeyType::decode_owned(&buff[1..])?;
        let (path, n) = DerivationPath::decode_owned(&buff[2..])?;
        let mut n = 2 + n;

        let display = match &buff[n..] {
            [] => false,
            [0x00] => false,
            [0x01] => true,
            _ => return Err(ApduError::InvalidEncoding),
        };
        n += display as usize;

        Ok((
            Self {
                path,
                group,
                key_type,
                display,
            },
            n,
        ))
    }
}

/// Account response APDU, containing the derived index, group, and
/// compressed secp256k1 public key. The address is computed from the
/// public key on the host.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         DERIVED_INDEX                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     GROUP     |   KEY_TYPE    |                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// /                 PUBLIC_KEY (33 bytes, compressed)             /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct AccountResp {
    /// Final path index reached by derivation
    pub index: u32,

    /// Account group
    pub group: u8,

    /// Key type
    pub key_type: KeyType,

    /// Compressed public key
    #[encdec(with = "arr")]
    pub public_key: [u8; 33],
}
