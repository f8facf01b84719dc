// Copyright (c) 2024 The Alephium Ledger App Developers

//! BIP32 derivation path encoding
//!
//! ## Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     DEPTH     |                 INDEX[0] ...                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /       ...     |         INDEX[DEPTH-1] (u32 LE each)          /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use core::{fmt::Display, str::FromStr};

use byteorder::{ByteOrder, LittleEndian};
use encdec::{DecodeOwned, Encode};
use heapless::Vec;

use crate::ApduError;

/// Maximum depth accepted on the wire
pub const MAX_PATH_DEPTH: usize = 8;

/// Hardened index flag
pub const HARDENED: u32 = 1 << 31;

/// BIP32 derivation path, a sequence of child indices with
/// [HARDENED] set for hardened children
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DerivationPath(Vec<u32, MAX_PATH_DEPTH>);

impl DerivationPath {
    /// Create a path from raw indices
    pub fn new(indices: &[u32]) -> Result<Self, ApduError> {
        Vec::from_slice(indices)
            .map(Self)
            .map_err(|_| ApduError::InvalidLength)
    }

    /// Path indices
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of path components
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Final path index
    pub fn last(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// Copy of this path with the final index replaced
    pub fn with_last(&self, index: u32) -> Self {
        let mut p = self.clone();
        if let Some(v) = p.0.last_mut() {
            *v = index;
        }
        p
    }
}

impl AsRef<[u32]> for DerivationPath {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

/// Display path in `m/44'/1234'/0'/0/0` form
impl Display for DerivationPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "m")?;
        for i in self.0.iter() {
            match i & HARDENED != 0 {
                true => write!(f, "/{}'", i & !HARDENED)?,
                false => write!(f, "/{i}")?,
            }
        }
        Ok(())
    }
}

/// Parse paths in `m/44'/1234'/0'/0/0` form, `h` is accepted as a hardened marker
impl FromStr for DerivationPath {
    type Err = ApduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('m').unwrap_or(s);
        let s = s.strip_prefix('/').unwrap_or(s);

        let mut p = Vec::new();
        if s.is_empty() {
            return Ok(Self(p));
        }

        for c in s.split('/') {
            let (c, hardened) = match c.strip_suffix(&['\'', 'h'][..]) {
                Some(v) => (v, true),
                None => (c, false),
            };

            let i = u32::from_str(c).map_err(|_| ApduError::InvalidEncoding)?;
            if i & HARDENED != 0 {
                return Err(ApduError::InvalidEncoding);
            }

            let i = if hardened { i | HARDENED } else { i };
            p.push(i).map_err(|_| ApduError::InvalidLength)?;
        }

        Ok(Self(p))
    }
}

impl Encode for DerivationPath {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + self.0.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.0.len() as u8;
        for (i, v) in self.0.iter().enumerate() {
            LittleEndian::write_u32(&mut buff[1 + i * 4..], *v);
        }

        Ok(n)
    }
}

impl DecodeOwned for DerivationPath {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let depth = match buff.first() {
            Some(d) => *d as usize,
            None => return Err(ApduError::InvalidPath),
        };

        // Excess depth and truncated indices are both path errors
        if depth > MAX_PATH_DEPTH || buff.len() < 1 + depth * 4 {
            return Err(ApduError::InvalidPath);
        }

        let mut p = Vec::new();
        for i in 0..depth {
            // Capacity checked above
            let _ = p.push(LittleEndian::read_u32(&buff[1 + i * 4..]));
        }

        Ok((Self(p), 1 + depth * 4))
    }
}

#[cfg(test)]
mod test {
    use alloc::string::ToString;

    use encdec::Decode;

    use super::*;

    #[test]
    fn parse_display() {
        let tests: &[(&str, &str, &[u32])] = &[
            (
                "m/44'/1234'/0'/0/0",
                "m/44'/1234'/0'/0/0",
                &[44 | HARDENED, 1234 | HARDENED, HARDENED, 0, 0],
            ),
            (
                "m/44h/1234h/1h/0/7",
                "m/44'/1234'/1'/0/7",
                &[44 | HARDENED, 1234 | HARDENED, 1 | HARDENED, 0, 7],
            ),
        ];

        for (s, display, v) in tests {
            let p = DerivationPath::from_str(s).unwrap();
            assert_eq!(p.as_slice(), *v);
            assert_eq!(&p.to_string(), display);
        }
    }

    #[test]
    fn parse_invalid() {
        for s in ["m/44'/x/0", "m/2147483648/0", "m/1/2/3/4/5/6/7/8/9"] {
            assert!(DerivationPath::from_str(s).is_err(), "{s} should fail");
        }
    }

    #[test]
    fn encode_decode() {
        let p = DerivationPath::from_str("m/44'/1234'/0'/0/3").unwrap();

        let mut buff = [0u8; 64];
        let n = p.encode(&mut buff).unwrap();
        assert_eq!(n, 21);

        let (d, m) = DerivationPath::decode(&buff[..n]).unwrap();
        assert_eq!(d, p);
        assert_eq!(m, n);
    }

    #[test]
    fn decode_invalid() {
        // Truncated indices
        let buff = [5u8, 0, 0, 0];
        assert_eq!(DerivationPath::decode(&buff), Err(ApduError::InvalidPath));

        // Missing depth
        assert_eq!(DerivationPath::decode(&[]), Err(ApduError::InvalidPath));

        // Depth exceeds the maximum
        let mut buff = [0u8; 64];
        buff[0] = MAX_PATH_DEPTH as u8 + 1;
        assert_eq!(DerivationPath::decode(&buff), Err(ApduError::InvalidPath));

        // Maximum depth is accepted
        buff[0] = MAX_PATH_DEPTH as u8;
        let (p, n) = DerivationPath::decode(&buff).unwrap();
        assert_eq!(p.depth(), MAX_PATH_DEPTH);
        assert_eq!(n, 1 + MAX_PATH_DEPTH * 4);
    }
}
