// Copyright (c) 2024 The Alephium Ledger App Developers

//! Compact integer encoding
//!
//! The two most significant bits of the first byte select the mode:
//!
//! | mode | length                                  | payload                     |
//! |------|-----------------------------------------|-----------------------------|
//! | 0b00 | 1 byte                                  | low 6 bits                  |
//! | 0b01 | 2 bytes                                 | low 14 bits, big-endian     |
//! | 0b10 | 4 bytes                                 | low 30 bits, big-endian     |
//! | 0b11 | header byte then `4 + (b & 0x3f)` bytes | following bytes, big-endian |
//!
//! Signed values sign-extend the payload. Only the shortest encoding of a
//! value is accepted.

use alloc::vec::Vec;

use super::{TxError, U256};

const MODE_MASK: u8 = 0xc0;
const PAYLOAD_MASK: u8 = 0x3f;

const SINGLE_BYTE: u8 = 0x00;
const TWO_BYTE: u8 = 0x40;
const FOUR_BYTE: u8 = 0x80;
const MULTI_BYTE: u8 = 0xc0;

/// Byte reader over an encoded transaction
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buff: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over the provided buffer
    pub fn new(buff: &'a [u8]) -> Self {
        Self { buff, index: 0 }
    }

    /// Bytes remaining
    pub fn remaining(&self) -> usize {
        self.buff.len() - self.index
    }

    /// Bytes consumed
    pub fn position(&self) -> usize {
        self.index
    }

    /// Read a single byte
    pub fn u8(&mut self) -> Result<u8, TxError> {
        let b = *self.buff.get(self.index).ok_or(TxError::Truncated)?;
        self.index += 1;
        Ok(b)
    }

    /// Read `n` bytes
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], TxError> {
        if self.remaining() < n {
            return Err(TxError::Truncated);
        }

        let b = &self.buff[self.index..][..n];
        self.index += n;
        Ok(b)
    }

    /// Read a fixed size array
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], TxError> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.bytes(N)?);
        Ok(a)
    }

    /// Read a big-endian u64
    pub fn u64_be(&mut self) -> Result<u64, TxError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// Read a compact signed 32-bit integer
    pub fn i32(&mut self) -> Result<i32, TxError> {
        let start = self.index;
        let b = self.u8()?;

        let v = match b & MODE_MASK {
            SINGLE_BYTE => sign_extend((b & PAYLOAD_MASK) as u32, 6),
            TWO_BYTE => {
                let l = self.u8()?;
                sign_extend(((b & PAYLOAD_MASK) as u32) << 8 | l as u32, 14)
            }
            FOUR_BYTE => {
                let r = self.array::<3>()?;
                let v = ((b & PAYLOAD_MASK) as u32) << 24
                    | (r[0] as u32) << 16
                    | (r[1] as u32) << 8
                    | r[2] as u32;
                sign_extend(v, 30)
            }
            _ => {
                // Multi-byte i32 values are always 4 bytes
                if b & PAYLOAD_MASK != 0 {
                    return Err(TxError::NonCanonical);
                }
                i32::from_be_bytes(self.array()?)
            }
        };

        if i32_len(v) != self.index - start {
            return Err(TxError::NonCanonical);
        }

        Ok(v)
    }

    /// Read a compact unsigned 256-bit integer
    pub fn u256(&mut self) -> Result<U256, TxError> {
        let start = self.index;
        let b = self.u8()?;

        let v = match b & MODE_MASK {
            SINGLE_BYTE => U256::from_u64((b & PAYLOAD_MASK) as u64),
            TWO_BYTE => {
                let l = self.u8()?;
                U256::from_u64(((b & PAYLOAD_MASK) as u64) << 8 | l as u64)
            }
            FOUR_BYTE => {
                let r = self.array::<3>()?;
                let v = ((b & PAYLOAD_MASK) as u64) << 24
                    | (r[0] as u64) << 16
                    | (r[1] as u64) << 8
                    | r[2] as u64;
                U256::from_u64(v)
            }
            _ => {
                let n = (b & PAYLOAD_MASK) as usize + 4;
                if n > 32 {
                    return Err(TxError::Overflow);
                }
                let d = self.bytes(n)?;
                U256::from_be_slice(d).ok_or(TxError::Overflow)?
            }
        };

        if u256_len(&v) != self.index - start {
            return Err(TxError::NonCanonical);
        }

        Ok(v)
    }

    /// Read a collection length, bounds checked against the remaining
    /// buffer using the minimum encoded size of an element
    pub fn len(&mut self, min_element_size: usize) -> Result<usize, TxError> {
        let n = self.i32()?;
        if n < 0 {
            return Err(TxError::InvalidLength);
        }

        let n = n as usize;
        match n.checked_mul(min_element_size) {
            Some(v) if v <= self.remaining() => Ok(n),
            _ => Err(TxError::Truncated),
        }
    }
}

fn sign_extend(v: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((v << shift) as i32) >> shift
}

/// Encoded length of a compact i32
pub fn i32_len(v: i32) -> usize {
    match v {
        -0x20..=0x1f => 1,
        -0x2000..=0x1fff => 2,
        -0x2000_0000..=0x1fff_ffff => 4,
        _ => 5,
    }
}

/// Encoded length of a compact U256
pub fn u256_len(v: &U256) -> usize {
    match v.as_u64() {
        Some(v) if v < 0x40 => 1,
        Some(v) if v < 0x4000 => 2,
        Some(v) if v < 0x4000_0000 => 4,
        _ => 1 + v.byte_len().max(4),
    }
}

/// Append a compact i32
pub fn put_i32(buff: &mut Vec<u8>, v: i32) {
    let b = v.to_be_bytes();
    match i32_len(v) {
        1 => buff.push(b[3] & PAYLOAD_MASK),
        2 => buff.extend_from_slice(&[(b[2] & PAYLOAD_MASK) | TWO_BYTE, b[3]]),
        4 => buff.extend_from_slice(&[(b[0] & PAYLOAD_MASK) | FOUR_BYTE, b[1], b[2], b[3]]),
        _ => {
            buff.push(MULTI_BYTE);
            buff.extend_from_slice(&b);
        }
    }
}

/// Append a compact U256
pub fn put_u256(buff: &mut Vec<u8>, v: &U256) {
    let b = v.to_be_bytes();
    match u256_len(v) {
        1 => buff.push(b[31]),
        2 => buff.extend_from_slice(&[b[30] | TWO_BYTE, b[31]]),
        4 => buff.extend_from_slice(&[b[28] | FOUR_BYTE, b[29], b[30], b[31]]),
        n => {
            let n = n - 1;
            buff.push(MULTI_BYTE | (n - 4) as u8);
            buff.extend_from_slice(&b[32 - n..]);
        }
    }
}
