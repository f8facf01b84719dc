// Copyright (c) 2024 The Alephium Ledger App Developers

//! 256-bit unsigned integer for token amounts and fee computation

use core::cmp::Ordering;

use crypto_bigint::{CheckedAdd, CheckedMul, Encoding, NonZero};

/// Maximum decimal digits of a [U256]
pub const U256_MAX_DIGITS: usize = 78;

/// 256-bit unsigned amount
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct U256(crypto_bigint::U256);

impl U256 {
    /// Zero value
    pub const ZERO: Self = Self(crypto_bigint::U256::ZERO);

    /// Maximum value
    pub const MAX: Self = Self(crypto_bigint::U256::MAX);

    /// Create from a u64
    pub const fn from_u64(v: u64) -> Self {
        Self(crypto_bigint::U256::from_u64(v))
    }

    /// Create from up to 32 big-endian bytes
    pub fn from_be_slice(b: &[u8]) -> Option<Self> {
        if b.len() > 32 {
            return None;
        }

        let mut full = [0u8; 32];
        full[32 - b.len()..].copy_from_slice(b);

        Some(Self::from_be_bytes(&full))
    }

    /// Create from 32 big-endian bytes
    pub fn from_be_bytes(b: &[u8; 32]) -> Self {
        Self(crypto_bigint::U256::from_be_bytes(*b))
    }

    /// Encode to 32 big-endian bytes
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes()
    }

    /// Number of bytes required to represent the value (zero for zero)
    pub fn byte_len(&self) -> usize {
        (self.0.bits() + 7) / 8
    }

    /// Check whether the value is zero
    pub fn is_zero(&self) -> bool {
        self.0 == crypto_bigint::U256::ZERO
    }

    /// Convert to u64 where the value fits
    pub fn as_u64(&self) -> Option<u64> {
        if self.byte_len() > 8 {
            return None;
        }

        let b = self.to_be_bytes();
        let mut v = [0u8; 8];
        v.copy_from_slice(&b[24..]);

        Some(u64::from_be_bytes(v))
    }

    /// Checked addition
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        Option::from(self.0.checked_add(&other.0)).map(Self)
    }

    /// Checked multiplication
    pub fn checked_mul(&self, other: &Self) -> Option<Self> {
        Option::from(self.0.checked_mul(&other.0)).map(Self)
    }

    /// Divide by a non-zero value, returning quotient and remainder
    pub fn div_rem(&self, d: u64) -> Option<(Self, u64)> {
        let d: Option<NonZero<crypto_bigint::U256>> =
            NonZero::new(crypto_bigint::U256::from_u64(d)).into();

        let (q, r) = self.0.div_rem(&d?);
        Self(r).as_u64().map(|r| (Self(q), r))
    }

    /// Write the decimal representation to the start of `buff`,
    /// returning the number of digits written
    pub fn write_decimal(&self, buff: &mut [u8]) -> Option<usize> {
        let mut digits = [0u8; U256_MAX_DIGITS];
        let mut n = 0;
        let mut v = *self;

        loop {
            let (q, r) = v.div_rem(10)?;
            digits[n] = b'0' + r as u8;
            n += 1;
            v = q;

            if v.is_zero() {
                break;
            }
        }

        if buff.len() < n {
            return None;
        }

        for (i, d) in digits[..n].iter().rev().enumerate() {
            buff[i] = *d;
        }

        Some(n)
    }
}

impl From<u64> for U256 {
    fn from(v: u64) -> Self {
        Self::from_u64(v)
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl core::fmt::Display for U256 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut buff = [0u8; U256_MAX_DIGITS];
        let n = self.write_decimal(&mut buff).ok_or(core::fmt::Error)?;
        let s = core::str::from_utf8(&buff[..n]).map_err(|_| core::fmt::Error)?;
        f.write_str(s)
    }
}

impl core::fmt::Debug for U256 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "U256({self})")
    }
}
