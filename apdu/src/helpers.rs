// Copyright (c) 2024 The Alephium Ledger App Developers

/// Encoding helper for fixed-size byte array fields
pub(crate) mod arr {
    use crate::ApduError;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < N {
            return Err(ApduError::InvalidLength);
        }

        buff[..N].copy_from_slice(&d[..]);

        Ok(N)
    }

    pub fn enc_len<const N: usize>(_d: &[u8; N]) -> Result<usize, ApduError> {
        Ok(N)
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), ApduError> {
        if buff.len() < N {
            return Err(ApduError::InvalidLength);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Write a hex string into a formatter
pub(crate) fn fmt_hex(d: &[u8], f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in d {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}
