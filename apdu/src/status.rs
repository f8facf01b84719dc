// Copyright (c) 2024 The Alephium Ledger App Developers

//! Response status words
//!
//! Every response ends with a big-endian status word, [SW_OK] on success or
//! `SW_ERROR_BASE | code` where `code` identifies the failure. ISO7816 codes
//! are taken from [ledger_apdu::APDUErrorCode] so device and host agree with
//! the transport crates.

use ledger_apdu::APDUErrorCode;

use crate::ApduError;

/// Success
pub const SW_OK: u16 = APDUErrorCode::NoError as u16;

/// Base for application error codes
pub const SW_ERROR_BASE: u16 = 0x6a00;

/// Instruction not supported
pub const SW_UNKNOWN_INS: u16 = APDUErrorCode::InsNotSupported as u16;

/// Build a status word for an application error code
pub const fn error_status(code: u8) -> u16 {
    SW_ERROR_BASE | code as u16
}

/// Fetch the application error code from a status word, if any
pub const fn error_code(sw: u16) -> Option<u8> {
    if sw & 0xff00 == SW_ERROR_BASE && sw & 0x00ff != 0 {
        Some((sw & 0x00ff) as u8)
    } else {
        None
    }
}

/// Write a status word following `n` bytes of response data,
/// returning the full response length
pub fn append_status(buff: &mut [u8], n: usize, sw: u16) -> Result<usize, ApduError> {
    if buff.len() < n + 2 {
        return Err(ApduError::InvalidLength);
    }

    buff[n..][..2].copy_from_slice(&sw.to_be_bytes());

    Ok(n + 2)
}
