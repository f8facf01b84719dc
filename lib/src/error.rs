// Copyright (c) 2024 The Alephium Ledger App Developers

use ledger_alph_apdu::{frame::FrameError, state::TxState, ApduError};
use ledger_alph_core::{engine::Error as DeviceError, tx::TxError};
use tokio::time::error::Elapsed;

/// Ledger Alephium API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport error
    #[error("Transport error {0}")]
    Transport(anyhow::Error),

    /// I/O error
    #[error("I/O error {0}")]
    Io(#[from] std::io::Error),

    /// No device found
    #[error("No ledger device found")]
    NoDevice,

    /// Invalid response length
    #[error("Invalid response length")]
    InvalidLength,

    /// APDU encoding or decoding failed
    #[error("APDU codec error: {0:?}")]
    Apdu(ApduError),

    /// Request framing failed
    #[error("Framing error: {0:?}")]
    Framing(FrameError),

    /// Invalid transaction state
    #[error("Invalid transaction state (actual: {0}, expected: {1})")]
    InvalidState(TxState, TxState),

    /// Unexpected APDU response
    #[error("Unexpected APDU response")]
    UnexpectedResponse,

    /// Device computed a different transaction id
    #[error("Transaction id mismatch")]
    TxIdMismatch,

    /// Transaction could not be decoded locally
    #[error("Malformed transaction: {0:?}")]
    Transaction(TxError),

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// User rejected operation
    #[error("Operation rejected by user")]
    UserRejected,

    /// Requested key type is not supported by the device
    #[error("BIP340 Schnorr is not supported yet")]
    UnsupportedKeyType,

    /// Device returned an error status
    #[error("Device error 0x{0:04x} ({1:?})")]
    Device(u16, Option<DeviceError>),

    /// Invalid key in response
    #[error("Invalid key object")]
    InvalidKey,

    /// Signature failed verification
    #[error("Invalid signature")]
    InvalidSignature,
}

impl Error {
    /// Map a non-success status word to an [Error]
    pub fn from_status(sw: u16) -> Self {
        match DeviceError::from_status(sw) {
            Some(DeviceError::UserRejected) => Error::UserRejected,
            Some(DeviceError::UnsupportedKeyType) => Error::UnsupportedKeyType,
            kind => Error::Device(sw, kind),
        }
    }

    /// Fetch the device error kind where available
    pub fn device_error(&self) -> Option<DeviceError> {
        match self {
            Error::UserRejected => Some(DeviceError::UserRejected),
            Error::UnsupportedKeyType => Some(DeviceError::UnsupportedKeyType),
            Error::Device(_, kind) => *kind,
            _ => None,
        }
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        Error::Apdu(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Framing(e)
    }
}

impl From<TxError> for Error {
    fn from(e: TxError) -> Self {
        Error::Transaction(e)
    }
}
