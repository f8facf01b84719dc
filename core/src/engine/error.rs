// Copyright (c) 2024 The Alephium Ledger App Developers

use ledger_alph_apdu::{
    frame::FrameError,
    status::{error_code, error_status},
    ApduError,
};
use num_enum::TryFromPrimitive;
use strum::{EnumIter, EnumString};

use crate::tx::TxError;

/// [Engine][super::Engine] errors, returned to the host as `0x6a00 | code`
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumIter, EnumString, TryFromPrimitive)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum Error {
    /// Invalid or unsupported derivation path / group
    #[cfg_attr(feature = "thiserror", error("invalid derivation path"))]
    InvalidPath = 0x01,

    /// Key type not supported by the device
    #[cfg_attr(feature = "thiserror", error("BIP340 Schnorr is not supported yet"))]
    UnsupportedKeyType = 0x02,

    /// Transaction could not be decoded or failed validation
    #[cfg_attr(feature = "thiserror", error("malformed transaction"))]
    MalformedTransaction = 0x03,

    /// Message exceeds the maximum payload length
    #[cfg_attr(feature = "thiserror", error("payload too large"))]
    PayloadTooLarge = 0x04,

    /// A signing request is already in flight
    #[cfg_attr(feature = "thiserror", error("device busy"))]
    DeviceBusy = 0x05,

    /// Invalid APDU or chunk sequence
    #[cfg_attr(feature = "thiserror", error("protocol framing error"))]
    ProtocolFraming = 0x06,

    /// Transaction rejected by the user
    #[cfg_attr(feature = "thiserror", error("rejected by user"))]
    UserRejected = 0x07,

    /// No signature is available
    #[cfg_attr(feature = "thiserror", error("signing aborted"))]
    SigningAborted = 0x08,

    /// Host disconnected during a transfer
    #[cfg_attr(feature = "thiserror", error("transport disconnected"))]
    TransportDisconnected = 0x09,

    /// Unexpected event
    #[cfg_attr(feature = "thiserror", error("unexpected event"))]
    UnexpectedEvent = 0x0a,

    /// Pending user approval
    #[cfg_attr(feature = "thiserror", error("pending user approval"))]
    ApprovalPending = 0x0b,

    /// Response encoding failed
    #[cfg_attr(feature = "thiserror", error("response encoding failed"))]
    EncodingFailed = 0x0c,
}

impl Error {
    /// Status word for this error
    pub const fn status(&self) -> u16 {
        error_status(*self as u8)
    }

    /// Resolve an error from a response status word
    pub fn from_status(sw: u16) -> Option<Self> {
        error_code(sw).and_then(|c| Self::try_from(c).ok())
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::PayloadTooLarge => Error::PayloadTooLarge,
            FrameError::Framing => Error::ProtocolFraming,
            FrameError::Truncated => Error::TransportDisconnected,
        }
    }
}

impl From<TxError> for Error {
    fn from(_e: TxError) -> Self {
        Error::MalformedTransaction
    }
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::InvalidPath => Error::InvalidPath,
            _ => Error::ProtocolFraming,
        }
    }
}
