// Copyright (c) 2024 The Alephium Ledger App Developers

//! Ledger Alephium API Library (and CLI)
//!
//! Provides a [DeviceHandle] over any [Exchange] transport for fetching
//! application info, deriving and confirming accounts, and signing
//! transactions or hashes, as well as host-side [verify][verify::verify]
//! for returned signatures.

pub use ledger_transport::Exchange;

/// Re-export transports for consumer use
pub mod transport;
pub use transport::{GenericTransport, TcpOptions, TransportTcp};

#[cfg(feature = "transport_hid")]
pub use transport::{HidApi, TransportNativeHID};

/// Re-export `ledger-alph-apdu` for consumers
pub use ledger_alph_apdu::{self as apdu};

mod account;
pub use account::Account;

mod handle;
pub use handle::{AppInfo, DeviceHandle, SignedTx};

mod error;
pub use error::Error;

pub mod tx;

pub mod verify;

/// Device transport selection
#[derive(Copy, Clone, Debug, PartialEq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum Target {
    /// USB HID device
    Hid,
    /// TCP (speculos) device
    Tcp,
}

/// Generic ledger device handle (abstract over transport types)
pub type GenericHandle = DeviceHandle<GenericTransport>;

/// Connect to a TCP (speculos) device
pub async fn connect_tcp(opts: TcpOptions) -> Result<DeviceHandle<TransportTcp>, Error> {
    log::debug!("Connecting to {}", opts.socket_addr());

    let t = TransportTcp::new(opts).await?;

    Ok(DeviceHandle::from(t))
}

/// Open a transport for the selected target
pub async fn open(target: Target, tcp: &TcpOptions) -> Result<GenericTransport, Error> {
    let t = match target {
        #[cfg(feature = "transport_hid")]
        Target::Hid => {
            let api = HidApi::new().map_err(|e| Error::Transport(anyhow::anyhow!("{e}")))?;

            let n = TransportNativeHID::list_ledgers(&api).count();
            log::debug!("Found {} HID devices", n);

            GenericTransport::from(TransportNativeHID::new(&api)?)
        }
        #[cfg(not(feature = "transport_hid"))]
        Target::Hid => return Err(Error::NoDevice),
        Target::Tcp => {
            log::debug!("Connecting to {}", tcp.socket_addr());
            GenericTransport::from(TransportTcp::new(tcp.clone()).await?)
        }
    };

    log::debug!("Connected via {}", t);

    Ok(t)
}

/// Connect to a device using the selected transport
pub async fn connect(target: Target, tcp: &TcpOptions) -> Result<GenericHandle, Error> {
    let t = open(target, tcp).await?;

    Ok(DeviceHandle::from(t))
}
