// Copyright (c) 2024 The Alephium Ledger App Developers

//! Transports and chunked request exchange
//!
//! Devices are reached via [ledger_transport::Exchange] implementations,
//! HID (with the `transport_hid` feature) or TCP for the speculos simulator.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    ops::Deref,
    time::Duration,
};

use encdec::{Decode, Encode};
use ledger_transport::{async_trait, APDUAnswer, APDUCommand, Exchange};
use log::trace;
use strum::Display;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
};

#[cfg(feature = "transport_hid")]
pub use ledger_transport_hid::{hidapi::HidApi, LedgerHIDError, TransportNativeHID};

use ledger_alph_apdu::{
    frame::{frame, Chunk, ChunkFlags},
    status::SW_OK,
    ApduError, ALPH_APDU_CLA,
};

use crate::Error;

/// Options for TCP connections, defaulting to the speculos simulator
#[derive(Clone, PartialEq, Debug, clap::Args)]
pub struct TcpOptions {
    /// Speculos APDU address
    #[clap(long, default_value = "127.0.0.1")]
    pub addr: IpAddr,

    /// Speculos APDU port
    #[clap(long, default_value = "1237")]
    pub port: u16,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 1237,
        }
    }
}

impl TcpOptions {
    /// Socket address for the connection
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// TCP transport using the speculos APDU framing
/// (`LEN:u32be || APDU`, answered with `LEN:u32be || DATA || SW1 SW2`
/// where `LEN` excludes the status word)
pub struct TransportTcp {
    stream: Mutex<TcpStream>,
}

impl TransportTcp {
    /// Connect to a TCP device
    pub async fn new(opts: TcpOptions) -> Result<Self, Error> {
        let stream = TcpStream::connect(opts.socket_addr()).await?;

        Ok(Self {
            stream: Mutex::new(stream),
        })
    }
}

#[async_trait]
impl Exchange for TransportTcp {
    type Error = Error;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(&self, command: &APDUCommand<I>) -> Result<APDUAnswer<Vec<u8>>, Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        let req = command.serialize();

        let mut s = self.stream.lock().await;

        trace!("tx: {:02x?}", req);

        let mut b = Vec::with_capacity(req.len() + 4);
        b.extend_from_slice(&(req.len() as u32).to_be_bytes());
        b.extend_from_slice(&req);
        s.write_all(&b).await?;

        let mut len = [0u8; 4];
        s.read_exact(&mut len).await?;
        let n = u32::from_be_bytes(len) as usize + 2;

        if n > MAX_RESPONSE_LEN {
            return Err(Error::InvalidLength);
        }
        let mut resp = vec![0u8; n];
        s.read_exact(&mut resp).await?;

        trace!("rx: {:02x?}", resp);

        APDUAnswer::from_answer(resp).map_err(|_| Error::UnexpectedResponse)
    }
}

/// Maximum response APDU length (`DATA || SW1 SW2`)
pub const MAX_RESPONSE_LEN: usize = 258;

/// Generic ledger device (abstract over transport types)
#[derive(Display)]
#[non_exhaustive]
pub enum GenericTransport {
    #[cfg(feature = "transport_hid")]
    Hid(TransportNativeHID),
    Tcp(TransportTcp),
}

/// Convert a HID transport into a generic transport
#[cfg(feature = "transport_hid")]
impl From<TransportNativeHID> for GenericTransport {
    fn from(t: TransportNativeHID) -> Self {
        Self::Hid(t)
    }
}

/// Convert a TCP transport into a generic transport
impl From<TransportTcp> for GenericTransport {
    fn from(t: TransportTcp) -> Self {
        Self::Tcp(t)
    }
}

/// Implementation of [Exchange] for [GenericTransport], hiding transport error types
#[async_trait]
impl Exchange for GenericTransport {
    type Error = Error;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(&self, command: &APDUCommand<I>) -> Result<APDUAnswer<Vec<u8>>, Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        let r = match self {
            #[cfg(feature = "transport_hid")]
            Self::Hid(t) => t.exchange(command).await?,
            Self::Tcp(t) => t.exchange(command).await?,
        };

        Ok(r)
    }
}

#[cfg(feature = "transport_hid")]
impl From<LedgerHIDError> for Error {
    fn from(e: LedgerHIDError) -> Self {
        match e {
            LedgerHIDError::DeviceNotFound => Error::NoDevice,
            LedgerHIDError::Io(e) => Error::Io(e),
            e => Error::Transport(anyhow::anyhow!("{e}")),
        }
    }
}

/// Build the request APDU for a chunk
fn command<'a>(c: &Chunk<'a>) -> APDUCommand<&'a [u8]> {
    let flags = match c.more {
        true => ChunkFlags::MORE,
        false => ChunkFlags::empty(),
    };

    APDUCommand {
        cla: ALPH_APDU_CLA,
        ins: c.ins,
        p1: c.seq,
        p2: flags.bits(),
        data: c.data,
    }
}

/// Frame a request payload into chunks and exchange these with the device,
/// returning the response data for the final chunk.
///
/// Each chunk is subject to `timeout`, a non-success status fails the request
/// with the corresponding [Error].
pub async fn request<T>(t: &T, ins: u8, payload: &[u8], timeout: Duration) -> Result<Vec<u8>, Error>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    let mut data = Vec::new();

    for c in frame(ins, payload)? {
        let cmd = command(&c);

        let answer = tokio::time::timeout(timeout, t.exchange(&cmd))
            .await?
            .map_err(Into::<Error>::into)?;

        let sw = answer.retcode();
        if sw != SW_OK {
            return Err(Error::from_status(sw));
        }

        data = answer.data().to_vec();
    }

    Ok(data)
}

/// Encode a request payload
pub(crate) fn encode<A: Encode<Error = ApduError>>(a: &A) -> Result<Vec<u8>, Error> {
    let mut b = vec![0u8; a.encode_len()?];
    let n = a.encode(&mut b)?;
    b.truncate(n);
    Ok(b)
}

/// Decode a response payload
pub(crate) fn decode<'a, R: Decode<'a, Error = ApduError>>(d: &'a [u8]) -> Result<R::Output, Error> {
    let (v, _n) = R::decode(d)?;
    Ok(v)
}
