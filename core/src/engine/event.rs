// Copyright (c) 2024 The Alephium Ledger App Developers

use encdec::Decode;

use ledger_alph_apdu::{frame::Chunk, prelude::*, ApduError};

/// [`Engine`][super::Engine] input events, typically decoded from request [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Event<'a> {
    None,

    /// Fetch application information
    GetVersion,

    /// Derive an account, optionally confirming the address on the device
    GetAccount {
        path: DerivationPath,
        group: Option<u8>,
        key_type: KeyType,
        display: bool,
    },

    /// Chunk of a transaction signing request
    TxChunk {
        seq: u8,
        more: bool,
        data: &'a [u8],
    },

    /// Review and sign a 32-byte hash
    SignHash { path: DerivationPath, hash: [u8; 32] },

    /// Fetch transaction state
    TxGetInfo,

    /// Fetch the signature for an approved transaction
    TxGetSignature,

    /// Complete the transaction, releasing the request
    TxComplete,

    /// Host disconnected
    Disconnect,
}

impl<'a> From<AppInfoReq> for Event<'a> {
    fn from(_: AppInfoReq) -> Self {
        Event::GetVersion
    }
}

impl<'a> From<AccountReq> for Event<'a> {
    fn from(a: AccountReq) -> Self {
        Event::GetAccount {
            path: a.path,
            group: a.group,
            key_type: a.key_type,
            display: a.display,
        }
    }
}

impl<'a> From<HashSignReq> for Event<'a> {
    fn from(r: HashSignReq) -> Self {
        Event::SignHash {
            path: r.path,
            hash: r.hash,
        }
    }
}

impl<'a> From<TxInfoReq> for Event<'a> {
    fn from(_: TxInfoReq) -> Self {
        Event::TxGetInfo
    }
}

impl<'a> From<TxSignatureReq> for Event<'a> {
    fn from(_: TxSignatureReq) -> Self {
        Event::TxGetSignature
    }
}

impl<'a> From<TxComplete> for Event<'a> {
    fn from(_: TxComplete) -> Self {
        Event::TxComplete
    }
}

impl<'a> From<Chunk<'a>> for Event<'a> {
    fn from(c: Chunk<'a>) -> Self {
        Event::TxChunk {
            seq: c.seq,
            more: c.more,
            data: c.data,
        }
    }
}

fn decode_event<'a, T>(buff: &'a [u8]) -> Result<Event<'a>, ApduError>
where
    T: Decode<'a, Error = ApduError>,
    Event<'a>: From<T::Output>,
{
    T::decode(buff).map(|(v, _n)| Event::from(v))
}

impl<'a> Event<'a> {
    /// Parse an incoming request chunk to engine event
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn parse(chunk: &Chunk<'a>) -> Result<Self, ApduError> {
        let buff = chunk.data;

        match Instruction::try_from(chunk.ins) {
            Ok(Instruction::GetVersion) => decode_event::<AppInfoReq>(buff),
            Ok(Instruction::GetAccount) => decode_event::<AccountReq>(buff),
            Ok(Instruction::SignTx) => Ok(Event::from(*chunk)),
            Ok(Instruction::TxGetInfo) => decode_event::<TxInfoReq>(buff),
            Ok(Instruction::TxGetSignature) => decode_event::<TxSignatureReq>(buff),
            Ok(Instruction::TxComplete) => decode_event::<TxComplete>(buff),
            Ok(Instruction::SignHash) => decode_event::<HashSignReq>(buff),
            Err(_) => Err(ApduError::InvalidEncoding),
        }
    }
}
