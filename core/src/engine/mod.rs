// Copyright (c) 2024 The Alephium Ledger App Developers

//! The [Engine] provides functionality required by hardware wallets.
//!
//! This handles [Event] inputs and returns [Output] responses to the caller,
//! see [apdu][crate::apdu] for APDU protocol / encoding specifications.
//!
//! Signing requests move through the following states:
//!
//! ```text
//! Init -> Loading(n) -> Review(step) -> Signed -> Complete
//!                            |
//!                            +-> Rejected
//! ```
//!
//! with structural failures moving to `Error`. Hash signing requests skip
//! `Loading`, and account requests with on-device confirmation move from
//! `Review(0)` to `Verified` or `Rejected`. Only one request may be under
//! review, account and signing requests fail with [Error::DeviceBusy] until
//! the request is completed or abandoned.

use encdec::Decode;
use k256::ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use ledger_alph_apdu::{
    account::KeyType,
    app_info::AppFlags,
    frame::{Chunk, Reassembler},
    path::DerivationPath,
    state::TxId,
    tx::TxSignReq,
    ApduError, Instruction,
};

use crate::{
    account::{self, Account},
    review::{Review, ReviewState, ReviewStep, Subject},
    tx::UnsignedTx,
};

mod driver;
#[cfg(feature = "seed")]
pub use driver::SeedDriver;
pub use driver::Driver;

mod function;
pub use function::{Function, ReviewContext};

mod event;
pub use event::Event;

mod output;
pub use output::Output;

mod error;
pub use error::Error;

/// Application name reported via [Output::AppInfo]
pub const APP_NAME: &str = "Alephium";

/// Application version reported via [Output::AppInfo]
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum State {
    /// Idle state, no transaction running
    Init,
    /// Receiving transaction chunks
    Loading(u16),
    /// Request pending user review at the provided step
    Review(u16),
    /// Transaction approved and signed
    Signed,
    /// Request rejected / abandoned
    Rejected,
    /// Address confirmed
    Verified,
    /// Transaction complete
    Complete,
    /// Transaction failed
    Error,
}

impl State {
    /// Check whether a signing request is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, State::Loading(_) | State::Review(_) | State::Signed)
    }
}

/// [Engine] provides hardware-independent support for Alephium wallet operations
pub struct Engine<DRV: Driver> {
    state: State,

    tx_id: TxId,

    chunks: Reassembler,

    function: Function,

    drv: DRV,
}

impl<DRV: Driver> Engine<DRV> {
    /// Create a new engine instance with the provided driver
    pub const fn new(drv: DRV) -> Self {
        Self {
            state: State::Init,
            tx_id: TxId::new(),
            chunks: Reassembler::new(),
            function: Function::new(),
            drv,
        }
    }

    /// Handle incoming events
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn update(&mut self, evt: &Event) -> Result<Output, Error> {
        #[cfg(feature = "log")]
        log::debug!("event: {:02x?}", evt);

        match (self.state, evt) {
            // Empty event, do nothing
            (_, Event::None) => (),

            // Fetch application info
            (_, Event::GetVersion) => {
                return Ok(Output::AppInfo {
                    flags: self.flags(),
                })
            }

            // Derive accounts only while idle
            (s, Event::GetAccount { .. }) if s.is_busy() => return Err(Error::DeviceBusy),
            (
                _,
                Event::GetAccount {
                    path,
                    group,
                    key_type,
                    display,
                },
            ) => return self.get_account(path, *group, *key_type, *display),

            // Start hash review
            (s, Event::SignHash { .. }) if s.is_busy() => return Err(Error::DeviceBusy),
            (_, Event::SignHash { path, hash }) => return self.hash_init(path, hash),

            // Continue loading a transaction
            (State::Loading(n), Event::TxChunk { seq, more, data }) if *seq != 0 => {
                return self.tx_load(n, *seq, *more, data)
            }

            // Start a new transaction
            (s, Event::TxChunk { seq: 0, .. }) if s.is_busy() => return Err(Error::DeviceBusy),
            (_, Event::TxChunk { seq: 0, more, data }) => {
                self.function.clear();
                self.chunks.clear();
                self.tx_id = TxId::new();

                return self.tx_load(0, 0, *more, data);
            }

            // Continuation without a transaction in progress
            (_, Event::TxChunk { .. }) => return Err(Error::ProtocolFraming),

            // Fetch signature
            (State::Signed, Event::TxGetSignature) => return self.signature(),
            (State::Review(_), Event::TxGetSignature) => return Err(Error::ApprovalPending),
            (State::Rejected, Event::TxGetSignature) => return Err(Error::UserRejected),
            (_, Event::TxGetSignature) => return Err(Error::SigningAborted),

            // Complete transaction
            (_, Event::TxComplete) => {
                // Clear sign context
                self.function.clear();
                self.chunks.clear();

                self.state = State::Complete;
            }

            // Host went away mid-transfer
            (State::Loading(_), Event::Disconnect) => {
                #[cfg(feature = "log")]
                log::warn!("disconnect while loading transaction");

                let e = match self.chunks.close() {
                    Err(e) => Error::from(e),
                    Ok(_) => Error::TransportDisconnected,
                };

                self.function.clear();
                self.state = State::Error;

                return Err(e);
            }

            // Abandoned review is an implicit rejection
            (State::Review(_) | State::Signed, Event::Disconnect) => {
                self.function.clear();
                self.state = State::Rejected;
            }

            (_, Event::Disconnect) => (),

            // Fetch transaction state / information
            (_, Event::TxGetInfo) => (),
        }

        // Default to returning updated state
        Ok(Output::State {
            state: self.state,
            tx_id: self.tx_id.clone(),
        })
    }

    /// Fetch current engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Fetch application flags
    pub fn flags(&self) -> AppFlags {
        let mut f = AppFlags::SIGN_HASH | AppFlags::VERIFY_ADDRESS;
        if self.state.is_busy() {
            f |= AppFlags::BUSY;
        }
        f
    }

    /// Fetch the transaction id or hash for the request in flight
    pub fn tx_id(&self) -> Option<&TxId> {
        self.function.reviewing_ref().map(|s| &s.id)
    }

    /// Fetch the account for the request in flight
    pub fn account(&self) -> Option<&Account> {
        self.function.reviewing_ref().map(|s| &s.account)
    }

    /// Fetch the review context for the request in flight
    pub fn review(&self) -> Option<Review<'_>> {
        self.function.reviewing_ref().map(|s| s.review())
    }

    /// Render the step currently under review
    pub fn current_step(&self) -> Option<ReviewStep> {
        match self.state {
            State::Review(_) => (),
            _ => return None,
        }

        let s = self.function.reviewing_ref()?;
        s.reviewer.current_step(&s.review())
    }

    /// Approve the current review step, signing the transaction or hash
    /// (or confirming the address) once every step has been accepted
    pub fn approve(&mut self) {
        if !matches!(self.state, State::Review(_)) {
            return;
        }

        let s = match self.function.reviewing() {
            Some(s) => s,
            None => return,
        };

        let review = Review::of(&s.subject, &s.id, &s.account);
        let r = s.reviewer.accept(&review);
        let address = s.subject == Subject::Address;

        match r {
            ReviewState::Pending(_) => self.state = State::Review(s.reviewer.step()),
            ReviewState::Approved if address => self.verified(),
            ReviewState::Approved => self.sign(),
            ReviewState::Rejected => self.deny(),
        }
    }

    /// Reject the request under review
    pub fn deny(&mut self) {
        if !matches!(self.state, State::Review(_)) {
            return;
        }

        if let Some(s) = self.function.reviewing() {
            s.reviewer.reject();
        }

        #[cfg(feature = "log")]
        log::info!("request rejected");

        self.function.clear();
        self.state = State::Rejected;
    }

    /// Reset engine state
    pub fn reset(&mut self) {
        self.function.clear();
        self.chunks.clear();
        self.tx_id = TxId::new();
        self.state = State::Init;
    }

    /// Derive an account, see [account::derive], starting address review
    /// where `display` is set
    #[cfg_attr(feature = "noinline", inline(never))]
    fn get_account(
        &mut self,
        path: &DerivationPath,
        group: Option<u8>,
        key_type: KeyType,
        display: bool,
    ) -> Result<Output, Error> {
        let (a, key) = account::derive(&self.drv, path, group, key_type)?;

        // Key is not required for account requests
        drop(key);

        let o = Output::Account {
            index: a.index,
            group: a.group,
            key_type: a.key_type,
            public_key: a.public_key,
        };

        if display {
            #[cfg(feature = "log")]
            log::info!("confirming address for {}", a.path);

            self.chunks.clear();
            self.tx_id = TxId::new();
            self.function.review_init(ReviewContext::address(a));
            self.state = State::Review(0);
        }

        Ok(o)
    }

    /// Derive the signing key for a hash and start review
    #[cfg_attr(feature = "noinline", inline(never))]
    fn hash_init(&mut self, path: &DerivationPath, hash: &[u8; 32]) -> Result<Output, Error> {
        self.function.clear();
        self.chunks.clear();
        self.tx_id = TxId::new();

        let (account, key) = match account::derive(&self.drv, path, None, KeyType::Default) {
            Ok(v) => v,
            Err(e) => {
                #[cfg(feature = "log")]
                log::error!("hash request rejected: {:?}", e);

                self.state = State::Error;
                return Err(e);
            }
        };

        let id = TxId(*hash);

        #[cfg(feature = "log")]
        log::info!("reviewing hash {}", id);

        self.tx_id = id;
        self.function.review_init(ReviewContext::hash(key, account, id));
        self.state = State::Review(0);

        Ok(Output::State {
            state: self.state,
            tx_id: self.tx_id,
        })
    }

    /// Complete an approved address review
    fn verified(&mut self) {
        #[cfg(feature = "log")]
        log::info!("address confirmed");

        self.function.clear();
        self.state = State::Verified;
    }

    /// Push a transaction chunk, starting review once the message is complete
    #[cfg_attr(feature = "noinline", inline(never))]
    fn tx_load(&mut self, n: u16, seq: u8, more: bool, data: &[u8]) -> Result<Output, Error> {
        let chunk = Chunk {
            ins: Instruction::SignTx as u8,
            seq,
            more,
            data,
        };

        match self.chunks.push(&chunk) {
            Ok(false) => self.state = State::Loading(n.wrapping_add(1)),
            Ok(true) => self.tx_init()?,
            Err(e) => {
                #[cfg(feature = "log")]
                log::error!("chunk {} rejected: {:?}", seq, e);

                self.chunks.clear();
                self.state = State::Error;
                return Err(e.into());
            }
        }

        Ok(Output::State {
            state: self.state,
            tx_id: self.tx_id.clone(),
        })
    }

    /// Decode a completed signing request and start review
    fn tx_init(&mut self) -> Result<(), Error> {
        let r = match self.chunks.payload() {
            Some(p) => Self::tx_decode(&self.drv, p),
            None => Err(Error::ProtocolFraming),
        };
        self.chunks.clear();

        let ctx = match r {
            Ok(v) => v,
            Err(e) => {
                #[cfg(feature = "log")]
                log::error!("signing request rejected: {:?}", e);

                self.state = State::Error;
                return Err(e);
            }
        };

        #[cfg(feature = "log")]
        if let Some(tx) = ctx.tx_ref() {
            log::info!(
                "reviewing transaction {} ({} inputs, {} outputs)",
                ctx.id,
                tx.inputs.len(),
                tx.outputs.len()
            );
        }

        self.tx_id = ctx.id;
        self.function.review_init(ctx);
        self.state = State::Review(0);

        Ok(())
    }

    fn tx_decode(drv: &DRV, payload: &[u8]) -> Result<ReviewContext, Error> {
        // Path prefix errors are reported separately from the transaction
        let (req, _n) = TxSignReq::decode(payload).map_err(|e| match e {
            ApduError::InvalidPath => Error::InvalidPath,
            _ => Error::MalformedTransaction,
        })?;

        let (account, key) = account::derive(drv, &req.path, None, KeyType::Default)?;

        let (tx, tx_id) = UnsignedTx::decode(req.tx)?;

        Ok(ReviewContext::tx(key, account, tx, tx_id))
    }

    /// Sign the approved transaction or hash, dropping the signing key
    #[cfg_attr(feature = "noinline", inline(never))]
    fn sign(&mut self) {
        let s = match self.function.reviewing() {
            Some(s) => s,
            None => {
                self.state = State::Error;
                return;
            }
        };

        let r = match s.key.take() {
            Some(k) => sign(&k, &s.id),
            None => Err(Error::SigningAborted),
        };

        match r {
            Ok(sig) => {
                s.signature = Some(sig);
                self.state = State::Signed;
            }
            Err(_e) => {
                #[cfg(feature = "log")]
                log::error!("signing failed: {:?}", _e);

                self.function.clear();
                self.state = State::Error;
            }
        }
    }

    fn signature(&self) -> Result<Output, Error> {
        let s = self.function.reviewing_ref().ok_or(Error::SigningAborted)?;
        let signature = s.signature.ok_or(Error::SigningAborted)?;

        Ok(Output::Signature {
            tx_id: s.id,
            signature,
        })
    }
}

/// Sign a transaction id or hash, returning a compact (`r || s`, low-S) ECDSA signature
pub fn sign(key: &SigningKey, tx_id: &TxId) -> Result<[u8; 64], Error> {
    let sig: Signature = <SigningKey as PrehashSigner<Signature>>::sign_prehash(key, &tx_id.0)
        .map_err(|_| Error::SigningAborted)?;
    let sig = sig.normalize_s().unwrap_or(sig);

    let mut o = [0u8; 64];
    o.copy_from_slice(&sig.to_bytes());
    Ok(o)
}
