// Copyright (c) 2024 The Alephium Ledger App Developers

//! Transaction APIs
//!
//! A [TransactionHandle] tracks a signing request (for a transaction or a
//! pre-computed hash) from loading through on-device review to signature
//! collection.

use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::sync::Mutex;

use ledger_alph_apdu::{
    path::DerivationPath,
    state::{TxId, TxState},
    tx::{HashSignReq, TxComplete, TxInfo, TxInfoReq, TxSignReq, TxSignature, TxSignatureReq},
    ApduStatic,
};
use ledger_alph_core::tx::UnsignedTx;

use crate::{
    transport::{decode, encode, request},
    Error, Exchange,
};

/// Interval between device polls while awaiting user approval
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Handle to a signing request in progress
///
/// See [DeviceHandle::transaction][super::DeviceHandle::transaction] to
/// create a [TransactionHandle]
pub struct TransactionHandle<T: Exchange> {
    t: Arc<Mutex<T>>,

    /// Locally computed transaction id, or the hash to be signed
    tx_id: TxId,

    /// Timeout for APDU requests
    request_timeout: Duration,
}

impl<T: Exchange> core::fmt::Debug for TransactionHandle<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("tx_id", &self.tx_id)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl<T> TransactionHandle<T>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    /// Load a transaction to the device, starting on-device review
    pub async fn init(
        t: Arc<Mutex<T>>,
        path: &DerivationPath,
        tx: &[u8],
        request_timeout: Duration,
    ) -> Result<Self, Error> {
        // Validate the transaction and compute its id prior to sending
        let (_utx, tx_id) = UnsignedTx::decode(tx)?;

        debug!("Loading transaction {} ({} bytes)", tx_id, tx.len());

        let req = encode(&TxSignReq::new(path.clone(), tx))?;

        Self::start(t, TxSignReq::INS, &req, tx_id, request_timeout).await
    }

    /// Load a 32-byte hash to the device, starting on-device review
    pub async fn init_hash(
        t: Arc<Mutex<T>>,
        path: &DerivationPath,
        hash: &[u8; 32],
        request_timeout: Duration,
    ) -> Result<Self, Error> {
        let tx_id = TxId(*hash);

        debug!("Loading hash {}", tx_id);

        let req = encode(&HashSignReq::new(path.clone(), *hash))?;

        Self::start(t, HashSignReq::INS, &req, tx_id, request_timeout).await
    }

    /// Issue a signing request, checking the device entered review for the
    /// expected id
    async fn start(
        t: Arc<Mutex<T>>,
        ins: u8,
        req: &[u8],
        tx_id: TxId,
        request_timeout: Duration,
    ) -> Result<Self, Error> {
        let resp = {
            let t = t.lock().await;
            request(&*t, ins, req, request_timeout).await?
        };
        let info = decode::<TxInfo>(&resp)?;

        let h = Self {
            t,
            tx_id,
            request_timeout,
        };

        let r = check_state(info.state, TxState::Review)
            .and_then(|_| check_tx_id(&info.tx_id, &h.tx_id));

        // Release the request where the device is reviewing something else
        if let Err(e) = r {
            warn!("Unexpected signing state ({}, {}), releasing request", info.state, info.tx_id);

            if let Err(e) = h.complete().await {
                warn!("Failed to release request: {}", e);
            }
            return Err(e);
        }

        Ok(h)
    }

    /// Locally computed transaction identifier
    pub fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// Fetch transaction state
    pub async fn info(&self) -> Result<TxInfo, Error> {
        let resp = self.request(TxInfoReq::INS, &encode(&TxInfoReq)?).await?;
        decode::<TxInfo>(&resp)
    }

    /// Await on-device transaction approval
    pub async fn await_approval(&self, user_timeout: Duration) -> Result<(), Error> {
        let poll = async {
            loop {
                let info = self.info().await?;

                debug!("awaiting tx approval (state: {}, step: {})", info.state, info.value);

                match info.state {
                    TxState::Signed => {
                        check_tx_id(&info.tx_id, &self.tx_id)?;
                        return Ok(());
                    }
                    TxState::Review => (),
                    TxState::Rejected => return Err(Error::UserRejected),
                    s => return Err(Error::InvalidState(s, TxState::Signed)),
                }

                // Sleep while we wait
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(user_timeout, poll).await {
            Ok(r) => r,
            Err(_) => Err(Error::UserTimeout),
        }
    }

    /// Fetch the signature for an approved transaction
    pub async fn signature(&self) -> Result<[u8; 64], Error> {
        let resp = self
            .request(TxSignatureReq::INS, &encode(&TxSignatureReq)?)
            .await?;
        let sig = decode::<TxSignature>(&resp)?;

        check_tx_id(&sig.tx_id, &self.tx_id)?;

        Ok(sig.signature)
    }

    /// Signal transaction completion, releasing the request on the device
    pub async fn complete(self) -> Result<(), Error> {
        let resp = self.request(TxComplete::INS, &encode(&TxComplete)?).await?;
        let info = decode::<TxInfo>(&resp)?;

        check_state(info.state, TxState::Complete)
    }

    async fn request(&self, ins: u8, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let t = self.t.lock().await;
        request(&*t, ins, payload, self.request_timeout).await
    }
}

/// Helper to check state when executing transactions
pub(crate) fn check_state(actual: TxState, expected: TxState) -> Result<(), Error> {
    if actual != expected {
        Err(Error::InvalidState(actual, expected))
    } else {
        Ok(())
    }
}

/// Helper to check the device computed the expected transaction id
pub(crate) fn check_tx_id(actual: &TxId, expected: &TxId) -> Result<(), Error> {
    if expected != actual {
        Err(Error::TxIdMismatch)
    } else {
        Ok(())
    }
}
