// Copyright (c) 2024 The Alephium Ledger App Developers

//! Handle for connected ledger devices
//!
//! This provides methods for interacting with the device
//! and is generic over [Exchange] transports

use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::sync::Mutex;

use ledger_alph_apdu::{
    account::{AccountReq, AccountResp, KeyType},
    app_info::{AppFlags, AppInfoReq, AppInfoResp, KeyTypes},
    path::DerivationPath,
    state::{TxId, TxState},
    tx::{TxComplete, TxInfo, TxInfoReq},
    ApduStatic,
};

use crate::{
    account::Account,
    transport::{decode, encode, request},
    tx::{TransactionHandle, POLL_INTERVAL},
    verify::verify,
    Error, Exchange,
};

/// Alephium handle for a connected ledger device.
///
/// This is generic over [Exchange] types to support different
/// underlying transports / providers
pub struct DeviceHandle<T: Exchange> {
    /// Device handle for communication
    t: Arc<Mutex<T>>,
    /// Timeout for user acknowledgements
    user_timeout_s: usize,
    /// Timeout for APDU requests
    request_timeout_s: usize,
}

impl<T: Exchange> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            t: self.t.clone(),
            user_timeout_s: self.user_timeout_s,
            request_timeout_s: self.request_timeout_s,
        }
    }
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            user_timeout_s: 30,
            request_timeout_s: 2,
        }
    }
}

/// Application information
#[derive(Clone, Debug, PartialEq)]
pub struct AppInfo {
    pub app_name: String,
    pub app_version: String,
    pub protocol_version: u8,
    /// Number of address groups
    pub groups: u8,
    /// Key types accepted for account derivation
    pub key_types: KeyTypes,
    pub flags: AppFlags,
}

/// Signed transaction or hash
#[derive(Clone, Debug, PartialEq)]
pub struct SignedTx {
    /// Transaction identifier or hash (signed message)
    pub tx_id: TxId,
    /// Compact ECDSA signature (`r || s`)
    pub signature: [u8; 64],
    /// Public key of the signing account
    pub public_key: [u8; 33],
}

impl SignedTx {
    /// Verify the signature against the signing account's public key
    pub fn verify(&self) -> bool {
        verify(&self.tx_id.0, &self.public_key, &self.signature)
    }
}

impl<T> DeviceHandle<T>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    /// Set the default user interaction timeout
    pub fn with_user_timeout(mut self, timeout_s: usize) -> Self {
        self.user_timeout_s = timeout_s;
        self
    }

    /// Set the APDU request timeout
    pub fn with_request_timeout(mut self, timeout_s: usize) -> Self {
        self.request_timeout_s = timeout_s;
        self
    }

    /// Helper to fetch user interaction timeout
    pub fn user_timeout(&self) -> Duration {
        Duration::from_secs(self.user_timeout_s as u64)
    }

    /// Helper to fetch APDU request timeout
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s as u64)
    }

    /// Fetch ledger application info
    pub async fn app_info(&self) -> Result<AppInfo, Error> {
        debug!("Requesting app info");

        let resp = self
            .request(AppInfoReq::INS, &encode(&AppInfoReq {})?)
            .await?;
        let info = decode::<AppInfoResp>(&resp)?;

        Ok(AppInfo {
            app_name: info.name.to_string(),
            app_version: info.version.to_string(),
            protocol_version: info.proto,
            groups: info.groups,
            key_types: info.key_types,
            flags: info.flags,
        })
    }

    /// Derive an account, optionally searching for an address in the provided group
    pub async fn account(
        &self,
        path: &DerivationPath,
        group: Option<u8>,
        key_type: KeyType,
    ) -> Result<Account, Error> {
        debug!(
            "Requesting account for path: {} group: {:?} key type: {}",
            path, group, key_type
        );

        let req = AccountReq::new(path.clone(), group, key_type);
        let resp = self.request(AccountReq::INS, &encode(&req)?).await?;
        let resp = decode::<AccountResp>(&resp)?;

        Account::from_resp(path, group, resp)
    }

    /// Derive an account and show its address on the device, returning once
    /// the user has confirmed the address
    pub async fn account_verified(
        &self,
        path: &DerivationPath,
        group: Option<u8>,
        key_type: KeyType,
        user_timeout: Duration,
    ) -> Result<Account, Error> {
        debug!(
            "Requesting address confirmation for path: {} group: {:?}",
            path, group
        );

        let req = AccountReq::new(path.clone(), group, key_type).with_display();
        let resp = self.request(AccountReq::INS, &encode(&req)?).await?;
        let resp = decode::<AccountResp>(&resp)?;

        let account = Account::from_resp(path, group, resp)?;

        debug!("Waiting for user to confirm address {}", account.address());

        let poll = async {
            loop {
                let info = self.tx_info().await?;

                match info.state {
                    TxState::Verified => return Ok(()),
                    TxState::Review => (),
                    TxState::Rejected => return Err(Error::UserRejected),
                    s => return Err(Error::InvalidState(s, TxState::Verified)),
                }

                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(user_timeout, poll).await {
            Ok(Ok(())) => Ok(account),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!("Address confirmation timed out, releasing request");
                if let Err(e) = self.request(TxComplete::INS, &encode(&TxComplete)?).await {
                    warn!("Failed to release request: {}", e);
                }
                Err(Error::UserTimeout)
            }
        }
    }

    /// Fetch transaction state
    pub async fn tx_info(&self) -> Result<TxInfo, Error> {
        let resp = self.request(TxInfoReq::INS, &encode(&TxInfoReq)?).await?;
        decode::<TxInfo>(&resp)
    }

    /// Load a transaction for signing, returning a [TransactionHandle] to
    /// await approval and collect the signature
    pub async fn transaction(
        &self,
        path: &DerivationPath,
        tx: &[u8],
    ) -> Result<TransactionHandle<T>, Error> {
        TransactionHandle::init(self.t.clone(), path, tx, self.request_timeout()).await
    }

    /// Load a 32-byte hash for signing, returning a [TransactionHandle] to
    /// await approval and collect the signature
    pub async fn hash(
        &self,
        path: &DerivationPath,
        hash: &[u8; 32],
    ) -> Result<TransactionHandle<T>, Error> {
        TransactionHandle::init_hash(self.t.clone(), path, hash, self.request_timeout()).await
    }

    /// Sign a serialised unsigned transaction using the device
    pub async fn sign_unsigned_tx(
        &self,
        path: &DerivationPath,
        tx: &[u8],
        user_timeout: Duration,
    ) -> Result<SignedTx, Error> {
        // Fetch signing account for verification
        let account = self.account(path, None, KeyType::Default).await?;

        // Start device transaction
        debug!("Starting transaction");
        let signer = self.transaction(path, tx).await?;

        Self::collect(signer, &account, user_timeout).await
    }

    /// Sign a pre-computed 32-byte hash using the device
    pub async fn sign_hash(
        &self,
        path: &DerivationPath,
        hash: &[u8; 32],
        user_timeout: Duration,
    ) -> Result<SignedTx, Error> {
        let account = self.account(path, None, KeyType::Default).await?;

        debug!("Starting hash signing");
        let signer = self.hash(path, hash).await?;

        Self::collect(signer, &account, user_timeout).await
    }

    /// Await approval of a signing request, collecting and verifying the signature
    async fn collect(
        signer: TransactionHandle<T>,
        account: &Account,
        user_timeout: Duration,
    ) -> Result<SignedTx, Error> {
        let tx_id = *signer.tx_id();

        // Await user input
        debug!("Waiting for user confirmation");
        if let Err(e) = signer.await_approval(user_timeout).await {
            // Release abandoned requests
            if let Error::UserTimeout = e {
                warn!("Approval timed out, releasing request");
                if let Err(e) = signer.complete().await {
                    warn!("Failed to release request: {}", e);
                }
            }
            return Err(e);
        }

        let signature = signer.signature().await?;

        // Signal completion to app
        signer.complete().await?;

        let signed = SignedTx {
            tx_id,
            signature,
            public_key: account.public_key,
        };

        if !signed.verify() {
            return Err(Error::InvalidSignature);
        }

        debug!("Signing complete");

        Ok(signed)
    }

    /// Issue a (possibly chunked) request, returning the response data
    pub async fn request(&self, ins: u8, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let t = self.t.lock().await;
        request(&*t, ins, payload, self.request_timeout()).await
    }
}
