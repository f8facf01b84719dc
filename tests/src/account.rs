// Copyright (c) 2024 The Alephium Ledger App Developers

use std::{future::Future, time::Duration};

use bip39::Mnemonic;
use log::{debug, info};

use ledger_alph::{DeviceHandle, Error, Exchange};
use ledger_alph_apdu::{
    account::KeyType,
    path::{DerivationPath, HARDENED},
};
use ledger_alph_core::{
    account::{self, COIN_TYPE, PURPOSE},
    address::{group_of, GROUP_NUM},
    engine::Error as DeviceError,
};

use crate::driver;

/// Path for the provided account and address index
pub fn path(account: u32, index: u32) -> DerivationPath {
    DerivationPath::new(&[PURPOSE, COIN_TYPE, account | HARDENED, 0, index]).unwrap()
}

/// Derive accounts for each group, checking these against local derivation
pub async fn test<T>(t: T, mnemonic: Mnemonic) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    let d = DeviceHandle::from(t);
    let drv = driver(&mnemonic);

    for group in 0..GROUP_NUM {
        for base in [0, 7] {
            let p = path(0, base);

            debug!("Requesting account {} in group {}", p, group);

            let a = d.account(&p, Some(group), KeyType::Default).await?;

            info!("Account {}: {} (group {})", a.path, a.address(), a.group);

            assert_eq!(a.group, group);
            assert!(a.index >= base);
            assert_eq!(group_of(&a.address())?, group);

            let (expected, _key) = account::derive(&drv, &p, Some(group), KeyType::Default)?;
            assert_eq!(a.public_key, expected.public_key);
            assert_eq!(a.index, expected.index);
        }
    }

    // Without a group the requested index is used as-is
    let p = path(1, 3);
    let a = d.account(&p, None, KeyType::Default).await?;
    assert_eq!(a.index, 3);

    Ok(())
}

/// Check invalid account requests are rejected
pub async fn invalid<T>(t: T) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    let d = DeviceHandle::from(t);

    // Schnorr keys are not yet supported
    let r = d.account(&path(0, 0), None, KeyType::Bip340Schnorr).await;
    assert!(matches!(r, Err(Error::UnsupportedKeyType)), "{r:?}");

    // Group out of range
    let r = d.account(&path(0, 0), Some(GROUP_NUM), KeyType::Default).await;
    assert_eq!(r.err().and_then(|e| e.device_error()), Some(DeviceError::InvalidPath));

    // Non-hardened account
    let p = DerivationPath::new(&[PURPOSE, COIN_TYPE, 0, 0, 0])?;
    let r = d.account(&p, None, KeyType::Default).await;
    assert_eq!(r.err().and_then(|e| e.device_error()), Some(DeviceError::InvalidPath));

    // Wrong coin type
    let p = DerivationPath::new(&[PURPOSE, 60 | HARDENED, HARDENED, 0, 0])?;
    let r = d.account(&p, None, KeyType::Default).await;
    assert_eq!(r.err().and_then(|e| e.device_error()), Some(DeviceError::InvalidPath));

    Ok(())
}

/// Confirm an address on the device, approving via the provided function
pub async fn verify_address<T, F>(
    t: T,
    approve: impl Fn() -> F,
    mnemonic: Mnemonic,
) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
    F: Future<Output = ()>,
{
    let d = DeviceHandle::from(t);
    let drv = driver(&mnemonic);
    let p = path(0, 0);

    let confirm = d.account_verified(&p, Some(1), KeyType::Default, Duration::from_secs(10));
    let (a, _) = tokio::join!(confirm, approve());
    let a = a?;

    info!("Confirmed account {}: {}", a.path, a.address());

    let (expected, _key) = account::derive(&drv, &p, Some(1), KeyType::Default)?;
    assert_eq!(a.public_key, expected.public_key);
    assert_eq!(a.group, 1);

    // Device is free for further requests
    d.account(&p, None, KeyType::Default).await?;

    Ok(())
}

/// Reject address confirmation via the provided function
pub async fn reject_address<T, F>(t: T, deny: impl Fn() -> F) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
    F: Future<Output = ()>,
{
    let d = DeviceHandle::from(t);

    let p = path(0, 0);
    let confirm = d.account_verified(&p, None, KeyType::Default, Duration::from_secs(10));
    let (r, _) = tokio::join!(confirm, deny());
    assert!(matches!(r, Err(Error::UserRejected)), "{r:?}");

    Ok(())
}
