// Copyright (c) 2024 The Alephium Ledger App Developers

use std::{future::Future, time::Duration};

use bip39::Mnemonic;
use log::{debug, info};

use ledger_alph::{verify::verify, DeviceHandle, Error, Exchange};
use ledger_alph_apdu::{
    account::KeyType,
    app_info::AppFlags,
    tx::TxSignReq,
    ApduStatic,
};
use ledger_alph_core::{
    account,
    address::LockupScript,
    engine::Error as DeviceError,
    tx::{AssetInput, AssetOutput, Network, OutputRef, Token, UnlockScript, UnsignedTx, U256},
};

use crate::{account::path, driver};

/// Keys available to transaction scenarios
#[derive(Clone, PartialEq, Debug)]
pub struct Keys {
    /// Signing account public key
    pub signer: [u8; 33],
    /// Second key in the signer's group
    pub other: [u8; 33],
}

/// Transaction scenario
pub struct Scenario {
    /// Scenario name
    pub name: &'static str,
    /// Build the unsigned transaction
    pub build: fn(&Keys) -> UnsignedTx,
    /// Number of review steps
    pub steps: usize,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "simple_transfer",
        build: simple_transfer,
        steps: 5,
    },
    Scenario {
        name: "same_address",
        build: same_address,
        steps: 5,
    },
    Scenario {
        name: "multisig_recipient",
        build: multisig_recipient,
        steps: 5,
    },
    Scenario {
        name: "token_transfer",
        build: token_transfer,
        steps: 6,
    },
    Scenario {
        name: "grouped_inputs",
        build: grouped_inputs,
        steps: 5,
    },
    Scenario {
        name: "two_keys",
        build: two_keys,
        steps: 6,
    },
];

/// Amount in ALPH (18 decimals)
pub fn alph(v: u64) -> U256 {
    U256::from_u64(v)
        .checked_mul(&U256::from_u64(1_000_000_000_000_000_000))
        .unwrap()
}

/// Input spending an output locked to `key`
pub fn input(key: &[u8; 33], n: u8, same_as_previous: bool) -> AssetInput {
    AssetInput {
        output_ref: OutputRef {
            hint: LockupScript::p2pkh(key).hint(),
            key: [n; 32],
        },
        unlock: match same_as_previous {
            true => UnlockScript::SameAsPrevious,
            false => UnlockScript::P2PKH(*key),
        },
    }
}

/// Plain ALPH output
pub fn output(lockup: LockupScript, amount: u64) -> AssetOutput {
    AssetOutput {
        amount: alph(amount),
        lockup,
        lock_time: 0,
        tokens: vec![],
        additional_data: vec![],
    }
}

fn tx(inputs: Vec<AssetInput>, outputs: Vec<AssetOutput>) -> UnsignedTx {
    UnsignedTx {
        version: 0,
        network: Network::Mainnet,
        gas_amount: 20000,
        gas_price: U256::from_u64(100_000_000_000),
        inputs,
        outputs,
    }
}

fn recipient() -> LockupScript {
    LockupScript::P2PKH([0x11; 32])
}

/// One input, two outputs to third parties
pub fn simple_transfer(k: &Keys) -> UnsignedTx {
    tx(
        vec![input(&k.signer, 0, false)],
        vec![
            output(recipient(), 10),
            output(LockupScript::P2PKH([0x12; 32]), 5),
        ],
    )
}

/// One input, two outputs to the same address
pub fn same_address(k: &Keys) -> UnsignedTx {
    tx(
        vec![input(&k.signer, 0, false)],
        vec![output(recipient(), 10), output(recipient(), 5)],
    )
}

/// 2-of-3 multi-signature recipient with change
pub fn multisig_recipient(k: &Keys) -> UnsignedTx {
    let multisig = LockupScript::P2MPKH {
        hashes: vec![[0x21; 32], [0x22; 32], [0x23; 32]],
        m: 2,
    };

    tx(
        vec![input(&k.signer, 0, false)],
        vec![output(multisig, 10), output(LockupScript::p2pkh(&k.signer), 1)],
    )
}

/// Token transfer with change
pub fn token_transfer(k: &Keys) -> UnsignedTx {
    let mut o = output(recipient(), 1);
    o.tokens.push(Token {
        id: [0x7a; 32],
        amount: U256::from_u64(100),
    });

    tx(
        vec![input(&k.signer, 0, false)],
        vec![o, output(LockupScript::p2pkh(&k.signer), 1)],
    )
}

/// Twenty inputs unlocked by the signer's key
pub fn grouped_inputs(k: &Keys) -> UnsignedTx {
    let inputs = (0..20).map(|i| input(&k.signer, i, i > 0)).collect();

    tx(
        inputs,
        vec![output(recipient(), 10), output(LockupScript::p2pkh(&k.signer), 1)],
    )
}

/// Inputs from two keys, each followed by a back-reference
pub fn two_keys(k: &Keys) -> UnsignedTx {
    tx(
        vec![
            input(&k.signer, 0, false),
            input(&k.signer, 1, true),
            input(&k.other, 2, false),
            input(&k.other, 3, true),
        ],
        vec![output(recipient(), 10), output(LockupScript::p2pkh(&k.signer), 1)],
    )
}

/// Fetch scenario keys, the signer from the device and a second key in
/// the same group from local derivation
pub async fn keys<T>(d: &DeviceHandle<T>, mnemonic: &Mnemonic) -> anyhow::Result<Keys>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    let a = d.account(&path(0, 0), None, KeyType::Default).await?;

    let (other, _key) =
        account::derive(&driver(mnemonic), &path(1, 0), Some(a.group), KeyType::Default)?;

    Ok(Keys {
        signer: a.public_key,
        other: other.public_key,
    })
}

/// Sign a scenario transaction, approving via the provided function
pub async fn test<T, F>(
    t: T,
    approve: impl Fn() -> F,
    mnemonic: &Mnemonic,
    scenario: &Scenario,
) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
    F: Future<Output = ()>,
{
    let d = DeviceHandle::from(t);
    let k = keys(&d, mnemonic).await?;

    // Build transaction and check encoding
    let utx = (scenario.build)(&k);
    let raw = utx.encode();

    let (decoded, tx_id) = UnsignedTx::decode(&raw)?;
    assert_eq!(decoded, utx);
    assert_eq!(decoded.encode(), raw);

    info!("Starting transaction {} ({})", scenario.name, tx_id);

    let signer = d.transaction(&path(0, 0), &raw).await?;
    assert_eq!(signer.tx_id(), &tx_id);

    // Trigger approver function
    approve().await;

    // Await user input
    debug!("Waiting for user confirmation");
    signer.await_approval(Duration::from_secs(10)).await?;

    let signature = signer.signature().await?;

    // Signal transaction is complete
    signer.complete().await?;

    info!("Transaction complete! validating signature");

    assert!(verify(&tx_id.0, &k.signer, &signature));

    Ok(())
}

/// Reject a transaction via the provided function
pub async fn reject<T, F>(t: T, deny: impl Fn() -> F, mnemonic: &Mnemonic) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
    F: Future<Output = ()>,
{
    let d = DeviceHandle::from(t);
    let k = keys(&d, mnemonic).await?;
    let raw = simple_transfer(&k).encode();

    let signer = d.transaction(&path(0, 0), &raw).await?;

    deny().await;

    let r = signer.await_approval(Duration::from_secs(10)).await;
    assert!(matches!(r, Err(Error::UserRejected)), "{r:?}");

    // No signature is released
    let r = signer.signature().await;
    assert!(matches!(r, Err(Error::UserRejected)), "{r:?}");

    signer.complete().await?;

    Ok(())
}

/// Check requests are rejected while a transaction is in flight
pub async fn busy<T>(t: T, mnemonic: &Mnemonic) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    let d = DeviceHandle::from(t);
    let k = keys(&d, mnemonic).await?;
    let raw = simple_transfer(&k).encode();

    let signer = d.transaction(&path(0, 0), &raw).await?;

    let info = d.app_info().await?;
    assert!(info.flags.contains(AppFlags::BUSY));

    let r = d.account(&path(0, 0), None, KeyType::Default).await;
    assert_eq!(r.err().and_then(|e| e.device_error()), Some(DeviceError::DeviceBusy));

    let r = d.transaction(&path(0, 0), &raw).await;
    assert_eq!(r.err().and_then(|e| e.device_error()), Some(DeviceError::DeviceBusy));

    let r = d.hash(&path(0, 0), &[0x11; 32]).await;
    assert_eq!(r.err().and_then(|e| e.device_error()), Some(DeviceError::DeviceBusy));

    // Signature is not available during review
    let r = signer.signature().await;
    assert_eq!(r.err().and_then(|e| e.device_error()), Some(DeviceError::ApprovalPending));

    // Completion releases the request
    signer.complete().await?;

    let info = d.app_info().await?;
    assert!(!info.flags.contains(AppFlags::BUSY));
    d.account(&path(0, 0), None, KeyType::Default).await?;

    Ok(())
}

/// Check malformed transactions are rejected by the device
pub async fn malformed<T>(t: T, mnemonic: &Mnemonic) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    let d = DeviceHandle::from(t);
    let k = keys(&d, mnemonic).await?;

    // Back-reference under a foreign hint
    let mut utx = two_keys(&k);
    utx.inputs[1].output_ref.hint = LockupScript::p2pkh(&k.other).hint();
    let raw = utx.encode();

    assert!(UnsignedTx::decode(&raw).is_err());

    let mut req = vec![0u8; 4096];
    let n = {
        use encdec::Encode;
        TxSignReq::new(path(0, 0), &raw).encode(&mut req)?
    };

    let r = d.request(TxSignReq::INS, &req[..n]).await;
    assert_eq!(
        r.err().and_then(|e| e.device_error()),
        Some(DeviceError::MalformedTransaction)
    );

    // Device is free for further requests
    let info = d.app_info().await?;
    assert!(!info.flags.contains(AppFlags::BUSY));

    Ok(())
}

/// Sign via [DeviceHandle::sign_unsigned_tx], requires a device or
/// transport approving requests
pub async fn sign_unsigned<T>(t: T, mnemonic: &Mnemonic) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
{
    let d = DeviceHandle::from(t);
    let k = keys(&d, mnemonic).await?;
    let raw = token_transfer(&k).encode();

    let signed = d
        .sign_unsigned_tx(&path(0, 0), &raw, Duration::from_secs(10))
        .await?;

    let (_utx, tx_id) = UnsignedTx::decode(&raw)?;
    assert_eq!(signed.tx_id, tx_id);
    assert_eq!(signed.public_key, k.signer);
    assert!(signed.verify());

    Ok(())
}

/// Sign a 32-byte hash, approving via the provided function
pub async fn sign_hash<T, F>(t: T, approve: impl Fn() -> F, mnemonic: &Mnemonic) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
    F: Future<Output = ()>,
{
    let d = DeviceHandle::from(t);
    let k = keys(&d, mnemonic).await?;
    let hash = [0x5c; 32];

    info!("Starting hash signing");

    let signer = d.hash(&path(0, 0), &hash).await?;
    assert_eq!(signer.tx_id().0, hash);

    approve().await;

    signer.await_approval(Duration::from_secs(10)).await?;
    let signature = signer.signature().await?;
    signer.complete().await?;

    assert!(verify(&hash, &k.signer, &signature));

    Ok(())
}

/// Reject hash signing via the provided function
pub async fn reject_hash<T, F>(t: T, deny: impl Fn() -> F) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
    T::Error: Into<Error>,
    F: Future<Output = ()>,
{
    let d = DeviceHandle::from(t);

    let signer = d.hash(&path(0, 0), &[0x5c; 32]).await?;

    deny().await;

    let r = signer.await_approval(Duration::from_secs(10)).await;
    assert!(matches!(r, Err(Error::UserRejected)), "{r:?}");

    signer.complete().await?;

    Ok(())
}
