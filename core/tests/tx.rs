// Copyright (c) 2024 The Alephium Ledger App Developers

use std::time::Duration;

use ledger_alph::{
    apdu::{tx::TxSignReq, ApduStatic, Instruction},
    DeviceHandle, Error,
};
use ledger_alph_core::{
    engine::{Error as DeviceError, State},
    review::StepKind,
};
use ledger_alph_tests::{
    account::path,
    mnemonic,
    transaction::{self, keys, same_address, simple_transfer, SCENARIOS},
    MNEMONIC,
};

mod helpers;
use helpers::*;

#[tokio::test(flavor = "multi_thread")]
async fn scenarios() -> anyhow::Result<()> {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());

    let m = mnemonic(MNEMONIC)?;

    for s in SCENARIOS {
        let e = TestEngine::default_seed();

        transaction::test(e.clone(), || approve_tx(&e), &m, s)
            .await
            .unwrap();

        assert_eq!(e.state(), State::Complete);
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn review_steps() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;

    for s in SCENARIOS {
        let e = TestEngine::default_seed();
        let d = DeviceHandle::from(e.clone());

        let k = keys(&d, &m).await?;
        let raw = (s.build)(&k).encode();

        let signer = d.transaction(&path(0, 0), &raw).await?;

        {
            let engine = e.engine.lock().unwrap();
            let review = engine.review().unwrap();
            assert_eq!(review.step_count(), s.steps, "{}", s.name);

            let step = engine.current_step().unwrap();
            assert_eq!(step.kind, StepKind::Path);
        }

        // Walk steps one at a time
        for i in 0..s.steps {
            assert_eq!(e.state(), State::Review(i as u16), "{}", s.name);

            let kind = e.engine.lock().unwrap().current_step().unwrap().kind;
            if i == s.steps - 1 {
                assert_eq!(kind, StepKind::FinalConfirm);
            }

            e.engine.lock().unwrap().approve();
        }

        assert_eq!(e.state(), State::Signed);

        signer.await_approval(Duration::from_secs(1)).await?;
        signer.signature().await?;
        signer.complete().await?;
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn reject() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;
    let e = TestEngine::default_seed();

    transaction::reject(e.clone(), || deny_tx(&e), &m)
        .await
        .unwrap();

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn busy() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;
    let e = TestEngine::default_seed();

    transaction::busy(e, &m).await.unwrap();

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;
    let e = TestEngine::default_seed();

    transaction::malformed(e, &m).await.unwrap();

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_unsigned() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;
    let e = TestEngine::default_seed().with_auto_approve();

    transaction::sign_unsigned(e.clone(), &m).await.unwrap();

    assert_eq!(e.state(), State::Complete);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn user_timeout() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;
    let e = TestEngine::default_seed();
    let d = DeviceHandle::from(e.clone());

    let k = keys(&d, &m).await?;
    let raw = simple_transfer(&k).encode();

    let signer = d.transaction(&path(0, 0), &raw).await?;

    let r = signer.await_approval(Duration::from_millis(600)).await;
    assert!(matches!(r, Err(Error::UserTimeout)), "{r:?}");

    // Host abandons the request
    e.disconnect();
    assert_eq!(e.state(), State::Rejected);

    let r = signer.signature().await;
    assert_eq!(
        r.err().and_then(|e| e.device_error()),
        Some(DeviceError::UserRejected)
    );

    signer.complete().await?;
    assert_eq!(e.state(), State::Complete);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn same_address_outputs() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;
    let e = TestEngine::default_seed();
    let d = DeviceHandle::from(e.clone());

    let k = keys(&d, &m).await?;
    let raw = same_address(&k).encode();

    let signer = d.transaction(&path(0, 0), &raw).await?;

    // Each output is shown on its own
    let mut kinds = vec![];
    while let State::Review(_) = e.state() {
        let mut engine = e.engine.lock().unwrap();
        kinds.push(engine.current_step().unwrap().kind);
        engine.approve();
    }
    assert_eq!(
        kinds,
        vec![
            StepKind::Path,
            StepKind::InputGroup,
            StepKind::OutputGroup,
            StepKind::OutputGroup,
            StepKind::FinalConfirm
        ]
    );

    signer.await_approval(Duration::from_secs(1)).await?;
    signer.signature().await?;
    signer.complete().await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_hash() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;
    let e = TestEngine::default_seed();

    transaction::sign_hash(e.clone(), || approve_tx(&e), &m)
        .await
        .unwrap();
    assert_eq!(e.state(), State::Complete);

    transaction::reject_hash(e.clone(), || deny_tx(&e))
        .await
        .unwrap();
    assert_eq!(e.state(), State::Complete);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_hash_timeout_releases() -> anyhow::Result<()> {
    let e = TestEngine::default_seed();
    let d = DeviceHandle::from(e.clone());

    let r = d
        .sign_hash(&path(0, 0), &[0x42; 32], Duration::from_millis(300))
        .await;
    assert!(matches!(r, Err(Error::UserTimeout)), "{r:?}");

    // Abandoned request is released
    assert_eq!(e.state(), State::Complete);
    d.account(&path(0, 0), None, Default::default()).await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn tx_id_mismatch_releases() -> anyhow::Result<()> {
    let m = mnemonic(MNEMONIC)?;
    let e = TestEngine::default_seed();
    let k = keys(&DeviceHandle::from(e.clone()), &m).await?;
    let raw = simple_transfer(&k).encode();

    // Device reports a different transaction id
    let e = e.with_corrupt_ins(Instruction::SignTx as u8);
    let d = DeviceHandle::from(e.clone());

    let r = d.transaction(&path(0, 0), &raw).await;
    assert!(matches!(r, Err(Error::TxIdMismatch)), "{r:?}");

    // Request is released rather than left under review
    assert_eq!(e.state(), State::Complete);
    let info = d.app_info().await?;
    assert!(!info.flags.contains(ledger_alph::apdu::app_info::AppFlags::BUSY));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_sign_path() -> anyhow::Result<()> {
    let e = TestEngine::default_seed();
    let d = DeviceHandle::from(e.clone());

    // Path depth exceeds the maximum
    let mut req = vec![9u8];
    req.extend_from_slice(&[0u8; 36]);

    let r = d.request(TxSignReq::INS, &req).await;
    assert_eq!(
        r.err().and_then(|e| e.device_error()),
        Some(DeviceError::InvalidPath)
    );

    // Payload ends inside the path
    let r = d.request(TxSignReq::INS, &[5, 0x80, 0x00]).await;
    assert_eq!(
        r.err().and_then(|e| e.device_error()),
        Some(DeviceError::InvalidPath)
    );

    Ok(())
}
