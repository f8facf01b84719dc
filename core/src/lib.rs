// Copyright (c) 2024 The Alephium Ledger App Developers

//! Alephium hardware wallet core
//!
//! This provides a common [Engine][engine::Engine] supporting account derivation and
//! transaction review / signing for execution on hardware wallets.
//!
//! Interactions with the [Engine][engine::Engine] are performed via [Event][engine::Event]s
//! and [Output][engine::Output]s, see [ledger_alph_apdu] for APDU objects and wire encodings,
//! or use [dispatch::handle_apdu] to operate directly on raw request / response buffers.
//!
//! ## Operations
//!
//! Prior to interacting with a hardware wallet the client should issue an
//! [`AppInfoReq`][ledger_alph_apdu::app_info::AppInfoReq] to fetch an
//! [`AppInfoResp`][ledger_alph_apdu::app_info::AppInfoResp] containing the application
//! name, version, protocol version, and flags.
//!
//! ### Requesting accounts
//!
//! Accounts are requested via [`AccountReq`][ledger_alph_apdu::account::AccountReq] with a
//! BIP44 path and optional target group. Where a group is provided the final path index is
//! advanced until the derived address belongs to that group, with the reached index returned in
//! the [`AccountResp`][ledger_alph_apdu::account::AccountResp].
//!
//! ### Signing a transaction
//!
//! 1. Issue [`TxSignReq`][ledger_alph_apdu::tx::TxSignReq] containing the signing path and
//!    serialised unsigned transaction, split into chunks by [ledger_alph_apdu::frame]
//! 2. Poll [`TxInfoReq`][ledger_alph_apdu::tx::TxInfoReq] while the user reviews the
//!    transaction, checking the returned transaction id matches the local computation
//! 3. Once in the `Signed` state issue
//!    [`TxSignatureReq`][ledger_alph_apdu::tx::TxSignatureReq] to fetch the signature
//! 4. Issue [`TxComplete`][ledger_alph_apdu::tx::TxComplete] to release the request

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use ledger_alph_apdu::{self as apdu};

pub mod account;

pub mod address;

pub mod dispatch;

pub mod engine;

pub mod helpers;

pub mod review;

pub mod tx;
