// Copyright (c) 2024 The Alephium Ledger App Developers

//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    account::{AccountReq, AccountResp, KeyType},
    app_info::{AppFlags, AppInfoReq, AppInfoResp, KeyTypes},
    frame::{ApduHeader, Chunk, FrameError, Reassembler},
    path::DerivationPath,
    state::{TxId, TxState},
    status::{SW_ERROR_BASE, SW_OK},
    tx::{
        HashSignReq, TxComplete, TxInfo, TxInfoReq, TxSignReq, TxSignature, TxSignatureReq,
    },
    ApduError, ApduStatic, Instruction, ALPH_APDU_CLA,
};
