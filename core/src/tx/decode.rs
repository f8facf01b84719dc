// Copyright (c) 2024 The Alephium Ledger App Developers

use alloc::vec::Vec;

use crate::address::{group_of_hint, pubkey_hash, script_hint, LockupScript};

use super::{
    compact::Reader, AssetInput, AssetOutput, Network, OutputRef, Token, TxError, UnlockScript,
    UnsignedTx, TX_VERSION,
};

/// hint + key + unlock type
const MIN_INPUT_LEN: usize = 4 + 32 + 1;
/// amount + P2PKH/P2SH lockup + lock time + tokens len + data len
const MIN_OUTPUT_LEN: usize = 1 + 33 + 8 + 1 + 1;
/// id + amount
const MIN_TOKEN_LEN: usize = 32 + 1;

const UNLOCK_P2PKH: u8 = 0x00;
const UNLOCK_P2MPKH: u8 = 0x01;
const UNLOCK_P2SH: u8 = 0x02;
const UNLOCK_SAME_AS_PREVIOUS: u8 = 0x03;

pub(super) fn decode_tx(bytes: &[u8]) -> Result<UnsignedTx, TxError> {
    let mut r = Reader::new(bytes);

    let version = r.u8()?;
    if version != TX_VERSION {
        return Err(TxError::InvalidVersion);
    }

    let network = Network::try_from(r.u8()?).map_err(|_| TxError::UnknownNetwork)?;

    if r.u8()? != 0 {
        return Err(TxError::UnsupportedScript);
    }

    let gas_amount = r.i32()?;
    if gas_amount <= 0 {
        return Err(TxError::InvalidGas);
    }
    let gas_price = r.u256()?;

    let inputs = decode_inputs(&mut r)?;

    let n = r.len(MIN_OUTPUT_LEN)?;
    let mut outputs = Vec::with_capacity(n);
    for _ in 0..n {
        outputs.push(decode_output(&mut r)?);
    }

    if r.remaining() != 0 {
        return Err(TxError::TrailingBytes);
    }

    Ok(UnsignedTx {
        version,
        network,
        gas_amount,
        gas_price,
        inputs,
        outputs,
    })
}

fn decode_inputs(r: &mut Reader) -> Result<Vec<AssetInput>, TxError> {
    let n = r.len(MIN_INPUT_LEN)?;
    if n == 0 {
        return Err(TxError::NoInputs);
    }

    let mut inputs = Vec::with_capacity(n);
    let mut previous_hint = None;
    let mut group = None;

    for _ in 0..n {
        let hint = u32::from_be_bytes(r.array()?);
        let key = r.array()?;

        let (unlock, expected_hint) = match r.u8()? {
            UNLOCK_P2PKH => {
                let public_key: [u8; 33] = r.array()?;
                let h = script_hint(&pubkey_hash(&public_key));
                (UnlockScript::P2PKH(public_key), h)
            }
            UNLOCK_SAME_AS_PREVIOUS => match previous_hint {
                Some(h) => (UnlockScript::SameAsPrevious, h),
                None => return Err(TxError::SameAsPreviousFirst),
            },
            // Multi-signature and script unlocks are not supported
            UNLOCK_P2MPKH | UNLOCK_P2SH => return Err(TxError::InvalidUnlockScript),
            _ => return Err(TxError::InvalidUnlockScript),
        };

        // Back-references may only spend outputs of the referenced key
        if hint != expected_hint {
            return Err(TxError::HintMismatch);
        }

        let g = group_of_hint(hint);
        match group {
            Some(v) if v != g => return Err(TxError::MixedGroups),
            _ => group = Some(g),
        }

        previous_hint = Some(expected_hint);

        inputs.push(AssetInput {
            output_ref: OutputRef { hint, key },
            unlock,
        });
    }

    Ok(inputs)
}

fn decode_output(r: &mut Reader) -> Result<AssetOutput, TxError> {
    let amount = r.u256()?;
    let lockup = LockupScript::read(r)?;
    let lock_time = r.u64_be()?;

    let n = r.len(MIN_TOKEN_LEN)?;
    let mut tokens: Vec<Token> = Vec::with_capacity(n);
    for _ in 0..n {
        let id = r.array()?;
        let amount = r.u256()?;

        if tokens.iter().any(|t| t.id == id) {
            return Err(TxError::DuplicateToken);
        }

        tokens.push(Token { id, amount });
    }

    let n = r.len(1)?;
    let additional_data = r.bytes(n)?.to_vec();

    Ok(AssetOutput {
        amount,
        lockup,
        lock_time,
        tokens,
        additional_data,
    })
}
