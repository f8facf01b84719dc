// Copyright (c) 2024 The Alephium Ledger App Developers

use alloc::vec::Vec;

use super::{
    compact::{put_i32, put_u256},
    AssetInput, AssetOutput, UnlockScript, UnsignedTx,
};

pub(super) fn encode_tx(tx: &UnsignedTx) -> Vec<u8> {
    let mut b = Vec::with_capacity(256);

    b.push(tx.version);
    b.push(tx.network as u8);
    // No script
    b.push(0);

    put_i32(&mut b, tx.gas_amount);
    put_u256(&mut b, &tx.gas_price);

    put_i32(&mut b, tx.inputs.len() as i32);
    for i in &tx.inputs {
        encode_input(&mut b, i);
    }

    put_i32(&mut b, tx.outputs.len() as i32);
    for o in &tx.outputs {
        encode_output(&mut b, o);
    }

    b
}

fn encode_input(b: &mut Vec<u8>, i: &AssetInput) {
    b.extend_from_slice(&i.output_ref.hint.to_be_bytes());
    b.extend_from_slice(&i.output_ref.key);

    match &i.unlock {
        UnlockScript::P2PKH(k) => {
            b.push(0x00);
            b.extend_from_slice(k);
        }
        UnlockScript::SameAsPrevious => b.push(0x03),
    }
}

fn encode_output(b: &mut Vec<u8>, o: &AssetOutput) {
    put_u256(b, &o.amount);
    o.lockup.write(b);
    b.extend_from_slice(&o.lock_time.to_be_bytes());

    put_i32(b, o.tokens.len() as i32);
    for t in &o.tokens {
        b.extend_from_slice(&t.id);
        put_u256(b, &t.amount);
    }

    put_i32(b, o.additional_data.len() as i32);
    b.extend_from_slice(&o.additional_data);
}
