// Copyright (c) 2024 The Alephium Ledger App Developers

//! Host-side signature verification

use k256::ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey};

/// Verify a compact (`r || s`) ECDSA signature over a transaction id.
///
/// Malformed keys or signatures verify as `false`.
pub fn verify(tx_id: &[u8; 32], public_key: &[u8], signature: &[u8]) -> bool {
    let key = match VerifyingKey::from_sec1_bytes(public_key) {
        Ok(v) => v,
        Err(_) => return false,
    };

    let sig = match Signature::from_slice(signature) {
        Ok(v) => v,
        Err(_) => return false,
    };

    key.verify_prehash(tx_id, &sig).is_ok()
}
