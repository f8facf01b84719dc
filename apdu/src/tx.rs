// Copyright (c) 2024 The Alephium Ledger App Developers

//! Transaction related APDUs, used to review and sign an unsigned transaction via the hardware wallet.
//!
//! See `ledger_alph_core::engine` for interaction and state machines

use encdec::{Decode, DecodeOwned, Encode};

use crate::{
    helpers::arr,
    path::DerivationPath,
    state::{TxId, TxState},
    ApduError, ApduStatic, Instruction, ALPH_APDU_CLA,
};

/// Sign transaction request payload, split into chunks with
/// [frame][crate::frame] and reassembled on the device prior to decoding.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      PATH (see DerivationPath)                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                  UNSIGNED_TX (remaining bytes)                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct TxSignReq<'a> {
    /// Derivation path for the signing account
    pub path: DerivationPath,

    /// Serialised unsigned transaction
    pub tx: &'a [u8],
}

impl<'a> TxSignReq<'a> {
    /// Create a new sign request
    pub fn new(path: DerivationPath, tx: &'a [u8]) -> Self {
        Self { path, tx }
    }
}

impl<'a> ApduStatic for TxSignReq<'a> {
    const CLA: u8 = ALPH_APDU_CLA;
    const INS: u8 = Instruction::SignTx as u8;
}

impl<'a> Encode for TxSignReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.path.encode_len()? + self.tx.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = self.path.encode(buff)?;

        buff[index..][..self.tx.len()].copy_from_slice(self.tx);
        index += self.tx.len();

        Ok(index)
    }
}

impl<'a> Decode<'a> for TxSignReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        let (path, n) = DerivationPath::decode_owned(buff)?;
        let tx = &buff[n..];

        Ok((Self { path, tx }, buff.len()))
    }
}

/// Sign hash request, a pre-computed 32-byte hash reviewed and signed in
/// place of a transaction. Fits a single chunk.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      PATH (see DerivationPath)                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                        HASH (32 bytes)                        /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct HashSignReq {
    /// Derivation path for the signing account
    pub path: DerivationPath,

    /// Hash to be signed
    pub hash: [u8; 32],
}

impl HashSignReq {
    /// Create a new sign hash request
    pub fn new(path: DerivationPath, hash: [u8; 32]) -> Self {
        Self { path, hash }
    }
}

impl ApduStatic for HashSignReq {
    const CLA: u8 = ALPH_APDU_CLA;
    const INS: u8 = Instruction::SignHash as u8;
}

impl Encode for HashSignReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.path.encode_len()? + 32)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let n = self.path.encode(buff)?;
        let m = arr::enc(&self.hash, &mut buff[n..])?;

        Ok(n + m)
    }
}

impl DecodeOwned for HashSignReq {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        let (path, n) = DerivationPath::decode_owned(buff)?;

        // Hash must fill the remainder exactly
        if buff.len() != n + 32 {
            return Err(ApduError::InvalidLength);
        }
        let (hash, m) = arr::dec::<32>(&buff[n..])?;

        Ok((Self { path, hash }, n + m))
    }
}

/// Transaction information request APDU
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxInfoReq;

impl ApduStatic for TxInfoReq {
    const CLA: u8 = ALPH_APDU_CLA;
    const INS: u8 = Instruction::TxGetInfo as u8;
}

/// Complete transaction operation (0 length APDU)
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxComplete;

impl ApduStatic for TxComplete {
    const CLA: u8 = ALPH_APDU_CLA;
    const INS: u8 = Instruction::TxComplete as u8;
}

/// Fetch signature for an approved transaction (0 length APDU)
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSignatureReq;

impl ApduStatic for TxSignatureReq {
    const CLA: u8 = ALPH_APDU_CLA;
    const INS: u8 = Instruction::TxGetSignature as u8;
}

/// Transaction information response APDU.
///
/// Received in response to TX commands, contains the current transaction engine state,
/// the index of the review step being shown (zero otherwise), and the identifier of the
/// loaded transaction (zero prior to decoding).
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   TX_STATE    |             VALUE             |               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+               +
/// /                      TX_ID (32 bytes)                         /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxInfo {
    /// Current transaction engine state
    pub state: TxState,
    /// Value associated with current state (zero otherwise)
    pub value: u16,
    /// Transaction identifier
    pub tx_id: TxId,
}

/// Transaction signature response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      TX_ID (32 bytes)                         /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                  SIGNATURE (64 bytes, r || s)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSignature {
    /// Identifier of the signed transaction
    pub tx_id: TxId,

    /// Compact ECDSA signature
    #[encdec(with = "arr")]
    pub signature: [u8; 64],
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn tx_info_apdu() {
        let apdu = TxInfo {
            state: TxState::Review,
            value: 3,
            tx_id: TxId([0x5a; 32]),
        };

        let mut buff = [0u8; 128];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 35);
    }

    #[test]
    fn tx_signature_apdu() {
        let apdu = TxSignature {
            tx_id: TxId([0x11; 32]),
            signature: [0x22; 64],
        };

        let mut buff = [0u8; 128];
        encode_decode_apdu(&mut buff, &apdu);
    }

    #[test]
    fn tx_sign_req_payload() {
        let path = DerivationPath::from_str("m/44'/1234'/0'/0/0").unwrap();
        let tx = [0x00, 0x01, 0x02, 0x03];

        let req = TxSignReq::new(path, &tx);

        let mut buff = [0u8; 64];
        let n = req.encode(&mut buff).unwrap();
        assert_eq!(n, req.encode_len().unwrap());

        let (d, m) = TxSignReq::decode(&buff[..n]).unwrap();
        assert_eq!(d, req);
        assert_eq!(m, n);

        // Bad paths are reported as such, not as transaction errors
        buff[0] = 9;
        assert_eq!(TxSignReq::decode(&buff[..n]), Err(ApduError::InvalidPath));
    }

    #[test]
    fn hash_sign_req_apdu() {
        let path = DerivationPath::from_str("m/44'/1234'/0'/0/0").unwrap();
        let apdu = HashSignReq::new(path, [0xc3; 32]);

        let mut buff = [0u8; 128];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 21 + 32);

        // Short and long hashes are rejected
        assert_eq!(
            HashSignReq::decode(&buff[..n - 1]),
            Err(ApduError::InvalidLength)
        );
        assert_eq!(
            HashSignReq::decode(&buff[..n + 1]),
            Err(ApduError::InvalidLength)
        );
    }
}
