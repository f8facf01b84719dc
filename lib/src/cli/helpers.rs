// Copyright (c) 2024 The Alephium Ledger App Developers

#[derive(Clone, PartialEq, Debug)]
pub struct HexData<const N: usize = 32>(pub [u8; N]);

impl<const N: usize> std::str::FromStr for HexData<N> {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; N];

        hex::decode_to_slice(s.trim_start_matches("0x"), &mut b)?;

        Ok(HexData(b))
    }
}

impl<const N: usize> AsRef<[u8; N]> for HexData<N> {
    fn as_ref(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> std::fmt::Display for HexData<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Variable length hex encoded data
#[derive(Clone, PartialEq, Debug)]
pub struct HexVec(pub Vec<u8>);

impl std::str::FromStr for HexVec {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.trim().trim_start_matches("0x")).map(HexVec)
    }
}

/// Signed transaction output
#[derive(Clone, PartialEq, Debug, serde::Serialize)]
pub struct SignedOutput {
    pub path: String,
    pub address: String,
    pub public_key: String,
    pub tx_id: String,
    pub signature: String,
}

/// Account output
#[derive(Clone, PartialEq, Debug, serde::Serialize)]
pub struct AccountOutput {
    pub path: String,
    pub index: u32,
    pub group: u8,
    pub address: String,
    pub public_key: String,
}
