// Copyright (c) 2024 The Alephium Ledger App Developers

use k256::ecdsa::SigningKey;
use zeroize::Zeroize;

use ledger_alph_apdu::state::TxId;

use crate::{
    account::Account,
    review::{Review, Reviewer, Subject},
    tx::UnsignedTx,
};

/// Per-request context, cleared between requests
pub struct Function {
    inner: FunctionType,
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

/// Enum for internal state machines
#[allow(clippy::large_enum_variant)]
enum FunctionType {
    None,
    Review(ReviewContext),
}

/// Context for a request under review, any signing key is held only until
/// signing completes
pub struct ReviewContext {
    /// Signing key derived for the request, `None` for address reviews
    pub key: Option<SigningKey>,
    /// Account for the request
    pub account: Account,
    /// Content under review
    pub subject: Subject,
    /// Transaction id or hash to be signed, empty for address reviews
    pub id: TxId,
    /// Review state
    pub reviewer: Reviewer,
    /// Signature, available once approved
    pub signature: Option<[u8; 64]>,
}

impl ReviewContext {
    fn new(key: Option<SigningKey>, account: Account, subject: Subject, id: TxId) -> Self {
        let reviewer = Reviewer::new(&Review::of(&subject, &id, &account));

        Self {
            key,
            account,
            subject,
            id,
            reviewer,
            signature: None,
        }
    }

    /// Context for signing a decoded transaction
    pub fn tx(key: SigningKey, account: Account, tx: UnsignedTx, tx_id: TxId) -> Self {
        Self::new(Some(key), account, Subject::Tx(tx), tx_id)
    }

    /// Context for signing a pre-computed hash
    pub fn hash(key: SigningKey, account: Account, hash: TxId) -> Self {
        Self::new(Some(key), account, Subject::Hash, hash)
    }

    /// Context for confirming an account address
    pub fn address(account: Account) -> Self {
        Self::new(None, account, Subject::Address, TxId::new())
    }

    /// Review context for the request
    pub fn review(&self) -> Review<'_> {
        Review::of(&self.subject, &self.id, &self.account)
    }

    /// Decoded transaction, for transaction requests
    pub fn tx_ref(&self) -> Option<&UnsignedTx> {
        match &self.subject {
            Subject::Tx(tx) => Some(tx),
            _ => None,
        }
    }
}

impl Drop for ReviewContext {
    fn drop(&mut self) {
        // Signing keys zeroize on drop
        self.key = None;
        self.signature.zeroize();
    }
}

impl Function {
    /// Create a new / empty function context
    pub const fn new() -> Self {
        Self {
            inner: FunctionType::None,
        }
    }

    /// Setup review context
    pub fn review_init(&mut self, ctx: ReviewContext) {
        self.inner = FunctionType::Review(ctx);
    }

    /// Fetch review context
    pub fn reviewing(&mut self) -> Option<&mut ReviewContext> {
        match &mut self.inner {
            FunctionType::Review(s) => Some(s),
            _ => None,
        }
    }

    /// Fetch review context reference
    pub fn reviewing_ref(&self) -> Option<&ReviewContext> {
        match &self.inner {
            FunctionType::Review(s) => Some(s),
            _ => None,
        }
    }

    /// Clear function context, dropping any key material
    pub fn clear(&mut self) {
        self.inner = FunctionType::None;
    }
}
