// Copyright (c) 2024 The Alephium Ledger App Developers

//! Request review
//!
//! A [Review] walks the [Subject] of a request in a fixed order, producing one
//! [ReviewStep] per [Cursor] position. Transactions are reviewed as:
//!
//! ```text
//! Path -> Inputs* -> Output* -> Token* -> Change? -> Final
//! ```
//!
//! while hashes and addresses are shown on a single step.
//!
//! Steps are rendered on demand from the cursor and never stored, the [Reviewer]
//! tracks the cursor and the user's accept / reject decisions.

use alloc::{format, string::String, vec, vec::Vec};

use strum::{Display, EnumIter};

use ledger_alph_apdu::state::TxId;

use crate::{
    account::Account,
    address::LockupScript,
    helpers::{fmt_alph, fmt_hex, fmt_lock_time, fmt_u256, ALPH_FMT_LEN},
    tx::{AssetOutput, UnsignedTx, U256, U256_MAX_DIGITS},
};

/// Review step kinds
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub enum StepKind {
    /// Signing path and address
    Path,
    /// Consecutive inputs sharing an unlock key
    InputGroup,
    /// Recipient output
    OutputGroup,
    /// Token total across outputs
    TokenGroup,
    /// Change returned to the signer
    ChangeOutput,
    /// Network, fees and transaction id, accepting signs the transaction
    FinalConfirm,
    /// Hash to be signed
    Hash,
    /// Account address to be confirmed
    Address,
}

/// Content of a request under review
#[derive(Clone, PartialEq, Debug)]
pub enum Subject {
    /// Decoded transaction, signed by id once approved
    Tx(UnsignedTx),
    /// Pre-computed hash, signed as provided
    Hash,
    /// Account address, confirmed without signing
    Address,
}

/// A single screen of named values
#[derive(Clone, PartialEq, Debug)]
pub struct Screen {
    /// Field names and rendered values
    pub fields: Vec<(&'static str, String)>,
}

impl Screen {
    fn one(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            fields: vec![(name, value.into())],
        }
    }

    /// Fetch a field by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Rendered review step
#[derive(Clone, PartialEq, Debug)]
pub struct ReviewStep {
    /// Step kind
    pub kind: StepKind,
    /// Step title
    pub title: String,
    /// Screens, in display order
    pub screens: Vec<Screen>,
    /// Label for accepting the step, the alternative is always `Reject`
    pub confirm: &'static str,
}

/// Review cursor position
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Cursor {
    /// Signing path
    Path,
    /// Inputs `start..end`
    Inputs { start: usize, end: usize },
    /// Non-change output by index
    Output(usize),
    /// Nth distinct token
    Token(usize),
    /// Change output by index
    Change(usize),
    /// Final confirmation
    Final,
    /// Hash
    Hash,
    /// Address
    Address,
}

impl Cursor {
    /// Step kind for the cursor position
    pub fn kind(&self) -> StepKind {
        match self {
            Cursor::Path => StepKind::Path,
            Cursor::Inputs { .. } => StepKind::InputGroup,
            Cursor::Output(_) => StepKind::OutputGroup,
            Cursor::Token(_) => StepKind::TokenGroup,
            Cursor::Change(_) => StepKind::ChangeOutput,
            Cursor::Final => StepKind::FinalConfirm,
            Cursor::Hash => StepKind::Hash,
            Cursor::Address => StepKind::Address,
        }
    }

    /// Accept label for the cursor position
    pub fn confirm(&self) -> &'static str {
        match self {
            Cursor::Final => "Sign transaction",
            Cursor::Hash => "Sign hash",
            Cursor::Address => "Confirm address",
            _ => "Continue",
        }
    }
}

/// Review context over a request subject and signing account
pub struct Review<'a> {
    kind: ReviewKind<'a>,
    account: &'a Account,
}

enum ReviewKind<'a> {
    Tx(TxReview<'a>),
    Hash(&'a TxId),
    Address,
}

impl<'a> Review<'a> {
    /// Create a transaction review context
    pub fn new(tx: &'a UnsignedTx, tx_id: &'a TxId, account: &'a Account) -> Self {
        Self {
            kind: ReviewKind::Tx(TxReview::new(tx, tx_id, account)),
            account,
        }
    }

    /// Create a hash review context
    pub fn hash(hash: &'a TxId, account: &'a Account) -> Self {
        Self {
            kind: ReviewKind::Hash(hash),
            account,
        }
    }

    /// Create an address review context
    pub fn address(account: &'a Account) -> Self {
        Self {
            kind: ReviewKind::Address,
            account,
        }
    }

    /// Create a review context for a request subject, `id` is the
    /// transaction id or hash to be signed
    pub fn of(subject: &'a Subject, id: &'a TxId, account: &'a Account) -> Self {
        match subject {
            Subject::Tx(tx) => Self::new(tx, id, account),
            Subject::Hash => Self::hash(id, account),
            Subject::Address => Self::address(account),
        }
    }

    /// Cursor for the first step
    pub fn first(&self) -> Cursor {
        match self.kind {
            ReviewKind::Tx(_) => Cursor::Path,
            ReviewKind::Hash(_) => Cursor::Hash,
            ReviewKind::Address => Cursor::Address,
        }
    }

    /// Cursor following `c`, `None` after the final step
    pub fn next(&self, c: Cursor) -> Option<Cursor> {
        match &self.kind {
            ReviewKind::Tx(t) => t.next(c),
            _ => None,
        }
    }

    /// Iterate over all review steps
    pub fn steps(&self) -> impl Iterator<Item = Cursor> + '_ {
        core::iter::successors(Some(self.first()), |c| self.next(*c))
    }

    /// Number of review steps
    pub fn step_count(&self) -> usize {
        self.steps().count()
    }

    /// Render the step at a cursor position
    pub fn render(&self, c: Cursor) -> ReviewStep {
        let mut buff = [0u8; 64];

        let (title, screens) = match (&self.kind, c) {
            (ReviewKind::Tx(t), c) => t.render(c),
            (ReviewKind::Hash(h), Cursor::Hash) => (
                String::from("Review"),
                vec![Screen::one("Hash", fmt_hex(&h.0, &mut buff))],
            ),
            (ReviewKind::Address, Cursor::Address) => (
                String::from("Review"),
                vec![Screen::one("Address", self.account.address())],
            ),
            _ => (String::new(), vec![]),
        };

        ReviewStep {
            kind: c.kind(),
            title,
            screens,
            confirm: c.confirm(),
        }
    }
}

/// Transaction walk
struct TxReview<'a> {
    tx: &'a UnsignedTx,
    tx_id: &'a TxId,
    account: &'a Account,
    change: Option<usize>,
}

impl<'a> TxReview<'a> {
    fn new(tx: &'a UnsignedTx, tx_id: &'a TxId, account: &'a Account) -> Self {
        let change = tx.change_index(&account.public_key);

        Self {
            tx,
            tx_id,
            account,
            change,
        }
    }

    fn next(&self, c: Cursor) -> Option<Cursor> {
        let n = match c {
            Cursor::Path => self.inputs_from(0),
            Cursor::Inputs { end, .. } => self.inputs_from(end),
            Cursor::Output(i) => self.outputs_from(i + 1),
            Cursor::Token(k) => self.tokens_from(k + 1),
            Cursor::Change(_) => Cursor::Final,
            Cursor::Final | Cursor::Hash | Cursor::Address => return None,
        };
        Some(n)
    }

    fn inputs_from(&self, start: usize) -> Cursor {
        if start >= self.tx.inputs.len() {
            return self.outputs_from(0);
        }

        let key = self.tx.input_key(start);
        let mut end = start + 1;
        while end < self.tx.inputs.len() && self.tx.input_key(end) == key {
            end += 1;
        }

        Cursor::Inputs { start, end }
    }

    fn outputs_from(&self, from: usize) -> Cursor {
        match (from..self.tx.outputs.len()).find(|i| Some(*i) != self.change) {
            Some(i) => Cursor::Output(i),
            None => self.tokens_from(0),
        }
    }

    fn tokens_from(&self, k: usize) -> Cursor {
        if self.token_id(k).is_some() {
            return Cursor::Token(k);
        }

        match self.change {
            Some(i) => Cursor::Change(i),
            None => Cursor::Final,
        }
    }

    /// Non-change outputs
    fn recipients(&self) -> impl Iterator<Item = &AssetOutput> + '_ {
        self.tx
            .outputs
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != self.change)
            .map(|(_, o)| o)
    }

    /// Nth distinct token id across non-change outputs, in order of first appearance
    fn token_id(&self, k: usize) -> Option<&[u8; 32]> {
        let mut ids = self.recipients().flat_map(|o| o.tokens.iter()).map(|t| &t.id);

        let mut seen: Vec<&[u8; 32]> = Vec::new();
        for id in &mut ids {
            if seen.contains(&id) {
                continue;
            }
            if seen.len() == k {
                return Some(id);
            }
            seen.push(id);
        }

        None
    }

    fn render(&self, c: Cursor) -> (String, Vec<Screen>) {
        match c {
            Cursor::Path => (String::from("Path"), self.render_path()),
            Cursor::Inputs { start, end } => self.render_inputs(start, end),
            Cursor::Output(i) => (format!("Output #{i}"), self.render_output(i)),
            Cursor::Token(k) => (String::from("Token"), self.render_token(k)),
            Cursor::Change(i) => (String::from("Change"), self.render_output(i)),
            Cursor::Final => (String::from("Confirm"), self.render_final()),
            Cursor::Hash | Cursor::Address => (String::new(), vec![]),
        }
    }

    fn render_path(&self) -> Vec<Screen> {
        vec![
            Screen::one("Path", format!("{}", self.account.path)),
            Screen::one("Address", self.account.address()),
        ]
    }

    fn render_inputs(&self, start: usize, end: usize) -> (String, Vec<Screen>) {
        let title = match end - start {
            1 => format!("Input #{start}"),
            _ => format!("Inputs #{} - #{}", start, end - 1),
        };

        let key = self.tx.input_key(start).copied().unwrap_or([0u8; 33]);
        let mut buff = [0u8; 66];

        let mut screens = vec![
            Screen::one("Address", LockupScript::p2pkh(&key).address()),
            Screen::one("Public Key", fmt_hex(&key, &mut buff)),
        ];

        // Key differs from the preceding input
        if start > 0 {
            screens.push(Screen::one("Unlock Script", "P2PKH, new key"));
        }

        if key != self.account.public_key {
            screens.push(Screen::one("Warning", "External input"));
        }

        for i in &self.tx.inputs[start..end] {
            screens.push(Screen::one(
                "Output Ref",
                fmt_hex(&i.output_ref.key, &mut buff),
            ));
        }

        (title, screens)
    }

    fn render_output(&self, index: usize) -> Vec<Screen> {
        let o = match self.tx.outputs.get(index) {
            Some(v) => v,
            None => return vec![],
        };

        let mut buff = [0u8; ALPH_FMT_LEN];
        let mut id_buff = [0u8; 64];

        let mut screens = vec![Screen::one("Address", o.lockup.address())];

        // Additional signatures required for multi-sig recipients
        if let LockupScript::P2MPKH { hashes, m } = &o.lockup {
            for i in 1..*m {
                screens.push(Screen::one(
                    "Multi-sig",
                    format!("signature {} of {} ({} keys)", i + 1, m, hashes.len()),
                ));
            }
        }

        for t in &o.tokens {
            screens.push(Screen {
                fields: vec![
                    ("Token ID", fmt_hex(&t.id, &mut id_buff).into()),
                    ("Token Amount", fmt_u256(&t.amount, &mut buff).into()),
                ],
            });
        }

        screens.push(Screen::one("ALPH", fmt_alph(&o.amount, &mut buff)));

        if o.lock_time != 0 {
            screens.push(Screen::one("Lock Time", fmt_lock_time(o.lock_time, &mut buff)));
        }

        if !o.additional_data.is_empty() {
            screens.push(Screen::one("Message", fmt_message(&o.additional_data)));
        }

        screens
    }

    fn render_token(&self, k: usize) -> Vec<Screen> {
        let id = match self.token_id(k) {
            Some(v) => v,
            None => return vec![],
        };

        let total = self
            .recipients()
            .flat_map(|o| o.tokens.iter())
            .filter(|t| &t.id == id)
            .try_fold(U256::ZERO, |a, t| a.checked_add(&t.amount));

        let mut id_buff = [0u8; 64];
        let mut buff = [0u8; U256_MAX_DIGITS];

        let total = match &total {
            Some(v) => fmt_u256(v, &mut buff),
            None => "Overflow",
        };

        vec![Screen {
            fields: vec![
                ("Token ID", fmt_hex(id, &mut id_buff).into()),
                ("Total Amount", total.into()),
            ],
        }]
    }

    fn render_final(&self) -> Vec<Screen> {
        let mut buff = [0u8; ALPH_FMT_LEN];
        let mut id_buff = [0u8; 64];

        let fees = match self.tx.fee() {
            Some(f) => String::from(fmt_alph(&f, &mut buff)),
            None => String::from("Overflow"),
        };

        vec![
            Screen::one("Network", format!("{}", self.tx.network)),
            Screen::one("Fees", fees),
            Screen::one("Transaction ID", fmt_hex(&self.tx_id.0, &mut id_buff)),
        ]
    }
}

/// Render printable ASCII messages as text, otherwise as hex
fn fmt_message(d: &[u8]) -> String {
    if d.iter().all(|c| (0x20..0x7f).contains(c)) {
        return d.iter().map(|c| *c as char).collect();
    }

    d.iter().map(|b| format!("{b:02x}")).collect()
}

/// Review progress
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ReviewState {
    /// Waiting on the user at the provided step
    Pending(Cursor),
    /// Every step accepted
    Approved,
    /// A step was rejected
    Rejected,
}

/// Review state machine, tracking the cursor and user decisions
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Reviewer {
    state: ReviewState,
    step: u16,
}

impl Reviewer {
    /// Create a reviewer at the first step of a review
    pub fn new(review: &Review) -> Self {
        Self {
            state: ReviewState::Pending(review.first()),
            step: 0,
        }
    }

    /// Current review state
    pub fn state(&self) -> ReviewState {
        self.state
    }

    /// Index of the current step
    pub fn step(&self) -> u16 {
        self.step
    }

    /// Current cursor, if review is in progress
    pub fn cursor(&self) -> Option<Cursor> {
        match self.state {
            ReviewState::Pending(c) => Some(c),
            _ => None,
        }
    }

    /// Render the current step
    pub fn current_step(&self, review: &Review) -> Option<ReviewStep> {
        self.cursor().map(|c| review.render(c))
    }

    /// Accept the current step, advancing to the next
    pub fn accept(&mut self, review: &Review) -> ReviewState {
        if let ReviewState::Pending(c) = self.state {
            self.state = match review.next(c) {
                Some(n) => {
                    self.step = self.step.saturating_add(1);
                    ReviewState::Pending(n)
                }
                None => ReviewState::Approved,
            };
        }

        self.state
    }

    /// Reject the current step, rejecting the whole request
    pub fn reject(&mut self) -> ReviewState {
        if let ReviewState::Pending(_) = self.state {
            self.state = ReviewState::Rejected;
        }

        self.state
    }
}
