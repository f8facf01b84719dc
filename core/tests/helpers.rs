// Copyright (c) 2024 The Alephium Ledger App Developers

#![allow(unused)]

use std::{
    ops::Deref,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, trace};

use ledger_alph::Error;
use ledger_alph_core::{
    dispatch::{disconnect, handle_apdu},
    engine::{Engine, SeedDriver, State},
};
use ledger_alph_tests::{driver, mnemonic, MNEMONIC};
use ledger_transport::{async_trait, APDUAnswer, APDUCommand, Exchange};

/// Engine wrapper exchanging raw APDUs via [handle_apdu]
#[derive(Clone)]
pub struct TestEngine {
    pub engine: Arc<Mutex<Engine<SeedDriver>>>,
    /// Approve each review step as soon as a request is loaded
    pub auto_approve: bool,
    /// Flip the final response byte for requests with this instruction
    pub corrupt_ins: Option<u8>,
}

impl TestEngine {
    pub fn new(engine: Engine<SeedDriver>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            auto_approve: false,
            corrupt_ins: None,
        }
    }

    /// Engine using the default test mnemonic
    pub fn default_seed() -> Self {
        let m = mnemonic(MNEMONIC).unwrap();
        Self::new(Engine::new(driver(&m)))
    }

    pub fn with_auto_approve(mut self) -> Self {
        self.auto_approve = true;
        self
    }

    pub fn with_corrupt_ins(mut self, ins: u8) -> Self {
        self.corrupt_ins = Some(ins);
        self
    }

    pub fn state(&self) -> State {
        self.engine.lock().unwrap().state()
    }

    /// Drop the host connection
    pub fn disconnect(&self) {
        let mut e = self.engine.lock().unwrap();
        disconnect(&mut e);
    }
}

/// Wait for the engine to enter review
async fn await_review(t: &TestEngine) {
    for _ in 0..100 {
        if let State::Review(_) = t.state() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Accept every review step for the loaded request
pub async fn approve_tx(t: &TestEngine) {
    await_review(t).await;

    let mut e = t.engine.lock().unwrap();

    let mut n = 0;
    while let State::Review(_) = e.state() {
        debug!("approving step {}: {:?}", n, e.current_step());
        e.approve();
        n += 1;
    }

    debug!("approved {} steps, state: {:?}", n, e.state());
}

/// Reject the loaded request
pub async fn deny_tx(t: &TestEngine) {
    await_review(t).await;

    let mut e = t.engine.lock().unwrap();
    e.deny();
}

#[async_trait]
impl Exchange for TestEngine {
    type Error = Error;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(&self, command: &APDUCommand<I>) -> Result<APDUAnswer<Vec<u8>>, Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        let req = command.serialize();
        trace!("req: {:02x?}", req);

        let mut resp = [0u8; 260];

        let n = {
            let mut e = self.engine.lock().unwrap();
            let n = handle_apdu(&mut e, &req, &mut resp);

            if self.auto_approve {
                while let State::Review(_) = e.state() {
                    e.approve();
                }
            }

            n
        };

        if self.corrupt_ins == Some(command.ins) && n > 2 {
            resp[n - 3] ^= 0xff;
        }

        trace!("resp: {:02x?}", &resp[..n]);

        APDUAnswer::from_answer(resp[..n].to_vec()).map_err(|_| Error::InvalidLength)
    }
}
