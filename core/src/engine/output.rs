// Copyright (c) 2024 The Alephium Ledger App Developers

use encdec::Encode;

use ledger_alph_apdu::{
    account::{AccountResp, KeyType},
    app_info::{AppFlags, AppInfoResp},
    state::{TxId, TxState},
    tx::{TxInfo, TxSignature},
    ApduError, ALPH_PROTO_VERSION,
};

use super::{State, APP_NAME, APP_VERSION};
use crate::{account::KEY_TYPES, address::GROUP_NUM};

/// [`Engine`][super::Engine] outputs (in response to events), typically encoded to response [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Output {
    None,

    /// Engine state
    State { state: State, tx_id: TxId },

    /// Application information
    AppInfo { flags: AppFlags },

    /// Derived account
    Account {
        index: u32,
        group: u8,
        key_type: KeyType,
        public_key: [u8; 33],
    },

    /// Transaction signature
    Signature {
        tx_id: TxId,
        signature: [u8; 64],
    },
}

impl Output {
    /// Encode an [`Output`] object to response APDU
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        match self.clone() {
            Output::None => Ok(0),
            Output::State { state, tx_id } => TxInfo {
                state: state.state(),
                value: state.value(),
                tx_id,
            }
            .encode(buff),
            Output::AppInfo { flags } => AppInfoResp {
                proto: ALPH_PROTO_VERSION,
                groups: GROUP_NUM,
                key_types: KEY_TYPES,
                flags,
                name: APP_NAME,
                version: APP_VERSION,
            }
            .encode(buff),
            Output::Account {
                index,
                group,
                key_type,
                public_key,
            } => AccountResp {
                index,
                group,
                key_type,
                public_key,
            }
            .encode(buff),
            Output::Signature { tx_id, signature } => {
                TxSignature { tx_id, signature }.encode(buff)
            }
        }
    }

    /// Fetch state for outputs containing this
    pub fn state(&self) -> Option<State> {
        match &self {
            Output::State { state, .. } => Some(*state),
            _ => None,
        }
    }

    /// Fetch transaction id for outputs containing this
    pub fn tx_id(&self) -> Option<&TxId> {
        match &self {
            Output::State { tx_id, .. } | Output::Signature { tx_id, .. } => Some(tx_id),
            _ => None,
        }
    }
}

impl PartialEq<State> for Output {
    fn eq(&self, other: &State) -> bool {
        match self {
            Output::State { state, .. } => state == other,
            _ => false,
        }
    }
}

impl State {
    /// Map [engine](crate::engine) states to [apdu][TxState] states for transmission
    pub fn state(&self) -> TxState {
        match self {
            State::Init => TxState::Init,
            State::Loading(_) => TxState::Loading,
            State::Review(_) => TxState::Review,
            State::Signed => TxState::Signed,
            State::Rejected => TxState::Rejected,
            State::Verified => TxState::Verified,
            State::Complete => TxState::Complete,
            State::Error => TxState::Error,
        }
    }

    /// Value associated with the state (chunk count or review step)
    pub fn value(&self) -> u16 {
        match self {
            State::Loading(n) => *n,
            State::Review(n) => *n,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn state_mapping() {
        for s in State::iter() {
            let o = Output::State {
                state: s,
                tx_id: TxId([0x11; 32]),
            };

            let mut buff = [0u8; 64];
            let n = o.encode(&mut buff).unwrap();
            assert_eq!(n, 35);
            assert_eq!(buff[0], s.state() as u8);
            assert!(o == s);
        }

        assert_eq!(State::Review(7).value(), 7);
        assert_eq!(State::Signed.value(), 0);
    }
}
