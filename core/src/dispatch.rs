// Copyright (c) 2024 The Alephium Ledger App Developers

//! Raw APDU dispatch
//!
//! Decodes request APDUs to [Event]s, updates the [Engine] and encodes the
//! resulting [Output][crate::engine::Output] with a trailing status word.

use encdec::Decode;

use ledger_alph_apdu::{
    frame::{Chunk, FrameError},
    status::{append_status, SW_OK, SW_UNKNOWN_INS},
    Instruction,
};

use crate::engine::{Driver, Engine, Error, Event};

/// Handle a request APDU, writing the response (`DATA || SW1 SW2`) to `resp`
/// and returning the response length.
///
/// `resp` must have space for the largest response plus the status word.
#[cfg_attr(feature = "noinline", inline(never))]
pub fn handle_apdu<DRV: Driver>(engine: &mut Engine<DRV>, req: &[u8], resp: &mut [u8]) -> usize {
    let sw = match dispatch(engine, req, resp) {
        Ok(n) => return append_status(resp, n, SW_OK).unwrap_or(0),
        Err(sw) => sw,
    };

    append_status(resp, 0, sw).unwrap_or(0)
}

/// Notify the engine the host has gone away
pub fn disconnect<DRV: Driver>(engine: &mut Engine<DRV>) {
    if let Err(_e) = engine.update(&Event::Disconnect) {
        #[cfg(feature = "log")]
        log::warn!("disconnect: {:?}", _e);
    }
}

fn dispatch<DRV: Driver>(engine: &mut Engine<DRV>, req: &[u8], resp: &mut [u8]) -> Result<usize, u16> {
    // Decode chunk header and data
    let (chunk, _n) = Chunk::decode(req).map_err(|e| {
        #[cfg(feature = "log")]
        log::warn!("invalid request APDU: {:?}", e);

        Error::from(e).status()
    })?;

    if Instruction::try_from(chunk.ins).is_err() {
        #[cfg(feature = "log")]
        log::warn!("unknown instruction: 0x{:02x}", chunk.ins);

        return Err(SW_UNKNOWN_INS);
    }

    // Only signing requests may span multiple chunks
    if chunk.ins != Instruction::SignTx as u8 && (chunk.seq != 0 || chunk.more) {
        return Err(Error::from(FrameError::Framing).status());
    }

    // Decode APDUs to engine events, path errors keep their own status
    let evt = Event::parse(&chunk).map_err(|e| {
        #[cfg(feature = "log")]
        log::warn!("invalid request: {:?}", e);

        Error::from(e).status()
    })?;

    // Update engine
    let output = engine.update(&evt).map_err(|e| e.status())?;

    // Encode engine output to response APDU, reserving space for the status word
    let max = resp.len().saturating_sub(2);
    output
        .encode(&mut resp[..max])
        .map_err(|_| Error::EncodingFailed.status())
}
