// Copyright (c) 2024 The Alephium Ledger App Developers

//! Chunk framing for messages larger than a single APDU.
//!
//! Each chunk is an APDU with `P1` carrying a (wrapping) sequence number and
//! bit 7 of `P2` set where further chunks follow.
//!
//! ## Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      CLA      |      INS      |    P1 (SEQ)   |  P2 (FLAGS)   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      LC       |            DATA (LC bytes, <= 250)            /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use encdec::{Decode, Encode};
use heapless::Vec;

use crate::{ApduError, ALPH_APDU_CLA};

/// APDU header length (`CLA INS P1 P2 LC`)
pub const APDU_HEADER_LEN: usize = 5;

/// Maximum data bytes carried per chunk
pub const MAX_CHUNK_DATA: usize = 250;

/// Maximum reassembled message length
pub const MAX_PAYLOAD: usize = 4096;

/// Maximum encoded chunk length
pub const MAX_CHUNK_LEN: usize = APDU_HEADER_LEN + MAX_CHUNK_DATA;

bitflags::bitflags! {
    /// Chunk flags, carried in `P2`
    pub struct ChunkFlags: u8 {
        /// Further chunks follow this one
        const MORE = 1 << 7;
    }
}

/// Framing errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum FrameError {
    /// Message exceeds [MAX_PAYLOAD]
    #[cfg_attr(feature = "thiserror", error("payload too large"))]
    PayloadTooLarge,

    /// Malformed chunk or chunk sequence
    #[cfg_attr(feature = "thiserror", error("protocol framing error"))]
    Framing,

    /// Channel closed before the final chunk
    #[cfg_attr(feature = "thiserror", error("message truncated"))]
    Truncated,
}

impl From<ApduError> for FrameError {
    fn from(_: ApduError) -> Self {
        FrameError::Framing
    }
}

impl From<encdec::Error> for FrameError {
    fn from(_: encdec::Error) -> Self {
        FrameError::Framing
    }
}

/// APDU header
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ApduHeader {
    /// Class
    pub cla: u8,
    /// Instruction
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
}

impl ApduHeader {
    /// Parse an APDU header and return the data following the `LC` field.
    ///
    /// Fails where the buffer is shorter than a header or `LC` does not
    /// match the data length.
    pub fn parse(buff: &[u8]) -> Result<(Self, &[u8]), FrameError> {
        if buff.len() < APDU_HEADER_LEN {
            return Err(FrameError::Framing);
        }

        let h = Self {
            cla: buff[0],
            ins: buff[1],
            p1: buff[2],
            p2: buff[3],
        };

        let lc = buff[4] as usize;
        let data = &buff[APDU_HEADER_LEN..];
        if lc != data.len() {
            return Err(FrameError::Framing);
        }

        Ok((h, data))
    }

    /// Sequence number of a chunked request
    pub fn seq(&self) -> u8 {
        self.p1
    }

    /// Chunk flags of a chunked request
    pub fn flags(&self) -> ChunkFlags {
        ChunkFlags::from_bits_truncate(self.p2)
    }
}

/// A single chunk of a framed message
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Chunk<'a> {
    /// Instruction
    pub ins: u8,
    /// Sequence number
    pub seq: u8,
    /// Further chunks follow
    pub more: bool,
    /// Chunk data
    pub data: &'a [u8],
}

impl<'a> Encode for Chunk<'a> {
    type Error = FrameError;

    fn encode_len(&self) -> Result<usize, FrameError> {
        Ok(APDU_HEADER_LEN + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, FrameError> {
        if self.data.len() > MAX_CHUNK_DATA {
            return Err(FrameError::Framing);
        }

        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(FrameError::Framing);
        }

        let flags = match self.more {
            true => ChunkFlags::MORE,
            false => ChunkFlags::empty(),
        };

        buff[0] = ALPH_APDU_CLA;
        buff[1] = self.ins;
        buff[2] = self.seq;
        buff[3] = flags.bits();
        buff[4] = self.data.len() as u8;
        buff[APDU_HEADER_LEN..n].copy_from_slice(self.data);

        Ok(n)
    }
}

impl<'a> Decode<'a> for Chunk<'a> {
    type Output = Self;
    type Error = FrameError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), FrameError> {
        let (h, data) = ApduHeader::parse(buff)?;

        if h.cla != ALPH_APDU_CLA {
            return Err(FrameError::Framing);
        }
        if data.len() > MAX_CHUNK_DATA {
            return Err(FrameError::Framing);
        }

        let c = Self {
            ins: h.ins,
            seq: h.seq(),
            more: h.flags().contains(ChunkFlags::MORE),
            data,
        };

        Ok((c, buff.len()))
    }
}

/// Split a message into chunks, see [Frames]
pub fn frame(ins: u8, payload: &[u8]) -> Result<Frames<'_>, FrameError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge);
    }

    Ok(Frames {
        ins,
        payload,
        seq: 0,
        done: false,
    })
}

/// Iterator over the chunks of a message.
///
/// An empty message is carried in a single empty chunk.
pub struct Frames<'a> {
    ins: u8,
    payload: &'a [u8],
    seq: u8,
    done: bool,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let n = self.payload.len().min(MAX_CHUNK_DATA);
        let (data, rest) = self.payload.split_at(n);

        let c = Chunk {
            ins: self.ins,
            seq: self.seq,
            more: !rest.is_empty(),
            data,
        };

        self.payload = rest;
        self.seq = self.seq.wrapping_add(1);
        self.done = rest.is_empty();

        Some(c)
    }
}

/// Fixed-capacity message reassembly
#[derive(Clone, Debug)]
pub struct Reassembler<const N: usize = MAX_PAYLOAD> {
    ins: Option<u8>,
    next_seq: u8,
    complete: bool,
    buff: Vec<u8, N>,
}

impl<const N: usize> Default for Reassembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Reassembler<N> {
    /// Create an empty reassembler
    pub const fn new() -> Self {
        Self {
            ins: None,
            next_seq: 0,
            complete: false,
            buff: Vec::new(),
        }
    }

    /// Push a chunk, returning `true` once the message is complete.
    ///
    /// A chunk with sequence zero starts a new message where none is in
    /// progress. On error the partial message is discarded.
    pub fn push(&mut self, chunk: &Chunk) -> Result<bool, FrameError> {
        let r = self.push_inner(chunk);
        if r.is_err() {
            self.clear();
        }
        r
    }

    fn push_inner(&mut self, chunk: &Chunk) -> Result<bool, FrameError> {
        match (self.in_progress(), chunk.seq) {
            // Start of a new message
            (false, 0) => {
                self.clear();
                self.ins = Some(chunk.ins);
            }
            // Restart mid-message or continuation without a start
            (true, 0) | (false, _) => return Err(FrameError::Framing),
            (true, _) => (),
        }

        if self.ins != Some(chunk.ins) || chunk.seq != self.next_seq {
            return Err(FrameError::Framing);
        }

        if self.buff.len() + chunk.data.len() > N.min(MAX_PAYLOAD) {
            return Err(FrameError::PayloadTooLarge);
        }
        self.buff
            .extend_from_slice(chunk.data)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        self.next_seq = self.next_seq.wrapping_add(1);
        self.complete = !chunk.more;

        Ok(self.complete)
    }

    /// Check whether a message is partially received
    pub fn in_progress(&self) -> bool {
        self.ins.is_some() && !self.complete
    }

    /// Instruction of the current message
    pub fn ins(&self) -> Option<u8> {
        self.ins
    }

    /// Completed message payload
    pub fn payload(&self) -> Option<&[u8]> {
        match self.complete {
            true => Some(&self.buff),
            false => None,
        }
    }

    /// Close the channel, failing with [FrameError::Truncated] where a
    /// message was partially received
    pub fn close(&mut self) -> Result<(), FrameError> {
        let truncated = self.in_progress();
        self.clear();

        match truncated {
            true => Err(FrameError::Truncated),
            false => Ok(()),
        }
    }

    /// Discard any buffered data
    pub fn clear(&mut self) {
        self.ins = None;
        self.next_seq = 0;
        self.complete = false;
        self.buff.clear();
    }
}

/// Reassemble a sequence of encoded chunks into `(ins, payload)`.
///
/// Chunk sequences ending before the final chunk or continuing past it are
/// framing errors.
#[cfg(feature = "alloc")]
pub fn reassemble<'a>(
    chunks: impl IntoIterator<Item = &'a [u8]>,
) -> Result<(u8, alloc::vec::Vec<u8>), FrameError> {
    let mut r = Reassembler::<MAX_PAYLOAD>::new();
    let mut complete = false;

    for c in chunks {
        if complete {
            return Err(FrameError::Framing);
        }

        let (chunk, _) = Chunk::decode(c)?;
        complete = r.push(&chunk)?;
    }

    match (r.ins(), r.payload()) {
        (Some(ins), Some(p)) => Ok((ins, p.to_vec())),
        _ => Err(FrameError::Framing),
    }
}

static_assertions::const_assert!(MAX_CHUNK_DATA <= u8::MAX as usize);
static_assertions::const_assert!(MAX_PAYLOAD / MAX_CHUNK_DATA < u8::MAX as usize);

#[cfg(test)]
mod test {
    use alloc::vec::Vec as AllocVec;

    use rand::{random, Rng};

    use super::*;
    use crate::Instruction;

    const INS: u8 = Instruction::SignTx as u8;

    fn encode_all(ins: u8, payload: &[u8]) -> AllocVec<AllocVec<u8>> {
        frame(ins, payload)
            .unwrap()
            .map(|c| {
                let mut b = [0u8; MAX_CHUNK_LEN];
                let n = c.encode(&mut b).unwrap();
                b[..n].to_vec()
            })
            .collect()
    }

    #[test]
    fn frame_reassemble() {
        let mut rng = rand::thread_rng();

        for len in [0, 1, 249, 250, 251, 500, 1000, MAX_PAYLOAD] {
            let payload: AllocVec<u8> = (0..len).map(|_| rng.gen()).collect();

            let chunks = encode_all(INS, &payload);
            assert_eq!(chunks.len(), len.max(1).div_ceil(MAX_CHUNK_DATA));

            for c in &chunks {
                assert!(c.len() <= MAX_CHUNK_LEN);
            }

            let (ins, p) = reassemble(chunks.iter().map(|c| &c[..])).unwrap();
            assert_eq!(ins, INS);
            assert_eq!(p, payload);
        }
    }

    #[test]
    fn payload_too_large() {
        let payload = [0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            frame(INS, &payload),
            Err(FrameError::PayloadTooLarge)
        ));

        // Chunks forged past the maximum are rejected on reassembly
        let mut r = Reassembler::<MAX_PAYLOAD>::new();
        let data = [0u8; MAX_CHUNK_DATA];
        let mut res = Ok(false);
        for seq in 0..=(MAX_PAYLOAD / MAX_CHUNK_DATA) as u8 {
            res = r.push(&Chunk {
                ins: INS,
                seq,
                more: true,
                data: &data,
            });
            if res.is_err() {
                break;
            }
        }
        assert_eq!(res, Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn framing_errors() {
        let payload: AllocVec<u8> = (0..600).map(|_| random()).collect();
        let chunks = encode_all(INS, &payload);

        // Out of order
        let c = [&chunks[0][..], &chunks[2][..], &chunks[1][..]];
        assert_eq!(reassemble(c), Err(FrameError::Framing));

        // Truncated
        let c = [&chunks[0][..], &chunks[1][..]];
        assert_eq!(reassemble(c), Err(FrameError::Framing));

        // Wrong class
        let mut bad = chunks[0].clone();
        bad[0] = 0xe0;
        let c = [&bad[..], &chunks[1][..], &chunks[2][..]];
        assert_eq!(reassemble(c), Err(FrameError::Framing));

        // Instruction change
        let mut bad = chunks[1].clone();
        bad[1] = Instruction::GetAccount as u8;
        let c = [&chunks[0][..], &bad[..], &chunks[2][..]];
        assert_eq!(reassemble(c), Err(FrameError::Framing));

        // LC mismatch
        let mut bad = chunks[2].clone();
        bad[4] += 1;
        let c = [&chunks[0][..], &chunks[1][..], &bad[..]];
        assert_eq!(reassemble(c), Err(FrameError::Framing));

        // Short header
        let c = [&chunks[0][..3]];
        assert_eq!(reassemble(c), Err(FrameError::Framing));
    }

    #[test]
    fn close_truncated() {
        let payload = [0xaa; 400];
        let mut r = Reassembler::<MAX_PAYLOAD>::new();

        let first = frame(INS, &payload).unwrap().next().unwrap();
        assert_eq!(r.push(&first), Ok(false));
        assert!(r.in_progress());

        assert_eq!(r.close(), Err(FrameError::Truncated));
        assert!(!r.in_progress());
        assert_eq!(r.close(), Ok(()));
    }

    #[test]
    fn restart_after_complete() {
        let mut r = Reassembler::<MAX_PAYLOAD>::new();

        for p in [&[1u8, 2, 3][..], &[4u8, 5][..]] {
            for c in frame(INS, p).unwrap() {
                r.push(&c).unwrap();
            }
            assert_eq!(r.payload(), Some(p));
        }
    }
}
