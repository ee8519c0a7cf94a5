// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Test-only scaffolding: a scripted handshake oracle and a deterministic,
//! byte-cycling [`Random`] source for property tests.
//!
//! Grounded on `quic/s2n-quic-core/src/havoc.rs`'s `testing::RandomSlice`
//! (a `Random` impl that replays a fixed byte sequence instead of drawing
//! from a PRNG, so a failing `bolero` input can be replayed byte-for-byte)
//! and `quic/s2n-quic-core/src/random.rs`'s `testing::Generator` (a
//! scripted oracle used in place of a real connection's state machine).

use core::ops::Range;

use crate::{
    frame::{FrameSkip, SkipError, Skipped, StandardFrameSkip},
    host::{ConnectionIdentity, HandshakeOracle},
    random::Random,
    state::{HandshakePhase, InitialConnectionId},
};

/// A [`Random`] that replays a fixed byte sequence, cycling once exhausted.
///
/// Unlike [`crate::random::ConnectionRng`], draws are fully reproducible from
/// the slice alone and require no PRNG seed — useful for `bolero`-style
/// fuzz harnesses where the input corpus *is* the randomness source, and for
/// unit tests that want to walk every branch of a mutator's pilot-driven
/// choice tree by constructing the exact bytes that reach it.
#[derive(Clone, Debug)]
pub struct ByteCycle<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteCycle<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        assert!(!bytes.is_empty(), "ByteCycle requires at least one byte to cycle");
        Self { bytes, position: 0 }
    }

    fn next_byte(&mut self) -> u8 {
        let b = self.bytes[self.position];
        self.position = (self.position + 1) % self.bytes.len();
        b
    }
}

impl<'a> Random for ByteCycle<'a> {
    fn fill(&mut self, bytes: &mut [u8]) {
        for slot in bytes {
            *slot = self.next_byte();
        }
    }

    fn gen_range(&mut self, range: Range<u64>) -> u64 {
        if range.start >= range.end {
            return range.start;
        }
        let span = range.end - range.start;
        range.start + self.gen_u64() % span
    }
}

/// A [`HandshakeOracle`]/[`ConnectionIdentity`] pair scripted with a fixed
/// phase and ICID, independent of any real connection handle type. Generic
/// over the connection handle so the same scaffolding can stand in for
/// whatever handle type a particular test exercises.
#[derive(Clone, Copy, Debug)]
pub struct ScriptedHost {
    pub phase: HandshakePhase,
    icid: InitialConnectionId,
}

impl ScriptedHost {
    pub fn new(phase: HandshakePhase, icid_bytes: &[u8]) -> Self {
        Self {
            phase,
            icid: InitialConnectionId::from_slice(icid_bytes),
        }
    }
}

impl<CH> ConnectionIdentity<CH> for ScriptedHost {
    fn initial_connection_id(&self, _connection: &CH) -> InitialConnectionId {
        self.icid
    }
}

impl<CH> HandshakeOracle<CH> for ScriptedHost {
    fn phase(&self, _connection: &CH) -> HandshakePhase {
        self.phase
    }
}

/// A [`FrameSkip`] that always reports a fixed length, regardless of the
/// bytes it's given — useful for exercising the frame walker's own
/// bookkeeping (stopping at `end`, the `MAX_FRAMES` cap) independent of any
/// particular frame family's wire layout.
#[derive(Clone, Copy, Debug)]
pub struct FixedLengthSkip {
    pub len: usize,
}

impl FrameSkip for FixedLengthSkip {
    fn skip(&self, payload: &[u8], offset: usize, end: usize) -> Result<Skipped, SkipError> {
        if offset >= end || offset + self.len > payload.len().min(end) {
            return Err(SkipError);
        }
        Ok(Skipped {
            len: self.len,
            is_ack_only: false,
        })
    }
}

/// Re-exported for tests that want the reference decoder without spelling
/// out the full path.
pub type ReferenceSkip = StandardFrameSkip;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_cycle_wraps_around() {
        let mut rng = ByteCycle::new(&[1, 2, 3]);
        let mut out = [0u8; 7];
        rng.fill(&mut out);
        assert_eq!(out, [1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn byte_cycle_gen_range_stays_in_bounds() {
        let mut rng = ByteCycle::new(&[0xff; 8]);
        for _ in 0..16 {
            let v = rng.gen_range(10..20);
            assert!((10..20).contains(&v));
        }
    }

    #[test]
    fn scripted_host_reports_fixed_phase_and_icid() {
        let host = ScriptedHost::new(HandshakePhase::Ready, b"fixed-icid");
        let conn = 42u64;
        assert_eq!(HandshakeOracle::<u64>::phase(&host, &conn), HandshakePhase::Ready);
        assert_eq!(
            ConnectionIdentity::<u64>::initial_connection_id(&host, &conn).as_slice(),
            b"fixed-icid"
        );
    }

    #[test]
    fn fixed_length_skip_rejects_out_of_range() {
        let skip = FixedLengthSkip { len: 4 };
        assert!(skip.skip(&[0u8; 4], 0, 4).is_ok());
        assert!(skip.skip(&[0u8; 2], 0, 2).is_err());
    }
}
