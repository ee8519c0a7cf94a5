// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! PADDING / PING / HANDSHAKE_DONE (spec.md §4.3): "the highest-value
//! strategy because padding occupies most of a QUIC packet's tail and is a
//! large attack surface."

use super::fuzz_varint_field;
use crate::{
    frame::{tag::code, walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

pub struct PaddingPingDone;

/// Candidate frame types to reinterpret a padding/ping/handshake-done byte
/// as, paired with how many trailing 1-byte varint fields each minimally
/// needs.
const CANDIDATES: [(u8, usize); 11] = [
    (code::MAX_DATA, 1),
    (code::DATA_BLOCKED, 1),
    (code::STREAMS_BLOCKED_BIDI, 1),
    (code::STREAMS_BLOCKED_UNI, 1),
    (code::RETIRE_CONNECTION_ID, 1),
    (code::STREAM_DATA_BLOCKED, 2),
    (code::STOP_SENDING, 2),
    (code::MAX_STREAM_DATA, 2),
    (code::MAX_STREAMS_BIDI, 1),
    (code::MAX_STREAMS_UNI, 1),
    (code::RESET_STREAM, 3),
];

impl<R: Random> FrameMutator<R> for PaddingPingDone {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        if extent.offset >= end {
            return MutationOutcome::UNCHANGED;
        }

        if pilot.one_in(8) {
            let others: [u8; 2] = match payload[extent.offset] {
                code::PADDING => [code::PING, code::HANDSHAKE_DONE],
                code::PING => [code::PADDING, code::HANDSHAKE_DONE],
                _ => [code::PADDING, code::PING],
            };
            payload[extent.offset] = others[pilot.choice(2) as usize];
            return MutationOutcome::changed();
        }

        let available = extent.len.saturating_sub(1);
        let fitting: Vec<&(u8, usize)> = CANDIDATES.iter().filter(|(_, n)| *n <= available).collect();
        if fitting.is_empty() {
            return MutationOutcome::UNCHANGED;
        }

        let (new_type, field_count) = *fitting[pilot.choice(fitting.len() as u32) as usize];
        payload[extent.offset] = new_type;

        for i in 0..field_count {
            let pos = extent.offset + 1 + i;
            // the byte was padding (0x00) or otherwise unused; establish it
            // as a minimal-width zero varint before fuzzing it like any
            // other field.
            let _ = varint::encode(payload, pos, pos + 1, 0);
            let _ = fuzz_varint_field(pilot, payload, pos, end);
        }

        MutationOutcome::changed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ConnectionRng;

    #[test]
    fn mutates_a_padding_run_without_panicking() {
        let buf = vec![0x00u8; 12];
        for seed in 0..64 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let _ = PaddingPingDone.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: true });
        }
    }

    #[test]
    fn single_byte_ping_has_no_room_for_field_candidates() {
        let mut b = vec![code::PING];
        // the fallthrough path must never panic on a 1-byte extent, across
        // every seed (exercising both the substitution and field branches).
        for seed in 0..64 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let _ = PaddingPingDone.mutate(&mut pilot, &mut b, Extent { offset: 0, len: 1, is_ack_only: false });
        }
    }
}
