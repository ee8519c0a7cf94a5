// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{fuzz_varint_field, xor_random_bytes};
use crate::{
    frame::{tag::classify, walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// draft-ietf-quic-ack-frequency ACK_FREQUENCY (spec.md §4.3 "ACK_FREQUENCY").
pub struct AckFrequency;

impl<R: Random> FrameMutator<R> for AckFrequency {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        let Some((_, tag_width)) = classify(payload, extent.offset, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let body_start = extent.offset + tag_width;

        // the three fields: Sequence Number, Packet Tolerance, Update Max Ack Delay.
        let mut starts = Vec::with_capacity(3);
        let mut pos = body_start;
        for _ in 0..3 {
            let Ok(d) = varint::decode(payload, pos, end) else {
                break;
            };
            starts.push(pos);
            pos = d.next;
        }

        if starts.is_empty() || pilot.one_in(4) {
            // fall back to a random payload byte flip.
            return if xor_random_bytes(pilot, payload, body_start, end, 4) {
                MutationOutcome::changed()
            } else {
                MutationOutcome::UNCHANGED
            };
        }

        let chosen = starts[pilot.choice(starts.len() as u32) as usize];
        if fuzz_varint_field(pilot, payload, chosen, end) {
            MutationOutcome::changed()
        } else {
            MutationOutcome::UNCHANGED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ConnectionRng;

    #[test]
    fn mutates_without_panicking() {
        let mut buf = vec![0xaf]; // single-byte extended tag encoding would be wrong; use proper varint
        let mut tmp = [0u8; 8];
        buf.clear();
        let w = varint::encode(&mut tmp, 0, 8, crate::frame::tag::code::ACK_FREQUENCY).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        for value in [1u64, 2, 25_000] {
            let w = varint::encode(&mut tmp, 0, 8, value).unwrap();
            buf.extend_from_slice(&tmp[..w]);
        }
        for seed in 0..32 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let _ = AckFrequency.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
        }
    }
}
