// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{flip_one_bit, fuzz_varint_field};
use crate::{
    frame::{walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// ACK / ACK_ECN (spec.md §4.3 "ACK frame").
pub struct Ack;

impl<R: Random> FrameMutator<R> for Ack {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end();
        if end > payload.len() || extent.len < 2 {
            return MutationOutcome::UNCHANGED;
        }

        let mut changed = false;

        // ~1/8: flip one of the reserved bits in the type byte (mask 0x7C).
        if pilot.one_in(8) {
            let reserved_bits = [2u32, 3, 4, 5, 6];
            let bit = reserved_bits[pilot.choice(reserved_bits.len() as u32) as usize];
            payload[extent.offset] ^= 1 << bit;
            changed = true;
        }

        let largest_acked_start = extent.offset + 1;
        let Ok(largest_acked) = varint::decode(payload, largest_acked_start, end) else {
            return finish(changed);
        };
        let ack_delay_start = largest_acked.next;
        let Ok(ack_delay) = varint::decode(payload, ack_delay_start, end) else {
            return finish(changed);
        };
        let range_count_start = ack_delay.next;
        let Ok(range_count) = varint::decode(payload, range_count_start, end) else {
            return finish(changed);
        };
        let range_count_end = range_count.next;

        // ~1/16: overwrite Largest Acknowledged with 0 or 1.
        if pilot.one_in(16) {
            let value = if pilot.flag() { 1 } else { 0 };
            changed |= varint::overwrite_in_place(
                payload,
                largest_acked_start,
                ack_delay_start,
                end,
                value,
            );
            return finish(changed);
        }

        // ~1/16: force ACK Range Count to 0, truncating declared ranges.
        if pilot.one_in(16) {
            changed |= varint::overwrite_in_place(
                payload,
                range_count_start,
                range_count_end,
                end,
                0,
            );
            return finish(changed);
        }

        let fields = [largest_acked_start, ack_delay_start, range_count_start];
        let chosen = fields[pilot.choice(fields.len() as u32) as usize];
        if fuzz_varint_field(pilot, payload, chosen, end) {
            changed = true;
        } else {
            changed |= flip_one_bit(pilot, payload, extent.offset + 1, end);
        }

        finish(changed)
    }
}

fn finish(changed: bool) -> MutationOutcome {
    if changed {
        MutationOutcome::changed()
    } else {
        MutationOutcome::UNCHANGED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ConnectionRng;

    fn sample_ack() -> Vec<u8> {
        let mut buf = vec![crate::frame::tag::code::ACK];
        let mut tmp = [0u8; 8];
        for value in [100u64, 10, 0, 5] {
            let w = varint::encode(&mut tmp, 0, 8, value).unwrap();
            buf.extend_from_slice(&tmp[..w]);
        }
        buf
    }

    #[test]
    fn mutates_without_panicking_across_many_seeds() {
        for seed in 0..64 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut buf = sample_ack();
            let end = buf.len();
            let _ = Ack.mutate(&mut pilot, &mut buf, Extent { offset: 0, len: end, is_ack_only: true });
        }
    }
}
