// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{boundary_maximal_overwrite, xor_random_bytes};
use crate::{
    frame::{walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// CRYPTO (spec.md §4.3 "CRYPTO").
pub struct Crypto;

impl<R: Random> FrameMutator<R> for Crypto {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        let offset_start = extent.offset + 1;
        let Ok(offset) = varint::decode(payload, offset_start, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let len_start = offset.next;
        let Ok(len) = varint::decode(payload, len_start, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let data_start = len.next;
        let data_len: usize = len.value.try_into().unwrap_or(usize::MAX);
        let data_end = data_start.saturating_add(data_len).min(end);

        let changed = match pilot.choice(4) {
            0 => boundary_maximal_overwrite(payload, offset_start, len_start, end),
            1 => boundary_maximal_overwrite(payload, len_start, data_start, end),
            2 => varint::overwrite_in_place(payload, len_start, data_start, end, 0),
            _ => {
                let flips = 1 + pilot.choice(3);
                let mut any = false;
                for _ in 0..flips {
                    any |= xor_random_bytes(pilot, payload, data_start, data_end, 1);
                }
                any
            }
        };

        if changed {
            MutationOutcome::changed()
        } else {
            MutationOutcome::UNCHANGED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::tag::code, random::ConnectionRng};

    fn sample() -> Vec<u8> {
        let mut buf = vec![code::CRYPTO];
        let mut tmp = [0u8; 8];
        let w1 = varint::encode(&mut tmp, 0, 8, 0).unwrap();
        buf.extend_from_slice(&tmp[..w1]);
        let w2 = varint::encode(&mut tmp, 0, 8, 5).unwrap();
        buf.extend_from_slice(&tmp[..w2]);
        buf.extend_from_slice(b"hello");
        buf
    }

    #[test]
    fn mutates_without_panicking() {
        let buf = sample();
        for seed in 0..64 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let _ = Crypto.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
        }
    }
}
