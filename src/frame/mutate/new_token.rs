// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{boundary_maximal_overwrite, fuzz_varint_field, xor_random_bytes};
use crate::{
    frame::{walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// NEW_TOKEN (spec.md §4.3 "NEW_TOKEN").
pub struct NewToken;

impl<R: Random> FrameMutator<R> for NewToken {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        let len_start = extent.offset + 1;
        let Ok(len) = varint::decode(payload, len_start, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let token_start = len.next;
        let token_len: usize = len.value.try_into().unwrap_or(usize::MAX);
        let token_end = token_start.saturating_add(token_len).min(end);

        let changed = match pilot.choice(3) {
            0 => {
                if pilot.one_in(2) {
                    boundary_maximal_overwrite(payload, len_start, token_start, end)
                } else {
                    fuzz_varint_field(pilot, payload, len_start, end)
                }
            }
            1 => fill_patterned(pilot, payload, token_start, token_end),
            _ => xor_random_bytes(pilot, payload, token_start, token_end, 4),
        };

        if changed {
            MutationOutcome::changed()
        } else {
            MutationOutcome::UNCHANGED
        }
    }
}

fn fill_patterned<R: Random>(pilot: &mut Pilot<'_, R>, payload: &mut [u8], start: usize, end: usize) -> bool {
    if start >= end {
        return false;
    }
    let pattern = [0x00u8, 0xff, 0xa5][pilot.choice(3) as usize];
    for byte in &mut payload[start..end] {
        *byte = pattern;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::tag::code, random::ConnectionRng};

    fn sample() -> Vec<u8> {
        let mut buf = vec![code::NEW_TOKEN];
        let mut tmp = [0u8; 8];
        let w = varint::encode(&mut tmp, 0, 8, 6).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        buf.extend_from_slice(b"abcdef");
        buf
    }

    #[test]
    fn mutates_without_panicking() {
        let buf = sample();
        for seed in 0..32 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let _ = NewToken.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
        }
    }
}
