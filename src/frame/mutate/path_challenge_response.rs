// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    frame::{walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
};

/// PATH_CHALLENGE / PATH_RESPONSE (spec.md §4.3).
pub struct PathChallengeResponse;

impl<R: Random> FrameMutator<R> for PathChallengeResponse {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let data_start = extent.offset + 1;
        let data_end = (data_start + 8).min(extent.end()).min(payload.len());
        if data_end <= extent.offset {
            return MutationOutcome::UNCHANGED;
        }

        if pilot.flag() {
            // swap PATH_CHALLENGE <-> PATH_RESPONSE by flipping the low bit
            // (0x1a / 0x1b differ only there).
            payload[extent.offset] ^= 0x01;
        } else if data_start < data_end {
            let idx = data_start + pilot.choice((data_end - data_start) as u32) as usize;
            payload[idx] ^= pilot.take_bits(8) as u8 | 1;
        } else {
            return MutationOutcome::UNCHANGED;
        }

        MutationOutcome::changed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::tag::code, random::ConnectionRng};

    #[test]
    fn mutates_without_panicking() {
        let mut buf = vec![code::PATH_CHALLENGE];
        buf.extend_from_slice(&[0x55; 8]);
        for seed in 0..32 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let _ = PathChallengeResponse.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
        }
    }
}
