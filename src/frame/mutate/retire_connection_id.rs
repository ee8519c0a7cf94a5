// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{flip_one_bit, max_value_for_width};
use crate::{
    frame::{walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// RETIRE_CONNECTION_ID (spec.md §4.3 "RETIRE_CONNECTION_ID").
pub struct RetireConnectionId;

impl<R: Random> FrameMutator<R> for RetireConnectionId {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        let start = extent.offset + 1;
        let Ok(decoded) = varint::decode(payload, start, end) else {
            return MutationOutcome::UNCHANGED;
        };

        let changed = if pilot.one_in(8) {
            let value = match pilot.choice(3) {
                0 => 0,
                1 => 1,
                _ => max_value_for_width(decoded.next - start),
            };
            varint::overwrite_in_place(payload, start, decoded.next, end, value)
        } else {
            flip_one_bit(pilot, payload, start, decoded.next)
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

    #[test]
    fn mutates_without_panicking() {
        let mut buf = vec![code::RETIRE_CONNECTION_ID];
        let mut tmp = [0u8; 8];
        let w = varint::encode(&mut tmp, 0, 8, 9).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        for seed in 0..32 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let _ = RetireConnectionId.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
        }
    }
}
