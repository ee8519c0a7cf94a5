// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{fuzz_varint_field, max_value_for_width};
use crate::{
    frame::{tag::classify, walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// draft-ietf-quic-multipath PATH_ABANDON / PATH_AVAILABLE / PATH_BACKUP /
/// PATHS_BLOCKED (spec.md §4.3).
pub struct PathExtension;

impl<R: Random> FrameMutator<R> for PathExtension {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        let Some((_, tag_width)) = classify(payload, extent.offset, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let path_id_start = extent.offset + tag_width;
        let Ok(path_id) = varint::decode(payload, path_id_start, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let second_start = path_id.next;
        let second = varint::decode(payload, second_start, end).ok();

        let changed = if pilot.one_in(4) {
            let value = if pilot.flag() { 0 } else { max_value_for_width(path_id.next - path_id_start) };
            varint::overwrite_in_place(payload, path_id_start, path_id.next, end, value)
        } else if let Some(second) = second {
            if pilot.one_in(3) {
                let value = if pilot.flag() { 0 } else { max_value_for_width(second.next - second_start) };
                varint::overwrite_in_place(payload, second_start, second.next, end, value)
            } else {
                fuzz_varint_field(pilot, payload, second_start, end)
            }
        } else {
            fuzz_varint_field(pilot, payload, path_id_start, end)
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
        let mut buf = vec![];
        let mut tmp = [0u8; 8];
        let w = varint::encode(&mut tmp, 0, 8, code::PATH_ABANDON).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        for value in [1u64, 0] {
            let w = varint::encode(&mut tmp, 0, 8, value).unwrap();
            buf.extend_from_slice(&tmp[..w]);
        }
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
            let _ = PathExtension.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
        }
    }
}
