// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::xor_random_bytes;
use crate::{
    frame::{tag::classify, walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
};

/// Catch-all for unrecognized or not-yet-specialized frame types (spec.md
/// §4.3 "Default"): skip the frame-type tag, then XOR one of the next up to
/// eight bytes with a pilot-derived mask.
pub struct Default;

impl<R: Random> FrameMutator<R> for Default {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        let Some((_, tag_width)) = classify(payload, extent.offset, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let body_start = extent.offset + tag_width;
        let body_end = (body_start + 8).min(end);

        if xor_random_bytes(pilot, payload, body_start, body_end, 8) {
            MutationOutcome::changed()
        } else {
            MutationOutcome::UNCHANGED
        }
    }
}
