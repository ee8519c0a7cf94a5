// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::fuzz_varint_field;
use crate::{
    frame::{tag::code, walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// CONNECTION_CLOSE / APPLICATION_CLOSE (spec.md §4.3): "generic four-varint
/// fuzz; reason phrase bytes left alone."
pub struct ConnectionClose;

impl<R: Random> FrameMutator<R> for ConnectionClose {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        let is_quic_close = payload.get(extent.offset) == Some(&code::CONNECTION_CLOSE_QUIC);

        let mut fields = Vec::with_capacity(3);
        let mut pos = extent.offset + 1;
        let Ok(error_code) = varint::decode(payload, pos, end) else {
            return MutationOutcome::UNCHANGED;
        };
        fields.push(pos);
        pos = error_code.next;

        if is_quic_close {
            let Ok(frame_type) = varint::decode(payload, pos, end) else {
                return MutationOutcome::UNCHANGED;
            };
            fields.push(pos);
            pos = frame_type.next;
        }

        let Ok(reason_len) = varint::decode(payload, pos, end) else {
            return MutationOutcome::UNCHANGED;
        };
        fields.push(pos);

        let chosen = fields[pilot.choice(fields.len() as u32) as usize];
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

    fn sample(app: bool) -> Vec<u8> {
        let mut buf = vec![if app { code::CONNECTION_CLOSE_APP } else { code::CONNECTION_CLOSE_QUIC }];
        let mut tmp = [0u8; 8];
        let w = varint::encode(&mut tmp, 0, 8, 10).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        if !app {
            let w = varint::encode(&mut tmp, 0, 8, 0x06).unwrap();
            buf.extend_from_slice(&tmp[..w]);
        }
        let w = varint::encode(&mut tmp, 0, 8, 0).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        buf
    }

    #[test]
    fn mutates_both_variants_without_panicking() {
        for app in [false, true] {
            let buf = sample(app);
            for seed in 0..32 {
                let mut rng = ConnectionRng::with_seed(seed);
                let mut pilot = Pilot::new(&mut rng);
                let mut b = buf.clone();
                let end = b.len();
                let _ = ConnectionClose.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
            }
        }
    }
}
