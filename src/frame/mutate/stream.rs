// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{boundary_maximal_overwrite, xor_random_bytes};
use crate::{
    frame::{walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// STREAM frames, type byte `0x08..=0x0f` (spec.md §4.3 "STREAM frame").
pub struct Stream;

enum Target {
    Fin,
    StreamId,
    Offset,
    Length,
    RandomByte,
}

impl<R: Random> FrameMutator<R> for Stream {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        if extent.offset >= end {
            return MutationOutcome::UNCHANGED;
        }

        let type_byte = payload[extent.offset];
        let off_bit = type_byte & 0x04 != 0;
        let len_bit = type_byte & 0x02 != 0;

        let mut pos = extent.offset + 1;
        let Ok(stream_id) = varint::decode(payload, pos, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let stream_id_start = pos;
        pos = stream_id.next;

        let offset_start = if off_bit {
            let s = pos;
            match varint::decode(payload, pos, end) {
                Ok(d) => {
                    pos = d.next;
                    Some(s)
                }
                Err(_) => None,
            }
        } else {
            None
        };

        let length_start = if len_bit {
            let s = pos;
            match varint::decode(payload, pos, end) {
                Ok(d) => {
                    pos = d.next;
                    Some(s)
                }
                Err(_) => None,
            }
        } else {
            None
        };

        let data_start = pos;

        let mut targets = vec![Target::Fin, Target::StreamId];
        if offset_start.is_some() {
            targets.push(Target::Offset);
        }
        if length_start.is_some() {
            targets.push(Target::Length);
        }
        if data_start < end {
            targets.push(Target::RandomByte);
        }

        let changed = match targets[pilot.choice(targets.len() as u32) as usize] {
            Target::Fin => {
                payload[extent.offset] ^= 0x01;
                true
            }
            Target::StreamId => {
                let field_end = stream_id.next;
                fuzz_field_with_boundary_bias(pilot, payload, stream_id_start, field_end, end)
            }
            Target::Offset => {
                let start = offset_start.expect("checked above");
                let field_end = varint::decode(payload, start, end).map(|d| d.next).unwrap_or(start);
                fuzz_field_with_boundary_bias(pilot, payload, start, field_end, end)
            }
            Target::Length => {
                let start = length_start.expect("checked above");
                let field_end = varint::decode(payload, start, end).map(|d| d.next).unwrap_or(start);
                fuzz_field_with_boundary_bias(pilot, payload, start, field_end, end)
            }
            Target::RandomByte => xor_random_bytes(pilot, payload, data_start, end, 4),
        };

        if changed {
            MutationOutcome::changed()
        } else {
            MutationOutcome::UNCHANGED
        }
    }
}

/// With 1/4 probability rewrite to the boundary-maximal value for the
/// field's current width; otherwise a generic width-preserving overwrite to
/// zero.
fn fuzz_field_with_boundary_bias<R: Random>(
    pilot: &mut Pilot<'_, R>,
    payload: &mut [u8],
    start: usize,
    field_end: usize,
    buffer_end: usize,
) -> bool {
    if start >= field_end {
        return false;
    }
    if pilot.one_in(4) {
        boundary_maximal_overwrite(payload, start, field_end, buffer_end)
    } else {
        varint::overwrite_in_place(payload, start, field_end, buffer_end, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ConnectionRng;

    fn sample_stream(off: bool, len: bool) -> Vec<u8> {
        let mut tag = 0x08u8;
        if off {
            tag |= 0x04;
        }
        if len {
            tag |= 0x02;
        }
        let mut buf = vec![tag];
        let mut tmp = [0u8; 8];
        let w = varint::encode(&mut tmp, 0, 8, 4).unwrap(); // stream id
        buf.extend_from_slice(&tmp[..w]);
        if off {
            let w = varint::encode(&mut tmp, 0, 8, 100).unwrap();
            buf.extend_from_slice(&tmp[..w]);
        }
        if len {
            let w = varint::encode(&mut tmp, 0, 8, 5).unwrap();
            buf.extend_from_slice(&tmp[..w]);
        }
        buf.extend_from_slice(b"hello");
        buf
    }

    #[test]
    fn mutates_every_variant_without_panicking() {
        for (off, len) in [(false, false), (true, false), (false, true), (true, true)] {
            let buf = sample_stream(off, len);
            for seed in 0..32 {
                let mut rng = ConnectionRng::with_seed(seed);
                let mut pilot = Pilot::new(&mut rng);
                let mut b = buf.clone();
                let end = b.len();
                let _ = Stream.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
            }
        }
    }

    #[test]
    fn fin_flip_toggles_low_bit() {
        let buf = sample_stream(false, false);
        let mut rng = ConnectionRng::with_seed(0);
        let mut pilot = Pilot::new(&mut rng);
        let mut b = buf.clone();
        let end = b.len();
        Stream.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
        // the type byte's upper bits (frame-family bits) must be unchanged.
        assert_eq!(b[0] & 0xf8, buf[0] & 0xf8);
    }
}
