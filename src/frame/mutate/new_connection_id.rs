// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    frame::{walk::Extent, Capture, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// NEW_CONNECTION_ID (spec.md §4.3 "NEW_CONNECTION_ID").
///
/// Always captures the sequence number (the scheduler arms the "immediate
/// retire" opportunity from the returned [`Capture`]); with ~1/3 probability
/// also mutates one of five sub-targets.
pub struct NewConnectionId;

impl<R: Random> FrameMutator<R> for NewConnectionId {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());

        let seq_start = extent.offset + 1;
        let Ok(seq) = varint::decode(payload, seq_start, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let retire_prior_to_start = seq.next;
        let Ok(retire_prior_to) = varint::decode(payload, retire_prior_to_start, end) else {
            return MutationOutcome::UNCHANGED;
        };
        let length_byte_offset = retire_prior_to.next;
        if length_byte_offset >= end {
            return MutationOutcome::UNCHANGED;
        }
        let cid_len = payload[length_byte_offset] as usize;
        let cid_start = length_byte_offset + 1;
        let Some(token_start) = cid_start.checked_add(cid_len) else {
            return MutationOutcome::UNCHANGED;
        };
        let token_end = token_start + 16;
        if token_end > end {
            return MutationOutcome::UNCHANGED;
        }

        let capture = Capture::NewConnectionIdSeq(seq.value);

        if !pilot.one_in(3) {
            return MutationOutcome {
                changed: false,
                capture,
            };
        }

        let changed = match pilot.choice(5) {
            0 => mutate_sequence_number(pilot, payload, seq_start, seq.next, end),
            1 => mutate_retire_prior_to(pilot, payload, retire_prior_to_start, retire_prior_to.next, end, seq.value),
            2 => mutate_length_byte(pilot, payload, length_byte_offset),
            3 => mutate_cid_bytes(pilot, payload, cid_start, token_start),
            _ => mutate_reset_token(pilot, payload, token_start, token_end),
        };

        MutationOutcome { changed, capture }
    }
}

fn mutate_sequence_number<R: Random>(
    pilot: &mut Pilot<'_, R>,
    payload: &mut [u8],
    start: usize,
    field_end: usize,
    buffer_end: usize,
) -> bool {
    let value = match pilot.choice(3) {
        0 => 0,
        1 => 0x3fff,
        _ => pilot.rng().gen_range(0..256),
    };
    varint::overwrite_in_place(payload, start, field_end, buffer_end, value)
}

fn mutate_retire_prior_to<R: Random>(
    pilot: &mut Pilot<'_, R>,
    payload: &mut [u8],
    start: usize,
    field_end: usize,
    buffer_end: usize,
    just_sent_seq: u64,
) -> bool {
    let value = match pilot.choice(3) {
        0 => just_sent_seq, // self-retire
        1 => 0,
        _ => just_sent_seq.saturating_sub(1),
    };
    varint::overwrite_in_place(payload, start, field_end, buffer_end, value)
}

fn mutate_length_byte<R: Random>(pilot: &mut Pilot<'_, R>, payload: &mut [u8], offset: usize) -> bool {
    payload[offset] = match pilot.choice(3) {
        0 => 0,
        1 => 20, // RFC 9000 max connection id length
        _ => 21, // one past max
    };
    true
}

fn mutate_cid_bytes<R: Random>(pilot: &mut Pilot<'_, R>, payload: &mut [u8], start: usize, end: usize) -> bool {
    if start >= end {
        return false;
    }
    let flips = 1 + pilot.choice(2);
    for _ in 0..flips {
        let idx = start + pilot.choice((end - start) as u32) as usize;
        payload[idx] ^= pilot.take_bits(8) as u8 | 1;
    }
    true
}

fn mutate_reset_token<R: Random>(pilot: &mut Pilot<'_, R>, payload: &mut [u8], start: usize, end: usize) -> bool {
    mutate_cid_bytes(pilot, payload, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::tag::code, random::ConnectionRng};

    fn sample() -> Vec<u8> {
        let mut buf = vec![code::NEW_CONNECTION_ID];
        let mut tmp = [0u8; 8];
        let w1 = varint::encode(&mut tmp, 0, 8, 5).unwrap();
        buf.extend_from_slice(&tmp[..w1]);
        let w2 = varint::encode(&mut tmp, 0, 8, 0).unwrap();
        buf.extend_from_slice(&tmp[..w2]);
        buf.push(8);
        buf.extend_from_slice(&[0x11; 8]);
        buf.extend_from_slice(&[0x22; 16]);
        buf
    }

    #[test]
    fn always_captures_sequence_number() {
        let buf = sample();
        for seed in 0..32 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let outcome = NewConnectionId.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
            assert_eq!(outcome.capture, Capture::NewConnectionIdSeq(5));
        }
    }
}
