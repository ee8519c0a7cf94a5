// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::fuzz_varint_field;
use crate::{
    frame::{walk::Extent, Capture, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// MAX_DATA (spec.md §4.3 "MAX_DATA").
///
/// The decrease-attack branch (rewriting to half the *previously* sent
/// value) needs that previous value from the connection's fuzz state, which
/// this mutator doesn't have access to through the generic [`FrameMutator`]
/// seam. The scheduler calls [`mutate_with_state`] directly with the
/// connection's `last_sent_max_data` instead of going through [`dispatch`]
/// for this frame family; the trait impl here is the fallback used when no
/// prior value is known yet (the connection's first MAX_DATA).
///
/// [`dispatch`]: super::dispatch
pub struct MaxData;

impl<R: Random> FrameMutator<R> for MaxData {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        mutate_with_state(pilot, payload, extent, None)
    }
}

pub fn mutate_with_state<R: Random>(
    pilot: &mut Pilot<'_, R>,
    payload: &mut [u8],
    extent: Extent,
    previous_sent: Option<u64>,
) -> MutationOutcome {
    let end = extent.end().min(payload.len());
    let start = extent.offset + 1;
    let Ok(decoded) = varint::decode(payload, start, end) else {
        return MutationOutcome::UNCHANGED;
    };

    let capture = Capture::MaxData(decoded.value);

    let changed = if let Some(previous) = previous_sent {
        if pilot.one_in(4) {
            varint::overwrite_in_place(payload, start, decoded.next, end, previous / 2)
        } else {
            fuzz_varint_field(pilot, payload, start, end)
        }
    } else {
        fuzz_varint_field(pilot, payload, start, end)
    };

    MutationOutcome { changed, capture }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::tag::code, random::ConnectionRng};

    fn sample(value: u64) -> Vec<u8> {
        let mut buf = vec![code::MAX_DATA];
        let mut tmp = [0u8; 8];
        let w = varint::encode(&mut tmp, 0, 8, value).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        buf
    }

    #[test]
    fn captures_the_observed_value() {
        let buf = sample(1_000_000);
        let mut rng = ConnectionRng::with_seed(3);
        let mut pilot = Pilot::new(&mut rng);
        let mut b = buf.clone();
        let end = b.len();
        let outcome = mutate_with_state(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false }, None);
        assert_eq!(outcome.capture, Capture::MaxData(1_000_000));
    }

    #[test]
    fn decrease_attack_halves_previous_value() {
        for seed in 0..64 {
            let buf = sample(1_073_741_824); // 4-byte width
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let outcome = mutate_with_state(
                &mut pilot,
                &mut b,
                Extent { offset: 0, len: end, is_ack_only: false },
                Some(2_000_000_000),
            );
            if outcome.changed {
                let decoded = varint::decode(&b, 1, end).unwrap();
                assert!(decoded.value == 0 || decoded.value == 1_000_000_000 || decoded.value <= varint::MAX_VARINT_VALUE);
            }
        }
    }
}
