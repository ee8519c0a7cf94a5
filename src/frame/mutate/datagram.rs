// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::fuzz_varint_field;
use crate::{
    frame::{tag::code, walk::Extent, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// DATAGRAM (RFC 9221, spec.md §4.3 "DATAGRAM").
pub struct Datagram;

impl<R: Random> FrameMutator<R> for Datagram {
    fn mutate(&self, pilot: &mut Pilot<'_, R>, payload: &mut [u8], extent: Extent) -> MutationOutcome {
        let end = extent.end().min(payload.len());
        let len_start = extent.offset + 1;
        if len_start >= end {
            return MutationOutcome::UNCHANGED;
        }

        let mut changed = false;
        if payload[extent.offset] == code::DATAGRAM_NO_LEN {
            // force the LEN bit on and reinterpret the first data byte as a
            // freshly-minted 1-byte length varint, clearing its top two
            // width bits so it decodes as a narrow (and almost certainly
            // wrong) declared length.
            payload[extent.offset] = code::DATAGRAM_WITH_LEN;
            payload[len_start] &= 0x3f;
            changed = true;
        }

        changed |= fuzz_varint_field(pilot, payload, len_start, end);

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
    use crate::random::ConnectionRng;

    #[test]
    fn forces_len_bit_on_for_no_len_variant() {
        let mut buf = vec![code::DATAGRAM_NO_LEN];
        buf.extend_from_slice(b"payload-bytes");
        let mut rng = ConnectionRng::with_seed(1);
        let mut pilot = Pilot::new(&mut rng);
        let end = buf.len();
        Datagram.mutate(&mut pilot, &mut buf, Extent { offset: 0, len: end, is_ack_only: false });
        assert_eq!(buf[0], code::DATAGRAM_WITH_LEN);
    }

    #[test]
    fn mutates_with_len_variant_without_panicking() {
        let mut buf = vec![code::DATAGRAM_WITH_LEN];
        let mut tmp = [0u8; 8];
        let w = varint::encode(&mut tmp, 0, 8, 4).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        buf.extend_from_slice(b"data");
        for seed in 0..32 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let end = b.len();
            let _ = Datagram.mutate(&mut pilot, &mut b, Extent { offset: 0, len: end, is_ack_only: false });
        }
    }
}
