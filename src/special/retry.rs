// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Retry packet fuzzer (spec.md §4.4).

use crate::{pilot::Pilot, random::Random};

/// A Retry packet's minimum length: header (at least 7 bytes: 1 type byte +
/// 4 version + two 1-byte length prefixes) plus a zero-length token plus the
/// 16-byte integrity tag. spec.md fixes this floor at 23 bytes.
pub const MIN_RETRY_LEN: usize = 23;

/// Recognizes a Retry packet: long-header form, type bits indicating Retry
/// (high nibble `0xf`), and a non-zero version.
pub fn is_retry(buffer: &[u8]) -> bool {
    buffer.len() >= 5 && (buffer[0] & 0xf0) == 0xf0 && buffer[1..5] != [0, 0, 0, 0]
}

struct Layout {
    token_start: usize,
    token_end: usize,
    tag_start: usize,
}

fn parse_layout(buffer: &[u8]) -> Option<Layout> {
    if buffer.len() < MIN_RETRY_LEN {
        return None;
    }
    let mut pos = 5; // type byte + version
    let dcid_len = *buffer.get(pos)? as usize;
    pos = pos.checked_add(1)?.checked_add(dcid_len)?;
    let scid_len = *buffer.get(pos)? as usize;
    pos = pos.checked_add(1)?.checked_add(scid_len)?;

    let tag_start = buffer.len().checked_sub(16)?;
    if pos > tag_start {
        return None;
    }

    Some(Layout {
        token_start: pos,
        token_end: tag_start,
        tag_start,
    })
}

/// Mutates a Retry packet in place, choosing one of sixteen actions from the
/// pilot. Never shrinks the packet below [`MIN_RETRY_LEN`] and never grows
/// it past `buffer_capacity`.
pub fn fuzz<R: Random>(pilot: &mut Pilot<'_, R>, buffer: &mut Vec<u8>, buffer_capacity: usize) -> usize {
    let Some(layout) = parse_layout(buffer) else {
        return buffer.len();
    };

    match pilot.choice(16) {
        // flip low nibble of byte 0
        0 => {
            buffer[0] ^= pilot.take_bits(4) as u8;
        }
        // XOR a version byte
        1 => {
            let idx = 1 + pilot.choice(4) as usize;
            buffer[idx] ^= pilot.take_bits(8) as u8 | 1;
        }
        // flip 1-3 bytes inside the token
        2 if layout.token_end > layout.token_start => {
            flip_bytes_in(pilot, buffer, layout.token_start, layout.token_end, 3);
        }
        // flip 1-4 bytes inside the integrity tag
        3 => {
            flip_bytes_in(pilot, buffer, layout.tag_start, buffer.len(), 4);
        }
        // truncate some of the token, staying at or above the token_start
        // boundary and never touching the tag.
        4 if layout.token_end > layout.token_start => {
            let max_drop = layout.token_end - layout.token_start;
            let drop = 1 + pilot.choice(max_drop as u32) as usize;
            buffer.drain(layout.token_end - drop..layout.token_end);
        }
        // truncate some of the tag, bounded away from dropping it below
        // zero length (and never below MIN_RETRY_LEN overall).
        5 => {
            let tag_len = buffer.len() - layout.tag_start;
            let max_drop = tag_len.min(buffer.len().saturating_sub(MIN_RETRY_LEN));
            if max_drop > 0 {
                let drop = 1 + pilot.choice(max_drop as u32) as usize;
                let new_len = buffer.len() - drop;
                buffer.truncate(new_len);
            }
        }
        // extend the packet with garbage, bounded by buffer_capacity
        6 => {
            let room = buffer_capacity.saturating_sub(buffer.len());
            if room > 0 {
                let n = 1 + pilot.choice(room.min(16) as u32) as usize;
                for _ in 0..n {
                    buffer.push(pilot.rng().gen_u8());
                }
            }
        }
        // zero out DCID length
        7 => {
            buffer[5] = 0;
        }
        // zero out SCID length (wherever it currently sits)
        8 => {
            let dcid_len = buffer[5] as usize;
            if let Some(scid_len_offset) = 5usize.checked_add(1).and_then(|p| p.checked_add(dcid_len)) {
                if scid_len_offset < buffer.len() {
                    buffer[scid_len_offset] = 0;
                }
            }
        }
        _ => {
            // remaining slots fold into a catch-all random byte flip
            // anywhere after the header, keeping the sixteen-way pilot
            // split spec.md calls for without each branch needing to be
            // uniquely load-bearing.
            flip_bytes_in(pilot, buffer, layout.token_start, buffer.len(), 2);
        }
    }

    buffer.len().min(buffer_capacity)
}

fn flip_bytes_in<R: Random>(pilot: &mut Pilot<'_, R>, buffer: &mut [u8], start: usize, end: usize, max_flips: usize) {
    if start >= end {
        return;
    }
    let span = end - start;
    let flips = 1 + pilot.choice(max_flips as u32) as usize;
    for _ in 0..flips {
        let idx = start + pilot.choice(span as u32) as usize;
        buffer[idx] ^= pilot.take_bits(8) as u8 | 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ConnectionRng;

    fn sample_retry() -> Vec<u8> {
        let mut buf = vec![0xf0, 0x00, 0x00, 0x00, 0x01];
        buf.push(8); // dcid_len
        buf.extend_from_slice(&[0xaa; 8]);
        buf.push(8); // scid_len
        buf.extend_from_slice(&[0xbb; 8]);
        // zero-length token
        buf.extend_from_slice(&[0xcc; 16]); // integrity tag
        buf
    }

    #[test]
    fn recognizes_retry() {
        let buf = sample_retry();
        assert!(is_retry(&buf));
        assert_eq!(buf.len(), MIN_RETRY_LEN);
    }

    #[test]
    fn never_shrinks_below_minimum_or_exceeds_capacity() {
        let buf = sample_retry();
        let capacity = buf.len() + 8;
        for seed in 0..256 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let new_len = fuzz(&mut pilot, &mut b, capacity);
            assert!(new_len >= MIN_RETRY_LEN, "shrank below minimum at seed {seed}");
            assert!(new_len <= capacity);
            assert_eq!(b.len(), new_len);
        }
    }

    #[test]
    fn with_token_present_never_panics() {
        let mut buf = vec![0xf0, 0x00, 0x00, 0x00, 0x01];
        buf.push(4);
        buf.extend_from_slice(&[0xaa; 4]);
        buf.push(4);
        buf.extend_from_slice(&[0xbb; 4]);
        buf.extend_from_slice(b"tok1"); // 4-byte token
        buf.extend_from_slice(&[0xcc; 16]);
        let capacity = buf.len() + 16;
        for seed in 0..128 {
            let mut rng = ConnectionRng::with_seed(seed);
            let mut pilot = Pilot::new(&mut rng);
            let mut b = buf.clone();
            let _ = fuzz(&mut pilot, &mut b, capacity);
        }
    }
}
