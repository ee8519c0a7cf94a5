// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! One mutator per frame family (spec.md §4.3), plus the shared
//! varint/byte-level primitives they're all built out of.
//!
//! Each family gets its own file, the way `quic/s2n-quic-core/src/frame/*.rs`
//! splits frame definitions one-per-file; [`dispatch`] is this crate's
//! counterpart to that module's `frames!` registry macro, picking the right
//! mutator for a classified frame tag.

mod ack;
mod ack_frequency;
mod connection_close;
mod crypto;
mod datagram;
mod default_fuzz;
pub(crate) mod max_data;
mod new_connection_id;
mod new_token;
mod padding_ping_done;
mod path_challenge_response;
mod path_extension;
mod retire_connection_id;
mod stream;

use crate::{
    frame::{tag::code, walk::Extent, Capture, FrameKind, FrameMutator, MutationOutcome},
    pilot::Pilot,
    random::Random,
    varint,
};

/// Picks and runs the mutator for `kind` over the frame occupying `extent`.
pub fn dispatch<R: Random>(
    kind: FrameKind,
    pilot: &mut Pilot<'_, R>,
    payload: &mut [u8],
    extent: Extent,
) -> MutationOutcome {
    match kind {
        FrameKind::SimpleTypeByte(code::ACK) | FrameKind::SimpleTypeByte(code::ACK_ECN) => {
            ack::Ack.mutate(pilot, payload, extent)
        }
        FrameKind::ExtendedVarintType(t) if t == code::ACK_FREQUENCY => {
            ack_frequency::AckFrequency.mutate(pilot, payload, extent)
        }
        FrameKind::ShortHeaderStream => stream::Stream.mutate(pilot, payload, extent),
        FrameKind::SimpleTypeByte(code::MAX_DATA) => max_data::MaxData.mutate(pilot, payload, extent),
        FrameKind::SimpleTypeByte(code::NEW_CONNECTION_ID) => {
            new_connection_id::NewConnectionId.mutate(pilot, payload, extent)
        }
        FrameKind::SimpleTypeByte(code::RETIRE_CONNECTION_ID) => {
            retire_connection_id::RetireConnectionId.mutate(pilot, payload, extent)
        }
        FrameKind::SimpleTypeByte(code::NEW_TOKEN) => new_token::NewToken.mutate(pilot, payload, extent),
        FrameKind::SimpleTypeByte(code::CRYPTO) => crypto::Crypto.mutate(pilot, payload, extent),
        FrameKind::SimpleTypeByte(code::PADDING)
        | FrameKind::SimpleTypeByte(code::PING)
        | FrameKind::SimpleTypeByte(code::HANDSHAKE_DONE) => {
            padding_ping_done::PaddingPingDone.mutate(pilot, payload, extent)
        }
        FrameKind::SimpleTypeByte(code::PATH_CHALLENGE) | FrameKind::SimpleTypeByte(code::PATH_RESPONSE) => {
            path_challenge_response::PathChallengeResponse.mutate(pilot, payload, extent)
        }
        FrameKind::ExtendedVarintType(t)
            if t == code::PATH_ABANDON
                || t == code::PATH_AVAILABLE
                || t == code::PATH_BACKUP
                || t == code::PATHS_BLOCKED =>
        {
            path_extension::PathExtension.mutate(pilot, payload, extent)
        }
        FrameKind::SimpleTypeByte(code::DATAGRAM_NO_LEN) | FrameKind::SimpleTypeByte(code::DATAGRAM_WITH_LEN) => {
            datagram::Datagram.mutate(pilot, payload, extent)
        }
        FrameKind::SimpleTypeByte(code::CONNECTION_CLOSE_QUIC)
        | FrameKind::SimpleTypeByte(code::CONNECTION_CLOSE_APP) => {
            connection_close::ConnectionClose.mutate(pilot, payload, extent)
        }
        _ => default_fuzz::Default.mutate(pilot, payload, extent),
    }
}

/// The smallest value that does *not* fit in a varint of the given
/// `field_width` (1, 2, 4, or 8) — i.e. the boundary-maximal value,
/// `encoded_width(new_value) == field_width`'s upper edge.
pub(super) fn max_value_for_width(field_width: usize) -> u64 {
    match field_width {
        1 => 0x3f,
        2 => 0x3fff,
        4 => 0x3fff_ffff,
        _ => varint::MAX_VARINT_VALUE,
    }
}

/// Overwrites the varint occupying `[start, end of that varint)` with one of
/// `{0, boundary-maximal-for-width, a single random bit flip}`, chosen by a
/// fresh 2-bit pilot draw. Falls back to a single-bit flip if the overwrite
/// doesn't fit (spec.md §7 item 3).
pub(super) fn fuzz_varint_field<R: Random>(
    pilot: &mut Pilot<'_, R>,
    payload: &mut [u8],
    start: usize,
    buffer_end: usize,
) -> bool {
    let Ok(decoded) = varint::decode(payload, start, buffer_end) else {
        return false;
    };
    let field_end = decoded.next;

    match pilot.choice(3) {
        0 => varint::overwrite_in_place(payload, start, field_end, buffer_end, 0),
        1 => {
            let max = max_value_for_width(field_end - start);
            varint::overwrite_in_place(payload, start, field_end, buffer_end, max)
        }
        _ => flip_one_bit(pilot, payload, start, field_end),
    }
}

/// Flips one pilot-chosen bit within `[start, end)`. If the chosen byte is
/// `start` itself, the flip is restricted to its low 6 bits so the varint's
/// width-encoding top bits survive — consistent with §4.1's width-invariant.
pub(super) fn flip_one_bit<R: Random>(
    pilot: &mut Pilot<'_, R>,
    payload: &mut [u8],
    start: usize,
    end: usize,
) -> bool {
    if start >= end || end > payload.len() {
        return false;
    }
    let span = (end - start) as u32;
    let byte_index = start + pilot.choice(span) as usize;
    let bit = if byte_index == start {
        pilot.choice(6)
    } else {
        pilot.choice(8)
    };
    payload[byte_index] ^= 1 << bit;
    true
}

/// XORs up to `max_bytes` pilot-chosen bytes within `[start, end)` with
/// pilot-derived masks. The catch-all fallback strategy (spec.md §4.3
/// "Default") and a component of several family-specific mutators.
pub(super) fn xor_random_bytes<R: Random>(
    pilot: &mut Pilot<'_, R>,
    payload: &mut [u8],
    start: usize,
    end: usize,
    max_bytes: usize,
) -> bool {
    let end = end.min(payload.len());
    if start >= end {
        return false;
    }
    let span = end - start;
    let count = 1 + pilot.choice(max_bytes.min(span).max(1) as u32) as usize;
    for _ in 0..count {
        let idx = start + pilot.choice(span as u32) as usize;
        let mask = pilot.take_bits(8) as u8;
        payload[idx] ^= mask.max(1);
    }
    true
}

/// Rewrites the varint at `[start, field_end)` to its width's boundary-
/// maximal value ("all-ones" within the value bits).
pub(super) fn boundary_maximal_overwrite(payload: &mut [u8], start: usize, field_end: usize, buffer_end: usize) -> bool {
    let max = max_value_for_width(field_end - start);
    varint::overwrite_in_place(payload, start, field_end, buffer_end, max)
}
