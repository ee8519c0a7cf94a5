// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The frame-skip primitive.
//!
//! Per spec.md §4.2/§6, determining how many bytes a single frame occupies
//! is delegated to a host-stack primitive — a real QUIC implementation
//! already has a frame decoder and re-deriving one here would duplicate it
//! (and likely duplicate its bugs differently). [`FrameSkip`] is that seam.
//!
//! [`StandardFrameSkip`] is a reference implementation, grounded on the
//! per-family wire layouts documented across
//! `quic/s2n-quic-core/src/frame/*.rs`, good enough to make this crate
//! self-testing without a real host stack attached.

use crate::{
    frame::tag::{classify, code, FrameKind},
    varint,
};

/// What the host stack's frame decoder reports about one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Skipped {
    /// Total bytes consumed by the frame, including its type tag.
    pub len: usize,
    /// Whether the frame carries no retransmittable/ack-eliciting content
    /// (PADDING and ACK frames are the classic examples). Exposed because a
    /// real host stack tracks this per RFC 9000 §13.2; kept here so a host's
    /// `FrameSkip` impl can report it for parity even though this crate's
    /// scheduler does not currently branch on it.
    pub is_ack_only: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkipError;

pub trait FrameSkip {
    /// Returns the number of bytes the frame starting at `payload[offset..]`
    /// occupies, or `Err` if the bytes do not parse as a known frame.
    fn skip(&self, payload: &[u8], offset: usize, end: usize) -> Result<Skipped, SkipError>;
}

/// A reference [`FrameSkip`] covering every frame family this crate's
/// mutators and injection corpus know about.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardFrameSkip;

impl FrameSkip for StandardFrameSkip {
    fn skip(&self, payload: &[u8], offset: usize, end: usize) -> Result<Skipped, SkipError> {
        let end = end.min(payload.len());
        let (kind, tag_width) = classify(payload, offset, end).ok_or(SkipError)?;
        let body_start = offset + tag_width;

        let len = match kind {
            FrameKind::SimpleTypeByte(code::PADDING) => {
                // a PADDING frame greedily consumes the whole contiguous run
                // of zero bytes, matching s2n-quic-core's `Padding::decode`.
                let mut i = body_start;
                while i < end && payload[i] == code::PADDING {
                    i += 1;
                }
                i - offset
            }
            FrameKind::SimpleTypeByte(code::PING) => 1,
            FrameKind::SimpleTypeByte(code::ACK) | FrameKind::SimpleTypeByte(code::ACK_ECN) => {
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // largest acked
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // ack delay
                let range_count = varint::decode(payload, pos, end).map_err(|_| SkipError)?;
                pos = range_count.next;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // first ack range
                for _ in 0..range_count.value {
                    pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // gap
                    pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // range length
                }
                if payload[offset] == code::ACK_ECN {
                    pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                    pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                    pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                }
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::RESET_STREAM) => {
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::STOP_SENDING) => {
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::CRYPTO) => {
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                let len = varint::decode(payload, pos, end).map_err(|_| SkipError)?;
                pos = len.next;
                let data_len: usize = len.value.try_into().map_err(|_| SkipError)?;
                pos = pos.checked_add(data_len).ok_or(SkipError)?;
                if pos > end {
                    return Err(SkipError);
                }
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::NEW_TOKEN) => {
                let len = varint::decode(payload, body_start, end).map_err(|_| SkipError)?;
                let data_len: usize = len.value.try_into().map_err(|_| SkipError)?;
                let pos = len.next.checked_add(data_len).ok_or(SkipError)?;
                if pos > end {
                    return Err(SkipError);
                }
                pos - offset
            }
            FrameKind::ShortHeaderStream => {
                let off_bit = payload[offset] & 0x04 != 0;
                let len_bit = payload[offset] & 0x02 != 0;
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // stream id
                if off_bit {
                    pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                }
                if len_bit {
                    let len = varint::decode(payload, pos, end).map_err(|_| SkipError)?;
                    let data_len: usize = len.value.try_into().map_err(|_| SkipError)?;
                    pos = len.next.checked_add(data_len).ok_or(SkipError)?;
                    if pos > end {
                        return Err(SkipError);
                    }
                } else {
                    pos = end;
                }
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::MAX_DATA) | FrameKind::SimpleTypeByte(code::DATA_BLOCKED) => {
                varint::skip(payload, body_start, end).map_err(|_| SkipError)? - offset
            }
            FrameKind::SimpleTypeByte(code::MAX_STREAM_DATA)
            | FrameKind::SimpleTypeByte(code::STREAM_DATA_BLOCKED) => {
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::MAX_STREAMS_BIDI)
            | FrameKind::SimpleTypeByte(code::MAX_STREAMS_UNI)
            | FrameKind::SimpleTypeByte(code::STREAMS_BLOCKED_BIDI)
            | FrameKind::SimpleTypeByte(code::STREAMS_BLOCKED_UNI) => {
                varint::skip(payload, body_start, end).map_err(|_| SkipError)? - offset
            }
            FrameKind::SimpleTypeByte(code::NEW_CONNECTION_ID) => {
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // seq no
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // retire prior to
                if pos >= end {
                    return Err(SkipError);
                }
                let cid_len = payload[pos] as usize;
                pos += 1;
                pos = pos.checked_add(cid_len).ok_or(SkipError)?;
                pos = pos.checked_add(16).ok_or(SkipError)?; // stateless reset token
                if pos > end {
                    return Err(SkipError);
                }
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::RETIRE_CONNECTION_ID) => {
                varint::skip(payload, body_start, end).map_err(|_| SkipError)? - offset
            }
            FrameKind::SimpleTypeByte(code::PATH_CHALLENGE)
            | FrameKind::SimpleTypeByte(code::PATH_RESPONSE) => {
                let pos = body_start.checked_add(8).ok_or(SkipError)?;
                if pos > end {
                    return Err(SkipError);
                }
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::CONNECTION_CLOSE_QUIC)
            | FrameKind::SimpleTypeByte(code::CONNECTION_CLOSE_APP) => {
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // error code
                if payload[offset] == code::CONNECTION_CLOSE_QUIC {
                    pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // frame type
                }
                let reason_len = varint::decode(payload, pos, end).map_err(|_| SkipError)?;
                pos = reason_len.next;
                let reason_len: usize = reason_len.value.try_into().map_err(|_| SkipError)?;
                pos = pos.checked_add(reason_len).ok_or(SkipError)?;
                if pos > end {
                    return Err(SkipError);
                }
                pos - offset
            }
            FrameKind::SimpleTypeByte(code::HANDSHAKE_DONE) => 1,
            FrameKind::SimpleTypeByte(code::DATAGRAM_NO_LEN) => end - offset,
            FrameKind::SimpleTypeByte(code::DATAGRAM_WITH_LEN) => {
                let len = varint::decode(payload, body_start, end).map_err(|_| SkipError)?;
                let data_len: usize = len.value.try_into().map_err(|_| SkipError)?;
                let pos = len.next.checked_add(data_len).ok_or(SkipError)?;
                if pos > end {
                    return Err(SkipError);
                }
                pos - offset
            }
            FrameKind::ExtendedVarintType(t) if t == code::ACK_FREQUENCY => {
                let mut pos = body_start;
                for _ in 0..3 {
                    pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?;
                }
                pos - offset
            }
            FrameKind::ExtendedVarintType(t)
                if t == code::PATH_ABANDON
                    || t == code::PATH_AVAILABLE
                    || t == code::PATH_BACKUP
                    || t == code::PATHS_BLOCKED =>
            {
                let mut pos = body_start;
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // path id
                pos = varint::skip(payload, pos, end).map_err(|_| SkipError)?; // error/seq
                pos - offset
            }
            FrameKind::SimpleTypeByte(_) | FrameKind::ExtendedVarintType(_) => {
                // unrecognized extension frame: we cannot safely determine
                // its length, so report a parse failure. The walker stops
                // here and the frames already found remain usable.
                return Err(SkipError);
            }
        };

        let is_ack_only = matches!(
            kind,
            FrameKind::SimpleTypeByte(code::PADDING)
                | FrameKind::SimpleTypeByte(code::ACK)
                | FrameKind::SimpleTypeByte(code::ACK_ECN)
        );

        Ok(Skipped { len, is_ack_only })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_ping() -> Vec<u8> {
        vec![code::PING]
    }

    #[test]
    fn skips_ping() {
        let buf = encode_ping();
        let skipped = StandardFrameSkip.skip(&buf, 0, buf.len()).unwrap();
        assert_eq!(skipped.len, 1);
    }

    #[test]
    fn skips_padding_run() {
        let buf = vec![0x00; 10];
        let skipped = StandardFrameSkip.skip(&buf, 0, buf.len()).unwrap();
        assert_eq!(skipped.len, 10);
        assert!(skipped.is_ack_only);
    }

    #[test]
    fn skips_max_data() {
        let mut buf = vec![code::MAX_DATA];
        let mut varint_buf = [0u8; 8];
        let w = varint::encode(&mut varint_buf, 0, 8, 1000).unwrap();
        buf.extend_from_slice(&varint_buf[..w]);
        let skipped = StandardFrameSkip.skip(&buf, 0, buf.len()).unwrap();
        assert_eq!(skipped.len, 1 + w);
    }

    #[test]
    fn skips_new_connection_id() {
        let mut buf = vec![code::NEW_CONNECTION_ID];
        let mut tmp = [0u8; 8];
        let w1 = varint::encode(&mut tmp, 0, 8, 3).unwrap();
        buf.extend_from_slice(&tmp[..w1]);
        let w2 = varint::encode(&mut tmp, 0, 8, 0).unwrap();
        buf.extend_from_slice(&tmp[..w2]);
        buf.push(8); // cid length
        buf.extend_from_slice(&[0xAA; 8]);
        buf.extend_from_slice(&[0xBB; 16]); // stateless reset token
        let skipped = StandardFrameSkip.skip(&buf, 0, buf.len()).unwrap();
        assert_eq!(skipped.len, buf.len());
    }

    #[test]
    fn stream_without_len_bit_runs_to_end() {
        let mut buf = vec![code::STREAM_START]; // no OFF, no LEN
        let mut tmp = [0u8; 8];
        let w = varint::encode(&mut tmp, 0, 8, 4).unwrap();
        buf.extend_from_slice(&tmp[..w]);
        buf.extend_from_slice(b"hello");
        let skipped = StandardFrameSkip.skip(&buf, 0, buf.len()).unwrap();
        assert_eq!(skipped.len, buf.len());
    }

    #[test]
    fn truncated_crypto_is_a_parse_error() {
        let mut buf = vec![code::CRYPTO];
        let mut tmp = [0u8; 8];
        let w1 = varint::encode(&mut tmp, 0, 8, 0).unwrap();
        buf.extend_from_slice(&tmp[..w1]);
        let w2 = varint::encode(&mut tmp, 0, 8, 100).unwrap(); // claims 100 bytes, has none
        buf.extend_from_slice(&tmp[..w2]);
        assert!(StandardFrameSkip.skip(&buf, 0, buf.len()).is_err());
    }
}
