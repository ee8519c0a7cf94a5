// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The injection corpus: a static table of named, well-formed-or-deliberately-
//! broken QUIC frame byte sequences, used by the scheduler's inject step
//! (spec.md §4.5 step 6) and by test-targeting (spec.md §6).

/// One named byte sequence. `name` exists only for test-targeting (an
/// error-condition test names the entry it wants injected); it carries no
/// meaning at runtime otherwise.
#[derive(Clone, Copy, Debug)]
pub struct InjectionCorpusEntry {
    pub name: &'static str,
    pub bytes: &'static [u8],
}

impl InjectionCorpusEntry {
    #[inline]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

macro_rules! entry {
    ($name:literal, [$($byte:expr),* $(,)?]) => {
        InjectionCorpusEntry {
            name: $name,
            bytes: &[$($byte),*],
        }
    };
}

/// The static corpus. Covers every RFC 9000/9221/ack-frequency/multipath
/// frame type in a minimal well-formed shape, plus a set of known-bad
/// variants named for direct test-targeting (spec.md §8 scenarios 3 and 4).
pub static CORPUS: &[InjectionCorpusEntry] = &[
    entry!("padding_1", [0x00]),
    entry!("padding_2", [0x00, 0x00]),
    entry!("padding_5", [0x00, 0x00, 0x00, 0x00, 0x00]),
    entry!("padding_7", [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
    entry!("padding_10", [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
    entry!(
        "padding_13",
        [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    ),
    entry!(
        "padding_50",
        [
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00,
        ]
    ),
    entry!("ping", [0x01]),
    // ACK: largest_acked=5, delay=0, range_count=0, first_range=0
    entry!("ack_minimal", [0x02, 0x05, 0x00, 0x00, 0x00]),
    // ACK whose Gap field (inside a single range) is the maximum varint
    // (2^62 - 1 encoded at 8-byte width): largest_acked=10, delay=0,
    // range_count=1, first_range=0, gap=MAX, range_length=0.
    entry!(
        "bad_ack_gaps",
        [
            0x02, 0x0a, 0x00, 0x01, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00,
        ]
    ),
    entry!("ack_ecn_minimal", [0x03, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
    // RESET_STREAM: stream=0, error=0, final_size=0
    entry!("reset_stream_minimal", [0x04, 0x00, 0x00, 0x00]),
    // STOP_SENDING: stream=0, error=0
    entry!("stop_sending_minimal", [0x05, 0x00, 0x00]),
    // CRYPTO: offset=0, length=0
    entry!("crypto_empty", [0x06, 0x00, 0x00]),
    // CRYPTO with a length claiming far more than is actually present.
    entry!("crypto_truncated", [0x06, 0x00, 0b0111_1111]),
    // NEW_TOKEN: length=0
    entry!("new_token_empty", [0x07, 0x00]),
    // STREAM: id=0, no OFF, no LEN (extends to end of packet) — empty here.
    entry!("stream_minimal", [0x08, 0x00]),
    // STREAM with OFF+LEN: id=0, offset=0, length=0.
    entry!("stream_off_len", [0x0f, 0x00, 0x00, 0x00]),
    // STREAM: id's low two bits select client-initiated (0) + unidirectional
    // (1) — a client sending on a stream id reserved for the server's own
    // unidirectional streams.
    entry!("stream_client_uni_wrong_direction", [0x08, 0x02]),
    entry!("max_data_minimal", [0x10, 0x00]),
    entry!("max_data_large", [0x10, 0x80, 0x3f, 0xff, 0xff]),
    entry!("max_stream_data_minimal", [0x11, 0x00, 0x00]),
    entry!("max_streams_bidi_minimal", [0x12, 0x00]),
    entry!("max_streams_uni_minimal", [0x13, 0x00]),
    entry!("data_blocked_minimal", [0x14, 0x00]),
    entry!("stream_data_blocked_minimal", [0x15, 0x00, 0x00]),
    entry!("streams_blocked_bidi_minimal", [0x16, 0x00]),
    entry!("streams_blocked_uni_minimal", [0x17, 0x00]),
    // NEW_CONNECTION_ID: seq=1, retire_prior_to=0, len=8, cid[8], token[16]
    entry!(
        "new_connection_id_minimal",
        [
            0x18, 0x01, 0x00, 0x08, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x22, 0x22, 0x22,
            0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22,
        ]
    ),
    entry!("retire_connection_id_zero", [0x19, 0x00]),
    entry!(
        "path_challenge_minimal",
        [0x1a, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
    ),
    entry!(
        "path_response_minimal",
        [0x1b, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
    ),
    // CONNECTION_CLOSE (QUIC layer): error=0, frame_type=0, reason_len=0
    entry!("connection_close_quic_minimal", [0x1c, 0x00, 0x00, 0x00]),
    // CONNECTION_CLOSE (application): error=0, reason_len=0
    entry!("connection_close_app_minimal", [0x1d, 0x00, 0x00]),
    // CONNECTION_CLOSE whose reason-phrase-length varint is the maximum
    // representable value, with no reason bytes actually present.
    entry!(
        "bad_connection_close",
        [0x1d, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
    ),
    entry!("handshake_done", [0x1e]),
    entry!("datagram_no_len", [0x30, b'd', b'g']),
    entry!("datagram_with_len", [0x31, 0x02, b'd', b'g']),
    // ACK_FREQUENCY (varint tag 0xaf, encoded as a 2-byte varint):
    // sequence=0, packet_tolerance=2, max_ack_delay=25000.
    entry!("ack_frequency_minimal", [0x40, 0xaf, 0x00, 0x02, 0x7a, 0x18]),
    // PATH_ABANDON (varint tag 0x15228c05): path_id=0, error_code=0.
    entry!(
        "path_abandon_minimal",
        [0x80, 0x15, 0x22, 0x8c, 0x05, 0x00, 0x00]
    ),
    entry!(
        "path_available_minimal",
        [0x80, 0x15, 0x22, 0x8c, 0x08, 0x00, 0x00]
    ),
    entry!(
        "path_backup_minimal",
        [0x80, 0x15, 0x22, 0x8c, 0x09, 0x00, 0x00]
    ),
    entry!(
        "paths_blocked_minimal",
        [0x80, 0x15, 0x22, 0x8c, 0x0c, 0x00, 0x00]
    ),
];

/// Known-bad Version Negotiation packets, used by the special-packet
/// fuzzers' "duplicate known-bad packet" test-targeting path (spec.md §6):
/// when `test_target` names one of these, the VN fuzzer replaces its input
/// wholesale instead of running one of its sixteen mutation actions.
pub static VN_CORPUS: &[InjectionCorpusEntry] = &[
    // MSB set, version 0, zero-length DCID/SCID, empty version list.
    entry!("vn_known_bad_empty_version_list", [0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
    // same, but with only grease versions offered — nothing a peer can
    // actually negotiate to.
    entry!(
        "vn_known_bad_grease_only",
        [0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a, 0x0a, 0x0a, 0x0a]
    ),
];

/// Known-bad Retry packets, used the same way by the Retry fuzzer.
pub static RETRY_CORPUS: &[InjectionCorpusEntry] = &[
    // high nibble 0xf, non-zero version, zero-length DCID/SCID/token, an
    // integrity tag that's obviously not a real AEAD tag.
    entry!(
        "retry_known_bad_corrupt_tag",
        [
            0xf0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        ]
    ),
    // claims a 20-byte DCID but is far too short to hold it — a
    // structurally-truncated Retry header.
    entry!("retry_known_bad_truncated_header", [0xf0, 0x00, 0x00, 0x00, 0x01, 0x14]),
];

/// Looks up a corpus entry by name. Used by test-targeting (spec.md §6) to
/// prefer a specific named entry when injecting.
pub fn find(name: &str) -> Option<&'static InjectionCorpusEntry> {
    CORPUS.iter().find(|entry| entry.name == name)
}

/// Looks up a known-bad Version Negotiation packet by name.
pub fn find_vn(name: &str) -> Option<&'static InjectionCorpusEntry> {
    VN_CORPUS.iter().find(|entry| entry.name == name)
}

/// Looks up a known-bad Retry packet by name.
pub fn find_retry(name: &str) -> Option<&'static InjectionCorpusEntry> {
    RETRY_CORPUS.iter().find(|entry| entry.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_is_non_empty() {
        for entry in CORPUS {
            assert!(!entry.is_empty(), "{} is empty", entry.name);
        }
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in CORPUS.iter().enumerate() {
            for b in &CORPUS[i + 1..] {
                assert_ne!(a.name, b.name, "duplicate corpus entry name");
            }
        }
    }

    #[test]
    fn finds_named_entries_used_by_error_condition_tests() {
        assert!(find("bad_ack_gaps").is_some());
        assert!(find("bad_connection_close").is_some());
        assert!(find("nonexistent").is_none());
    }

    #[test]
    fn vn_and_retry_corpora_are_non_empty_and_unique() {
        for entry in VN_CORPUS.iter().chain(RETRY_CORPUS) {
            assert!(!entry.is_empty(), "{} is empty", entry.name);
        }
        assert!(find_vn("vn_known_bad_empty_version_list").is_some());
        assert!(find_retry("retry_known_bad_corrupt_tag").is_some());
        assert!(find_vn("nonexistent").is_none());
        assert!(find_retry("nonexistent").is_none());
    }
}
