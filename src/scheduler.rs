// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The scheduler (spec.md §4.5): the single per-packet entry point that
//! decides whether, and how, to fuzz an outbound plaintext packet.

use crate::{
    corpus::{self, InjectionCorpusEntry, CORPUS},
    frame::{self, tag::code, Capture, FrameSkip, StandardFrameSkip},
    host::{ConnectionIdentity, HandshakeOracle},
    pilot::Pilot,
    random::Random,
    special::{retry, version_negotiation},
    state::{ConnectionFuzzState, HandshakePhase, InitialConnectionId},
    stats::Statistics,
    table::{ConnectionStateTable, DEFAULT_CAPACITY},
    varint,
};

/// Process-wide fuzzing context, one per endpoint (spec.md §3
/// `FuzzerContext`).
///
/// Built with [`FuzzerContext::builder`], mirroring
/// `quic/s2n-quic/src/client.rs`'s `Client::builder()` /
/// `quic/s2n-quic-core/src/packet/interceptor/loss.rs`'s `Loss::builder()`
/// pattern: a small builder validates and defaults fields that the final
/// struct holds immutably (capacity, initial entropy) or mutably
/// (the connection table, statistics, test-targeting override).
pub struct FuzzerContext {
    corpus: &'static [InjectionCorpusEntry],
    table: ConnectionStateTable,
    entropy_counter: u64,
    stats: Statistics,
    /// Test-targeting override (spec.md §6, §9 "Global mutable state"): kept
    /// on the context instead of a process-global, eliminating cross-test
    /// bleed between concurrently-running test cases.
    test_target: Option<&'static str>,
    frame_skip: StandardFrameSkip,
}

impl FuzzerContext {
    pub fn builder() -> FuzzerContextBuilder {
        FuzzerContextBuilder::default()
    }

    fn next_entropy(&mut self) -> u64 {
        self.entropy_counter = self.entropy_counter.wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        self.entropy_counter
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn set_test_target(&mut self, name: Option<&'static str>) {
        self.test_target = name;
    }
}

#[derive(Default)]
pub struct FuzzerContextBuilder {
    capacity: Option<usize>,
    entropy_seed: Option<u64>,
    test_target: Option<&'static str>,
    corpus: Option<&'static [InjectionCorpusEntry]>,
}

impl FuzzerContextBuilder {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn entropy_seed(mut self, seed: u64) -> Self {
        self.entropy_seed = Some(seed);
        self
    }

    pub fn test_target(mut self, name: &'static str) -> Self {
        self.test_target = Some(name);
        self
    }

    pub fn corpus(mut self, corpus: &'static [InjectionCorpusEntry]) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn build(self) -> FuzzerContext {
        FuzzerContext {
            corpus: self.corpus.unwrap_or(CORPUS),
            table: ConnectionStateTable::new(self.capacity.unwrap_or(DEFAULT_CAPACITY)),
            entropy_counter: self.entropy_seed.unwrap_or(0),
            stats: Statistics::new(),
            test_target: self.test_target,
            frame_skip: StandardFrameSkip,
        }
    }
}

fn pick_corpus_entry<R: Random>(
    corpus: &'static [InjectionCorpusEntry],
    test_target: Option<&'static str>,
    pilot: &mut Pilot<'_, R>,
) -> &'static InjectionCorpusEntry {
    if let Some(name) = test_target {
        if let Some(entry) = corpus::find(name) {
            return entry;
        }
    }
    &corpus[pilot.choice(corpus.len() as u32) as usize]
}

/// The host-stack hook (spec.md §6): `fuzz(ctx, connection_handle, buffer,
/// buffer_capacity, current_length, header_length) -> new_length`.
///
/// `buffer` holds exactly `current_length` bytes on entry; `buffer_capacity`
/// is the hard ceiling this call must never grow past. Returns the new
/// length, satisfying `header_length <= new_length <= buffer_capacity`.
pub fn fuzz<CH, I, H>(
    ctx: &mut FuzzerContext,
    identity: &I,
    oracle: &H,
    connection: &CH,
    buffer: &mut Vec<u8>,
    buffer_capacity: usize,
    header_length: usize,
) -> usize
where
    I: ConnectionIdentity<CH>,
    H: HandshakeOracle<CH>,
{
    // copy out the immutable/Copy parts of the context so the rest of this
    // function can borrow `ctx.table` and `ctx.stats` independently instead
    // of needing `&ctx` as a whole (which would conflict with the live
    // `&mut ConnectionFuzzState` borrowed out of `ctx.table` below).
    let corpus = ctx.corpus;
    let test_target = ctx.test_target;
    let frame_skip = ctx.frame_skip;

    let icid = identity.initial_connection_id(connection);
    let entropy = ctx.next_entropy();
    let state = ctx.table.get_or_create(icid, || ConnectionFuzzState::new(icid, entropy));

    let mut pilot = Pilot::new(state.rng());
    let phase = oracle.phase(connection);

    if version_negotiation::is_version_negotiation(buffer) {
        let eligible = !state.already_fuzzed || pilot.flag();
        if !eligible {
            return buffer.len();
        }
        record_first_fuzz(&mut ctx.stats, state, phase);
        return fuzz_special(buffer, buffer_capacity, corpus::VN_CORPUS, test_target, |b| {
            version_negotiation::fuzz(&mut pilot, b, header_length, buffer_capacity)
        });
    }

    if retry::is_retry(buffer) {
        let eligible = !state.already_fuzzed || pilot.flag();
        if !eligible {
            return buffer.len();
        }
        record_first_fuzz(&mut ctx.stats, state, phase);
        return fuzz_special(buffer, buffer_capacity, corpus::RETRY_CORPUS, test_target, |b| {
            retry::fuzz(&mut pilot, b, buffer_capacity)
        });
    }

    let wait_count = state.increment_wait_count(phase);
    ctx.stats.observe_wait_count(phase, wait_count);

    let eligible_phase =
        phase > state.target_phase || (phase == state.target_phase && wait_count >= state.target_wait);
    let eligible = eligible_phase && (!state.already_fuzzed || pilot.flag());

    if !eligible {
        return buffer.len();
    }

    record_first_fuzz(&mut ctx.stats, state, phase);
    ctx.stats.observe_waited(phase, wait_count);

    // low two pilot bits pick append/prepend/replace/no-op (spec.md §4.5
    // step 6; `original_source/lib/fuzzer.c`'s `fuzz_pilot & 0x03`).
    let injected = match pilot.choice(4) {
        0 => inject_append(
            corpus,
            test_target,
            &frame_skip,
            &mut pilot,
            buffer,
            header_length,
            buffer_capacity,
        ),
        1 => inject_prepend(corpus, test_target, &mut pilot, buffer, header_length, buffer_capacity),
        2 => inject_replace(corpus, test_target, &mut pilot, buffer, header_length, buffer_capacity),
        _ => false,
    };

    let mut mutated = false;
    if pilot.one_in(2) {
        mutated = mutate_one_frame(&frame_skip, state, &mut pilot, buffer, header_length);
    }

    if !injected && !mutated {
        basic_packet_fuzz(&mut pilot, buffer, header_length, buffer_capacity);
    }

    if pilot.one_in(4) {
        if let Some(seq) = state.take_retire_target() {
            append_retire_connection_id(&frame_skip, buffer, header_length, buffer_capacity, seq);
        }
    }

    ctx.stats.record_packet_fuzzed(phase);

    buffer.len().min(buffer_capacity)
}

/// Records a connection's first successful fuzz, together with its "tried"
/// counter, at the exact moment eligibility is established — never before
/// (spec.md §8: `nb_cnx_tried[p] <= nb_cnx_fuzzed[p]` for every phase `p`).
/// Called from both the ordinary-packet path and the VN/Retry special-packet
/// path, since either can be the first packet a connection is ever fuzzed on.
fn record_first_fuzz(stats: &mut Statistics, state: &mut ConnectionFuzzState, phase: HandshakePhase) {
    if !state.already_fuzzed {
        stats.record_connection_tried(phase);
        stats.record_connection_fuzzed(phase);
        state.already_fuzzed = true;
    }
}

/// Eligibility for VN/Retry packets has already been checked and
/// `already_fuzzed` already flipped by the caller; this just picks the
/// mutation itself, preferring a known-bad packet from `known_bad` when
/// test-targeting names one (spec.md §6's "duplicate known-bad packet" path),
/// otherwise running the sixteen-action fuzzer.
fn fuzz_special(
    buffer: &mut Vec<u8>,
    buffer_capacity: usize,
    known_bad: &'static [InjectionCorpusEntry],
    test_target: Option<&'static str>,
    run: impl FnOnce(&mut Vec<u8>) -> usize,
) -> usize {
    if let Some(name) = test_target {
        if let Some(entry) = known_bad.iter().find(|e| e.name == name) {
            let n = entry.len().min(buffer_capacity);
            buffer.clear();
            buffer.extend_from_slice(&entry.bytes[..n]);
            return buffer.len();
        }
    }
    run(buffer).min(buffer_capacity)
}

fn inject_append<R: Random>(
    corpus: &'static [InjectionCorpusEntry],
    test_target: Option<&'static str>,
    frame_skip: &StandardFrameSkip,
    pilot: &mut Pilot<'_, R>,
    buffer: &mut Vec<u8>,
    header_length: usize,
    buffer_capacity: usize,
) -> bool {
    let entry = pick_corpus_entry(corpus, test_target, pilot);
    if buffer.len() + entry.len() > buffer_capacity {
        return false;
    }
    let insert_at = frame::last_non_padding_offset(frame_skip, &buffer[header_length..], buffer.len() - header_length)
        .map(|offset| header_length + offset)
        .unwrap_or(header_length);
    buffer.splice(insert_at..insert_at, entry.bytes.iter().copied());
    true
}

fn inject_prepend<R: Random>(
    corpus: &'static [InjectionCorpusEntry],
    test_target: Option<&'static str>,
    pilot: &mut Pilot<'_, R>,
    buffer: &mut Vec<u8>,
    header_length: usize,
    buffer_capacity: usize,
) -> bool {
    let entry = pick_corpus_entry(corpus, test_target, pilot);
    if buffer.len() + entry.len() > buffer_capacity {
        return false;
    }
    buffer.splice(header_length..header_length, entry.bytes.iter().copied());
    true
}

fn inject_replace<R: Random>(
    corpus: &'static [InjectionCorpusEntry],
    test_target: Option<&'static str>,
    pilot: &mut Pilot<'_, R>,
    buffer: &mut Vec<u8>,
    header_length: usize,
    buffer_capacity: usize,
) -> bool {
    let entry = pick_corpus_entry(corpus, test_target, pilot);
    buffer.truncate(header_length);
    let room = buffer_capacity.saturating_sub(header_length);
    let n = entry.len().min(room);
    buffer.extend_from_slice(&entry.bytes[..n]);
    true
}

fn mutate_one_frame<R: Random>(
    frame_skip: &StandardFrameSkip,
    state: &mut ConnectionFuzzState,
    pilot: &mut Pilot<'_, R>,
    buffer: &mut Vec<u8>,
    header_length: usize,
) -> bool {
    if header_length > buffer.len() {
        return false;
    }

    let mut extents = Vec::new();
    {
        let payload = &buffer[header_length..];
        frame::walk(frame_skip, payload, payload.len(), |extent| extents.push(extent));
    }
    if extents.is_empty() {
        return false;
    }

    let chosen = extents[pilot.choice(extents.len() as u32) as usize];
    let payload_len = buffer.len() - header_length;
    let payload = &mut buffer[header_length..];
    let Some((kind, _)) = frame::classify(payload, chosen.offset, payload_len) else {
        return false;
    };

    // MAX_DATA's decrease-attack branch needs the connection's previously
    // observed value, which the generic FrameMutator seam doesn't carry
    // (spec.md §4.3) — called directly here instead of through `dispatch`.
    let outcome = if matches!(kind, frame::FrameKind::SimpleTypeByte(code::MAX_DATA)) {
        let previous = state.has_sent_max_data.then_some(state.last_sent_max_data);
        crate::frame::mutate::max_data::mutate_with_state(pilot, payload, chosen, previous)
    } else {
        crate::frame::mutate::dispatch(kind, pilot, payload, chosen)
    };

    match outcome.capture {
        Capture::MaxData(v) => state.record_max_data(v),
        Capture::NewConnectionIdSeq(v) => state.record_new_connection_id(v),
        Capture::None => {}
    }

    outcome.changed
}

fn basic_packet_fuzz<R: Random>(
    pilot: &mut Pilot<'_, R>,
    buffer: &mut Vec<u8>,
    header_length: usize,
    buffer_capacity: usize,
) {
    if header_length >= buffer.len() {
        return;
    }
    if pilot.flag() {
        let span = buffer.len() - header_length;
        let idx = header_length + pilot.choice(span as u32) as usize;
        buffer[idx] ^= pilot.take_bits(8) as u8 | 1;
    } else {
        let room = buffer_capacity.saturating_sub(buffer.len());
        let n = pilot.choice(17).min(room as u32) as usize;
        for _ in 0..n {
            buffer.push(pilot.rng().gen_u8());
        }
    }
}

fn append_retire_connection_id(
    frame_skip: &StandardFrameSkip,
    buffer: &mut Vec<u8>,
    header_length: usize,
    buffer_capacity: usize,
    seq: u64,
) {
    let mut frame_bytes = vec![crate::frame::tag::code::RETIRE_CONNECTION_ID];
    let mut tmp = [0u8; 8];
    let Ok(width) = varint::encode(&mut tmp, 0, 8, seq) else {
        return;
    };
    frame_bytes.extend_from_slice(&tmp[..width]);

    if buffer.len() + frame_bytes.len() > buffer_capacity {
        return;
    }

    // resolved per spec.md §9's open question: the end of the last-parsed
    // frame in the post-mutation payload, not the source's ambiguous
    // `fuzzed_length`.
    let insert_at = frame::last_non_padding_offset(frame_skip, &buffer[header_length..], buffer.len() - header_length)
        .map(|offset| header_length + offset)
        .unwrap_or(buffer.len());

    buffer.splice(insert_at..insert_at, frame_bytes);
}
