// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The host-stack seam (spec.md §6 "Host-stack primitives consumed").
//!
//! The mutation engine is deliberately not a protocol implementation
//! (spec.md §1 Non-goals): it never decrypts, never owns connection state,
//! never drives the handshake. Everything it needs from the surrounding QUIC
//! stack comes through a small set of traits, the same seam shape as
//! `quic/s2n-quic-core/src/packet/interceptor.rs`'s `Interceptor` trait
//! (host exposes a narrow interface; core implementation consumes it without
//! depending on the host's connection types directly).

use crate::state::{HandshakePhase, InitialConnectionId};

pub use crate::frame::{FrameSkip, StandardFrameSkip};

/// Maps a connection handle to the information the scheduler needs about it
/// without understanding the host stack's connection representation at all.
pub trait ConnectionIdentity<ConnectionHandle> {
    /// The connection's initial connection id, used as the fuzz-state table
    /// key (spec.md §3).
    fn initial_connection_id(&self, connection: &ConnectionHandle) -> InitialConnectionId;
}

/// Maps a connection handle to this crate's four-phase handshake bucket
/// (spec.md §3 `HandshakePhase`). The host stack's own connection state
/// machine has finer granularity; this trait is where that gets collapsed.
pub trait HandshakeOracle<ConnectionHandle> {
    fn phase(&self, connection: &ConnectionHandle) -> HandshakePhase;
}
