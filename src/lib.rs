#![cfg_attr(docsrs, feature(doc_cfg))]

//! A stateful, structure-aware mutation engine for fuzzing QUIC endpoints.
//!
//! This crate sits between an unmodified QUIC implementation and its peer. A
//! host stack calls [`scheduler::fuzz`] immediately before encrypting each
//! outbound plaintext packet; the call returns a (possibly unchanged) new
//! payload length. The host stack, its encryption, its retransmission and
//! loss recovery, and its network simulator are all external collaborators —
//! this crate only ever sees a flat byte buffer, a header length, and a
//! small set of traits (see [`host`]) through which it reads connection
//! identity and handshake phase.

pub mod corpus;
pub mod frame;
pub mod host;
pub mod pilot;
pub mod random;
pub mod scheduler;
pub mod special;
pub mod state;
pub mod stats;
pub mod table;
pub mod varint;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use scheduler::{fuzz, FuzzerContext};
pub use state::HandshakePhase;
