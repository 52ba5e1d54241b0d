//! # Manifold Bridge
//! UDP event distribution between manifold reactors.
//!
//! A [`Bridge`] makes a manager's `flush` fan newly queued events out to
//! a mesh of peer reactors, and makes incoming datagrams look like
//! locally dispatched events. Records are batched into 8 KiB datagrams
//! and the codec is self-delimiting, so no framing bytes are needed.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bridge;
mod error;
mod peer;
mod wire;

pub use bridge::{Bridge, BridgeConfig, DATAGRAM_BUDGET, DEFAULT_BRIDGE_PORT};
pub use error::{BridgeError, WireError};
pub use peer::PeerTable;
pub use wire::{read_varint, write_varint, ByteReader, ByteWriter, Record, Wire};
