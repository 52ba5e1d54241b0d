//! Shared helpers for manifold end-to-end and integration tests.

pub mod helpers;

pub use helpers::{pump_until, CountdownTask, Recorder};
