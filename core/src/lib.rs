//! # Manifold Core
//! Channel-addressed event queue, dispatch & component lifecycle for the
//! manifold reactor.
//!
//! The reactor is cooperative: a single control flow drives
//! [`Manager::flush`] in a loop, interleaved with the socket and bridge
//! `poll` passes built on top of this crate. The only real parallelism
//! is [`Worker`] threads, which reach the shared queue through cloned
//! [`Emitter`] handles.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod component;
mod dispatch;
mod error;
mod event;
mod handler;
mod manager;
mod registry;
mod value;
mod worker;

pub use component::{link, unlink, Component, LinkHandle, Registration};
pub use dispatch::Dispatcher;
pub use error::{CoreError, DispatchError};
pub use event::Event;
pub use handler::{FilterFn, FilterOutcome, Handler, HandlerId, HandlerKind, ListenerFn};
pub use manager::{resolved_channel, Emitter, Manager};
pub use registry::{HandlerRegistry, GLOBAL_CHANNEL};
pub use value::Value;
pub use worker::{Worker, WorkerTask};
