use std::{collections::HashMap, net::SocketAddr};

use crate::value::Value;

/// A single occurrence flowing through the reactor.
///
/// Producers build an `Event` with a name and payload only. The routing
/// fields (`channel`, `target`) are stamped exactly once by the
/// [`Manager`](crate::Manager) at the moment the event is queued or sent,
/// and `source` is stamped by a bridge when the event arrived from a
/// remote peer. Once queued, an event is immutable: ownership moves into
/// the queue and handlers only ever observe `&Event`.
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    args: Vec<Value>,
    kwargs: HashMap<String, Value>,
    channel: Option<String>,
    target: Option<String>,
    source: Option<SocketAddr>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: HashMap::new(),
            channel: None,
            target: None,
            source: None,
        }
    }

    /// Appends a positional argument.
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Inserts a named argument. Insertion order is not significant.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn kwargs(&self) -> &HashMap<String, Value> {
        &self.kwargs
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// The channel this event was queued or sent on. `None` until the
    /// Manager has routed it.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// The component this event was addressed to, if any.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The remote peer this event originated from. `None` for locally
    /// originated events.
    pub fn source(&self) -> Option<SocketAddr> {
        self.source
    }

    pub(crate) fn route(&mut self, channel: String, target: Option<String>) {
        self.channel = Some(channel);
        self.target = target;
    }

    pub(crate) fn mark_source(&mut self, source: SocketAddr) {
        self.source = Some(source);
    }

    /// Observational equality: same name and payload, routing fields
    /// ignored. Two events that round-tripped a bridge compare equal here
    /// even though their routing differs.
    pub fn same_payload(&self, other: &Event) -> bool {
        self.name == other.name && self.args == other.args && self.kwargs == other.kwargs
    }
}
