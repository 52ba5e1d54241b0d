use crate::{event::Event, value::Value};

/// What a filter decided about the event it just inspected.
#[derive(Debug)]
pub enum FilterOutcome {
    /// Let the event continue to the remaining handlers untouched.
    Pass,
    /// Substitute a replacement event that all subsequent handlers in
    /// this dispatch observe instead.
    Replace(Event),
    /// Abort this dispatch entirely. No further filter or listener sees
    /// the event; it is dropped silently.
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Filter,
    Listener,
}

pub type FilterFn = Box<dyn FnMut(&Event) -> FilterOutcome>;
pub type ListenerFn = Box<dyn FnMut(&Event) -> Option<Value>>;

pub(crate) enum HandlerBody {
    Filter(FilterFn),
    Listener(ListenerFn),
}

/// A callable registered on a channel, tagged as filter or listener.
///
/// The tag is part of the type, so an untagged callable is
/// unrepresentable; registration can still fail on a structurally
/// invalid channel name (see [`HandlerRegistry::add`](crate::HandlerRegistry::add)).
pub struct Handler {
    pub(crate) channel: String,
    pub(crate) body: HandlerBody,
}

impl Handler {
    pub fn filter(
        channel: impl Into<String>,
        func: impl FnMut(&Event) -> FilterOutcome + 'static,
    ) -> Self {
        Self {
            channel: channel.into(),
            body: HandlerBody::Filter(Box::new(func)),
        }
    }

    pub fn listener(
        channel: impl Into<String>,
        func: impl FnMut(&Event) -> Option<Value> + 'static,
    ) -> Self {
        Self {
            channel: channel.into(),
            body: HandlerBody::Listener(Box::new(func)),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn kind(&self) -> HandlerKind {
        match &self.body {
            HandlerBody::Filter(_) => HandlerKind::Filter,
            HandlerBody::Listener(_) => HandlerKind::Listener,
        }
    }

    /// Namespaces this handler's channel under `prefix`. Applied during
    /// component registration; `global` and already-namespaced channels
    /// are left alone.
    pub(crate) fn apply_prefix(&mut self, prefix: &str) {
        if self.channel == crate::registry::GLOBAL_CHANNEL || self.channel.contains(':') {
            return;
        }
        self.channel = format!("{}:{}", prefix, self.channel);
    }
}

/// Key handed out at registration, used to deregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        HandlerId(value)
    }
}
