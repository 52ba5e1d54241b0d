use std::collections::HashMap;

use crate::{
    error::CoreError,
    handler::{FilterFn, Handler, HandlerBody, HandlerId, ListenerFn},
};

/// The reserved catch-all channel. Handlers registered here observe every
/// event regardless of its real channel and always run first; events may
/// never be sent *to* it.
pub const GLOBAL_CHANNEL: &str = "global";

#[derive(Default)]
pub(crate) struct ChannelHandlers {
    pub(crate) filters: Vec<(HandlerId, FilterFn)>,
    pub(crate) listeners: Vec<(HandlerId, ListenerFn)>,
}

impl ChannelHandlers {
    fn new() -> Self {
        Self {
            filters: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.listeners.is_empty()
    }

    fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.filters.len() + self.listeners.len();
        self.filters.retain(|(handler_id, _)| *handler_id != id);
        self.listeners.retain(|(handler_id, _)| *handler_id != id);
        before != self.filters.len() + self.listeners.len()
    }
}

/// Per-channel ordered handler lists, split into the global catch-all set
/// and exact-channel sets.
///
/// Filters and listeners live in separate vecs, so "filters before
/// listeners, stable registration order within each kind" is a property
/// of the data shape rather than of a sort.
pub struct HandlerRegistry {
    pub(crate) global: ChannelHandlers,
    pub(crate) channels: HashMap<String, ChannelHandlers>,
    next_id: u64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            global: ChannelHandlers::new(),
            channels: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a handler on its channel.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHandler`] when the channel name is
    /// structurally invalid. The wildcard form `<prefix>:*` is valid.
    pub fn add(&mut self, handler: Handler) -> Result<HandlerId, CoreError> {
        if !valid_channel(&handler.channel) {
            return Err(CoreError::InvalidHandler {
                channel: handler.channel,
            });
        }

        let id = HandlerId::from_u64(self.next_id);
        self.next_id += 1;

        let slot = if handler.channel == GLOBAL_CHANNEL {
            &mut self.global
        } else {
            self.channels
                .entry(handler.channel)
                .or_insert_with(ChannelHandlers::new)
        };
        match handler.body {
            HandlerBody::Filter(func) => slot.filters.push((id, func)),
            HandlerBody::Listener(func) => slot.listeners.push((id, func)),
        }
        Ok(id)
    }

    /// Removes a handler by id. A no-op when the id was never issued or
    /// has already been removed.
    pub fn remove(&mut self, id: HandlerId) {
        if self.global.remove(id) {
            return;
        }
        let mut emptied = None;
        for (channel, handlers) in self.channels.iter_mut() {
            if handlers.remove(id) {
                if handlers.is_empty() {
                    emptied = Some(channel.clone());
                }
                break;
            }
        }
        if let Some(channel) = emptied {
            self.channels.remove(&channel);
        }
    }

    pub fn has_global(&self) -> bool {
        !self.global.is_empty()
    }

    /// Whether a dispatch on `channel` would visit at least one handler
    /// (global, wildcard, or exact).
    pub fn has_any(&self, channel: &str) -> bool {
        if self.has_global() {
            return true;
        }
        if let Some(wildcard) = wildcard_of(channel) {
            if self.channels.contains_key(&wildcard) {
                return true;
            }
        }
        self.channels.contains_key(channel)
    }

    pub(crate) fn wildcard_handlers(&mut self, channel: &str) -> Option<&mut ChannelHandlers> {
        let wildcard = wildcard_of(channel)?;
        self.channels.get_mut(&wildcard)
    }

    pub(crate) fn exact_handlers(&mut self, channel: &str) -> Option<&mut ChannelHandlers> {
        self.channels.get_mut(channel)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `ircd:privmsg` matches handlers registered on `ircd:*`.
fn wildcard_of(channel: &str) -> Option<String> {
    let (prefix, name) = channel.split_once(':')?;
    if name == "*" {
        // already the wildcard itself
        return None;
    }
    Some(format!("{}:*", prefix))
}

fn valid_channel(channel: &str) -> bool {
    if channel.is_empty() || channel == "*" {
        return false;
    }
    if channel.chars().any(char::is_whitespace) {
        return false;
    }
    if let Some((prefix, name)) = channel.split_once(':') {
        if prefix.is_empty() || name.is_empty() {
            return false;
        }
    }
    true
}
