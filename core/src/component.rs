use log::warn;

use crate::{
    error::CoreError,
    handler::{Handler, HandlerId},
    manager::Manager,
    registry::GLOBAL_CHANNEL,
};

/// A named bundle of filter/listener handlers that attaches to a
/// [`Manager`].
///
/// `handlers` is the component's explicit registration table: it must be
/// callable repeatedly, building fresh closures over the component's
/// shared state on every call (this is what makes [`link`] possible).
/// When a channel prefix is configured, table channels without a
/// namespace are registered under `<prefix>:<channel>`; `global` is
/// never prefixed.
pub trait Component {
    fn name(&self) -> &str;

    fn channel_prefix(&self) -> Option<&str> {
        None
    }

    fn handlers(&mut self) -> Vec<Handler>;
}

/// Tracks one component's attachment to a manager.
///
/// Lifecycle: `Unregistered → Registered → Unregistered`, reusable via
/// [`reattach`](Self::reattach). `detach` is idempotent, and `reattach`
/// on an attached registration is a no-op, so handlers can never end up
/// duplicated in the resolve order. One `Registration` per component
/// instance is the contract.
pub struct Registration {
    ids: Vec<HandlerId>,
    attached: bool,
}

impl Registration {
    /// Registers the component's handler table with the manager.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidHandler`] if any table entry carries an
    /// invalid channel; already-registered entries are rolled back.
    pub fn attach<C: Component + ?Sized>(
        manager: &mut Manager,
        component: &mut C,
    ) -> Result<Self, CoreError> {
        let ids = register_table(manager, component, None)?;
        Ok(Self {
            ids,
            attached: true,
        })
    }

    /// Re-registers after a [`detach`](Self::detach). A no-op when still
    /// attached.
    pub fn reattach<C: Component + ?Sized>(
        &mut self,
        manager: &mut Manager,
        component: &mut C,
    ) -> Result<(), CoreError> {
        if self.attached {
            return Ok(());
        }
        self.ids = register_table(manager, component, None)?;
        self.attached = true;
        Ok(())
    }

    /// Removes every handler this registration installed. Idempotent:
    /// a second call is a no-op.
    pub fn detach(&mut self, manager: &mut Manager) {
        if !self.attached {
            return;
        }
        for id in self.ids.drain(..) {
            manager.deregister(id);
        }
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.attached {
            warn!("registration dropped while still attached; handlers remain registered");
        }
    }
}

/// Registers `other`'s handler table under `host_name`'s private dispatch
/// surface, so events addressed *to* the host component also reach
/// `other`. Table channels become `<host_name>:<channel>`; `global`
/// entries are skipped (they already observe everything).
pub fn link<C: Component + ?Sized>(
    manager: &mut Manager,
    host_name: &str,
    other: &mut C,
) -> Result<LinkHandle, CoreError> {
    let ids = register_table(manager, other, Some(host_name))?;
    Ok(LinkHandle { ids })
}

/// Reverses a [`link`], removing exactly the handlers it installed.
/// Consumes the handle, so a double-unlink is unrepresentable.
pub fn unlink(manager: &mut Manager, handle: LinkHandle) {
    for id in handle.ids {
        manager.deregister(id);
    }
}

/// Proof of a live [`link`]; pass it to [`unlink`] to undo.
pub struct LinkHandle {
    ids: Vec<HandlerId>,
}

fn register_table<C: Component + ?Sized>(
    manager: &mut Manager,
    component: &mut C,
    surface: Option<&str>,
) -> Result<Vec<HandlerId>, CoreError> {
    let prefix = component.channel_prefix().map(str::to_owned);
    let mut ids = Vec::new();
    for mut handler in component.handlers() {
        match surface {
            Some(host) => {
                if handler.channel() == GLOBAL_CHANNEL {
                    continue;
                }
                handler.apply_prefix(host);
            }
            None => {
                if let Some(prefix) = &prefix {
                    handler.apply_prefix(prefix);
                }
            }
        }
        match manager.register(handler) {
            Ok(id) => ids.push(id),
            Err(error) => {
                for id in ids {
                    manager.deregister(id);
                }
                return Err(error);
            }
        }
    }
    Ok(ids)
}
