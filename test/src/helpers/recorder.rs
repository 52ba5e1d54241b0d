use std::{cell::RefCell, rc::Rc};

use manifold_core::{Component, Event, Handler, Manager, Registration};

/// Listener tap: records every event dispatched on one channel so tests
/// can assert delivery counts, payloads, and sources.
pub struct Recorder {
    channel: String,
    seen: Rc<RefCell<Vec<Event>>>,
    registration: Option<Registration>,
}

impl Recorder {
    /// Attaches a recorder to `channel`. The channel is taken verbatim
    /// (no prefixing), so pass the full `<prefix>:<name>` form when
    /// tapping a reactor.
    pub fn attach(manager: &mut Manager, channel: impl Into<String>) -> Self {
        let mut recorder = Self {
            channel: channel.into(),
            seen: Rc::new(RefCell::new(Vec::new())),
            registration: None,
        };
        let registration =
            Registration::attach(manager, &mut recorder).expect("recorder channel is valid");
        recorder.registration = Some(registration);
        recorder
    }

    pub fn count(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.seen.borrow().clone()
    }

    pub fn detach(&mut self, manager: &mut Manager) {
        if let Some(mut registration) = self.registration.take() {
            registration.detach(manager);
        }
    }
}

impl Component for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn handlers(&mut self) -> Vec<Handler> {
        let seen = Rc::clone(&self.seen);
        vec![Handler::listener(self.channel.clone(), move |event: &Event| {
            seen.borrow_mut().push(event.clone());
            None
        })]
    }
}
