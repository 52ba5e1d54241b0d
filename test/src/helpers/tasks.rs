use std::{thread, time::Duration};

use manifold_core::{Emitter, Event, WorkerTask};

/// Worker task that pushes a fixed number of events onto a channel, then
/// idles until stopped.
pub struct CountdownTask {
    channel: String,
    remaining: usize,
}

impl CountdownTask {
    pub fn new(channel: impl Into<String>, count: usize) -> Self {
        Self {
            channel: channel.into(),
            remaining: count,
        }
    }
}

impl WorkerTask for CountdownTask {
    fn tick(&mut self, emitter: &Emitter) {
        if self.remaining > 0 {
            self.remaining -= 1;
            let event = Event::new("count").with_arg(self.remaining as u64);
            let _ = emitter.push(event, self.channel.clone());
        } else {
            thread::sleep(Duration::from_millis(1));
        }
    }
}
