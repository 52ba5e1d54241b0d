use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::trace;

use crate::{error::CoreError, manager::Emitter};

/// One bounded unit of a worker's work.
///
/// `tick` is called in a loop for as long as the worker is running and
/// must return promptly: [`Worker::stop`] is advisory and cannot take
/// effect before the current `tick` returns, so a blocking body delays
/// its own shutdown.
pub trait WorkerTask: Send + 'static {
    fn tick(&mut self, emitter: &Emitter);
}

/// A component with its own thread of control.
///
/// Workers are the only source of real parallelism in the reactor: the
/// thread loops the task against the shared queue's [`Emitter`], the
/// single handle a worker holds. Registries, sockets, and peer tables
/// stay on the driving thread.
pub struct Worker {
    name: String,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a named thread looping `task.tick` until [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// [`CoreError::WorkerSpawn`] when the OS refuses the thread.
    pub fn spawn<T: WorkerTask>(
        name: impl Into<String>,
        mut task: T,
        emitter: Emitter,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread_name = name.clone();

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                trace!("worker `{}` started", thread_name);
                while flag.load(Ordering::Relaxed) {
                    task.tick(&emitter);
                }
                trace!("worker `{}` stopped", thread_name);
            })
            .map_err(|error| CoreError::WorkerSpawn {
                name: name.clone(),
                message: error.to_string(),
            })?;

        Ok(Self {
            name,
            running,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Requests the worker to stop. Only flips the flag; the thread
    /// winds down at its next `tick` boundary. Joining is the caller's
    /// responsibility via [`join`](Self::join).
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Waits for the thread to finish. Call [`stop`](Self::stop) first;
    /// joining a still-running worker blocks until something else stops
    /// it.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // let the thread wind down on its own; never join implicitly
        self.running.store(false, Ordering::Relaxed);
    }
}
