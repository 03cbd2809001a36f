//! Fixed-cadence background task.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use thread_priority::{ThreadPriority, ThreadPriorityValue};

/// Body of a periodic task.
pub trait Activation: Send + 'static {
    /// One polling pass. Must return promptly.
    fn activate(&mut self);

    /// Runs once on the task thread after the last activation.
    fn shutdown(&mut self) {}
}

/// Runs an [`Activation`] on a named thread, sleeping `interval` between
/// activations, until stopped.
pub struct PeriodicTask {
    name: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn spawn<A: Activation>(
        name: &str,
        priority: Option<u8>,
        interval: Duration,
        mut activation: A,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if let Some(priority) = priority {
                    apply_priority(&thread_name, priority);
                }

                while !stop_flag.load(Ordering::Acquire) {
                    activation.activate();
                    thread::sleep(interval);
                }

                activation.shutdown();
                tracing::debug!("Task {} stopped", thread_name);
            })
            .map_err(|e| Error::ThreadSpawn(format!("{}: {}", name, e)))?;

        tracing::debug!("Task {} started ({:?} interval)", name, interval);

        Ok(Self {
            name: name.to_string(),
            stop,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` once stopped.
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.handle.as_ref().map(|handle| handle.thread().id())
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the task and wait for its final shutdown pass.
    ///
    /// Called from the task's own thread, it only signals; the shutdown pass
    /// runs once the current activation returns.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Task {} panicked", self.name);
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

fn apply_priority(name: &str, priority: u8) {
    let value = match ThreadPriorityValue::try_from(priority) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Task {}: invalid priority {}: {}", name, priority, e);
            return;
        }
    };
    let priority_value = ThreadPriority::Crossplatform(value);
    if let Err(e) = thread_priority::set_current_thread_priority(priority_value) {
        // Raising priority usually needs privileges; the task still runs.
        tracing::warn!("Task {}: cannot set priority {}: {:?}", name, priority, e);
    }
}
