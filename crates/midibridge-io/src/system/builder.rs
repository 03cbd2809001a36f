//! MidiSystem builder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::bounded;
use parking_lot::Mutex;

use crate::config::MidiConfig;
use crate::error::Result;
use crate::io::{InputLoop, OutputLoop, PeriodicTask};

use super::{MidiSystem, MidiSystemInner, Shared};

const COMMAND_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct MidiSystemBuilder {
    pub(super) config: MidiConfig,
}

impl MidiSystemBuilder {
    /// Replace every setting at once.
    pub fn config(mut self, config: MidiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn input_buffer_size(mut self, bytes: usize) -> Self {
        self.config.input_buffer_size = bytes;
        self
    }

    pub fn output_buffer_size(mut self, bytes: usize) -> Self {
        self.config.output_buffer_size = bytes;
        self
    }

    pub fn message_queue_capacity(mut self, messages: usize) -> Self {
        self.config.message_queue_capacity = messages;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.config.error_backoff = backoff;
        self
    }

    /// `None` leaves the I/O threads at the OS default.
    pub fn thread_priority(mut self, priority: Option<u8>) -> Self {
        self.config.thread_priority = priority;
        self
    }

    /// Validate the config and start both activation loops.
    pub fn build(self) -> Result<MidiSystem> {
        let config = self.config;
        config.validate()?;

        let (input_tx, input_rx) = bounded(COMMAND_CAPACITY);
        let (output_tx, output_rx) = bounded(COMMAND_CAPACITY);

        let input_task = PeriodicTask::spawn(
            "midibridge-input",
            config.thread_priority,
            config.poll_interval,
            InputLoop::new(input_rx, config.input_buffer_size),
        )?;
        let output_task = PeriodicTask::spawn(
            "midibridge-output",
            config.thread_priority,
            config.poll_interval,
            OutputLoop::new(output_rx, config.error_backoff),
        )?;

        tracing::info!(
            "MIDI system started (poll {:?}, priority {:?})",
            config.poll_interval,
            config.thread_priority
        );

        Ok(MidiSystem {
            inner: Arc::new(MidiSystemInner {
                shared: Arc::new(Shared {
                    config,
                    input_commands: input_tx,
                    output_commands: output_tx,
                    endpoints: Mutex::new(HashMap::new()),
                    next_id: AtomicU64::new(0),
                    running: AtomicBool::new(true),
                    input_thread: input_task.thread_id(),
                    output_thread: output_task.thread_id(),
                }),
                tasks: Mutex::new(vec![input_task, output_task]),
            }),
        })
    }
}
