//! MIDI system: the two background activation loops plus the endpoints
//! attached to them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use midibridge_io::{MidiSystem, MidiWrite};
//!
//! let midi = MidiSystem::builder().build()?;
//!
//! let mut keyboard = midi.open_input("/dev/midi1")?;
//! let mut synth = midi.open_output("hw:1,0")?;
//!
//! // Real-time side: never blocks.
//! let input = keyboard.input().unwrap();
//! while let Some(message) = input.next_message() {
//!     synth.output().unwrap().write_channel_message(&message)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;

pub use builder::MidiSystemBuilder;

use crate::config::{EndpointOptions, MidiConfig};
use crate::endpoint::{MidiEndpoint, MidiInput, MidiOutput};
use crate::error::{Error, Result};
use crate::io::{
    EndpointId, InputCommand, InputParser, InputSlot, OutputCommand, OutputSlot, PeriodicTask,
};
use crate::transport::{list_char_devices, open_transport, Direction, MidiTransport};
use crossbeam_channel::{bounded, SendError, Sender};
use midibridge_core::{byte_ring, MessageHandler, MessageReceiver, MidiDecoder};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

#[derive(Debug, Clone, Copy)]
struct EndpointRecord {
    has_input: bool,
    has_output: bool,
}

/// State reachable from both the system and its endpoints.
pub(crate) struct Shared {
    config: MidiConfig,
    input_commands: Sender<InputCommand>,
    output_commands: Sender<OutputCommand>,
    endpoints: Mutex<HashMap<EndpointId, EndpointRecord>>,
    next_id: AtomicU64,
    running: AtomicBool,
    input_thread: Option<ThreadId>,
    output_thread: Option<ThreadId>,
}

impl Shared {
    /// Unregister from both loops and wait for each to close its transport.
    ///
    /// On a loop's own thread (a message handler dropping its endpoint) the
    /// wait is skipped for that loop; it closes the transport on its next pass.
    pub(crate) fn release(&self, id: EndpointId) {
        let Some(record) = self.endpoints.lock().remove(&id) else {
            return;
        };
        let current = thread::current().id();

        if record.has_output {
            let (ack_tx, ack_rx) = bounded(1);
            if self
                .output_commands
                .send(OutputCommand::Unregister(id, ack_tx))
                .is_ok()
                && self.output_thread != Some(current)
            {
                // Disconnected means the loop already stopped and closed it.
                let _ = ack_rx.recv();
            }
        }
        if record.has_input {
            let (ack_tx, ack_rx) = bounded(1);
            if self
                .input_commands
                .send(InputCommand::Unregister(id, ack_tx))
                .is_ok()
                && self.input_thread != Some(current)
            {
                let _ = ack_rx.recv();
            }
        }

        tracing::debug!("Endpoint {} released", id);
    }
}

/// MIDI system entry point.
///
/// Clone is cheap (Arc internally). The activation loops stop when the last
/// clone is dropped or on [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct MidiSystem {
    inner: Arc<MidiSystemInner>,
}

pub(crate) struct MidiSystemInner {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<PeriodicTask>>,
}

impl Drop for MidiSystemInner {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        for mut task in self.tasks.get_mut().drain(..) {
            task.stop();
        }
    }
}

impl MidiSystem {
    pub fn builder() -> MidiSystemBuilder {
        MidiSystemBuilder::default()
    }

    pub fn config(&self) -> MidiConfig {
        self.inner.shared.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.shared.running.load(Ordering::Acquire)
    }

    /// Open endpoints (input, output, or both).
    pub fn endpoint_count(&self) -> usize {
        self.inner.shared.endpoints.lock().len()
    }

    /// Parsing input, backend inferred from the identifier.
    pub fn open_input(&self, identifier: &str) -> Result<MidiEndpoint> {
        self.open(identifier, EndpointOptions::for_identifier(identifier), true, false)
    }

    pub fn open_output(&self, identifier: &str) -> Result<MidiEndpoint> {
        self.open(identifier, EndpointOptions::for_identifier(identifier), false, true)
    }

    /// Parsing input whose messages go to `handler` on the input thread
    /// instead of the endpoint's queue.
    ///
    /// The handler may drop endpoints, including its own; their transports
    /// are then closed on the next input pass rather than before the drop
    /// returns.
    pub fn open_input_with_handler<H: MessageHandler + 'static>(
        &self,
        identifier: &str,
        handler: H,
    ) -> Result<MidiEndpoint> {
        self.ensure_running()?;
        let options = EndpointOptions::for_identifier(identifier);
        let transport = open_transport(identifier, Direction::Input, options.backend)?;
        let (mut decoder, messages) = self.new_decoder();
        decoder.set_handler(handler);
        self.attach(identifier.to_string(), Some(transport), None, Some((decoder, messages)))
    }

    pub fn open(
        &self,
        identifier: &str,
        options: EndpointOptions,
        input: bool,
        output: bool,
    ) -> Result<MidiEndpoint> {
        self.ensure_running()?;
        if !input && !output {
            return Err(Error::InvalidConfig(format!(
                "{}: endpoint needs at least one direction",
                identifier
            )));
        }

        let input_transport = if input {
            Some(open_transport(identifier, Direction::Input, options.backend)?)
        } else {
            None
        };
        let output_transport = if output {
            match open_transport(identifier, Direction::Output, options.backend) {
                Ok(transport) => Some(transport),
                Err(e) => {
                    if let Some(transport) = input_transport {
                        close_transport(transport);
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };

        let parser = (input && options.parse).then(|| self.new_decoder());
        self.attach(identifier.to_string(), input_transport, output_transport, parser)
    }

    /// Attach already-open transports, e.g. a custom or in-memory one.
    pub fn open_with_transport(
        &self,
        input: Option<Box<dyn MidiTransport>>,
        output: Option<Box<dyn MidiTransport>>,
        parse: bool,
    ) -> Result<MidiEndpoint> {
        self.ensure_running()?;
        let identifier = match (&input, &output) {
            (Some(transport), _) | (None, Some(transport)) => transport.identifier().to_string(),
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "endpoint needs at least one transport".into(),
                ))
            }
        };
        let parser = (input.is_some() && parse).then(|| self.new_decoder());
        self.attach(identifier, input, output, parser)
    }

    /// Open every `/dev/midi*` device for both directions, skipping the
    /// ones that fail.
    pub fn open_all_char_devices(&self) -> Vec<MidiEndpoint> {
        list_char_devices()
            .into_iter()
            .filter_map(|device| {
                match self.open(
                    &device.identifier,
                    EndpointOptions::default(),
                    device.supports_input,
                    device.supports_output,
                ) {
                    Ok(endpoint) => Some(endpoint),
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", device.identifier, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Same as dropping the endpoint.
    pub fn close(&self, endpoint: MidiEndpoint) {
        endpoint.close();
    }

    /// Stop both loops, closing every endpoint still registered.
    pub fn shutdown(&self) {
        if !self.inner.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let mut tasks = std::mem::take(&mut *self.inner.tasks.lock());
        for task in tasks.iter_mut() {
            task.stop();
        }
        self.inner.shared.endpoints.lock().clear();
        tracing::info!("MIDI system shut down");
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(Error::SystemStopped)
        }
    }

    fn new_decoder(&self) -> (MidiDecoder, MessageReceiver) {
        MidiDecoder::new(self.inner.shared.config.message_queue_capacity)
    }

    fn attach(
        &self,
        identifier: String,
        input: Option<Box<dyn MidiTransport>>,
        output: Option<Box<dyn MidiTransport>>,
        parser: Option<(MidiDecoder, MessageReceiver)>,
    ) -> Result<MidiEndpoint> {
        let shared = &self.inner.shared;
        let id = EndpointId(shared.next_id.fetch_add(1, Ordering::Relaxed));

        let input_ring = match &input {
            Some(_) => Some(byte_ring(shared.config.input_buffer_size)?),
            None => None,
        };
        let output_ring = match &output {
            Some(_) => Some(byte_ring(shared.config.output_buffer_size)?),
            None => None,
        };

        shared.endpoints.lock().insert(
            id,
            EndpointRecord {
                has_input: input.is_some(),
                has_output: output.is_some(),
            },
        );

        let mut input_half = None;
        if let (Some(transport), Some((producer, consumer))) = (input, input_ring) {
            let (parser, half) = match parser {
                Some((decoder, messages)) => {
                    let stats = decoder.stats_handle();
                    (
                        Some(InputParser::new(consumer, decoder)),
                        MidiInput::Parsed { messages, stats },
                    )
                }
                None => (None, MidiInput::Raw(consumer)),
            };
            let slot = InputSlot::new(id, transport, producer, parser);
            if let Err(SendError(command)) =
                shared.input_commands.send(InputCommand::Register(slot))
            {
                if let InputCommand::Register(slot) = command {
                    slot.close();
                }
                if let Some(transport) = output {
                    close_transport(transport);
                }
                shared.endpoints.lock().remove(&id);
                return Err(Error::SystemStopped);
            }
            input_half = Some(half);
        }

        let mut output_half = None;
        if let (Some(transport), Some((producer, consumer))) = (output, output_ring) {
            let slot = OutputSlot::new(id, transport, consumer);
            if let Err(SendError(command)) =
                shared.output_commands.send(OutputCommand::Register(slot))
            {
                if let OutputCommand::Register(slot) = command {
                    slot.close();
                }
                shared.release(id);
                return Err(Error::SystemStopped);
            }
            output_half = Some(MidiOutput::new(producer));
        }

        tracing::info!(
            "Opened MIDI endpoint {} ({}){}{}",
            id,
            identifier,
            if input_half.is_some() { " in" } else { "" },
            if output_half.is_some() { " out" } else { "" }
        );

        Ok(MidiEndpoint::new(
            id,
            identifier,
            input_half,
            output_half,
            Arc::clone(shared),
        ))
    }
}

/// Close a transport that never reached an activation loop.
fn close_transport(transport: Box<dyn MidiTransport>) {
    let identifier = transport.identifier().to_string();
    if let Err(e) = transport.drain_and_close() {
        tracing::warn!("{}: close failed: {}", identifier, e);
    }
}

impl std::fmt::Debug for MidiSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiSystem")
            .field("running", &self.is_running())
            .field("endpoints", &self.endpoint_count())
            .field("config", &self.inner.shared.config)
            .finish()
    }
}
