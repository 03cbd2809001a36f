//! Input activation loop: transport -> input ring -> decoder.

use super::registry::{EndpointId, EndpointRegistry};
use super::scheduler::Activation;
use crate::transport::MidiTransport;
use crossbeam_channel::{Receiver, Sender};
use midibridge_core::{ByteConsumer, ByteProducer, DecoderStats, MidiDecoder};
use std::io;

pub(crate) enum InputCommand {
    Register(InputSlot),
    Unregister(EndpointId, Sender<()>),
}

/// Decoder fed from the endpoint's own input ring.
pub(crate) struct InputParser {
    pub ring: ByteConsumer,
    pub decoder: MidiDecoder,
    reported: DecoderStats,
}

impl InputParser {
    pub fn new(ring: ByteConsumer, decoder: MidiDecoder) -> Self {
        Self {
            ring,
            decoder,
            reported: DecoderStats::default(),
        }
    }

    fn drain(&mut self, id: EndpointId) {
        loop {
            let (head, _) = self.ring.as_slices();
            if head.is_empty() {
                break;
            }
            let consumed = self.decoder.parse(head);
            self.ring.advance(consumed);
        }
        self.report(id);
    }

    fn report(&mut self, id: EndpointId) {
        let stats = self.decoder.stats();
        let last = self.reported;
        if stats == last {
            return;
        }

        if stats.messages_dropped > last.messages_dropped {
            tracing::warn!(
                "Input {}: message queue full, {} messages dropped",
                id,
                stats.messages_dropped - last.messages_dropped
            );
        }
        if stats.bytes_discarded > last.bytes_discarded {
            tracing::debug!(
                "Input {}: {} stray bytes discarded",
                id,
                stats.bytes_discarded - last.bytes_discarded
            );
        }
        if stats.sysex_blocks > last.sysex_blocks || stats.sysex_bytes > last.sysex_bytes {
            tracing::debug!(
                "Input {}: skipped {} sysex blocks ({} bytes)",
                id,
                stats.sysex_blocks - last.sysex_blocks,
                stats.sysex_bytes - last.sysex_bytes
            );
        }
        self.reported = stats;
    }
}

pub(crate) struct InputSlot {
    pub transport: Box<dyn MidiTransport>,
    pub ring: ByteProducer,
    pub parser: Option<InputParser>,
    id: EndpointId,
    stalled: bool,
}

impl InputSlot {
    pub fn new(
        id: EndpointId,
        transport: Box<dyn MidiTransport>,
        ring: ByteProducer,
        parser: Option<InputParser>,
    ) -> Self {
        Self {
            transport,
            ring,
            parser,
            id,
            stalled: false,
        }
    }

    /// Read until the transport has nothing more or a read comes back short
    /// of the ring's free space.
    fn poll(&mut self, scratch: &mut [u8]) {
        loop {
            let wanted = self.ring.vacant_len().min(scratch.len());
            if wanted == 0 {
                if !self.stalled {
                    tracing::warn!(
                        "Input {} ({}): input buffer full, reads paused",
                        self.id,
                        self.transport.identifier()
                    );
                    self.stalled = true;
                }
                break;
            }
            self.stalled = false;

            match self.transport.read_nonblocking(&mut scratch[..wanted]) {
                Ok(0) => break,
                Ok(n) => {
                    self.ring.write(&scratch[..n]);
                    if let Some(parser) = self.parser.as_mut() {
                        parser.drain(self.id);
                    }
                    if n < wanted {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(
                        "Input {} ({}): read failed: {}",
                        self.id,
                        self.transport.identifier(),
                        e
                    );
                    break;
                }
            }
        }
    }

    pub fn close(self) {
        let identifier = self.transport.identifier().to_string();
        if let Err(e) = self.transport.drain_and_close() {
            tracing::warn!("Input {} ({}): close failed: {}", self.id, identifier, e);
        }
    }
}

/// Shared by every input endpoint.
pub(crate) struct InputLoop {
    commands: Receiver<InputCommand>,
    registry: EndpointRegistry<InputSlot>,
    scratch: Vec<u8>,
}

impl InputLoop {
    pub fn new(commands: Receiver<InputCommand>, scratch_size: usize) -> Self {
        Self {
            commands,
            registry: EndpointRegistry::new(),
            scratch: vec![0; scratch_size.max(1)],
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                InputCommand::Register(slot) => {
                    tracing::debug!(
                        "Input {} registered ({})",
                        slot.id,
                        slot.transport.identifier()
                    );
                    if let Some(previous) = self.registry.add(slot.id, slot) {
                        previous.close();
                    }
                }
                InputCommand::Unregister(id, ack) => {
                    if let Some(slot) = self.registry.remove(id) {
                        slot.close();
                        tracing::debug!("Input {} unregistered", id);
                    }
                    let _ = ack.send(());
                }
            }
        }
    }
}

impl Activation for InputLoop {
    fn activate(&mut self) {
        self.apply_commands();
        for (_, slot) in self.registry.iter_mut() {
            slot.poll(&mut self.scratch);
        }
    }

    fn shutdown(&mut self) {
        self.apply_commands();
        let count = self.registry.len();
        for (_, slot) in self.registry.drain() {
            slot.close();
        }
        tracing::debug!("Input loop closed {} endpoints", count);
    }
}
