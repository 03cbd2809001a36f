//! Output activation loop: output ring -> transport.

use super::registry::{EndpointId, EndpointRegistry};
use super::scheduler::Activation;
use crate::transport::MidiTransport;
use crossbeam_channel::{Receiver, Sender};
use midibridge_core::ByteConsumer;
use std::io;
use std::thread;
use std::time::Duration;

pub(crate) enum OutputCommand {
    Register(OutputSlot),
    Unregister(EndpointId, Sender<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flush {
    /// Ring is empty.
    Done,
    /// Transport took part of the burst or would block; retry next activation.
    Pending,
    Failed,
}

pub(crate) struct OutputSlot {
    pub transport: Box<dyn MidiTransport>,
    pub ring: ByteConsumer,
    id: EndpointId,
}

impl OutputSlot {
    pub fn new(id: EndpointId, transport: Box<dyn MidiTransport>, ring: ByteConsumer) -> Self {
        Self {
            transport,
            ring,
            id,
        }
    }

    /// Write everything queued, advancing the ring only by what the
    /// transport accepted.
    fn flush(&mut self) -> Flush {
        let mut written = 0;
        let result = loop {
            let (head, _) = self.ring.as_slices();
            if head.is_empty() {
                break Flush::Done;
            }
            let burst = head.len();
            match self.transport.write(head) {
                Ok(0) => break Flush::Pending,
                Ok(n) => {
                    self.ring.advance(n);
                    written += n;
                    if n < burst {
                        break Flush::Pending;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Flush::Pending,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(
                        "Output {} ({}): write failed: {}",
                        self.id,
                        self.transport.identifier(),
                        e
                    );
                    break Flush::Failed;
                }
            }
        };

        if written > 0 {
            if let Err(e) = self.transport.drain() {
                tracing::warn!(
                    "Output {} ({}): drain failed: {}",
                    self.id,
                    self.transport.identifier(),
                    e
                );
            }
        }
        result
    }

    pub fn close(mut self) {
        if !self.ring.is_empty() && self.flush() != Flush::Done {
            tracing::warn!(
                "Output {} ({}): {} bytes unsent at close",
                self.id,
                self.transport.identifier(),
                self.ring.len()
            );
        }
        let identifier = self.transport.identifier().to_string();
        if let Err(e) = self.transport.drain_and_close() {
            tracing::warn!("Output {} ({}): close failed: {}", self.id, identifier, e);
        }
    }
}

/// Shared by every output endpoint.
pub(crate) struct OutputLoop {
    commands: Receiver<OutputCommand>,
    registry: EndpointRegistry<OutputSlot>,
    error_backoff: Duration,
}

impl OutputLoop {
    pub fn new(commands: Receiver<OutputCommand>, error_backoff: Duration) -> Self {
        Self {
            commands,
            registry: EndpointRegistry::new(),
            error_backoff,
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                OutputCommand::Register(slot) => {
                    tracing::debug!(
                        "Output {} registered ({})",
                        slot.id,
                        slot.transport.identifier()
                    );
                    if let Some(previous) = self.registry.add(slot.id, slot) {
                        previous.close();
                    }
                }
                OutputCommand::Unregister(id, ack) => {
                    // Removed first so no further activation touches it.
                    if let Some(slot) = self.registry.remove(id) {
                        slot.close();
                        tracing::debug!("Output {} unregistered", id);
                    }
                    let _ = ack.send(());
                }
            }
        }
    }
}

impl Activation for OutputLoop {
    fn activate(&mut self) {
        self.apply_commands();
        let mut failed = false;
        for (_, slot) in self.registry.iter_mut() {
            failed |= slot.flush() == Flush::Failed;
        }
        if failed && !self.error_backoff.is_zero() {
            thread::sleep(self.error_backoff);
        }
    }

    fn shutdown(&mut self) {
        self.apply_commands();
        let count = self.registry.len();
        for (_, slot) in self.registry.drain() {
            slot.close();
        }
        tracing::debug!("Output loop closed {} endpoints", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};
    use midibridge_core::{byte_ring, ByteProducer, MidiWrite};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Default)]
    struct Wire {
        bytes: Vec<u8>,
        drains: usize,
        closed: usize,
    }

    /// Accepts at most `limit` bytes per write; scripted failures first.
    struct Sink {
        wire: Arc<Mutex<Wire>>,
        limit: usize,
        failures: VecDeque<io::ErrorKind>,
    }

    impl MidiTransport for Sink {
        fn identifier(&self) -> &str {
            "sink"
        }

        fn read_nonblocking(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(kind) = self.failures.pop_front() {
                return Err(kind.into());
            }
            let n = buf.len().min(self.limit);
            self.wire.lock().bytes.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn drain(&mut self) -> io::Result<()> {
            self.wire.lock().drains += 1;
            Ok(())
        }

        fn drain_and_close(self: Box<Self>) -> io::Result<()> {
            self.wire.lock().closed += 1;
            Ok(())
        }
    }

    fn slot(
        id: u64,
        capacity: usize,
        limit: usize,
        failures: Vec<io::ErrorKind>,
    ) -> (OutputSlot, ByteProducer, Arc<Mutex<Wire>>) {
        let wire = Arc::new(Mutex::new(Wire::default()));
        let sink = Sink {
            wire: Arc::clone(&wire),
            limit,
            failures: failures.into(),
        };
        let (tx, rx) = byte_ring(capacity).unwrap();
        (
            OutputSlot::new(EndpointId(id), Box::new(sink), rx),
            tx,
            wire,
        )
    }

    #[test]
    fn test_flush_writes_in_order() {
        let (mut slot, mut tx, wire) = slot(1, 16, usize::MAX, vec![]);
        tx.write_note_on(0, 60, 100).unwrap();
        tx.write_program_change(1, 7).unwrap();

        assert_eq!(slot.flush(), Flush::Done);
        assert_eq!(wire.lock().bytes, vec![0x90, 60, 100, 0xC1, 7]);
        assert_eq!(wire.lock().drains, 1);
        assert!(slot.ring.is_empty());

        // Nothing queued, nothing drained.
        assert_eq!(slot.flush(), Flush::Done);
        assert_eq!(wire.lock().drains, 1);
    }

    #[test]
    fn test_partial_write_advances_by_accepted() {
        let (mut slot, mut tx, wire) = slot(1, 16, 2, vec![]);
        tx.write_note_on(0, 60, 100).unwrap();

        assert_eq!(slot.flush(), Flush::Pending);
        assert_eq!(slot.ring.len(), 1);
        assert_eq!(slot.flush(), Flush::Done);
        assert_eq!(wire.lock().bytes, vec![0x90, 60, 100]);
    }

    #[test]
    fn test_wrapped_ring_is_fully_written() {
        let (mut slot, mut tx, wire) = slot(1, 4, usize::MAX, vec![]);
        tx.write_note_on(0, 1, 2).unwrap();
        assert_eq!(slot.flush(), Flush::Done);
        // Next message straddles the end of storage.
        tx.write_note_off(0, 3, 4).unwrap();
        assert_eq!(slot.flush(), Flush::Done);
        assert_eq!(wire.lock().bytes, vec![0x90, 1, 2, 0x80, 3, 4]);
    }

    #[test]
    fn test_error_keeps_bytes_for_retry() {
        let (mut slot, mut tx, wire) = slot(1, 16, usize::MAX, vec![io::ErrorKind::Other]);
        tx.write_control_change(0, 7, 100).unwrap();

        assert_eq!(slot.flush(), Flush::Failed);
        assert_eq!(slot.ring.len(), 3);
        assert_eq!(slot.flush(), Flush::Done);
        assert_eq!(wire.lock().bytes, vec![0xB0, 7, 100]);
    }

    #[test]
    fn test_would_block_is_pending() {
        let (mut slot, mut tx, _) = slot(1, 16, usize::MAX, vec![io::ErrorKind::WouldBlock]);
        tx.write_byte(0xF8).unwrap();
        assert_eq!(slot.flush(), Flush::Pending);
        assert_eq!(slot.ring.len(), 1);
    }

    #[test]
    fn test_unregister_flushes_then_closes() {
        let (cmd_tx, cmd_rx) = unbounded();
        let mut output_loop = OutputLoop::new(cmd_rx, Duration::ZERO);
        let (slot, mut tx, wire) = slot(9, 16, usize::MAX, vec![]);
        cmd_tx.send(OutputCommand::Register(slot)).unwrap();

        tx.write_note_on(2, 64, 1).unwrap();
        let (ack_tx, ack_rx) = bounded(1);
        cmd_tx
            .send(OutputCommand::Unregister(EndpointId(9), ack_tx))
            .unwrap();
        output_loop.activate();

        ack_rx.recv().unwrap();
        let wire = wire.lock();
        assert_eq!(wire.bytes, vec![0x92, 64, 1]);
        assert_eq!(wire.closed, 1);
        assert!(output_loop.registry.is_empty());
    }

    #[test]
    fn test_shutdown_closes_each_once() {
        let (cmd_tx, cmd_rx) = unbounded();
        let mut output_loop = OutputLoop::new(cmd_rx, Duration::ZERO);
        let mut wires = Vec::new();
        for id in 0..3 {
            let (slot, _tx, wire) = slot(id, 8, usize::MAX, vec![]);
            cmd_tx.send(OutputCommand::Register(slot)).unwrap();
            wires.push(wire);
        }
        output_loop.activate();
        output_loop.shutdown();
        output_loop.shutdown();

        for wire in wires {
            assert_eq!(wire.lock().closed, 1);
        }
    }
}
