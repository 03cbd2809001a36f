//! Test helpers and fixtures for midibridge integration tests
//!
//! Provides a virtual MIDI cable (output transport wired to an input
//! transport in memory), deterministic byte-stream generators, and polling
//! helpers for the background activation loops.

#![allow(dead_code)]

use midibridge::{ChannelMessage, MessageType, MidiSystem, MidiTransport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll interval for deterministic testing
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on how long a test waits for the loops.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Create a system without raising thread priority, for CI environments.
pub fn test_system() -> MidiSystem {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    MidiSystem::builder()
        .poll_interval(TEST_POLL_INTERVAL)
        .thread_priority(None)
        .build()
        .expect("Failed to create test MIDI system")
}

/// Poll `condition` until it holds or [`TEST_TIMEOUT`] elapses.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < TEST_TIMEOUT {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

// =============================================================================
// Virtual cable
// =============================================================================

#[derive(Default)]
pub struct CableState {
    pub in_flight: VecDeque<u8>,
    pub bytes_sent: usize,
    pub closed_ends: usize,
}

/// Both ends of an in-memory MIDI cable.
#[derive(Clone, Default)]
pub struct Cable {
    pub state: Arc<Mutex<CableState>>,
}

impl Cable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The receiving end, to be opened as an input.
    pub fn input_end(&self, name: &str) -> Box<dyn MidiTransport> {
        Box::new(CableEnd {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    /// The sending end, to be opened as an output.
    pub fn output_end(&self, name: &str) -> Box<dyn MidiTransport> {
        self.input_end(name)
    }

    /// Inject bytes as if a device had sent them.
    pub fn inject(&self, bytes: &[u8]) {
        self.state.lock().in_flight.extend(bytes.iter().copied());
    }

    pub fn closed_ends(&self) -> usize {
        self.state.lock().closed_ends
    }
}

struct CableEnd {
    name: String,
    state: Arc<Mutex<CableState>>,
}

impl MidiTransport for CableEnd {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.in_flight.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(state.in_flight.len());
        for (slot, byte) in buf.iter_mut().zip(state.in_flight.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.in_flight.extend(buf.iter().copied());
        state.bytes_sent += buf.len();
        Ok(buf.len())
    }

    fn drain_and_close(self: Box<Self>) -> io::Result<()> {
        self.state.lock().closed_ends += 1;
        Ok(())
    }
}

// =============================================================================
// Deterministic message generators
// =============================================================================

/// One message of every type on every channel, in a fixed order.
pub fn every_message_kind() -> Vec<ChannelMessage> {
    let mut messages = Vec::new();
    for channel in 0..16u8 {
        let v = channel * 7;
        messages.push(ChannelMessage::note_off(channel, v, 64));
        messages.push(ChannelMessage::note_on(channel, v, 100));
        messages.push(ChannelMessage::poly_key_pressure(channel, v, 33));
        messages.push(ChannelMessage::control_change(channel, v, 127));
        messages.push(ChannelMessage::program_change(channel, v));
        messages.push(ChannelMessage::channel_pressure(channel, v));
        messages.push(ChannelMessage::pitch_bend(channel, u16::from(v) << 7));
    }
    messages
}

/// Encode messages back to back into a byte vector.
pub fn encode_all(messages: &[ChannelMessage]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for message in messages {
        let (buf, len) = message.to_bytes();
        bytes.extend_from_slice(&buf[..len]);
    }
    bytes
}

/// Count of messages of `kind`.
pub fn count_kind(messages: &[ChannelMessage], kind: MessageType) -> usize {
    messages.iter().filter(|m| m.kind == kind).count()
}
