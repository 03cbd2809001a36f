//! Streaming MIDI byte decoder.
//!
//! Reassembles channel messages from a raw byte stream fed one byte at a time
//! or in bursts. Supported subset:
//!
//! - Channel-voice messages (`0x80..=0xEF` status bytes).
//! - System Exclusive blocks (`0xF0 ... 0xF7`) are skipped as opaque payload.
//! - No running status: a data byte that follows a completed message without a
//!   new status byte is discarded, not reinterpreted.
//! - System common and real-time bytes received while waiting for a status are
//!   discarded. Inside a message every byte is taken as data; malformed input is
//!   absorbed, never reported as an error.
//!
//! `parse` never blocks and never allocates.

use crate::message::{ChannelMessage, MessageType, SYSEX_END, SYSEX_START};
use crate::queue::{message_queue_with_capacity, MessageProducer, MessageReceiver};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives each completed message synchronously from the decode path.
///
/// Implementations must not block. Closures capture whatever context they need.
pub trait MessageHandler: Send {
    fn on_message(&mut self, message: ChannelMessage);
}

impl<F> MessageHandler for F
where
    F: FnMut(ChannelMessage) + Send,
{
    #[inline]
    fn on_message(&mut self, message: ChannelMessage) {
        self(message)
    }
}

/// Forwards completed messages into a crossbeam channel with `try_send`.
///
/// Messages that do not fit, or that find the receiver gone, are counted.
/// Clones share the counter, so keep one to read [`dropped`](Self::dropped)
/// after handing the other to [`MidiDecoder::set_handler`].
#[derive(Clone)]
pub struct ChannelForwarder {
    sender: Sender<ChannelMessage>,
    dropped: Arc<AtomicU64>,
}

impl ChannelForwarder {
    pub fn new(sender: Sender<ChannelMessage>) -> Self {
        Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl MessageHandler for ChannelForwarder {
    fn on_message(&mut self, message: ChannelMessage) {
        match self.sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Observable decoder state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderState {
    WaitingForStatus,
    ReceivingSysex,
    AccumulatingData,
}

/// Snapshot of a decoder's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub messages_completed: u64,
    /// Messages that found the queue full.
    pub messages_dropped: u64,
    /// Stray data bytes and system bytes seen while waiting for a status byte.
    pub bytes_discarded: u64,
    pub sysex_blocks: u64,
    /// Payload bytes skipped inside sysex blocks, terminator excluded.
    pub sysex_bytes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    messages_completed: AtomicU64,
    messages_dropped: AtomicU64,
    bytes_discarded: AtomicU64,
    sysex_blocks: AtomicU64,
    sysex_bytes: AtomicU64,
}

impl Counters {
    // Single writer: the decoder. Relaxed is enough for monotonic counters.
    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DecoderStats {
        DecoderStats {
            messages_completed: self.messages_completed.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            sysex_blocks: self.sysex_blocks.load(Ordering::Relaxed),
            sysex_bytes: self.sysex_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Read-only view of a decoder's counters from another thread.
#[derive(Clone, Debug)]
pub struct DecoderStatsHandle {
    counters: Arc<Counters>,
}

impl DecoderStatsHandle {
    pub fn snapshot(&self) -> DecoderStats {
        self.counters.snapshot()
    }
}

#[derive(Clone, Copy, Debug)]
enum State {
    WaitingForStatus,
    ReceivingSysex,
    AccumulatingData {
        message: ChannelMessage,
        elapsed: usize,
    },
}

pub struct MidiDecoder {
    state: State,
    queue: MessageProducer,
    handler: Option<Box<dyn MessageHandler>>,
    stats: Arc<Counters>,
}

impl MidiDecoder {
    /// Creates a decoder and the receiver for its decoded-message queue.
    pub fn new(queue_capacity: usize) -> (Self, MessageReceiver) {
        let (producer, receiver) = message_queue_with_capacity(queue_capacity);
        (Self::with_queue(producer), receiver)
    }

    pub fn with_queue(queue: MessageProducer) -> Self {
        Self {
            state: State::WaitingForStatus,
            queue,
            handler: None,
            stats: Arc::new(Counters::default()),
        }
    }

    /// Routes completed messages to `handler` instead of the queue.
    pub fn set_handler(&mut self, handler: impl MessageHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Returns completed messages to the queue.
    pub fn clear_handler(&mut self) -> Option<Box<dyn MessageHandler>> {
        self.handler.take()
    }

    #[inline]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn state(&self) -> DecoderState {
        match self.state {
            State::WaitingForStatus => DecoderState::WaitingForStatus,
            State::ReceivingSysex => DecoderState::ReceivingSysex,
            State::AccumulatingData { .. } => DecoderState::AccumulatingData,
        }
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats.snapshot()
    }

    /// Handle that reads this decoder's counters from any thread.
    pub fn stats_handle(&self) -> DecoderStatsHandle {
        DecoderStatsHandle {
            counters: Arc::clone(&self.stats),
        }
    }

    /// Drops any partial message or sysex block.
    pub fn reset(&mut self) {
        self.state = State::WaitingForStatus;
    }

    /// Feeds a burst of bytes. Returns the number consumed, always `bytes.len()`.
    pub fn parse(&mut self, bytes: &[u8]) -> usize {
        for &byte in bytes {
            self.parse_byte(byte);
        }
        bytes.len()
    }

    #[inline]
    pub fn parse_byte(&mut self, byte: u8) {
        let state = self.state;
        self.state = match state {
            State::WaitingForStatus => self.on_waiting(byte),
            State::ReceivingSysex => {
                if byte == SYSEX_END {
                    State::WaitingForStatus
                } else {
                    Counters::bump(&self.stats.sysex_bytes);
                    State::ReceivingSysex
                }
            }
            State::AccumulatingData {
                mut message,
                elapsed,
            } => {
                message.data[elapsed] = byte;
                let elapsed = elapsed + 1;
                if elapsed == message.data_byte_count() {
                    self.complete(message);
                    State::WaitingForStatus
                } else {
                    State::AccumulatingData { message, elapsed }
                }
            }
        };
    }

    fn on_waiting(&mut self, byte: u8) -> State {
        if let Some(kind) = MessageType::from_status(byte) {
            let message = ChannelMessage::new(kind, byte & 0x0F, [0, 0]);
            if kind.data_byte_count() == 0 {
                self.complete(message);
                State::WaitingForStatus
            } else {
                State::AccumulatingData {
                    message,
                    elapsed: 0,
                }
            }
        } else if byte == SYSEX_START {
            Counters::bump(&self.stats.sysex_blocks);
            State::ReceivingSysex
        } else {
            Counters::bump(&self.stats.bytes_discarded);
            State::WaitingForStatus
        }
    }

    fn complete(&mut self, message: ChannelMessage) {
        Counters::bump(&self.stats.messages_completed);
        match self.handler.as_mut() {
            Some(handler) => handler.on_message(message),
            None => {
                if !self.queue.push(message) {
                    Counters::bump(&self.stats.messages_dropped);
                }
            }
        }
    }
}

impl std::fmt::Debug for MidiDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiDecoder")
            .field("state", &self.state)
            .field("has_handler", &self.handler.is_some())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
