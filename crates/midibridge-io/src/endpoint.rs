//! Caller-side endpoint handles.
//!
//! [`MidiInput`] and [`MidiOutput`] are the real-time halves: they only touch
//! lock-free rings and never block, so they can be moved onto an audio thread
//! with `take_input`/`take_output`. The owning [`MidiEndpoint`] stays on a
//! control thread and releases the transport when dropped.

use crate::io::EndpointId;
use crate::system::Shared;
use midibridge_core::{
    ByteConsumer, ByteProducer, ChannelMessage, DecoderStats, DecoderStatsHandle, MessageReceiver,
    MidiWrite,
};
use std::sync::Arc;

/// Incoming side of an endpoint.
pub enum MidiInput {
    /// Undecoded bytes in arrival order.
    Raw(ByteConsumer),
    /// Decoded channel messages in completion order, plus the counters of
    /// the decoder producing them on the input thread.
    Parsed {
        messages: MessageReceiver,
        stats: DecoderStatsHandle,
    },
}

impl MidiInput {
    pub fn is_parsed(&self) -> bool {
        matches!(self, MidiInput::Parsed { .. })
    }

    /// Next raw byte. Always `None` for a parsing input.
    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        match self {
            MidiInput::Raw(ring) => ring.read(),
            MidiInput::Parsed { .. } => None,
        }
    }

    /// Copy pending raw bytes into `buf`.
    #[inline]
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        match self {
            MidiInput::Raw(ring) => ring.read_into(buf),
            MidiInput::Parsed { .. } => 0,
        }
    }

    /// Next decoded message. Always `None` for a raw input.
    #[inline]
    pub fn next_message(&mut self) -> Option<ChannelMessage> {
        match self {
            MidiInput::Parsed { messages, .. } => messages.pop(),
            MidiInput::Raw(_) => None,
        }
    }

    /// Pending bytes (raw) or messages (parsed).
    #[inline]
    pub fn available(&self) -> usize {
        match self {
            MidiInput::Raw(ring) => ring.len(),
            MidiInput::Parsed { messages, .. } => messages.available(),
        }
    }

    pub fn available_messages(&self) -> usize {
        match self {
            MidiInput::Parsed { messages, .. } => messages.available(),
            MidiInput::Raw(_) => 0,
        }
    }

    /// Messages lost to a full queue since the endpoint opened.
    pub fn dropped_messages(&self) -> u64 {
        match self {
            MidiInput::Parsed { messages, .. } => messages.dropped(),
            MidiInput::Raw(_) => 0,
        }
    }

    /// Decoder counters: discarded bytes, skipped sysex, completed and
    /// dropped messages. `None` for a raw input.
    pub fn decoder_stats(&self) -> Option<DecoderStats> {
        match self {
            MidiInput::Parsed { stats, .. } => Some(stats.snapshot()),
            MidiInput::Raw(_) => None,
        }
    }
}

impl std::fmt::Debug for MidiInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MidiInput::Raw(ring) => f
                .debug_struct("Raw")
                .field("pending", &ring.len())
                .finish(),
            MidiInput::Parsed { messages, stats } => f
                .debug_struct("Parsed")
                .field("pending", &messages.available())
                .field("dropped", &messages.dropped())
                .field("stats", &stats.snapshot())
                .finish(),
        }
    }
}

/// Outgoing side of an endpoint.
///
/// Messages are queued whole or rejected with `OutputBufferFull`; the output
/// loop sends them on its next activation.
pub struct MidiOutput {
    ring: ByteProducer,
}

impl MidiOutput {
    pub(crate) fn new(ring: ByteProducer) -> Self {
        Self { ring }
    }

    pub fn vacant_len(&self) -> usize {
        self.ring.vacant_len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl MidiWrite for MidiOutput {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> midibridge_core::Result<()> {
        self.ring.try_write_all(bytes)
    }
}

impl std::fmt::Debug for MidiOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiOutput")
            .field("vacant", &self.ring.vacant_len())
            .field("capacity", &self.ring.capacity())
            .finish()
    }
}

/// An open MIDI endpoint.
pub struct MidiEndpoint {
    id: EndpointId,
    identifier: String,
    input: Option<MidiInput>,
    output: Option<MidiOutput>,
    shared: Option<Arc<Shared>>,
}

impl MidiEndpoint {
    pub(crate) fn new(
        id: EndpointId,
        identifier: String,
        input: Option<MidiInput>,
        output: Option<MidiOutput>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            id,
            identifier,
            input,
            output,
            shared: Some(shared),
        }
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn input(&mut self) -> Option<&mut MidiInput> {
        self.input.as_mut()
    }

    pub fn output(&mut self) -> Option<&mut MidiOutput> {
        self.output.as_mut()
    }

    /// Move the input half out, e.g. onto the audio thread.
    pub fn take_input(&mut self) -> Option<MidiInput> {
        self.input.take()
    }

    pub fn take_output(&mut self) -> Option<MidiOutput> {
        self.output.take()
    }

    /// Flush pending output, then drain and close the transports.
    ///
    /// Blocks until both activation loops have released the endpoint.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release(self.id);
        }
    }
}

impl Drop for MidiEndpoint {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for MidiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiEndpoint")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midibridge_core::{byte_ring, Error as CoreError, MidiDecoder};

    #[test]
    fn test_raw_input_reads_bytes() {
        let (mut tx, rx) = byte_ring(8).unwrap();
        let mut input = MidiInput::Raw(rx);
        tx.write(&[0x90, 0x40, 0x7F]);

        assert!(!input.is_parsed());
        assert_eq!(input.available(), 3);
        assert_eq!(input.read_byte(), Some(0x90));
        let mut buf = [0u8; 4];
        assert_eq!(input.read_bytes(&mut buf), 2);
        assert_eq!(&buf[..2], &[0x40, 0x7F]);
        assert_eq!(input.next_message(), None);
        assert_eq!(input.dropped_messages(), 0);
        assert_eq!(input.decoder_stats(), None);
    }

    #[test]
    fn test_parsed_input_pops_messages() {
        let (mut decoder, messages) = MidiDecoder::new(1);
        let mut input = MidiInput::Parsed {
            messages,
            stats: decoder.stats_handle(),
        };
        decoder.parse(&[0x90, 60, 1, 0x90, 61, 1]);

        assert!(input.is_parsed());
        assert_eq!(input.available_messages(), 1);
        assert_eq!(input.dropped_messages(), 1);
        assert_eq!(input.read_byte(), None);
        assert_eq!(
            input.next_message(),
            Some(ChannelMessage::note_on(0, 60, 1))
        );
        assert_eq!(input.next_message(), None);

        let stats = input.decoder_stats().unwrap();
        assert_eq!(stats.messages_completed, 2);
        assert_eq!(stats.messages_dropped, 1);
    }

    #[test]
    fn test_output_rejects_whole_message() {
        let (tx, mut rx) = byte_ring(5).unwrap();
        let mut output = MidiOutput::new(tx);
        output.write_note_on(0, 60, 100).unwrap();

        let err = output.write_control_change(0, 1, 2).unwrap_err();
        assert_eq!(
            err,
            CoreError::OutputBufferFull {
                needed: 3,
                available: 2
            }
        );
        assert_eq!(rx.len(), 3);
        assert_eq!(output.vacant_len(), 2);
        assert_eq!(output.capacity(), 5);
        rx.clear();
        output.write_control_change(0, 1, 2).unwrap();
    }
}
