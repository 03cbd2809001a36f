//! Real-time safe MIDI data path.
//!
//! Pure building blocks shared by the I/O layer and the real-time consumer:
//! channel message model, streaming decoder, encoder, and the lock-free SPSC
//! byte rings and message queue that bridge the two. Nothing here spawns
//! threads or touches the OS.
//!
//! # Example
//!
//! ```
//! use midibridge_core::{MidiDecoder, MidiWrite, MessageType};
//!
//! let mut bytes = Vec::new();
//! bytes.write_note_on(0, 0x40, 0x7F).unwrap();
//!
//! let (mut decoder, mut messages) = MidiDecoder::new(16);
//! decoder.parse(&bytes);
//!
//! let msg = messages.pop().unwrap();
//! assert_eq!(msg.kind, MessageType::NoteOn);
//! assert_eq!(msg.data, [0x40, 0x7F]);
//! ```

pub mod error;
pub use error::{Error, Result};

mod message;
pub use message::{
    ChannelMessage, MessageType, DATA_BYTE_COUNTS, STATUS_BYTES, SYSEX_END, SYSEX_START,
};

pub mod decoder;
pub use decoder::{
    ChannelForwarder, DecoderState, DecoderStats, DecoderStatsHandle, MessageHandler, MidiDecoder,
};

pub mod encoder;
pub use encoder::{make_status_byte, MidiWrite};

pub mod ring;
pub use ring::{byte_ring, ByteConsumer, ByteProducer};

pub mod queue;
pub use queue::{message_queue, message_queue_with_capacity, MessageProducer, MessageReceiver};

mod convert;
