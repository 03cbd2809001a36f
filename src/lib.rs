//! # midibridge - Real-time safe MIDI I/O
//!
//! Turns a raw MIDI byte stream from a character device or sound-card
//! rawmidi port into channel messages, and channel messages back into
//! bytes, without ever blocking the audio thread.
//!
//! ## Architecture
//!
//! midibridge is an umbrella crate that coordinates:
//! - **midibridge-core** - Decoder state machine, encoder, lock-free byte rings and message queue
//! - **midibridge-io** - Transports, background activation loops, `MidiSystem`
//!
//! ## Quick Start
//!
//! ```no_run
//! use midibridge::prelude::*;
//!
//! let midi = MidiSystem::builder().poll_interval(std::time::Duration::from_millis(1)).build()?;
//! let mut endpoint = midi.open("/dev/midi1", EndpointOptions::default(), true, true)?;
//!
//! // Audio thread
//! let mut input = endpoint.take_input().unwrap();
//! let mut output = endpoint.take_output().unwrap();
//! while let Some(message) = input.next_message() {
//!     if message.is_note_on() {
//!         output.write_channel_message(&message)?;
//!     }
//! }
//! # Ok::<(), midibridge::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Core plus I/O
//! - `io` - Transports and background loops (`midibridge-io`)

/// Re-export of midibridge-core for direct access
pub use midibridge_core as core;

pub use midibridge_core::{
    byte_ring, make_status_byte, message_queue, message_queue_with_capacity, ByteConsumer,
    ByteProducer, ChannelForwarder, ChannelMessage, DecoderState, DecoderStats, MessageHandler,
    MessageProducer, MessageReceiver, MessageType, MidiDecoder, MidiWrite,
};

#[cfg(feature = "io")]
pub use midibridge_io as io;

#[cfg(feature = "io")]
pub use midibridge_io::{
    Backend, DeviceInfo, Direction, EndpointId, EndpointOptions, MidiConfig, MidiEndpoint,
    MidiInput, MidiOutput, MidiSystem, MidiSystemBuilder, MidiTransport,
};

mod error;
pub use error::{Error, Result};

/// Everything needed for typical use.
pub mod prelude {
    pub use crate::{ChannelMessage, MessageType, MidiDecoder, MidiWrite};
    pub use crate::{Error, Result};

    #[cfg(feature = "io")]
    pub use crate::{EndpointOptions, MidiConfig, MidiEndpoint, MidiSystem};
}
