//! MIDI transport I/O for midibridge.
//!
//! Opens character-device and rawmidi transports, runs the shared input and
//! output activation loops, and hands the caller non-blocking endpoint
//! halves backed by `midibridge-core` rings.

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::{EndpointOptions, MidiConfig};

pub mod transport;
pub use transport::{
    list_char_devices, list_rawmidi_devices, open_transport, Backend, DeviceInfo, Direction,
    MidiTransport,
};

pub mod io;
pub use io::{Activation, EndpointId, EndpointRegistry, PeriodicTask};

mod endpoint;
pub use endpoint::{MidiEndpoint, MidiInput, MidiOutput};

mod system;
pub use system::{MidiSystem, MidiSystemBuilder};

pub use midibridge_core::{ChannelMessage, MessageHandler, MessageType, MidiWrite};
