//! Byte transports carrying MIDI to and from the outside world.
//!
//! A transport is opened for one direction and owned by the activation loop
//! of that direction until the endpoint is released.

mod char_device;
mod enumerate;
#[cfg(target_os = "linux")]
mod rawmidi;

pub use char_device::CharDevice;
pub use enumerate::{list_char_devices, list_rawmidi_devices, DeviceInfo};
#[cfg(target_os = "linux")]
pub use rawmidi::RawMidi;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

/// Transport backend, chosen per endpoint at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Byte-oriented character device such as `/dev/midi1`.
    #[default]
    CharDevice,
    /// Sound-card rawmidi interface addressed as `hw:CARD,DEVICE[,SUB]`.
    RawMidi,
}

impl Backend {
    /// `hw:` identifiers select rawmidi, anything else is a device path.
    pub fn infer(identifier: &str) -> Self {
        if identifier.starts_with("hw:") {
            Backend::RawMidi
        } else {
            Backend::CharDevice
        }
    }
}

/// One open direction of a MIDI transport.
///
/// `read_nonblocking` must return `ErrorKind::WouldBlock` (or `Ok(0)`) when no
/// data is pending; it is never allowed to wait.
pub trait MidiTransport: Send {
    fn identifier(&self) -> &str;

    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Push written bytes to the wire. Called after every output burst.
    fn drain(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Flush pending writes and release the handle.
    fn drain_and_close(self: Box<Self>) -> io::Result<()>;
}

/// Open `identifier` for one direction with the given backend.
pub fn open_transport(
    identifier: &str,
    direction: Direction,
    backend: Backend,
) -> Result<Box<dyn MidiTransport>> {
    let opened: io::Result<Box<dyn MidiTransport>> = match backend {
        Backend::CharDevice => {
            CharDevice::open(identifier, direction)
                .map(|t| Box::new(t) as Box<dyn MidiTransport>)
        }
        #[cfg(target_os = "linux")]
        Backend::RawMidi => {
            let port = rawmidi::RawMidiPort::parse(identifier)
                .ok_or_else(|| Error::InvalidIdentifier(identifier.to_string()))?;
            RawMidi::open(identifier, port, direction)
                .map(|t| Box::new(t) as Box<dyn MidiTransport>)
        }
        #[cfg(not(target_os = "linux"))]
        Backend::RawMidi => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "rawmidi is only available on Linux",
        )),
    };

    opened.map_err(|source| Error::TransportOpen {
        identifier: identifier.to_string(),
        source,
    })
}
