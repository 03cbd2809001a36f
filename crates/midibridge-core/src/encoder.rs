//! Channel message encoding onto a byte sink.

use crate::error::Result;
use crate::message::{ChannelMessage, MessageType};
use crate::ring::ByteProducer;

/// `(status & 0xF0) | (channel & 0x0F)`.
#[inline]
pub fn make_status_byte(status: u8, channel: u8) -> u8 {
    (status & 0xF0) | (channel & 0x0F)
}

/// A sink for encoded MIDI bytes.
///
/// Only `write_bytes` is required. Each message is handed over in a single
/// `write_bytes` call so a bounded sink can accept or reject it whole.
pub trait MidiWrite {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }

    fn write_message1(&mut self, status: u8, channel: u8, data: u8) -> Result<()> {
        self.write_bytes(&[make_status_byte(status, channel), data & 0x7F])
    }

    fn write_message2(&mut self, status: u8, channel: u8, data1: u8, data2: u8) -> Result<()> {
        self.write_bytes(&[
            make_status_byte(status, channel),
            data1 & 0x7F,
            data2 & 0x7F,
        ])
    }

    fn write_note_off(&mut self, channel: u8, note: u8, velocity: u8) -> Result<()> {
        self.write_message2(
            MessageType::NoteOff.status_nibble(),
            channel,
            note,
            velocity,
        )
    }

    fn write_note_on(&mut self, channel: u8, note: u8, velocity: u8) -> Result<()> {
        self.write_message2(
            MessageType::NoteOn.status_nibble(),
            channel,
            note,
            velocity,
        )
    }

    fn write_poly_key_pressure(&mut self, channel: u8, note: u8, pressure: u8) -> Result<()> {
        self.write_message2(
            MessageType::PolyKeyPressure.status_nibble(),
            channel,
            note,
            pressure,
        )
    }

    fn write_control_change(&mut self, channel: u8, controller: u8, value: u8) -> Result<()> {
        self.write_message2(
            MessageType::ControlChange.status_nibble(),
            channel,
            controller,
            value,
        )
    }

    fn write_program_change(&mut self, channel: u8, program: u8) -> Result<()> {
        self.write_message1(MessageType::ProgramChange.status_nibble(), channel, program)
    }

    fn write_channel_pressure(&mut self, channel: u8, pressure: u8) -> Result<()> {
        self.write_message1(
            MessageType::ChannelPressure.status_nibble(),
            channel,
            pressure,
        )
    }

    /// `bend`: unsigned 14-bit value, sent LSB then MSB.
    fn write_pitch_bend(&mut self, channel: u8, bend: u16) -> Result<()> {
        self.write_message2(
            MessageType::PitchBend.status_nibble(),
            channel,
            (bend & 0x7F) as u8,
            ((bend >> 7) & 0x7F) as u8,
        )
    }

    /// [`MessageType::None`] writes nothing.
    fn write_channel_message(&mut self, message: &ChannelMessage) -> Result<()> {
        if message.kind == MessageType::None {
            return Ok(());
        }
        let (bytes, len) = message.to_bytes();
        self.write_bytes(&bytes[..len])
    }
}

impl MidiWrite for ByteProducer {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.try_write_all(bytes)
    }
}

impl MidiWrite for Vec<u8> {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}
