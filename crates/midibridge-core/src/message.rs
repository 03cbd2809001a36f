//! MIDI 1.0 channel message model.
//!
//! Only the seven channel-voice message kinds are represented. The number of
//! data bytes a message carries is a property of its kind, never stored.

use std::fmt;

/// Status nibbles of the channel-voice messages, indexed by [`MessageType`].
pub const STATUS_BYTES: [u8; 8] = [0x80, 0x90, 0xA0, 0xB0, 0xC0, 0xD0, 0xE0, 0x00];

/// Data bytes required by each [`MessageType`], same indexing as [`STATUS_BYTES`].
pub const DATA_BYTE_COUNTS: [usize; 8] = [2, 2, 2, 2, 1, 1, 2, 0];

/// System Exclusive begin.
pub const SYSEX_START: u8 = 0xF0;

/// End of Exclusive.
pub const SYSEX_END: u8 = 0xF7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MessageType {
    NoteOff = 0,
    NoteOn = 1,
    PolyKeyPressure = 2,
    ControlChange = 3,
    ProgramChange = 4,
    ChannelPressure = 5,
    PitchBend = 6,
    #[default]
    None = 7,
}

impl MessageType {
    const ALL: [MessageType; 8] = [
        MessageType::NoteOff,
        MessageType::NoteOn,
        MessageType::PolyKeyPressure,
        MessageType::ControlChange,
        MessageType::ProgramChange,
        MessageType::ChannelPressure,
        MessageType::PitchBend,
        MessageType::None,
    ];

    /// Looks up the kind of a channel status byte (`0x80..=0xEF`) by its high nibble.
    ///
    /// Returns `None` for data bytes and system bytes (`0xF0..=0xFF`).
    #[inline]
    pub fn from_status(status: u8) -> Option<MessageType> {
        if !(0x80..0xF0).contains(&status) {
            return None;
        }
        let nibble = status & 0xF0;
        STATUS_BYTES
            .iter()
            .position(|&s| s == nibble)
            .map(|index| Self::ALL[index])
    }

    /// High nibble of the status byte (`0x00` for [`MessageType::None`]).
    #[inline]
    pub fn status_nibble(self) -> u8 {
        STATUS_BYTES[self as usize]
    }

    #[inline]
    pub fn data_byte_count(self) -> usize {
        DATA_BYTE_COUNTS[self as usize]
    }
}

/// A decoded or to-be-encoded channel message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ChannelMessage {
    pub kind: MessageType,
    /// 4-bit channel (0-15).
    pub channel: u8,
    /// Data bytes; only the first `kind.data_byte_count()` are meaningful.
    pub data: [u8; 2],
}

impl ChannelMessage {
    #[inline]
    pub fn new(kind: MessageType, channel: u8, data: [u8; 2]) -> Self {
        Self {
            kind,
            channel: channel & 0x0F,
            data,
        }
    }

    #[inline]
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(MessageType::NoteOff, channel, [note, velocity])
    }

    #[inline]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(MessageType::NoteOn, channel, [note, velocity])
    }

    #[inline]
    pub fn poly_key_pressure(channel: u8, note: u8, pressure: u8) -> Self {
        Self::new(MessageType::PolyKeyPressure, channel, [note, pressure])
    }

    #[inline]
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::new(MessageType::ControlChange, channel, [controller, value])
    }

    #[inline]
    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::new(MessageType::ProgramChange, channel, [program, 0])
    }

    #[inline]
    pub fn channel_pressure(channel: u8, pressure: u8) -> Self {
        Self::new(MessageType::ChannelPressure, channel, [pressure, 0])
    }

    /// `bend`: unsigned 14-bit value, 8192 is centre.
    #[inline]
    pub fn pitch_bend(channel: u8, bend: u16) -> Self {
        Self::new(
            MessageType::PitchBend,
            channel,
            [(bend & 0x7F) as u8, ((bend >> 7) & 0x7F) as u8],
        )
    }

    #[inline]
    pub fn data_byte_count(&self) -> usize {
        self.kind.data_byte_count()
    }

    /// The meaningful data bytes.
    #[inline]
    pub fn data_bytes(&self) -> &[u8] {
        &self.data[..self.data_byte_count()]
    }

    #[inline]
    pub fn status_byte(&self) -> u8 {
        crate::encoder::make_status_byte(self.kind.status_nibble(), self.channel)
    }

    /// Wire bytes: status followed by the data bytes masked to 7 bits.
    ///
    /// Returns the byte array and the number of valid bytes in it.
    pub fn to_bytes(&self) -> ([u8; 3], usize) {
        let mut bytes = [self.status_byte(), 0, 0];
        let count = self.data_byte_count();
        for (dst, src) in bytes[1..=count].iter_mut().zip(self.data.iter()) {
            *dst = src & 0x7F;
        }
        (bytes, count + 1)
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.kind == MessageType::NoteOn
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.kind == MessageType::NoteOff
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.kind {
            MessageType::NoteOff | MessageType::NoteOn | MessageType::PolyKeyPressure => {
                Some(self.data[0])
            }
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        match self.kind {
            MessageType::NoteOff | MessageType::NoteOn => Some(self.data[1]),
            _ => None,
        }
    }

    #[inline]
    pub fn controller(&self) -> Option<u8> {
        (self.kind == MessageType::ControlChange).then_some(self.data[0])
    }

    #[inline]
    pub fn value(&self) -> Option<u8> {
        (self.kind == MessageType::ControlChange).then_some(self.data[1])
    }

    #[inline]
    pub fn program(&self) -> Option<u8> {
        (self.kind == MessageType::ProgramChange).then_some(self.data[0])
    }

    /// Key pressure for poly pressure, channel pressure otherwise.
    #[inline]
    pub fn pressure(&self) -> Option<u8> {
        match self.kind {
            MessageType::PolyKeyPressure => Some(self.data[1]),
            MessageType::ChannelPressure => Some(self.data[0]),
            _ => None,
        }
    }

    /// Unsigned 14-bit bend (LSB first on the wire).
    #[inline]
    pub fn pitch_bend_value(&self) -> Option<u16> {
        (self.kind == MessageType::PitchBend)
            .then(|| (self.data[0] as u16 & 0x7F) | ((self.data[1] as u16 & 0x7F) << 7))
    }
}

impl fmt::Display for ChannelMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ch {}", self.kind, self.channel)?;
        for byte in self.data_bytes() {
            write!(f, " {:#04x}", byte)?;
        }
        Ok(())
    }
}
