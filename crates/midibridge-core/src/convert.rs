//! Conversions to and from `midly` live events.

use crate::message::{ChannelMessage, MessageType};
use midly::live::LiveEvent;
use midly::num::{u14, u4, u7};
use midly::{MidiMessage, PitchBend};

impl ChannelMessage {
    /// `None` for [`MessageType::None`].
    pub fn to_live_event(&self) -> Option<LiveEvent<'static>> {
        let [d0, d1] = self.data;
        let message = match self.kind {
            MessageType::NoteOff => MidiMessage::NoteOff {
                key: u7::new(d0),
                vel: u7::new(d1),
            },
            MessageType::NoteOn => MidiMessage::NoteOn {
                key: u7::new(d0),
                vel: u7::new(d1),
            },
            MessageType::PolyKeyPressure => MidiMessage::Aftertouch {
                key: u7::new(d0),
                vel: u7::new(d1),
            },
            MessageType::ControlChange => MidiMessage::Controller {
                controller: u7::new(d0),
                value: u7::new(d1),
            },
            MessageType::ProgramChange => MidiMessage::ProgramChange {
                program: u7::new(d0),
            },
            MessageType::ChannelPressure => MidiMessage::ChannelAftertouch { vel: u7::new(d0) },
            MessageType::PitchBend => MidiMessage::PitchBend {
                bend: PitchBend(u14::new(self.pitch_bend_value().unwrap_or(0x2000))),
            },
            MessageType::None => return None,
        };
        Some(LiveEvent::Midi {
            channel: u4::new(self.channel),
            message,
        })
    }

    /// `None` for system common and real-time events.
    pub fn from_live_event(event: &LiveEvent<'_>) -> Option<Self> {
        let LiveEvent::Midi { channel, message } = event else {
            return None;
        };
        let channel = channel.as_int();
        let converted = match *message {
            MidiMessage::NoteOff { key, vel } => {
                ChannelMessage::note_off(channel, key.as_int(), vel.as_int())
            }
            MidiMessage::NoteOn { key, vel } => {
                ChannelMessage::note_on(channel, key.as_int(), vel.as_int())
            }
            MidiMessage::Aftertouch { key, vel } => {
                ChannelMessage::poly_key_pressure(channel, key.as_int(), vel.as_int())
            }
            MidiMessage::Controller { controller, value } => {
                ChannelMessage::control_change(channel, controller.as_int(), value.as_int())
            }
            MidiMessage::ProgramChange { program } => {
                ChannelMessage::program_change(channel, program.as_int())
            }
            MidiMessage::ChannelAftertouch { vel } => {
                ChannelMessage::channel_pressure(channel, vel.as_int())
            }
            MidiMessage::PitchBend { bend } => ChannelMessage::pitch_bend(channel, bend.0.as_int()),
        };
        Some(converted)
    }
}
