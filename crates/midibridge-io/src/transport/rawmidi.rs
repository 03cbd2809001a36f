use super::{Direction, MidiTransport};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;

// _IOW('W', 0x31, int)
const SNDRV_RAWMIDI_IOCTL_DRAIN: libc::c_ulong = 0x4004_5731;
const SNDRV_RAWMIDI_STREAM_OUTPUT: libc::c_int = 0;
const SNDRV_RAWMIDI_STREAM_INPUT: libc::c_int = 1;

/// Card/device/subdevice triple of a `hw:C,D[,S]` identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawMidiPort {
    pub card: u32,
    pub device: u32,
    pub subdevice: u32,
}

impl RawMidiPort {
    pub fn parse(identifier: &str) -> Option<Self> {
        let rest = identifier.strip_prefix("hw:")?;
        let mut fields = rest.split(',').map(|f| f.trim().parse::<u32>());
        let card = fields.next()?.ok()?;
        let device = fields.next()?.ok()?;
        let subdevice = match fields.next() {
            Some(sub) => sub.ok()?,
            None => 0,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            card,
            device,
            subdevice,
        })
    }

    pub fn node_path(&self) -> String {
        format!("/dev/snd/midiC{}D{}", self.card, self.device)
    }
}

/// Kernel rawmidi node of a sound card.
#[derive(Debug)]
pub struct RawMidi {
    identifier: String,
    file: File,
    direction: Direction,
}

impl RawMidi {
    pub(crate) fn open(
        identifier: &str,
        port: RawMidiPort,
        direction: Direction,
    ) -> io::Result<Self> {
        if port.subdevice != 0 {
            tracing::warn!(
                "Subdevice {} of {} cannot be selected, using the first free one",
                port.subdevice,
                identifier
            );
        }

        let path = port.node_path();
        let mut options = OpenOptions::new();
        match direction {
            Direction::Input => options.read(true).custom_flags(libc::O_NONBLOCK),
            Direction::Output => options.write(true),
        };
        let file = options.open(&path)?;
        tracing::debug!("Opened rawmidi {} ({}) for {:?}", identifier, path, direction);

        Ok(Self {
            identifier: identifier.to_string(),
            file,
            direction,
        })
    }

    fn ioctl_drain(&self) -> io::Result<()> {
        let stream = match self.direction {
            Direction::Input => SNDRV_RAWMIDI_STREAM_INPUT,
            Direction::Output => SNDRV_RAWMIDI_STREAM_OUTPUT,
        };
        // SAFETY: the fd is owned by `self.file` and the argument points to a live c_int.
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                SNDRV_RAWMIDI_IOCTL_DRAIN as _,
                &stream as *const libc::c_int,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl MidiTransport for RawMidi {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn drain(&mut self) -> io::Result<()> {
        if self.direction == Direction::Output {
            self.ioctl_drain()?;
        }
        Ok(())
    }

    fn drain_and_close(self: Box<Self>) -> io::Result<()> {
        self.ioctl_drain()?;
        tracing::debug!("Closed rawmidi {}", self.identifier);
        Ok(())
    }
}
