use super::{Direction, MidiTransport};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;

/// Generic byte device (`/dev/midi*`, a FIFO, a serial line).
///
/// Inputs are opened non-blocking so reads return `WouldBlock` when idle.
/// Outputs are opened blocking; a write completes once the driver has
/// accepted the bytes.
#[derive(Debug)]
pub struct CharDevice {
    identifier: String,
    file: File,
    direction: Direction,
}

impl CharDevice {
    pub fn open(path: &str, direction: Direction) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        match direction {
            Direction::Input => options
                .read(true)
                .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY),
            Direction::Output => options.write(true).custom_flags(libc::O_NOCTTY),
        };
        let file = options.open(path)?;
        tracing::debug!("Opened MIDI device {} for {:?}", path, direction);

        Ok(Self {
            identifier: path.to_string(),
            file,
            direction,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl MidiTransport for CharDevice {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn drain_and_close(mut self: Box<Self>) -> io::Result<()> {
        if self.direction == Direction::Output {
            self.file.flush()?;
        }
        tracing::debug!("Closed MIDI device {}", self.identifier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("midibridge-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_regular_file_round_trip() {
        let path = temp_path("chardev");
        let path_str = path.to_str().unwrap();
        std::fs::write(&path, []).unwrap();

        let mut out = CharDevice::open(path_str, Direction::Output).unwrap();
        assert_eq!(out.write(&[0x90, 0x40, 0x7F]).unwrap(), 3);
        Box::new(out).drain_and_close().unwrap();

        let mut input = CharDevice::open(path_str, Direction::Input).unwrap();
        assert_eq!(input.identifier(), path_str);
        let mut buf = [0u8; 8];
        assert_eq!(input.read_nonblocking(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[0x90, 0x40, 0x7F]);
        // End of file reads as nothing pending.
        assert_eq!(input.read_nonblocking(&mut buf).unwrap(), 0);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_open_missing_path() {
        let err = CharDevice::open("/nonexistent/midibridge", Direction::Input).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
