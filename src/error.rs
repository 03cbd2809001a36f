//! Centralized error type for the midibridge umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] midibridge_core::Error),

    #[cfg(feature = "io")]
    #[error("MIDI I/O: {0}")]
    Io(#[from] midibridge_io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_converts() {
        fn fails() -> Result<()> {
            let _ring = midibridge_core::byte_ring(0)?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Error::Core(_))));
    }

    #[cfg(feature = "io")]
    #[test]
    fn test_io_error_display() {
        let err: Error = midibridge_io::Error::SystemStopped.into();
        assert_eq!(err.to_string(), "MIDI I/O: MIDI system is not running");
    }
}
