//! Error types for the MIDI I/O subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot open MIDI transport {identifier}: {source}")]
    TransportOpen {
        identifier: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid MIDI device identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] midibridge_core::Error),

    #[error("Failed to spawn I/O thread: {0}")]
    ThreadSpawn(String),

    #[error("MIDI system is not running")]
    SystemStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
