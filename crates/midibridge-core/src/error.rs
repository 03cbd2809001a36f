//! Error types for the MIDI data path.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The output ring cannot hold the whole message; nothing was written.
    #[error("Output buffer full: {needed} bytes needed, {available} available")]
    OutputBufferFull { needed: usize, available: usize },

    #[error("Invalid buffer capacity: {0}")]
    InvalidCapacity(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
