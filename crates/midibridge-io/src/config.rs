//! MIDI system configuration.

use crate::error::{Error, Result};
use crate::transport::Backend;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Buffer sizes and polling parameters shared by every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Input byte ring capacity per endpoint (default: 1000)
    pub input_buffer_size: usize,
    /// Output byte ring capacity per endpoint (default: 1000)
    pub output_buffer_size: usize,
    /// Decoded message queue capacity per parsing endpoint (default: 128)
    pub message_queue_capacity: usize,
    /// Sleep between activations of each I/O loop (default: 1ms)
    #[serde(with = "duration_micros")]
    pub poll_interval: Duration,
    /// Pause after a failed transport write (default: 10ms)
    #[serde(with = "duration_micros")]
    pub error_backoff: Duration,
    /// Cross-platform priority 0-99 for the I/O threads; `None` keeps the OS default (default: 50)
    pub thread_priority: Option<u8>,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_buffer_size: 1000,
            output_buffer_size: 1000,
            message_queue_capacity: 128,
            poll_interval: Duration::from_millis(1),
            error_backoff: Duration::from_millis(10),
            thread_priority: Some(50),
        }
    }
}

impl MidiConfig {
    /// Config with the same capacity for both byte rings.
    pub fn with_buffer_size(bytes: usize) -> Self {
        Self {
            input_buffer_size: bytes,
            output_buffer_size: bytes,
            ..Default::default()
        }
    }

    pub fn with_poll_interval(interval: Duration) -> Self {
        Self {
            poll_interval: interval,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_buffer_size == 0 {
            return Err(Error::InvalidConfig("input_buffer_size must be > 0".into()));
        }
        if self.output_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "output_buffer_size must be > 0".into(),
            ));
        }
        if self.message_queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "message_queue_capacity must be > 0".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll_interval must be > 0".into()));
        }
        if matches!(self.thread_priority, Some(p) if p > 99) {
            return Err(Error::InvalidConfig(
                "thread_priority must be in 0..=99".into(),
            ));
        }
        Ok(())
    }
}

/// Per-endpoint choices made at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointOptions {
    pub backend: Backend,
    /// Decode input into channel messages instead of exposing raw bytes.
    pub parse: bool,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            backend: Backend::CharDevice,
            parse: true,
        }
    }
}

impl EndpointOptions {
    /// Backend picked from the identifier's form, parsing enabled.
    pub fn for_identifier(identifier: &str) -> Self {
        Self {
            backend: Backend::infer(identifier),
            parse: true,
        }
    }

    pub fn raw(mut self) -> Self {
        self.parse = false;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}

mod duration_micros {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_micros() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MidiConfig::default();
        assert_eq!(config.input_buffer_size, 1000);
        assert_eq!(config.output_buffer_size, 1000);
        assert_eq!(config.message_queue_capacity, 128);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.error_backoff, Duration::from_millis(10));
        assert_eq!(config.thread_priority, Some(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_buffer_size() {
        let config = MidiConfig::with_buffer_size(64);
        assert_eq!(config.input_buffer_size, 64);
        assert_eq!(config.output_buffer_size, 64);
        assert_eq!(config.message_queue_capacity, 128);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = MidiConfig::default();
        config.input_buffer_size = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = MidiConfig::with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = MidiConfig {
            thread_priority: Some(120),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: MidiConfig =
            serde_json::from_str(r#"{ "input_buffer_size": 256, "poll_interval": 500 }"#).unwrap();
        assert_eq!(config.input_buffer_size, 256);
        assert_eq!(config.poll_interval, Duration::from_micros(500));
        assert_eq!(config.output_buffer_size, 1000);
        assert_eq!(config.thread_priority, Some(50));
    }

    #[test]
    fn test_endpoint_options() {
        let options = EndpointOptions::for_identifier("hw:1,0");
        assert_eq!(options.backend, Backend::RawMidi);
        assert!(options.parse);

        let options = EndpointOptions::default().raw();
        assert_eq!(options.backend, Backend::CharDevice);
        assert!(!options.parse);

        let options: EndpointOptions =
            serde_json::from_str(r#"{ "backend": "RawMidi" }"#).unwrap();
        assert_eq!(
            options,
            EndpointOptions::default().backend(Backend::RawMidi)
        );
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = MidiConfig {
            thread_priority: None,
            ..MidiConfig::with_buffer_size(32)
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: MidiConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
