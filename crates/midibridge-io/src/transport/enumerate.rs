//! Device discovery.

use super::Backend;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub identifier: String,
    pub backend: Backend,
    pub supports_input: bool,
    pub supports_output: bool,
}

/// `/dev/midi*` character devices, sorted by path.
pub fn list_char_devices() -> Vec<DeviceInfo> {
    list_char_devices_in(Path::new("/dev"))
}

/// `/dev/snd/midiC*D*` nodes as `hw:C,D` identifiers, sorted by card then device.
pub fn list_rawmidi_devices() -> Vec<DeviceInfo> {
    list_rawmidi_devices_in(Path::new("/dev/snd"))
}

pub(crate) fn list_char_devices_in(dir: &Path) -> Vec<DeviceInfo> {
    let mut devices: Vec<DeviceInfo> = dir_entries(dir)
        .into_iter()
        .filter(|name| name.starts_with("midi"))
        .map(|name| {
            let path = dir.join(&name);
            DeviceInfo {
                identifier: path.to_string_lossy().into_owned(),
                backend: Backend::CharDevice,
                supports_input: true,
                supports_output: true,
            }
        })
        .collect();
    devices.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    tracing::debug!("Found {} MIDI character devices", devices.len());
    devices
}

pub(crate) fn list_rawmidi_devices_in(dir: &Path) -> Vec<DeviceInfo> {
    let mut ports: Vec<(u32, u32)> = dir_entries(dir)
        .iter()
        .filter_map(|name| parse_rawmidi_node(name))
        .collect();
    ports.sort_unstable();
    ports
        .into_iter()
        .map(|(card, device)| DeviceInfo {
            identifier: format!("hw:{},{}", card, device),
            backend: Backend::RawMidi,
            supports_input: true,
            supports_output: true,
        })
        .collect()
}

fn dir_entries(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect(),
        Err(e) => {
            tracing::debug!("Cannot scan {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}

/// `midiC1D0` -> `(1, 0)`.
fn parse_rawmidi_node(name: &str) -> Option<(u32, u32)> {
    let rest = name.strip_prefix("midiC")?;
    let (card, device) = rest.split_once('D')?;
    Some((card.parse().ok()?, device.parse().ok()?))
}
