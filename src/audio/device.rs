//! Audio input device enumeration

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::errors::RecorderError;

/// Audio input device information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    /// Device identifier (enumeration index as a string)
    pub id: String,
    /// Human-readable device name
    pub name: String,
    /// Maximum input channel count
    pub channels: u16,
    /// Default sample rate in Hz
    pub default_sample_rate: u32,
    /// Whether this is the system default input device
    pub is_default: bool,
}

/// Classify the audio driver a device belongs to from its name.
///
/// Used only to filter device listings; recording itself is driver-agnostic.
pub fn detect_driver(device_name: &str) -> &'static str {
    let name = device_name.to_lowercase();
    if name.contains("pulse") || name.contains("pipewire") {
        "pulse"
    } else if name.contains("alsa") || name.contains("hw:") || name.contains("plughw") {
        "alsa"
    } else if name.contains("jack") {
        "jack"
    } else if name.contains("usb") {
        "usb"
    } else {
        "default"
    }
}

/// List all available audio input devices, optionally filtered by driver
/// kind (`pulse`, `alsa`, `jack`, `usb`, `default`).
pub fn list_input_devices(
    driver_filter: Option<&str>,
) -> Result<Vec<AudioDeviceInfo>, RecorderError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| RecorderError::Device(format!("failed to enumerate input devices: {e}")))?
        .enumerate()
        .filter_map(|(index, device)| {
            let name = device.name().ok()?;
            let config = device.default_input_config().ok()?;

            if let Some(filter) = driver_filter {
                if detect_driver(&name) != filter.to_lowercase() {
                    return None;
                }
            }

            Some(AudioDeviceInfo {
                id: index.to_string(),
                name: name.clone(),
                channels: config.channels(),
                default_sample_rate: config.sample_rate().0,
                is_default: default_name.as_ref() == Some(&name),
            })
        })
        .collect();

    Ok(devices)
}

/// Find an input device by enumeration id or name.
///
/// `None` or `"default"` selects the system default input.
pub fn find_input_device(selector: Option<&str>) -> Result<cpal::Device, RecorderError> {
    let host = cpal::default_host();

    let selector = match selector {
        None | Some("") | Some("default") => {
            return host
                .default_input_device()
                .ok_or_else(|| RecorderError::Device("no default input device".into()));
        }
        Some(s) => s,
    };

    let mut devices = host
        .input_devices()
        .map_err(|e| RecorderError::Device(format!("failed to enumerate input devices: {e}")))?;

    devices
        .find(|d| {
            d.name()
                .map(|name| name == selector)
                .unwrap_or(false)
        })
        .or_else(|| {
            // Fall back to index-based lookup
            let index: usize = selector.parse().ok()?;
            host.input_devices().ok()?.nth(index)
        })
        .ok_or_else(|| RecorderError::Device(format!("input device not found: {selector}")))
}
