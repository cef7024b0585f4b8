// Copyright 2021 CoreOS, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! ATA IDENTIFY DEVICE decoding.  The identity block is the
//! authoritative source for the model and serial number of ATA drives;
//! the feature-set bits matter for forensic triage (HPA and DCO can hide
//! sectors from the OS).

use crate::util::ata_string;

#[cfg(target_os = "linux")]
use {
    anyhow::{Context, Result},
    log::debug,
    std::os::unix::io::AsRawFd,
};

/// Size of the IDENTIFY DEVICE data block.
pub const IDENTIFY_SIZE: usize = 512;

/// Decoded IDENTIFY DEVICE fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtaDeviceConfiguration {
    pub serial_number: String,
    pub model: String,
    /// ATA general configuration removable-media bit.
    pub removable: bool,
    /// Device type bits of the general configuration word.
    pub device_type: u8,
    pub smart: bool,
    pub security_mode: bool,
    pub security_enabled: bool,
    pub host_protected_area: bool,
    pub device_configuration_overlay: bool,
    pub media_serial: bool,
}

fn identify_word(data: &[u8; IDENTIFY_SIZE], word: usize) -> u16 {
    u16::from_le_bytes([data[word * 2], data[word * 2 + 1]])
}

/// Decode an IDENTIFY DEVICE block.
pub fn parse_identify(data: &[u8; IDENTIFY_SIZE]) -> AtaDeviceConfiguration {
    let config = identify_word(data, 0);
    let command_set_1 = identify_word(data, 82);
    let command_set_2 = identify_word(data, 83);
    let extension = identify_word(data, 84);
    let security_status = identify_word(data, 128);

    AtaDeviceConfiguration {
        // words 10-19 and 27-46, character-swapped within each word
        serial_number: ata_string(&data[20..40]),
        model: ata_string(&data[54..94]),
        removable: config & 0x0080 != 0,
        device_type: ((config >> 8) & 0x1f) as u8,
        smart: command_set_1 & 0x0001 != 0,
        security_mode: command_set_1 & 0x0002 != 0,
        security_enabled: security_status & 0x0002 != 0,
        host_protected_area: command_set_1 & 0x0400 != 0,
        device_configuration_overlay: command_set_2 & 0x0800 != 0,
        media_serial: extension & 0x0004 != 0,
    }
}

// create unsafe ioctl wrappers
#[cfg(target_os = "linux")]
#[allow(clippy::missing_safety_doc)]
mod ioctl {
    use super::IDENTIFY_SIZE;
    use nix::ioctl_read_bad;
    ioctl_read_bad!(hdio_get_identity, 0x030d, [u8; IDENTIFY_SIZE]);
}

/// Fetch and decode the drive's identity via HDIO_GET_IDENTITY.
#[cfg(target_os = "linux")]
pub fn get_device_configuration(device: &impl AsRawFd) -> Result<AtaDeviceConfiguration> {
    let mut data = [0u8; IDENTIFY_SIZE];
    unsafe { ioctl::hdio_get_identity(device.as_raw_fd(), &mut data) }
        .context("unable to query device for: HDIO_GET_IDENTITY")?;
    let configuration = parse_identify(&data);
    debug!(
        "ATA feature sets: SMART {} security {} (enabled {}) HPA {} DCO {} media serial {}",
        configuration.smart,
        configuration.security_mode,
        configuration.security_enabled,
        configuration.host_protected_area,
        configuration.device_configuration_overlay,
        configuration.media_serial,
    );
    Ok(configuration)
}
