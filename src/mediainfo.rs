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

//! Device identity aggregation.  Combines the SCSI, ATA and optical
//! probes into one record.  Probes are best effort: a drive that rejects
//! an individual query still yields whatever the other probes found.

use anyhow::Result;
use std::fmt;

use crate::device::DeviceFile;
use crate::track::{SectorRange, Track};

#[cfg(target_os = "linux")]
use {
    crate::{ata, optical, scsi},
    log::debug,
};

/// SCSI peripheral device type for CD/DVD drives.
pub const DEVICE_TYPE_OPTICAL: u8 = 0x05;

/// Bus the device is attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusType {
    #[default]
    Unknown,
    Ata,
    FireWire,
    Scsi,
    Usb,
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BusType::Unknown => "Unknown",
            BusType::Ata => "ATA/ATAPI",
            BusType::FireWire => "FireWire (IEEE1394)",
            BusType::Scsi => "SCSI",
            BusType::Usb => "USB",
        };
        f.write_str(name)
    }
}

/// Coarse media classification derived from the device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Fixed,
    Removable,
    Optical,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaType::Fixed => "Fixed",
            MediaType::Removable => "Removable",
            MediaType::Optical => "Optical",
        };
        f.write_str(name)
    }
}

/// Canonical identity record for an opened device.
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    pub bus_type: BusType,
    /// SCSI peripheral device type, 5 bits.
    pub device_type: u8,
    pub removable: bool,
    pub vendor: String,
    pub model: String,
    pub serial_number: String,
    pub sessions: Vec<SectorRange>,
    pub lead_outs: Vec<SectorRange>,
    pub tracks: Vec<Track>,
}

impl MediaInfo {
    pub fn media_type(&self) -> MediaType {
        if self.device_type == DEVICE_TYPE_OPTICAL {
            MediaType::Optical
        } else if self.removable {
            MediaType::Removable
        } else {
            MediaType::Fixed
        }
    }
}

/// Probe the identity of a device.  `total_sectors`, when known, sizes
/// the lead-out range of optical media.
///
/// The bus type probe is the prerequisite for everything after it and
/// propagates failure; the remaining probes degrade to empty fields.
#[cfg(target_os = "linux")]
pub(crate) fn probe(device: &DeviceFile, total_sectors: Option<u64>) -> Result<MediaInfo> {
    let mut info = MediaInfo {
        bus_type: scsi::get_bus_type(device)?,
        ..Default::default()
    };

    let mut response = [0u8; 255];
    match scsi::inquiry(device, false, 0x00, &mut response) {
        Ok(count) => {
            if let Some(inquiry) = scsi::parse_inquiry(&response[..count]) {
                info.device_type = inquiry.device_type;
                info.removable = inquiry.removable;
                info.vendor = inquiry.vendor;
                info.model = inquiry.model;
            }
        }
        Err(err) => debug!("INQUIRY failed: {:#}", err),
    }

    let mut response = [0u8; 255];
    match scsi::inquiry(device, true, 0x80, &mut response) {
        Ok(count) => {
            if let Some(serial_number) = scsi::parse_inquiry_unit_serial(&response[..count]) {
                info.serial_number = serial_number;
            }
        }
        Err(err) => debug!("INQUIRY unit serial failed: {:#}", err),
    }

    // the IDENTIFY data is authoritative for ATA drives
    if info.bus_type == BusType::Ata {
        match ata::get_device_configuration(device) {
            Ok(configuration) => {
                info.serial_number = configuration.serial_number;
                info.model = configuration.model;
                info.removable = configuration.removable;
                info.device_type = configuration.device_type;
            }
            Err(err) => debug!("ATA identify failed: {:#}", err),
        }
    }

    if info.device_type == DEVICE_TYPE_OPTICAL {
        let toc = optical::read_table_of_contents(device).or_else(|err| {
            debug!("kernel TOC read failed, trying SCSI: {:#}", err);
            optical::read_table_of_contents_scsi(device)
        });
        match toc {
            Ok(mut toc) => {
                size_lead_outs(&mut toc.lead_outs, total_sectors);
                info.sessions = toc.sessions;
                info.lead_outs = toc.lead_outs;
                info.tracks = toc.tracks;
            }
            Err(err) => debug!("unable to read table of contents: {:#}", err),
        }
    }

    // presence-only diagnostics
    if let Err(err) = scsi::get_identifier(device) {
        debug!("no SCSI identifier: {:#}", err);
    }
    match scsi::get_pci_bus_address(device) {
        Ok(Some(address)) => debug!("host adapter PCI address: {}", address),
        Ok(None) => (),
        Err(err) => debug!("no PCI bus address: {:#}", err),
    }

    Ok(info)
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn probe(_device: &DeviceFile, _total_sectors: Option<u64>) -> Result<MediaInfo> {
    Ok(MediaInfo::default())
}

/// The TOC reports only where the lead-out starts; when the media extent
/// is known, run the lead-out to the last sector.
#[cfg(target_os = "linux")]
fn size_lead_outs(lead_outs: &mut [SectorRange], total_sectors: Option<u64>) {
    if let Some(total_sectors) = total_sectors {
        for lead_out in lead_outs {
            if total_sectors > lead_out.start_sector() {
                if let Ok(sized) = SectorRange::new(
                    lead_out.start_sector(),
                    total_sectors - lead_out.start_sector(),
                ) {
                    *lead_out = sized;
                }
            }
        }
    }
}
