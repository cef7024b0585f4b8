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

//! SCSI command framing over the kernel's generic SCSI pass-through.
//! CDB construction and response parsing are pure and portable; only the
//! SG_IO issue path is Linux-specific.
//!
//! Multi-byte fields are big-endian per SPC/MMC.

use anyhow::{bail, Result};
use bytes::Buf;
use thiserror::Error;

use crate::util::trim_byte_string;

#[cfg(target_os = "linux")]
use {
    crate::mediainfo::BusType,
    anyhow::Context,
    log::debug,
    std::os::raw::{c_int, c_uchar, c_uint, c_ushort, c_void},
    std::os::unix::io::AsRawFd,
};

// SCSI operation codes
pub const SCSI_OPCODE_INQUIRY: u8 = 0x12;
pub const SCSI_OPCODE_READ_TOC: u8 = 0x43;
pub const SCSI_OPCODE_READ_DISC_INFORMATION: u8 = 0x51;
pub const SCSI_OPCODE_READ_TRACK_INFORMATION: u8 = 0x52;

// Sense keys
pub const SENSE_KEY_ILLEGAL_REQUEST: u8 = 0x05;

// Additional sense codes
pub const ASC_INVALID_COMMAND_OPERATION_CODE: u8 = 0x20;

/// Sense key descriptions per SPC.
const SENSE_KEY_DESCRIPTIONS: [&str; 16] = [
    "No Sense",
    "Recovered Error",
    "Not Ready",
    "Medium Error",
    "Hardware Error",
    "Illegal Request",
    "Unit Attention",
    "Data Protect",
    "Blank Check",
    "Vendor specific",
    "Copy Aborted",
    "Aborted Command",
    "Equal",
    "Volume Overflow",
    "Miscompare",
    "Completed",
];

/// Out-of-band failure description returned alongside a SCSI command.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseError {
    pub key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl std::fmt::Display for SenseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let description = SENSE_KEY_DESCRIPTIONS
            .get(self.key as usize)
            .copied()
            .unwrap_or("Invalid sense key");
        write!(
            f,
            "{} (key 0x{:02x}, ASC 0x{:02x}, ASCQ 0x{:02x})",
            description, self.key, self.asc, self.ascq
        )
    }
}

/// Decode a sense buffer in fixed or descriptor format.
pub(crate) fn parse_sense(sense: &[u8]) -> Option<SenseError> {
    if sense.is_empty() {
        return None;
    }
    match sense[0] & 0x7f {
        // fixed format
        0x70 | 0x71 if sense.len() >= 14 => Some(SenseError {
            key: sense[2] & 0x0f,
            asc: sense[12],
            ascq: sense[13],
        }),
        // descriptor format
        0x72 | 0x73 if sense.len() >= 4 => Some(SenseError {
            key: sense[1] & 0x0f,
            asc: sense[2],
            ascq: sense[3],
        }),
        _ => None,
    }
}

// CDB construction.  Alloc lengths are capped to what the 16-bit length
// fields can carry.

pub(crate) fn inquiry_cdb(evpd: bool, page_code: u8, allocation_length: u16) -> [u8; 6] {
    [
        SCSI_OPCODE_INQUIRY,
        evpd as u8,
        page_code,
        (allocation_length >> 8) as u8,
        allocation_length as u8,
        0,
    ]
}

pub(crate) fn read_toc_cdb(
    format: u8,
    time: bool,
    starting_track: u8,
    allocation_length: u16,
) -> [u8; 10] {
    let mut cdb = [0u8; 10];
    cdb[0] = SCSI_OPCODE_READ_TOC;
    cdb[1] = (time as u8) << 1;
    // ATAPI places the format in the low nibble of byte 2, SCSI-3 drives
    // expect it in the high bits of byte 9; set both for compatibility
    cdb[2] = format & 0x0f;
    cdb[6] = starting_track;
    cdb[7] = (allocation_length >> 8) as u8;
    cdb[8] = allocation_length as u8;
    cdb[9] = (format & 0x03) << 6;
    cdb
}

pub(crate) fn read_disc_information_cdb(allocation_length: u16) -> [u8; 10] {
    let mut cdb = [0u8; 10];
    cdb[0] = SCSI_OPCODE_READ_DISC_INFORMATION;
    cdb[7] = (allocation_length >> 8) as u8;
    cdb[8] = allocation_length as u8;
    cdb
}

pub(crate) fn read_track_information_cdb(track: u32, allocation_length: u16) -> [u8; 10] {
    let mut cdb = [0u8; 10];
    cdb[0] = SCSI_OPCODE_READ_TRACK_INFORMATION;
    // address type 01: interpret the address as a track number
    cdb[1] = 0x01;
    cdb[2..6].copy_from_slice(&track.to_be_bytes());
    cdb[7] = (allocation_length >> 8) as u8;
    cdb[8] = allocation_length as u8;
    cdb
}

// Response parsing.

/// Identity fields from the standard INQUIRY page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InquiryData {
    pub device_type: u8,
    pub removable: bool,
    pub vendor: String,
    pub model: String,
}

/// Parse a standard INQUIRY response.  Short responses yield what they
/// carry; fewer than 5 bytes is not a response at all.
pub(crate) fn parse_inquiry(data: &[u8]) -> Option<InquiryData> {
    if data.len() < 5 {
        return None;
    }
    let mut inquiry = InquiryData {
        device_type: data[0] & 0x1f,
        removable: data[1] & 0x80 != 0,
        vendor: String::new(),
        model: String::new(),
    };
    if data.len() >= 16 {
        inquiry.vendor = trim_byte_string(&data[8..16]);
    }
    if data.len() >= 32 {
        inquiry.model = trim_byte_string(&data[16..32]);
    }
    Some(inquiry)
}

/// Parse the unit serial number VPD page (0x80).
pub(crate) fn parse_inquiry_unit_serial(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[1] != 0x80 {
        return None;
    }
    let length = (data[3] as usize).min(data.len() - 4);
    if length == 0 {
        return None;
    }
    Some(trim_byte_string(&data[4..4 + length]))
}

/// One track descriptor from a format 0 READ TOC response.  The lead-out
/// is reported as track 0xaa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TocEntry {
    pub track_number: u8,
    pub control: u8,
    pub address: u32,
}

pub(crate) const TOC_LEAD_OUT_TRACK: u8 = 0xaa;

/// Parse a format 0 READ TOC response into (first track, last track,
/// descriptors).
pub(crate) fn parse_toc(data: &[u8]) -> Result<(u8, u8, Vec<TocEntry>)> {
    if data.len() < 4 {
        bail!("TOC response of {} bytes is too short", data.len());
    }
    let mut buf = data;
    let data_length = buf.get_u16() as usize;
    let first_track = buf.get_u8();
    let last_track = buf.get_u8();

    let mut remaining = data_length.saturating_sub(2).min(buf.remaining());
    let mut entries = Vec::new();
    while remaining >= 8 {
        buf.advance(1);
        let adr_control = buf.get_u8();
        let track_number = buf.get_u8();
        buf.advance(1);
        let address = buf.get_u32();
        entries.push(TocEntry {
            track_number,
            control: adr_control & 0x0f,
            address,
        });
        remaining -= 8;
    }
    Ok((first_track, last_track, entries))
}

/// Summary fields from a READ DISC INFORMATION response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DiscInformation {
    pub disc_status: u8,
    pub erasable: bool,
    pub first_track: u8,
    pub number_of_sessions: u16,
}

pub(crate) fn parse_disc_information(data: &[u8]) -> Result<DiscInformation> {
    if data.len() < 10 {
        bail!(
            "disc information response of {} bytes is too short",
            data.len()
        );
    }
    Ok(DiscInformation {
        disc_status: data[2] & 0x03,
        erasable: data[2] & 0x10 != 0,
        first_track: data[3],
        number_of_sessions: data[4] as u16 | ((data[9] as u16) << 8),
    })
}

/// Fields from a READ TRACK INFORMATION response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrackInformation {
    pub track_number: u16,
    pub session_number: u16,
    pub track_mode: u8,
    pub data_mode: u8,
    pub start_address: u32,
    pub size: u32,
}

pub(crate) fn parse_track_information(data: &[u8]) -> Result<TrackInformation> {
    if data.len() < 28 {
        bail!(
            "track information response of {} bytes is too short",
            data.len()
        );
    }
    let mut buf = data;
    buf.advance(2);
    let track_lsb = buf.get_u8() as u16;
    let session_lsb = buf.get_u8() as u16;
    buf.advance(1);
    let track_mode = buf.get_u8() & 0x0f;
    let data_mode = buf.get_u8() & 0x0f;
    buf.advance(1);
    let start_address = buf.get_u32();
    // next writable address, free blocks, fixed packet size
    buf.advance(12);
    let size = buf.get_u32();
    // track/session number MSBs arrived with MMC-3 longer responses
    let (track_msb, session_msb) = if data.len() >= 34 {
        ((data[32] as u16) << 8, (data[33] as u16) << 8)
    } else {
        (0, 0)
    };
    Ok(TrackInformation {
        track_number: track_msb | track_lsb,
        session_number: session_msb | session_lsb,
        track_mode,
        data_mode,
        start_address,
        size,
    })
}

// SG_IO pass-through.

/// Default SG command timeout in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT: u32 = 1000;

#[cfg(target_os = "linux")]
const SENSE_BUFFER_SIZE: usize = 32;

#[cfg(target_os = "linux")]
const SG_DXFER_FROM_DEV: c_int = -3;

/// sg_io_hdr from <scsi/sg.h>.
#[cfg(target_os = "linux")]
#[repr(C)]
struct SgIoHdr {
    interface_id: c_int,
    dxfer_direction: c_int,
    cmd_len: c_uchar,
    mx_sb_len: c_uchar,
    iovec_count: c_ushort,
    dxfer_len: c_uint,
    dxferp: *mut c_void,
    cmdp: *mut c_uchar,
    sbp: *mut c_uchar,
    timeout: c_uint,
    flags: c_uint,
    pack_id: c_int,
    usr_ptr: *mut c_void,
    status: c_uchar,
    masked_status: c_uchar,
    msg_status: c_uchar,
    sb_len_wr: c_uchar,
    host_status: c_ushort,
    driver_status: c_ushort,
    resid: c_int,
    duration: c_uint,
    info: c_uint,
}

/// sg_scsi_id from <scsi/sg.h>.
#[cfg(target_os = "linux")]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScsiIdentifier {
    pub host_number: c_int,
    pub channel: c_int,
    pub scsi_id: c_int,
    pub lun: c_int,
    pub scsi_type: c_int,
    pub host_commands_per_lun: c_ushort,
    pub device_queue_depth: c_ushort,
    unused: [c_int; 2],
}

// create unsafe ioctl wrappers
#[cfg(target_os = "linux")]
#[allow(clippy::missing_safety_doc)]
mod ioctl {
    use super::{ScsiIdentifier, SgIoHdr};
    use nix::{ioctl_read_bad, ioctl_readwrite_bad};
    ioctl_readwrite_bad!(sg_io, 0x2285, SgIoHdr);
    ioctl_read_bad!(sg_get_scsi_id, 0x2276, ScsiIdentifier);
    ioctl_readwrite_bad!(scsi_ioctl_probe_host, 0x5385, [u8; 128]);
    ioctl_read_bad!(scsi_ioctl_get_pci, 0x5387, [u8; 20]);
}

/// Issue a data-in CDB with the given timeout in milliseconds and return
/// the number of response bytes.  A device that rejects the command with
/// illegal request/invalid operation code is reported as "unsupported"
/// by returning 0.
#[cfg(target_os = "linux")]
pub fn issue_read_command(
    device: &impl AsRawFd,
    cdb: &[u8],
    data: &mut [u8],
    timeout: u32,
) -> Result<usize> {
    let mut cdb = cdb.to_vec();
    let mut sense = [0u8; SENSE_BUFFER_SIZE];
    // zeroed: the header has reserved fields the kernel expects cleared
    let mut header: SgIoHdr = unsafe { std::mem::zeroed() };
    header.interface_id = 'S' as c_int;
    header.dxfer_direction = SG_DXFER_FROM_DEV;
    header.cmd_len = cdb.len() as c_uchar;
    header.mx_sb_len = SENSE_BUFFER_SIZE as c_uchar;
    header.dxfer_len = data.len() as c_uint;
    header.dxferp = data.as_mut_ptr() as *mut c_void;
    header.cmdp = cdb.as_mut_ptr();
    header.sbp = sense.as_mut_ptr();
    header.timeout = timeout;

    unsafe { ioctl::sg_io(device.as_raw_fd(), &mut header) }
        .context("unable to query device for: SG_IO")?;

    if header.status != 0 || header.host_status != 0 || header.driver_status != 0 {
        if let Some(sense) = parse_sense(&sense[..header.sb_len_wr as usize]) {
            if sense.key == SENSE_KEY_ILLEGAL_REQUEST
                && sense.asc == ASC_INVALID_COMMAND_OPERATION_CODE
            {
                debug!("device does not support command 0x{:02x}", cdb[0]);
                return Ok(0);
            }
            return Err(anyhow::Error::new(sense)
                .context(format!("SCSI command 0x{:02x} failed", cdb[0])));
        }
        bail!(
            "SCSI command 0x{:02x} failed with status 0x{:02x}, host status 0x{:02x}, driver status 0x{:02x}",
            cdb[0],
            header.status,
            header.host_status,
            header.driver_status
        );
    }
    Ok(data.len().saturating_sub(header.resid.max(0) as usize))
}

#[cfg(target_os = "linux")]
fn allocation_length(data: &[u8]) -> u16 {
    data.len().min(u16::MAX as usize) as u16
}

/// INQUIRY (0x12).  `evpd` selects vital product data page `page_code`.
#[cfg(target_os = "linux")]
pub fn inquiry(
    device: &impl AsRawFd,
    evpd: bool,
    page_code: u8,
    data: &mut [u8],
) -> Result<usize> {
    let cdb = inquiry_cdb(evpd, page_code, allocation_length(data));
    issue_read_command(device, &cdb, data, DEFAULT_COMMAND_TIMEOUT)
}

/// READ TOC (0x43) with the requested format.
#[cfg(target_os = "linux")]
pub fn read_toc(
    device: &impl AsRawFd,
    format: u8,
    time: bool,
    starting_track: u8,
    data: &mut [u8],
) -> Result<usize> {
    let cdb = read_toc_cdb(format, time, starting_track, allocation_length(data));
    issue_read_command(device, &cdb, data, DEFAULT_COMMAND_TIMEOUT)
}

/// READ DISC INFORMATION (0x51).
#[cfg(target_os = "linux")]
pub fn read_disc_information(device: &impl AsRawFd, data: &mut [u8]) -> Result<usize> {
    let cdb = read_disc_information_cdb(allocation_length(data));
    issue_read_command(device, &cdb, data, DEFAULT_COMMAND_TIMEOUT)
}

/// READ TRACK INFORMATION (0x52) for a track number.
#[cfg(target_os = "linux")]
pub fn read_track_information(
    device: &impl AsRawFd,
    track: u32,
    data: &mut [u8],
) -> Result<usize> {
    let cdb = read_track_information_cdb(track, allocation_length(data));
    issue_read_command(device, &cdb, data, DEFAULT_COMMAND_TIMEOUT)
}

/// Ask the sg driver for the device's SCSI identifier.  Mainly useful as
/// a presence probe: succeeding at all means the device answers on the
/// generic SCSI interface.
#[cfg(target_os = "linux")]
pub fn get_identifier(device: &impl AsRawFd) -> Result<ScsiIdentifier> {
    let mut identifier = ScsiIdentifier::default();
    unsafe { ioctl::sg_get_scsi_id(device.as_raw_fd(), &mut identifier) }
        .context("unable to query device for: SG_GET_SCSI_ID")?;
    debug!(
        "SCSI identifier: host {} channel {} id {} lun {}",
        identifier.host_number, identifier.channel, identifier.scsi_id, identifier.lun
    );
    Ok(identifier)
}

/// Host adapter description, if the kernel reports one.
#[cfg(target_os = "linux")]
fn probe_host(device: &impl AsRawFd) -> Result<Option<String>> {
    let mut buffer = [0u8; 128];
    // the ioctl reads the usable buffer length from the first bytes
    let buffer_len = buffer.len() as u32;
    buffer[..4].copy_from_slice(&buffer_len.to_ne_bytes());
    let present = unsafe { ioctl::scsi_ioctl_probe_host(device.as_raw_fd(), &mut buffer) }
        .context("unable to query device for: SCSI_IOCTL_PROBE_HOST")?;
    if present == 0 {
        return Ok(None);
    }
    let end = buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len());
    Ok(Some(String::from_utf8_lossy(&buffer[..end]).into_owned()))
}

/// Classify the bus from the host adapter description.  The kernel does
/// not report this directly, so match on the adapter names the relevant
/// drivers register.
#[cfg(target_os = "linux")]
pub fn get_bus_type(device: &impl AsRawFd) -> Result<BusType> {
    let description = match probe_host(device)? {
        Some(description) => description.to_lowercase(),
        None => return Ok(BusType::Unknown),
    };
    debug!("host adapter: {}", description);
    let bus_type = if description.contains("usb") {
        BusType::Usb
    } else if description.contains("1394") || description.contains("sbp") {
        BusType::FireWire
    } else if description.contains("ata") || description.contains("ide") {
        BusType::Ata
    } else {
        BusType::Scsi
    };
    Ok(bus_type)
}

/// PCI slot name of the host adapter, for diagnostics.
#[cfg(target_os = "linux")]
pub fn get_pci_bus_address(device: &impl AsRawFd) -> Result<Option<String>> {
    let mut buffer = [0u8; 20];
    match unsafe { ioctl::scsi_ioctl_get_pci(device.as_raw_fd(), &mut buffer) } {
        Ok(_) => {
            let end = buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len());
            Ok(Some(String::from_utf8_lossy(&buffer[..end]).into_owned()))
        }
        // non-PCI host adapters report ENXIO
        Err(nix::errno::Errno::ENXIO) => Ok(None),
        Err(err) => Err(err).context("unable to query device for: SCSI_IOCTL_GET_PCI"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inquiry_cdb_layout() {
        assert_eq!(inquiry_cdb(false, 0, 255), [0x12, 0, 0, 0, 255, 0]);
        assert_eq!(inquiry_cdb(true, 0x80, 255), [0x12, 1, 0x80, 0, 255, 0]);
        assert_eq!(
            inquiry_cdb(false, 0, 0x1234),
            [0x12, 0, 0, 0x12, 0x34, 0]
        );
    }

    #[test]
    fn read_toc_cdb_layout() {
        assert_eq!(
            read_toc_cdb(0, false, 0, 1024),
            [0x43, 0, 0, 0, 0, 0, 0, 0x04, 0x00, 0]
        );
        assert_eq!(
            read_toc_cdb(2, true, 1, 0x0804),
            [0x43, 0x02, 0x02, 0, 0, 0, 1, 0x08, 0x04, 0x80]
        );
        // format nibble is masked
        assert_eq!(read_toc_cdb(0x12, false, 0, 4)[2], 0x02);
    }

    #[test]
    fn read_disc_information_cdb_layout() {
        assert_eq!(
            read_disc_information_cdb(34),
            [0x51, 0, 0, 0, 0, 0, 0, 0, 34, 0]
        );
    }

    #[test]
    fn read_track_information_cdb_layout() {
        assert_eq!(
            read_track_information_cdb(0x00010203, 48),
            [0x52, 0x01, 0x00, 0x01, 0x02, 0x03, 0, 0, 48, 0]
        );
    }

    #[test]
    fn sense_parsing() {
        let mut sense = [0u8; 18];
        sense[0] = 0x70;
        sense[2] = 0x05;
        sense[12] = 0x20;
        assert_eq!(
            parse_sense(&sense),
            Some(SenseError {
                key: 0x05,
                asc: 0x20,
                ascq: 0x00
            })
        );

        // descriptor format
        let sense = [0x72u8, 0x03, 0x11, 0x01];
        assert_eq!(
            parse_sense(&sense),
            Some(SenseError {
                key: 0x03,
                asc: 0x11,
                ascq: 0x01
            })
        );

        assert_eq!(parse_sense(&[]), None);
        assert_eq!(parse_sense(&[0x70, 0, 0]), None);
    }

    #[test]
    fn sense_display() {
        let sense = SenseError {
            key: 0x03,
            asc: 0x11,
            ascq: 0x00,
        };
        assert_eq!(
            sense.to_string(),
            "Medium Error (key 0x03, ASC 0x11, ASCQ 0x00)"
        );
    }

    #[test]
    fn inquiry_parsing() {
        let mut data = [0u8; 36];
        data[0] = 0x05; // CD/DVD
        data[1] = 0x80; // removable
        data[8..16].copy_from_slice(b"PLEXTOR ");
        data[16..32].copy_from_slice(b"DVDR   PX-760A  ");
        let inquiry = parse_inquiry(&data).unwrap();
        assert_eq!(inquiry.device_type, 5);
        assert!(inquiry.removable);
        assert_eq!(inquiry.vendor, "PLEXTOR");
        assert_eq!(inquiry.model, "DVDR   PX-760A");

        // short response carries only the header fields
        let inquiry = parse_inquiry(&data[..8]).unwrap();
        assert_eq!(inquiry.device_type, 5);
        assert_eq!(inquiry.vendor, "");

        assert_eq!(parse_inquiry(&data[..4]), None);
    }

    #[test]
    fn inquiry_unit_serial_parsing() {
        let mut data = [0u8; 16];
        data[1] = 0x80;
        data[3] = 10;
        data[4..14].copy_from_slice(b"  1A2B3C  ");
        assert_eq!(parse_inquiry_unit_serial(&data).unwrap(), "1A2B3C");

        // length byte larger than the buffer is clipped
        data[3] = 200;
        assert_eq!(parse_inquiry_unit_serial(&data).unwrap(), "1A2B3C");

        // wrong page code
        data[1] = 0x83;
        assert_eq!(parse_inquiry_unit_serial(&data), None);
        assert_eq!(parse_inquiry_unit_serial(&[0u8; 2]), None);
    }

    #[test]
    fn toc_parsing() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x1a, 0x01, 0x02,
            0x00, 0x14, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x14, 0x02, 0x00, 0x00, 0x00, 0x3e, 0x80,
            0x00, 0x14, 0xaa, 0x00, 0x00, 0x04, 0xe2, 0x00,
        ];
        let (first, last, entries) = parse_toc(&data).unwrap();
        assert_eq!(first, 1);
        assert_eq!(last, 2);
        assert_eq!(
            entries,
            vec![
                TocEntry { track_number: 1, control: 0x04, address: 0 },
                TocEntry { track_number: 2, control: 0x04, address: 16000 },
                TocEntry { track_number: TOC_LEAD_OUT_TRACK, control: 0x04, address: 320000 },
            ]
        );

        // data length larger than the buffer parses what is present
        let mut truncated = data.to_vec();
        truncated.truncate(12);
        let (_, _, entries) = parse_toc(&truncated).unwrap();
        assert_eq!(entries.len(), 1);

        assert!(parse_toc(&data[..3]).is_err());
    }

    #[test]
    fn disc_information_parsing() {
        let mut data = [0u8; 34];
        data[1] = 32;
        data[2] = 0x1e; // erasable, last session incomplete, disc incomplete
        data[3] = 1;
        data[4] = 2;
        let info = parse_disc_information(&data).unwrap();
        assert_eq!(info.disc_status, 0x02);
        assert!(info.erasable);
        assert_eq!(info.first_track, 1);
        assert_eq!(info.number_of_sessions, 2);

        // session count MSB
        data[9] = 1;
        assert_eq!(
            parse_disc_information(&data).unwrap().number_of_sessions,
            258
        );

        assert!(parse_disc_information(&data[..8]).is_err());
    }

    #[test]
    fn track_information_parsing() {
        let mut data = [0u8; 36];
        data[1] = 34;
        data[2] = 2; // track
        data[3] = 1; // session
        data[5] = 0x04; // track mode: data
        data[6] = 0x01; // data mode: mode 1
        data[8..12].copy_from_slice(&16000u32.to_be_bytes());
        data[24..28].copy_from_slice(&304000u32.to_be_bytes());
        let info = parse_track_information(&data).unwrap();
        assert_eq!(info.track_number, 2);
        assert_eq!(info.session_number, 1);
        assert_eq!(info.track_mode, 0x04);
        assert_eq!(info.data_mode, 0x01);
        assert_eq!(info.start_address, 16000);
        assert_eq!(info.size, 304000);

        // MMC-2 sized response without the MSB bytes
        let info = parse_track_information(&data[..28]).unwrap();
        assert_eq!(info.track_number, 2);

        assert!(parse_track_information(&data[..20]).is_err());
    }
}
