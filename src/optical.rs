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

//! Optical disc table of contents.  The kernel CDROM interface is asked
//! first; drives reachable only through the generic SCSI interface go
//! through READ TOC / READ DISC INFORMATION / READ TRACK INFORMATION.
//! Either way the TOC is reduced to sessions, tracks and the lead-out.

use anyhow::{bail, Result};

use crate::track::{SectorRange, Track, TrackType};

#[cfg(target_os = "linux")]
use {
    crate::scsi,
    anyhow::Context,
    log::debug,
    std::os::raw::c_int,
    std::os::unix::io::AsRawFd,
};

const SECONDS_PER_MINUTE: i64 = 60;
const FRAMES_PER_SECOND: i64 = 75;
/// Two seconds of lead-in precede logical block 0.
const MSF_OFFSET: i64 = 150;

/// Convert minutes/seconds/frames addressing to a logical block address.
/// Track 1 conventionally starts at 00:02.00, which is LBA 0.
pub(crate) fn msf_to_lba(minute: u8, second: u8, frame: u8) -> i64 {
    (minute as i64 * SECONDS_PER_MINUTE + second as i64) * FRAMES_PER_SECOND + frame as i64
        - MSF_OFFSET
}

/// One TOC track start, normalized from either kernel or SCSI responses.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TocTrackStart {
    pub address: u64,
    pub control: u8,
    pub data_mode: Option<u8>,
}

/// Assembled table of contents.
#[derive(Debug, Clone, Default)]
pub(crate) struct TableOfContents {
    pub sessions: Vec<SectorRange>,
    pub lead_outs: Vec<SectorRange>,
    pub tracks: Vec<Track>,
}

/// Derive the track type from the TOC control field and the MMC data
/// mode.  The control data bit separates audio from data; the data mode
/// distinguishes the recorded form of data tracks.
pub(crate) fn derive_track_type(control: u8, data_mode: Option<u8>) -> TrackType {
    if control & 0x04 == 0 {
        return TrackType::Audio;
    }
    match data_mode {
        Some(2) => TrackType::Mode2_2336,
        _ => TrackType::Mode1_2048,
    }
}

/// Build sessions, tracks and the lead-out from track start addresses.
/// Each successive pair of starts delimits one session range and one
/// track; the lead-out closes the last.  Starts must never decrease.
pub(crate) fn assemble_table_of_contents(
    track_starts: &[TocTrackStart],
    lead_out: u64,
) -> Result<TableOfContents> {
    let mut toc = TableOfContents::default();
    let mut last_address = 0u64;

    for (index, start) in track_starts.iter().enumerate() {
        if index > 0 && start.address < last_address {
            bail!(
                "invalid table of contents: offset {} before previous offset {}",
                start.address,
                last_address
            );
        }
        if index > 0 {
            let range = SectorRange::new(last_address, start.address - last_address)?;
            toc.sessions.push(range);
            toc.tracks.push(Track::new(
                range,
                derive_track_type(
                    track_starts[index - 1].control,
                    track_starts[index - 1].data_mode,
                ),
            ));
        }
        last_address = start.address;
    }
    if let Some(last_track) = track_starts.last() {
        if lead_out < last_address {
            bail!(
                "invalid table of contents: lead-out {} before previous offset {}",
                lead_out,
                last_address
            );
        }
        let range = SectorRange::new(last_address, lead_out - last_address)?;
        toc.sessions.push(range);
        toc.tracks
            .push(Track::new(range, derive_track_type(last_track.control, last_track.data_mode)));
        toc.lead_outs.push(SectorRange::new(lead_out, 0)?);
    }
    Ok(toc)
}

// Kernel CDROM interface.

#[cfg(target_os = "linux")]
const CDROM_LEAD_OUT: u8 = 0xaa;
#[cfg(target_os = "linux")]
const CDROM_LBA: u8 = 0x01;
#[cfg(target_os = "linux")]
const CDROM_MSF: u8 = 0x02;

/// struct cdrom_tochdr from <linux/cdrom.h>.
#[cfg(target_os = "linux")]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct CdromTocHeader {
    first_track: u8,
    last_track: u8,
}

#[cfg(target_os = "linux")]
#[repr(C)]
#[derive(Clone, Copy)]
struct CdromMsf {
    minute: u8,
    second: u8,
    frame: u8,
}

#[cfg(target_os = "linux")]
#[repr(C)]
#[derive(Clone, Copy)]
union CdromAddress {
    msf: CdromMsf,
    lba: c_int,
}

/// struct cdrom_tocentry from <linux/cdrom.h>.  The adr/ctrl bitfields
/// share one byte, ADR in the low nibble.
#[cfg(target_os = "linux")]
#[repr(C)]
struct CdromTocEntry {
    track: u8,
    adr_ctrl: u8,
    format: u8,
    address: CdromAddress,
    data_mode: u8,
}

// create unsafe ioctl wrappers
#[cfg(target_os = "linux")]
#[allow(clippy::missing_safety_doc)]
mod ioctl {
    use super::{CdromTocEntry, CdromTocHeader};
    use nix::{ioctl_read_bad, ioctl_readwrite_bad};
    ioctl_read_bad!(cdromreadtochdr, 0x5305, CdromTocHeader);
    ioctl_readwrite_bad!(cdromreadtocentry, 0x5306, CdromTocEntry);
}

#[cfg(target_os = "linux")]
fn read_toc_entry(device: &impl AsRawFd, track: u8) -> Result<TocTrackStart> {
    let mut entry = CdromTocEntry {
        track,
        adr_ctrl: 0,
        format: CDROM_LBA,
        address: CdromAddress { lba: 0 },
        data_mode: 0,
    };
    unsafe { ioctl::cdromreadtocentry(device.as_raw_fd(), &mut entry) }
        .context("unable to query device for: CDROMREADTOCENTRY")?;

    let address = match entry.format {
        CDROM_LBA => (unsafe { entry.address.lba }) as i64,
        CDROM_MSF => {
            let msf = unsafe { entry.address.msf };
            msf_to_lba(msf.minute, msf.second, msf.frame)
        }
        format => bail!("unsupported CDROM address format: 0x{:02x}", format),
    };
    if address < 0 {
        bail!("invalid table of contents: negative offset {}", address);
    }
    Ok(TocTrackStart {
        address: address as u64,
        // control is the high nibble of the packed adr/ctrl byte
        control: entry.adr_ctrl >> 4,
        data_mode: Some(entry.data_mode),
    })
}

/// Read the TOC through the kernel CDROM interface.
#[cfg(target_os = "linux")]
pub(crate) fn read_table_of_contents(device: &impl AsRawFd) -> Result<TableOfContents> {
    let mut header = CdromTocHeader::default();
    unsafe { ioctl::cdromreadtochdr(device.as_raw_fd(), &mut header) }
        .context("unable to query device for: CDROMREADTOCHDR")?;
    debug!(
        "table of contents: tracks {} - {}",
        header.first_track, header.last_track
    );

    let mut track_starts = Vec::new();
    for track in header.first_track..=header.last_track {
        track_starts.push(read_toc_entry(device, track)?);
    }
    let lead_out = read_toc_entry(device, CDROM_LEAD_OUT)?;
    assemble_table_of_contents(&track_starts, lead_out.address)
}

/// Read the TOC through the generic SCSI interface.
#[cfg(target_os = "linux")]
pub(crate) fn read_table_of_contents_scsi(device: &impl AsRawFd) -> Result<TableOfContents> {
    let mut data = [0u8; 2048];
    let count = scsi::read_toc(device, 0, false, 0, &mut data)?;
    if count == 0 {
        bail!("device does not support READ TOC");
    }
    let (first_track, last_track, entries) = scsi::parse_toc(&data[..count])?;
    debug!("table of contents: tracks {} - {}", first_track, last_track);

    let mut lead_out = None;
    let mut track_starts = Vec::new();
    let mut track_numbers = Vec::new();
    for entry in &entries {
        if entry.track_number == scsi::TOC_LEAD_OUT_TRACK {
            lead_out = Some(entry.address as u64);
        } else {
            track_starts.push(TocTrackStart {
                address: entry.address as u64,
                control: entry.control,
                data_mode: None,
            });
            track_numbers.push(entry.track_number);
        }
    }
    let lead_out = match lead_out {
        Some(lead_out) => lead_out,
        None => bail!("table of contents contains no lead-out"),
    };

    // session count, for the curious; the ranges derive from the TOC
    let mut info = [0u8; 34];
    match scsi::read_disc_information(device, &mut info) {
        Ok(count) if count > 0 => match scsi::parse_disc_information(&info[..count]) {
            Ok(info) => debug!("disc reports {} session(s)", info.number_of_sessions),
            Err(err) => debug!("undecodable disc information: {:#}", err),
        },
        Ok(_) => (),
        Err(err) => debug!("unable to read disc information: {:#}", err),
    }

    // data mode per track, best effort
    for (start, number) in track_starts.iter_mut().zip(&track_numbers) {
        let mut info = [0u8; 36];
        match scsi::read_track_information(device, *number as u32, &mut info) {
            Ok(count) if count > 0 => match scsi::parse_track_information(&info[..count]) {
                Ok(info) => start.data_mode = Some(info.data_mode),
                Err(err) => debug!("undecodable track {} information: {:#}", number, err),
            },
            Ok(_) => (),
            Err(err) => debug!("unable to read track {} information: {:#}", number, err),
        }
    }

    assemble_table_of_contents(&track_starts, lead_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(address: u64, control: u8, data_mode: Option<u8>) -> TocTrackStart {
        TocTrackStart {
            address,
            control,
            data_mode,
        }
    }

    #[test]
    fn msf_conversion() {
        // track 1 convention
        assert_eq!(msf_to_lba(0, 2, 0), 0);
        assert_eq!(msf_to_lba(0, 2, 1), 1);
        assert_eq!(msf_to_lba(1, 0, 0), 4350);
        // 74 minute disc capacity
        assert_eq!(msf_to_lba(74, 0, 0), 332850);
        assert_eq!(msf_to_lba(0, 0, 0), -150);
    }

    #[test]
    fn sessions_from_track_pairs() {
        let toc = assemble_table_of_contents(
            &[start(0, 0x04, Some(1)), start(16000, 0x04, Some(1))],
            320000,
        )
        .unwrap();
        assert_eq!(
            toc.sessions,
            vec![
                SectorRange::new(0, 16000).unwrap(),
                SectorRange::new(16000, 304000).unwrap(),
            ]
        );
        assert_eq!(toc.tracks.len(), 2);
        assert_eq!(toc.tracks[0].track_type(), TrackType::Mode1_2048);
        assert_eq!(toc.lead_outs, vec![SectorRange::new(320000, 0).unwrap()]);
    }

    #[test]
    fn single_track_disc() {
        let toc = assemble_table_of_contents(&[start(0, 0x04, Some(1))], 333000).unwrap();
        assert_eq!(toc.sessions, vec![SectorRange::new(0, 333000).unwrap()]);
        assert_eq!(toc.tracks.len(), 1);
        assert_eq!(toc.lead_outs.len(), 1);
    }

    #[test]
    fn empty_toc() {
        let toc = assemble_table_of_contents(&[], 0).unwrap();
        assert!(toc.sessions.is_empty());
        assert!(toc.tracks.is_empty());
        assert!(toc.lead_outs.is_empty());
    }

    #[test]
    fn decreasing_offsets_rejected() {
        let err = assemble_table_of_contents(
            &[start(16000, 0x04, None), start(0, 0x04, None)],
            320000,
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("before previous offset"),
            "incorrect error: {:#}",
            err
        );

        let err =
            assemble_table_of_contents(&[start(16000, 0x04, None)], 15000).unwrap_err();
        assert!(
            err.to_string().contains("lead-out 15000"),
            "incorrect error: {:#}",
            err
        );
    }

    #[test]
    fn track_type_derivation() {
        assert_eq!(derive_track_type(0x00, None), TrackType::Audio);
        assert_eq!(derive_track_type(0x00, Some(1)), TrackType::Audio);
        assert_eq!(derive_track_type(0x04, Some(1)), TrackType::Mode1_2048);
        assert_eq!(derive_track_type(0x04, Some(2)), TrackType::Mode2_2336);
        assert_eq!(derive_track_type(0x04, None), TrackType::Mode1_2048);
        // pre-emphasis audio still reads as audio
        assert_eq!(derive_track_type(0x01, None), TrackType::Audio);
    }

    #[test]
    fn mixed_mode_disc() {
        let toc = assemble_table_of_contents(
            &[
                start(0, 0x04, Some(1)),
                start(1000, 0x00, None),
                start(5000, 0x00, None),
            ],
            10000,
        )
        .unwrap();
        assert_eq!(toc.tracks.len(), 3);
        assert_eq!(toc.tracks[0].track_type(), TrackType::Mode1_2048);
        assert_eq!(toc.tracks[1].track_type(), TrackType::Audio);
        assert_eq!(toc.tracks[2].track_type(), TrackType::Audio);
        assert_eq!(toc.tracks[2].range(), SectorRange::new(5000, 5000).unwrap());
    }
}
