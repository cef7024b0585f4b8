// Copyright 2022 CoreOS, Inc.
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

//! Human-readable report of an opened device, in the layout forensic
//! practitioners know from the info tools: device identity first, then
//! media geometry, then the optical layout if there is one.

use anyhow::Result;
use byte_unit::Byte;
use std::io::Write;

use crate::handle::Handle;
use crate::track::SectorRange;

fn sector_range_line(range: &SectorRange) -> String {
    let mut last_sector = range.start_sector() + range.number_of_sectors();
    if range.number_of_sectors() != 0 {
        last_sector -= 1;
    }
    format!(
        "at sector(s): {} - {} number: {}",
        range.start_sector(),
        last_sector,
        range.number_of_sectors()
    )
}

/// Print the device report to `out`.
pub fn print_info(handle: &mut Handle, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Device information:")?;
    writeln!(out, "\tbus type\t\t: {}", handle.bus_type()?)?;
    for (label, identifier) in [
        ("vendor\t\t", "vendor"),
        ("model\t\t", "model"),
        ("serial\t\t", "serial_number"),
    ] {
        let value = handle.information_value(identifier)?.unwrap_or_default();
        writeln!(out, "\t{}\t: {}", label, value)?;
    }
    writeln!(out)?;

    writeln!(out, "Storage media information:")?;
    writeln!(out, "\tmedia type\t\t: {}", handle.media_type()?)?;
    match handle.media_size() {
        Ok(media_size) => {
            let adjusted = Byte::from_bytes(media_size as u128).get_appropriate_unit(true);
            writeln!(
                out,
                "\tmedia size\t\t: {} ({} bytes)",
                adjusted, media_size
            )?;
        }
        Err(err) => log::warn!("unable to retrieve media size: {:#}", err),
    }
    match handle.bytes_per_sector() {
        Ok(bytes_per_sector) => {
            writeln!(out, "\tbytes per sector\t: {}", bytes_per_sector)?;
        }
        Err(err) => log::warn!("unable to retrieve bytes per sector: {:#}", err),
    }
    writeln!(out)?;

    let number_of_sessions = handle.number_of_sessions()?;
    if number_of_sessions > 0 {
        writeln!(out, "Sessions:")?;
        writeln!(out, "\ttotal number: {}", number_of_sessions)?;
        for index in 0..number_of_sessions {
            let session = handle.session(index)?;
            writeln!(out, "\t{}", sector_range_line(&session))?;
        }
        writeln!(out)?;
    }

    let number_of_tracks = handle.number_of_tracks()?;
    if number_of_tracks > 0 {
        writeln!(out, "Tracks:")?;
        writeln!(out, "\ttotal number: {}", number_of_tracks)?;
        for index in 0..number_of_tracks {
            let track = handle.track(index)?;
            writeln!(
                out,
                "\ttype: {} (sector size: {}) {}",
                track.track_type(),
                track.track_type().bytes_per_sector(),
                sector_range_line(&track.range())
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn report_for_image_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&[0u8; 2048]).unwrap();
        temp.flush().unwrap();

        let mut handle = Handle::new();
        handle.open(temp.path(), false).unwrap();

        let mut out = Vec::new();
        print_info(&mut handle, &mut out).unwrap();
        let report = String::from_utf8(out).unwrap();

        assert!(report.contains("Device information:"));
        assert!(report.contains("\tbus type\t\t: Unknown"));
        assert!(report.contains("Storage media information:"));
        assert!(report.contains("\tmedia type\t\t: Fixed"));
        assert!(report.contains("(2048 bytes)"));
        assert!(report.contains("\tbytes per sector\t: 512"));
        // an image file has no optical layout
        assert!(!report.contains("Sessions:"));
        assert!(!report.contains("Tracks:"));
    }

    #[test]
    fn sector_range_formatting() {
        let range = SectorRange::new(16000, 304000).unwrap();
        assert_eq!(
            sector_range_line(&range),
            "at sector(s): 16000 - 319999 number: 304000"
        );
        let empty = SectorRange::new(320000, 0).unwrap();
        assert_eq!(
            sector_range_line(&empty),
            "at sector(s): 320000 - 320000 number: 0"
        );
    }
}
