// Copyright 2020 CoreOS, Inc.
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

use anyhow::{bail, Result};
use std::fmt;

/// A run of sectors on the media: start sector plus sector count.
/// Byte offsets derived from a range must fit in an i64, so both fields
/// and their sum are validated against that limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRange {
    start_sector: u64,
    number_of_sectors: u64,
}

impl SectorRange {
    pub fn new(start_sector: u64, number_of_sectors: u64) -> Result<Self> {
        if start_sector > i64::MAX as u64 {
            bail!("start sector {} exceeds maximum", start_sector);
        }
        if number_of_sectors > i64::MAX as u64 {
            bail!("number of sectors {} exceeds maximum", number_of_sectors);
        }
        if start_sector.checked_add(number_of_sectors).is_none()
            || start_sector + number_of_sectors > i64::MAX as u64
        {
            bail!(
                "sector range {} + {} exceeds maximum",
                start_sector,
                number_of_sectors
            );
        }
        Ok(Self {
            start_sector,
            number_of_sectors,
        })
    }

    pub fn start_sector(&self) -> u64 {
        self.start_sector
    }

    pub fn number_of_sectors(&self) -> u64 {
        self.number_of_sectors
    }

    /// First sector past the range.
    pub fn end_sector(&self) -> u64 {
        self.start_sector + self.number_of_sectors
    }
}

/// CD track types, as reported through the TOC control field and the
/// MMC data mode.  The on-disc sector size is fixed per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    Audio,
    Cdg,
    Mode1_2048,
    Mode1_2352,
    Mode2_2048,
    Mode2_2324,
    Mode2_2336,
    Mode2_2352,
    Cdi2336,
    Cdi2352,
}

impl TrackType {
    pub fn bytes_per_sector(self) -> u32 {
        match self {
            TrackType::Audio => 2352,
            TrackType::Cdg => 2448,
            TrackType::Mode1_2048 => 2048,
            TrackType::Mode1_2352 => 2352,
            TrackType::Mode2_2048 => 2048,
            TrackType::Mode2_2324 => 2324,
            TrackType::Mode2_2336 => 2336,
            TrackType::Mode2_2352 => 2352,
            TrackType::Cdi2336 => 2336,
            TrackType::Cdi2352 => 2352,
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackType::Audio => "audio",
            TrackType::Cdg => "CD+G",
            TrackType::Mode1_2048 => "mode1/2048",
            TrackType::Mode1_2352 => "mode1/2352",
            TrackType::Mode2_2048 => "mode2/2048",
            TrackType::Mode2_2324 => "mode2/2324",
            TrackType::Mode2_2336 => "mode2/2336",
            TrackType::Mode2_2352 => "mode2/2352",
            TrackType::Cdi2336 => "CDI/2336",
            TrackType::Cdi2352 => "CDI/2352",
        };
        f.write_str(name)
    }
}

/// A track on an optical disc: its sector extent plus type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Track {
    range: SectorRange,
    track_type: TrackType,
}

impl Track {
    pub fn new(range: SectorRange, track_type: TrackType) -> Self {
        Self { range, track_type }
    }

    pub fn start_sector(&self) -> u64 {
        self.range.start_sector()
    }

    pub fn number_of_sectors(&self) -> u64 {
        self.range.number_of_sectors()
    }

    pub fn range(&self) -> SectorRange {
        self.range
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_range_validation() {
        let range = SectorRange::new(16000, 304000).unwrap();
        assert_eq!(range.start_sector(), 16000);
        assert_eq!(range.number_of_sectors(), 304000);
        assert_eq!(range.end_sector(), 320000);

        SectorRange::new(0, 0).unwrap();
        SectorRange::new(i64::MAX as u64, 0).unwrap();
        SectorRange::new(0, i64::MAX as u64).unwrap();

        assert!(SectorRange::new(i64::MAX as u64 + 1, 0).is_err());
        assert!(SectorRange::new(0, i64::MAX as u64 + 1).is_err());
        // each field fits but the sum does not
        assert!(SectorRange::new(i64::MAX as u64, 1).is_err());
        assert!(SectorRange::new(u64::MAX, u64::MAX).is_err());
    }

    #[test]
    fn bytes_per_sector_table() {
        assert_eq!(TrackType::Audio.bytes_per_sector(), 2352);
        assert_eq!(TrackType::Cdg.bytes_per_sector(), 2448);
        assert_eq!(TrackType::Mode1_2048.bytes_per_sector(), 2048);
        assert_eq!(TrackType::Mode1_2352.bytes_per_sector(), 2352);
        assert_eq!(TrackType::Mode2_2048.bytes_per_sector(), 2048);
        assert_eq!(TrackType::Mode2_2324.bytes_per_sector(), 2324);
        assert_eq!(TrackType::Mode2_2336.bytes_per_sector(), 2336);
        assert_eq!(TrackType::Mode2_2352.bytes_per_sector(), 2352);
        assert_eq!(TrackType::Cdi2336.bytes_per_sector(), 2336);
        assert_eq!(TrackType::Cdi2352.bytes_per_sector(), 2352);
    }

    #[test]
    fn track_accessors() {
        let track = Track::new(
            SectorRange::new(0, 16000).unwrap(),
            TrackType::Mode1_2048,
        );
        assert_eq!(track.start_sector(), 0);
        assert_eq!(track.number_of_sectors(), 16000);
        assert_eq!(track.track_type(), TrackType::Mode1_2048);
        assert_eq!(track.track_type().to_string(), "mode1/2048");
    }
}
