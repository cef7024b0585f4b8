// Copyright 2019 CoreOS, Inc.
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

//! Media geometry: size and logical sector size of the opened device,
//! resolved through the platform's block device IOCTLs.  Regular files
//! are sized through their metadata so image files can stand in for
//! devices.

use anyhow::{Context, Result};

use crate::device::DeviceFile;

#[cfg(any(target_os = "linux", target_os = "freebsd", target_os = "macos"))]
use std::os::unix::io::AsRawFd;

/// Size of the media in bytes.
pub fn media_size(device: &DeviceFile) -> Result<u64> {
    if !device.is_device()? {
        return device.file_size();
    }
    device_media_size(device)
}

/// Logical sector size of the media in bytes.  Regular files have no
/// geometry; the conventional 512 is reported.
pub fn bytes_per_sector(device: &DeviceFile) -> Result<u32> {
    if !device.is_device()? {
        return Ok(512);
    }
    device_bytes_per_sector(device)
}

#[cfg(target_os = "linux")]
fn device_media_size(device: &DeviceFile) -> Result<u64> {
    let mut size: libc::size_t = 0;
    unsafe { ioctl::blkgetsize64(device.as_raw_fd(), &mut size) }
        .context("unable to query device for: BLKGETSIZE64")?;
    Ok(size as u64)
}

#[cfg(target_os = "linux")]
fn device_bytes_per_sector(device: &DeviceFile) -> Result<u32> {
    let mut size: libc::c_int = 0;
    unsafe { ioctl::blksszget(device.as_raw_fd(), &mut size) }
        .context("unable to query device for: BLKSSZGET")?;
    size.try_into()
        .with_context(|| format!("sector size {} doesn't fit in u32", size))
}

#[cfg(target_os = "freebsd")]
fn device_media_size(device: &DeviceFile) -> Result<u64> {
    let mut size: libc::off_t = 0;
    unsafe { ioctl::diocgmediasize(device.as_raw_fd(), &mut size) }
        .context("unable to query device for: DIOCGMEDIASIZE")?;
    Ok(size as u64)
}

#[cfg(target_os = "freebsd")]
fn device_bytes_per_sector(device: &DeviceFile) -> Result<u32> {
    let mut size: libc::c_uint = 0;
    unsafe { ioctl::diocgsectorsize(device.as_raw_fd(), &mut size) }
        .context("unable to query device for: DIOCGSECTORSIZE")?;
    Ok(size)
}

#[cfg(target_os = "macos")]
fn device_media_size(device: &DeviceFile) -> Result<u64> {
    let block_size = device_bytes_per_sector(device)?;
    let mut block_count: u64 = 0;
    unsafe { ioctl::dkiocgetblockcount(device.as_raw_fd(), &mut block_count) }
        .context("unable to query device for: DKIOCGETBLOCKCOUNT")?;
    Ok(block_count * block_size as u64)
}

#[cfg(target_os = "macos")]
fn device_bytes_per_sector(device: &DeviceFile) -> Result<u32> {
    let mut block_size: u32 = 0;
    unsafe { ioctl::dkiocgetblocksize(device.as_raw_fd(), &mut block_size) }
        .context("unable to query device for: DKIOCGETBLOCKSIZE")?;
    Ok(block_size)
}

#[cfg(not(any(target_os = "linux", target_os = "freebsd", target_os = "macos")))]
fn device_media_size(_device: &DeviceFile) -> Result<u64> {
    anyhow::bail!("determining the media size is unsupported on this platform");
}

#[cfg(not(any(target_os = "linux", target_os = "freebsd", target_os = "macos")))]
fn device_bytes_per_sector(_device: &DeviceFile) -> Result<u32> {
    anyhow::bail!("determining the sector size is unsupported on this platform");
}

// create unsafe ioctl wrappers
#[cfg(target_os = "linux")]
#[allow(clippy::missing_safety_doc)]
mod ioctl {
    use nix::{ioctl_read, ioctl_read_bad, request_code_none};
    use std::os::raw::c_int;
    ioctl_read_bad!(blksszget, request_code_none!(0x12, 104), c_int);
    ioctl_read!(blkgetsize64, 0x12, 114, libc::size_t);
}

#[cfg(target_os = "freebsd")]
#[allow(clippy::missing_safety_doc)]
mod ioctl {
    use nix::ioctl_read;
    ioctl_read!(diocgsectorsize, b'd', 128, libc::c_uint);
    ioctl_read!(diocgmediasize, b'd', 129, libc::off_t);
}

#[cfg(target_os = "macos")]
#[allow(clippy::missing_safety_doc)]
mod ioctl {
    use nix::ioctl_read;
    ioctl_read!(dkiocgetblocksize, b'd', 24, u32);
    ioctl_read!(dkiocgetblockcount, b'd', 25, u64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn regular_file_geometry() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&[0u8; 4096]).unwrap();
        temp.flush().unwrap();

        let device = DeviceFile::open(temp.path(), false).unwrap();
        assert_eq!(media_size(&device).unwrap(), 4096);
        assert_eq!(bytes_per_sector(&device).unwrap(), 512);
    }

    #[test]
    fn empty_file_geometry() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let device = DeviceFile::open(temp.path(), false).unwrap();
        assert_eq!(media_size(&device).unwrap(), 0);
    }
}
