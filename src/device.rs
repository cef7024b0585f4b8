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

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Raw I/O on an opened device.  Errors carry the native error code via
/// `io::Error::raw_os_error()`, which the read engine inspects to decide
/// between retrying and aborting.
pub trait DeviceIo {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
}

/// An opened storage media device.  Regular files are accepted as well,
/// so image files can stand in for devices.
#[derive(Debug)]
pub struct DeviceFile {
    file: File,
    path: PathBuf,
}

impl DeviceFile {
    /// Open the device at `path`.  Devices are opened with O_NONBLOCK so
    /// that optical drives and other ejectable media open even when no
    /// medium is loaded; the flag has no effect on regular files.
    pub fn open<P: AsRef<Path>>(path: P, write: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(write)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the underlying file is a character or block device.
    pub fn is_device(&self) -> Result<bool> {
        let file_type = self
            .file
            .metadata()
            .with_context(|| format!("getting metadata for {}", self.path.display()))?
            .file_type();
        Ok(file_type.is_block_device() || file_type.is_char_device())
    }

    /// Size of the underlying file, from metadata.  Only meaningful for
    /// regular files; block devices report 0 here and are sized through
    /// their geometry IOCTLs instead.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self
            .file
            .metadata()
            .with_context(|| format!("getting metadata for {}", self.path.display()))?
            .len())
    }
}

impl DeviceIo for DeviceFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl AsRawFd for DeviceFile {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Whether `path` refers to a storage media device node.  Fails if the
/// path cannot be inspected at all (not found, access denied).
pub fn check_device<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    let file_type = std::fs::metadata(path)
        .with_context(|| format!("getting metadata for {}", path.display()))?
        .file_type();
    Ok(file_type.is_block_device() || file_type.is_char_device())
}
