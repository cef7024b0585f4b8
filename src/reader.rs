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

//! Fault-tolerant read loop.  A failing device is read through a
//! retry-and-skip cycle that preserves offset correctness: transient
//! errors are retried in place, exhausted retries skip forward by the
//! configured error granularity, and every skipped region is recorded so
//! the caller can note it in the acquired image.

use anyhow::{bail, Context, Result};
use log::debug;
use std::io::{ErrorKind, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::device::DeviceIo;
use crate::range_list::RangeList;

/// Replace unreadable bytes with zeros in the output buffer instead of
/// leaving them untouched.
pub const ERROR_FLAG_ZERO_ON_ERROR: u8 = 0x01;

/// How the read loop treats unreadable regions.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Reads retried in place before a region is declared unreadable.
    pub retry_count: u8,
    /// Alignment and size, in bytes, at which unreadable regions are
    /// isolated.  0 means the whole read buffer.
    pub error_granularity: u32,
    /// ERROR_FLAG_* bits.
    pub error_flags: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 2,
            error_granularity: 0,
            error_flags: 0,
        }
    }
}

impl RetryPolicy {
    fn zero_on_error(&self) -> bool {
        self.error_flags & ERROR_FLAG_ZERO_ON_ERROR != 0
    }
}

/// Read errors that mean the device is gone or the file is not seekable,
/// rather than the medium being locally unreadable.  These are never
/// retried.
fn is_fatal_read_error(code: Option<i32>) -> bool {
    matches!(
        code,
        Some(libc::ESPIPE) | Some(libc::EPERM) | Some(libc::ENXIO) | Some(libc::ENODEV)
    )
}

/// Fill `buf` from `device`, which is positioned at byte `offset`.
///
/// On success the requested size is delivered in full, clamped to
/// `media_size` when known; unreadable regions are stepped over,
/// optionally zero-filled, and appended to `errors`.  Returns the number
/// of bytes produced (read, zero-filled, or skipped).  The caller is
/// responsible for advancing its logical offset by the returned count.
pub(crate) fn read_with_recovery<D: DeviceIo>(
    device: &mut D,
    buf: &mut [u8],
    offset: i64,
    media_size: Option<u64>,
    policy: &RetryPolicy,
    abort: &AtomicBool,
    errors: &mut RangeList,
) -> Result<usize> {
    if buf.len() > isize::MAX as usize {
        bail!("buffer size {} exceeds maximum", buf.len());
    }
    let mut read_size = buf.len();
    if let Some(media_size) = media_size {
        if offset as u64 >= media_size {
            bail!("offset {} exceeds media size {}", offset, media_size);
        }
        read_size = read_size.min((media_size - offset as u64) as usize);
    }

    let mut buffer_offset = 0usize;
    let mut read_errors = 0u32;

    loop {
        if abort.load(Ordering::Relaxed) {
            debug!("abort requested, returning {} bytes", buffer_offset);
            break;
        }
        if read_size == 0 {
            break;
        }
        let expected_offset = offset + buffer_offset as i64;

        let count = match device.read(&mut buf[buffer_offset..buffer_offset + read_size]) {
            // end of the file: deliver what we have
            Ok(0) => break,
            Ok(count) => count,
            Err(ref err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                let code = err.raw_os_error();
                if is_fatal_read_error(code) {
                    return Err(err).context("unable to read from device file");
                }
                debug!(
                    "read error at offset {}: {} (retry {} of {})",
                    expected_offset, err, read_errors, policy.retry_count
                );

                // Some kernels (observed on Darwin) report a failed read
                // while still advancing the file offset to the position of
                // the error.  Probe the device offset: if it ran ahead of
                // our accounting, that many bytes were transferred before
                // the failure and count as read.  An offset behind our
                // accounting cannot be corrected.
                let current_offset = device
                    .seek(SeekFrom::Current(0))
                    .context("unable to seek current offset after read error")?;
                let current_offset: i64 = current_offset
                    .try_into()
                    .context("device offset exceeds maximum")?;
                if current_offset < expected_offset {
                    bail!(
                        "unable to correct negative offset drift (device: {}, expected: {})",
                        current_offset,
                        expected_offset
                    );
                }
                if current_offset > expected_offset {
                    debug!(
                        "correcting offset drift (device: {}, expected: {})",
                        current_offset, expected_offset
                    );
                }
                (current_offset - expected_offset) as usize
            }
        };

        if count > read_size {
            bail!("read count {} exceeds read size {}", count, read_size);
        }
        if count > 0 {
            buffer_offset += count;
            read_size -= count;
            read_errors = 0;
            continue;
        }

        // no progress at this position
        read_errors += 1;
        if read_errors <= policy.retry_count as u32 {
            continue;
        }

        // Retries exhausted: isolate the unreadable region to a
        // granularity window and skip past it.  The skip distance runs
        // from the current position to the next window boundary, clipped
        // to the remaining read.
        let granularity = if policy.error_granularity > 0 {
            policy.error_granularity as usize
        } else {
            buf.len()
        };
        let window_start = (buffer_offset / granularity) * granularity;
        let skip = (window_start + granularity - buffer_offset).min(read_size);

        let (error_offset, error_size) = if policy.zero_on_error() {
            let window_end = (window_start + granularity).min(buf.len());
            buf[window_start..window_end].fill(0);
            (offset + window_start as i64, (window_end - window_start) as u64)
        } else {
            (offset + buffer_offset as i64, skip as u64)
        };
        debug!(
            "recording read error at offset {} of {} bytes, skipping {} bytes",
            error_offset, error_size, skip
        );
        errors.append(error_offset, error_size);

        device
            .seek(SeekFrom::Current(skip as i64))
            .with_context(|| format!("unable to skip {} bytes after read error", skip))?;
        buffer_offset += skip;
        read_size -= skip;
        read_errors = 0;
    }

    Ok(buffer_offset)
}
