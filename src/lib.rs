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

//! Library for reading storage media devices as byte streams while
//! tolerating and recording unreadable regions, and for introspecting
//! device identity and geometry.  Built for forensic imagers that need
//! to copy failing devices as faithfully as possible.

// library
pub mod ata;
pub mod blockdev;
pub mod device;
pub mod handle;
pub mod mediainfo;
mod optical;
pub mod range_list;
pub mod reader;
pub mod scsi;
pub mod track;
mod util;

// binary support
pub mod cmdline;
pub mod info;

pub use crate::device::{check_device, DeviceFile, DeviceIo};
pub use crate::handle::Handle;
pub use crate::mediainfo::{BusType, MediaInfo, MediaType};
pub use crate::range_list::RangeList;
pub use crate::reader::{RetryPolicy, ERROR_FLAG_ZERO_ON_ERROR};
pub use crate::scsi::SenseError;
pub use crate::track::{SectorRange, Track, TrackType};
