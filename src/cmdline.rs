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

use clap::Parser;
use std::path::PathBuf;

// Args are listed in --help in the order declared here.  Please keep the
// entire help text to 80 columns.

/// Determine information about storage media devices
#[derive(Debug, Parser)]
#[clap(name = "smdevinfo", version)]
pub struct InfoConfig {
    /// Ignore data file(s)
    ///
    /// Accepted for compatibility; data files are never reported.
    #[clap(short = 'i', long)]
    pub ignore_data_files: bool,
    /// Verbose output to stderr
    #[clap(short, long)]
    pub verbose: bool,
    /// The source device file
    #[clap(value_name = "SOURCE")]
    pub source: PathBuf,
}
