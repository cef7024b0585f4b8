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

use anyhow::{bail, Context, Result};
use clap::Parser;
use lazy_static::lazy_static;
use log::{LevelFilter, Metadata, Record};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::io;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use libsmdev::cmdline::InfoConfig;
use libsmdev::info::print_info;
use libsmdev::Handle;

lazy_static! {
    // filled in before the SIGINT handler is installed; the handler only
    // ever try_locks it
    static ref ABORT_TOKEN: Mutex<Option<Arc<AtomicBool>>> = Mutex::new(None);
}

extern "C" fn handle_sigint(_: libc::c_int) {
    if let Ok(token) = ABORT_TOKEN.try_lock() {
        if let Some(token) = token.as_ref() {
            token.store(true, Ordering::Relaxed);
        }
    }
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!("smdevinfo: {}", record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() {
    let config = InfoConfig::parse();
    if let Err(err) = run(&config) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(config: &InfoConfig) -> Result<()> {
    if config.verbose {
        log::set_logger(&LOGGER)
            .map(|()| log::set_max_level(LevelFilter::Debug))
            .context("installing logger")?;
    }
    println!("smdevinfo {}", env!("CARGO_PKG_VERSION"));
    println!();

    let mut handle = Handle::new();
    handle
        .open(&config.source, false)
        .with_context(|| format!("opening {}", config.source.display()))?;

    let token = handle.abort_token();
    *ABORT_TOKEN
        .lock()
        .expect("abort token mutex poisoned") = Some(token.clone());
    let action = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGINT, &action) }.context("installing SIGINT handler")?;

    print_info(&mut handle, &mut io::stdout().lock())?;

    if token.load(Ordering::Relaxed) {
        bail!("aborted");
    }
    handle.close()?;
    Ok(())
}
