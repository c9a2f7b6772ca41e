/*
Copyright 2022 PALM I/O Tools developers

This file is part of PALM I/O Tools.

PALM I/O Tools is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

PALM I/O Tools is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with PALM I/O Tools. If not, see https://www.gnu.org/licenses/.
*/

//! PALM I/O Tools is a set of command line tools supporting
//! the input and output pipeline of the PALM atmospheric model.
//!
//! The tools convert raster tiles into NetCDF, generate input files
//! following the PALM Input Data Standard (PIDS), compare PALM output
//! files level by level and interpolate staggered velocity components
//! onto cell centres.

mod cli;
mod constants;
mod errors;
mod tools;

use cap::Cap;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::{alloc, process};

type Float = f64;

/// Global allocator used by the tools.
///
/// Use of static global allocator allows for capping the memory to the limit set by user
/// with `--memory` and in effect provide better [OOM error](https://en.wikipedia.org/wiki/Out_of_memory) handling.
#[global_allocator]
static ALLOCATOR: Cap<alloc::System> = Cap::new(alloc::System, usize::MAX);

/// The main program function.
/// Prepares the runtime environment and calls the [`tools::main`].
///
/// The `env_logger` needs to be initiated before any log messages
/// are possible to occur.
fn main() {
    #[cfg(not(feature = "debug"))]
    let logger_env = Env::new().filter_or("PALMTOOLS_LOG_LEVEL", "info");

    #[cfg(feature = "debug")]
    let logger_env = Env::new().filter_or("PALMTOOLS_LOG_LEVEL", "debug");

    env_logger::Builder::from_env(logger_env)
        .format_timestamp_millis()
        .init();

    let cli = cli::Cli::parse();

    match tools::main(cli) {
        Ok(_) => info!("Execution finished."),
        Err(err) => {
            error!("Execution failed with error: {}", err);
            process::exit(1);
        }
    }
}
