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

//! Module containing the tools code: raster and NetCDF readers,
//! PIDS writers and the commands built on top of them.

pub mod commands;
pub mod configuration;
pub mod netcdf_io;
pub mod pids;
pub mod raster;

use crate::cli::{Cli, Command};
use crate::errors::ToolError;
use crate::tools::configuration::Resources;
use crate::ALLOCATOR;
use log::debug;
use rayon::ThreadPoolBuilder;

/// Main tools function, prepares resources
/// and runs the requested command.
pub fn main(cli: Cli) -> Result<(), ToolError> {
    let resources = Resources {
        threads: cli.threads,
        memory: cli.memory.unwrap_or(Resources::default().memory),
    };

    prepare_resources(&resources, cli.memory.is_some())?;

    match cli.command {
        Command::RasterToNetcdf(args) => commands::raster_to_netcdf::run(&args),
        Command::Pids(args) => commands::gen_pids::run(&args.config),
        Command::Compare(args) => commands::compare::run(&args),
        Command::RasterInfo(args) => commands::raster_info::run(&args.filename),
        Command::Interpolate(args) => commands::interpolate::run(&args),
    }
}

/// Sets memory limit (when requested) and
/// builds the global thread pool.
fn prepare_resources(resources: &Resources, limit_memory: bool) -> Result<(), ToolError> {
    resources.check_bounds()?;

    if limit_memory {
        debug!("Setting memory limit to {} MB", resources.memory);
        ALLOCATOR
            .set_limit(resources.memory.saturating_mul(1024 * 1024))
            .map_err(|_| {
                ToolError::MemoryLimit(format!(
                    "{} MB is less than already allocated memory",
                    resources.memory
                ))
            })?;
    }

    debug!("Setting up ThreadPool with {} threads", resources.threads);
    ThreadPoolBuilder::new()
        .num_threads(resources.threads as usize)
        .stack_size(2 * 1024 * 1024)
        .build_global()?;

    Ok(())
}
