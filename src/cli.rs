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

//! Command line interface of the tools.

use crate::Float;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "palmtools")]
#[command(version, about = "Input and output tools for the PALM model", long_about = None)]
pub struct Cli {
    /// Thread count of the global thread pool
    #[arg(long, global = true, default_value_t = 1, env = "PALMTOOLS_THREADS")]
    pub threads: u16,

    /// Heap memory limit in MB
    #[arg(long, global = true, env = "PALMTOOLS_MEMORY")]
    pub memory: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert raster tile into a NetCDF topography mask or 2D field
    RasterToNetcdf(RasterToNetcdfArgs),

    /// Generate PIDS input files from YAML configuration
    Pids(PidsArgs),

    /// Compare a variable between two NetCDF files level by level
    Compare(CompareArgs),

    /// Print information about raster tile
    RasterInfo(RasterInfoArgs),

    /// Interpolate staggered velocity component onto cell centres
    Interpolate(InterpolateArgs),
}

#[derive(Args, Debug)]
pub struct RasterToNetcdfArgs {
    /// Input raster tile (.npz)
    #[arg(short, long)]
    pub filename: PathBuf,

    /// Output NetCDF file
    #[arg(short = 'o', long, default_value = "output.ncdf")]
    pub fileout: PathBuf,

    /// Number of grid points in z direction, computed from the highest point when not given
    #[arg(short = 'N', long)]
    pub nz: Option<usize>,

    /// Resolution of z axis, defaults to resolution of N axis
    #[arg(long)]
    pub dz: Option<Float>,

    /// Save as a 2D array instead of a 3D mask
    #[arg(long)]
    pub flat: bool,

    /// Name of the variable in NetCDF
    #[arg(short, long, default_value = "buildings_0")]
    pub varname: String,

    /// Compress variables with zlib
    #[arg(short, long)]
    pub compress: bool,
}

#[derive(Args, Debug)]
pub struct PidsArgs {
    /// YAML configuration file
    pub config: PathBuf,
}

/// Mode of computing differences.
#[derive(ValueEnum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum DiffMode {
    /// Delta, `v2 - v1`
    #[value(name = "d")]
    Delta,
    /// Relative to the first field pointwise
    #[value(name = "r")]
    Relative,
    /// Scaled by the mean of the first field
    #[value(name = "s")]
    Scaled,
    /// Root normalized mean square difference
    #[value(name = "n")]
    Normalized,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// First (reference) NetCDF file
    #[arg(long = "file1")]
    pub file1: PathBuf,

    /// Second NetCDF file
    #[arg(long = "file2")]
    pub file2: PathBuf,

    /// Variable to compare, names containing UH (UD) give
    /// horizontal speed (direction) from u_xy and v_xy
    #[arg(short, long, default_value = "u")]
    pub varname: String,

    /// Reference values v0 in v+ = (v - v0)/v* for both files
    #[arg(long, num_args = 2, value_names = ["V0_1", "V0_2"], default_values_t = [0.0, 0.0])]
    pub vref: Vec<Float>,

    /// Characteristic values v* in v+ = (v - v0)/v* for both files
    #[arg(long, num_args = 2, value_names = ["VS_1", "VS_2"], default_values_t = [1.0, 1.0])]
    pub vstar: Vec<Float>,

    /// Difference mode
    #[arg(short, long, value_enum, default_value_t = DiffMode::Delta)]
    pub mode: DiffMode,

    /// Write the root-mean-square of differences to RMS_d<varname>.dat
    #[arg(short, long)]
    pub write_rms: bool,

    /// Exclude the first and last number of nodes in x-direction
    #[arg(long, num_args = 2, value_names = ["FIRST", "LAST"], default_values_t = [0, 1])]
    pub nexcl: Vec<usize>,

    /// Indices of z levels to compare, all levels when not given
    #[arg(short, long, value_delimiter = ',')]
    pub levels: Option<Vec<usize>>,
}

#[derive(Args, Debug)]
pub struct RasterInfoArgs {
    /// Input raster tile (.npz)
    #[arg(short, long)]
    pub filename: PathBuf,
}

#[derive(Args, Debug)]
pub struct InterpolateArgs {
    /// Input NetCDF file
    #[arg(short, long)]
    pub filename: PathBuf,

    /// Output NetCDF file, defaults to <varname>_centred.nc
    #[arg(short = 'o', long)]
    pub fileout: Option<PathBuf>,

    /// Name of the staggered variable
    #[arg(short, long, default_value = "u")]
    pub varname: String,

    /// Component: i, j or k
    #[arg(short = 'i', long, default_value = "i")]
    pub component: String,

    /// Number of skipped time steps
    #[arg(long, default_value_t = 0)]
    pub time_offset: usize,

    /// Number of skipped points at the start of each spatial axis
    #[arg(long, default_value_t = 0)]
    pub left: usize,

    /// Number of skipped points at the end of each spatial axis
    #[arg(long, default_value_t = 0)]
    pub right: usize,

    /// Coarsening level
    #[arg(long, default_value_t = 1)]
    pub coarsening: usize,

    /// Write the time mean
    #[arg(long)]
    pub mean: bool,

    /// Write the fluctuating part
    #[arg(long)]
    pub primes: bool,

    /// Compress variables with zlib
    #[arg(short, long)]
    pub compress: bool,
}
