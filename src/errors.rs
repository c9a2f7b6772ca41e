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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Error while reading configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while reading raster tile: {0}")]
    Raster(#[from] RasterError),

    #[error("NetCDF library error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Error while handling NetCDF data: {0}")]
    NetcdfIo(#[from] NetcdfIoError),

    #[error("Error while writing PIDS data: {0}")]
    Pids(#[from] PidsError),

    #[error("Error while interpolating vector field: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Error while comparing datasets: {0}")]
    Compare(#[from] CompareError),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Cannot set the memory limit: {0}")]
    MemoryLimit(String),

    #[error("Error while writing output table: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open configuration file: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize configuration file: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds: {0}")]
    OutOfBounds(&'static str),

    #[error("Input file {0} does not exist")]
    MissingInput(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Cannot open raster file: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot read npz archive: {0}")]
    Npz(#[from] ndarray_npy::ReadNpzError),

    #[error("Array {0} not found in raster archive")]
    MissingArray(&'static str),

    #[error("Array {0} has unsupported element type")]
    UnsupportedType(&'static str),

    #[error("Raster has {found} dimensions, expected {expected}")]
    Dimensionality { expected: usize, found: usize },
}

#[derive(Error, Debug)]
pub enum NetcdfIoError {
    #[error("NetCDF library error: {0}")]
    Library(#[from] netcdf::Error),

    #[error("{0} list of the dataset has zero length")]
    EmptyListing(&'static str),

    #[error("Variable {name} not in list {available:?}")]
    MissingVariable {
        name: String,
        available: Vec<String>,
    },

    #[error("Offsets {left}..-{right} leave no data in variable {name}")]
    EmptySelection {
        name: String,
        left: usize,
        right: usize,
    },

    #[error("Variable {0} has incompatible shape for this operation")]
    IncompatibleShape(String),

    #[error("Coarsening level must be at least 1")]
    ZeroCoarsening,
}

#[derive(Error, Debug)]
pub enum PidsError {
    #[error("NetCDF library error: {0}")]
    Library(#[from] netcdf::Error),

    #[error("{0}")]
    NetcdfIo(#[from] NetcdfIoError),

    #[error("{0}")]
    Raster(#[from] RasterError),

    #[error("Dimension {name} already exists with length {existing}, cannot use length {requested}")]
    DimensionMismatch {
        name: String,
        existing: usize,
        requested: usize,
    },

    #[error("Invalid number of dimensions in buildings array: {0}")]
    BuildingsRank(usize),

    #[error("Horizontal shape of {name} {found:?} does not match the orography {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Invalid value for {key}: {reason}")]
    InvalidInput { key: &'static str, reason: String },

    #[error("emission_time_factors_lod = {0} is not yet implemented")]
    LodNotImplemented(u8),
}

#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Invalid component string: {0}")]
    InvalidComponent(String),

    #[error("Field must have at least two points along every spatial axis, got {0:?}")]
    TooSmall(Vec<usize>),

    #[error("Field has no time steps to average")]
    NoTimeSteps,

    #[error("Mean field shape {mean:?} does not match the instantaneous field {field:?}")]
    MeanShape { field: Vec<usize>, mean: Vec<usize> },
}

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("{0}")]
    NetcdfIo(#[from] NetcdfIoError),

    #[error("Coordinate {0} is missing from the dataset")]
    MissingCoordinate(&'static str),

    #[error("Field of rank {0} cannot be compared level by level")]
    Rank(usize),

    #[error("Exclusion of {first}+{last} nodes leaves nothing of {len} nodes in x-direction")]
    Exclusion { first: usize, last: usize, len: usize },

    #[error("Level index {index} is out of range for {count} levels")]
    LevelIndex { index: usize, count: usize },

    #[error("Shapes of u_xy {0:?} and v_xy {1:?} differ")]
    ComponentShapes(Vec<usize>, Vec<usize>),

    #[error("Field of shape {0:?} is too small to centre wind components")]
    TooSmall(Vec<usize>),

    #[error("Compared levels have different shapes {0:?} and {1:?}")]
    LevelShapes(Vec<usize>, Vec<usize>),
}
