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

//! Module responsible for writing input files following
//! the PALM Input Data Standard (PIDS).
//!
//! PIDS files are ordinary NetCDF-4 files with a fixed set of global
//! attributes and variables with prescribed names, dimensions, types
//! and fill values. Static input (`PIDS_STATIC`) carries the topography
//! and surface classification, aerosol input (`PIDS_AERO`) carries
//! emission categories, species and their time factors.
//!
//! Each processing function creates the dimensions it needs, unless they
//! already exist, and either creates the variable or overwrites
//! its values when the file already contains it.

pub mod aerosol;
pub mod dimensions;
pub mod parsing;
pub mod static_input;

use crate::constants::{PIDS_FLOAT_ATTRIBUTES, PIDS_STR_ATTRIBUTES};
use crate::errors::PidsError;
use crate::tools::configuration::ConfigValue;
use crate::tools::netcdf_io::{
    create_output, variables,
    variables::{NcChar, NcElement, VariableSpec},
    write_and_close, OutputMode,
};
use log::debug;
use netcdf::FileMut;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// PIDS file opened for writing, with the lists of
/// variables and dimensions it already contains.
pub struct PidsDataset {
    file: FileMut,
    pub path: PathBuf,
    pub variables: Vec<String>,
    pub dimensions: Vec<String>,
    pub zlib: bool,
}

impl PidsDataset {
    /// Opens the file and collects names already present in it
    /// (relevant in append mode).
    pub fn create(path: &Path, mode: OutputMode, zlib: bool) -> Result<Self, PidsError> {
        let file = create_output(path, mode)?;

        let variables: Vec<String> = file.variables().map(|v| v.name()).collect();
        let dimensions: Vec<String> = file.dimensions().map(|d| d.name()).collect();

        debug!(
            "PIDS file {} contains variables {:?} and dimensions {:?}",
            path.display(),
            variables,
            dimensions
        );

        Ok(PidsDataset {
            file,
            path: path.to_path_buf(),
            variables,
            dimensions,
            zlib,
        })
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d == name)
    }

    pub fn dimension_len(&self, name: &str) -> Option<usize> {
        self.file.dimension(name).map(|d| d.len())
    }

    /// Writes the field, creating the variable if it does not exist yet.
    pub(crate) fn put_field<T: NcElement>(
        &mut self,
        spec: VariableSpec,
        values: &[T],
        fill: T,
    ) -> Result<(), PidsError> {
        if self.has_variable(spec.name) {
            variables::overwrite_values(&mut self.file, spec.name, values)?;
        } else {
            let spec = spec.zlib(self.zlib);
            variables::create_variable(&mut self.file, &spec, values, Some(fill))?;
            self.variables.push(spec.name.to_string());
        }

        Ok(())
    }

    /// Character array counterpart of [`PidsDataset::put_field`].
    pub(crate) fn put_chars(&mut self, spec: VariableSpec, values: &[NcChar]) -> Result<(), PidsError> {
        if self.has_variable(spec.name) {
            variables::overwrite_values(&mut self.file, spec.name, values)?;
        } else {
            let spec = spec.zlib(self.zlib);
            variables::create_char_variable(&mut self.file, &spec, values)?;
            self.variables.push(spec.name.to_string());
        }

        Ok(())
    }

    pub fn close(self) {
        write_and_close(self.file);
    }
}

/// Sets PIDS global attributes.
///
/// Attributes missing from `attributes` are set to empty string
/// (or `0.0` for numeric ones) unless the file already has them.
pub fn set_global_attributes(
    ds: &mut PidsDataset,
    attributes: &BTreeMap<String, ConfigValue>,
) -> Result<(), PidsError> {
    for key in PIDS_STR_ATTRIBUTES {
        match attributes.get(key) {
            Some(value) => {
                ds.file.add_attribute(key, value.as_text())?;
            }
            None => {
                if ds.file.attribute(key).is_none() {
                    ds.file.add_attribute(key, "")?;
                }
            }
        }
    }

    for key in PIDS_FLOAT_ATTRIBUTES {
        match attributes.get(key) {
            Some(value) => {
                let value = value.as_float().ok_or_else(|| PidsError::InvalidInput {
                    key,
                    reason: format!("{} is not a number", value.as_text()),
                })?;
                ds.file.add_attribute(key, value)?;
            }
            None => {
                if ds.file.attribute(key).is_none() {
                    ds.file.add_attribute(key, 0.0f64)?;
                }
            }
        }
    }

    Ok(())
}
