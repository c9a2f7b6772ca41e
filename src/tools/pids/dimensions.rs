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

//! Sub-module creating PIDS dimensions together with
//! their coordinate variables.

use super::PidsDataset;
use crate::constants::{HOURS_PER_YEAR, MAX_NAME_LEN};
use crate::errors::PidsError;
use crate::tools::netcdf_io::variables::{create_coordinate_axis, create_variable, VariableSpec};
use crate::tools::raster::RasterTile;
use crate::Float;
use log::debug;

impl PidsDataset {
    /// Checks if the dimension exists with required length.
    /// Returns `true` when nothing has to be created.
    fn dimension_exists(&self, name: &str, n: usize) -> Result<bool, PidsError> {
        if !self.has_dimension(name) {
            return Ok(false);
        }

        let existing = self.dimension_len(name).unwrap_or(n);

        if existing != n {
            return Err(PidsError::DimensionMismatch {
                name: name.to_string(),
                existing,
                requested: n,
            });
        }

        debug!("Dimension {} already exists", name);
        Ok(true)
    }

    fn ensure_axis(
        &mut self,
        name: &str,
        n: usize,
        spacing: Float,
        long_name: &str,
    ) -> Result<(), PidsError> {
        if self.dimension_exists(name, n)? {
            return Ok(());
        }

        create_coordinate_axis(&mut self.file, n, spacing, name, "m", Some(long_name), self.zlib)?;
        self.register_coordinate(name);

        Ok(())
    }

    /// Creates index dimension with coordinate values `1..=n`.
    fn ensure_index_dim(
        &mut self,
        name: &str,
        n: usize,
        long_name: Option<&str>,
    ) -> Result<(), PidsError> {
        if self.dimension_exists(name, n)? {
            return Ok(());
        }

        let values: Vec<i32> = (1..=n as i32).collect();
        let mut spec = VariableSpec::coordinate(name, "").zlib(self.zlib);
        spec.long_name = long_name;

        create_variable(&mut self.file, &spec, &values, None)?;
        self.register_coordinate(name);

        Ok(())
    }

    fn register_coordinate(&mut self, name: &str) {
        self.dimensions.push(name.to_string());
        self.variables.push(name.to_string());
    }

    pub fn ensure_x_dim(&mut self, tile: &RasterTile) -> Result<(), PidsError> {
        let [_, nx] = tile.horizontal_shape();
        self.ensure_axis("x", nx, tile.spacing_x(), "distance to origin in x-direction")
    }

    pub fn ensure_y_dim(&mut self, tile: &RasterTile) -> Result<(), PidsError> {
        let [ny, _] = tile.horizontal_shape();
        self.ensure_axis("y", ny, tile.spacing_y(), "distance to origin in y-direction")
    }

    pub fn ensure_z_dim(&mut self, nz: usize, dz: Float) -> Result<(), PidsError> {
        self.ensure_axis("z", nz, dz, "height above origin")
    }

    /// Vertical axis of leaf area density.
    pub fn ensure_zlad_dim(&mut self, nz: usize, dz: Float) -> Result<(), PidsError> {
        self.ensure_axis("zlad", nz, dz, "height above origin")
    }

    pub fn ensure_ncat_dim(&mut self, ncat: usize) -> Result<(), PidsError> {
        self.ensure_index_dim("ncat", ncat, Some("number of emission categories"))
    }

    pub fn ensure_nspecies_dim(&mut self, nspecies: usize) -> Result<(), PidsError> {
        self.ensure_index_dim("nspecies", nspecies, Some("number of emission species"))
    }

    pub fn ensure_composition_index_dim(&mut self, n: usize) -> Result<(), PidsError> {
        self.ensure_index_dim("composition_index", n, Some("aerosol composition index"))
    }

    /// Character positions of names, `1..=10`.
    pub fn ensure_strlen_dim(&mut self) -> Result<(), PidsError> {
        self.ensure_index_dim("strlen", MAX_NAME_LEN, None)
    }

    pub fn ensure_nhoursyear_dim(&mut self) -> Result<(), PidsError> {
        self.ensure_index_dim("nhoursyear", HOURS_PER_YEAR, Some("number of hours in a year"))
    }
}
