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

//! Sub-module writing static PIDS variables: terrain, buildings,
//! surface classification and leaf area density.
//!
//! Two-dimensional tiles are flipped north-up before writing,
//! three-dimensional tiles are reordered to `(z, y, x)`.

use super::PidsDataset;
use crate::constants::{FILL_F32, FILL_I32, FILL_I8};
use crate::errors::PidsError;
use crate::tools::netcdf_io::variables::{convert, NcElement, VariableSpec};
use crate::tools::raster::RasterTile;
use log::info;

impl PidsDataset {
    /// Writes north-up 2D field on `(y, x)`.
    fn put_horizontal<T: NcElement>(
        &mut self,
        tile: &RasterTile,
        spec: VariableSpec,
        fill: T,
    ) -> Result<(), PidsError> {
        let raster = tile.north_up()?;

        self.ensure_x_dim(tile)?;
        self.ensure_y_dim(tile)?;

        let values = convert(raster.iter().copied(), fill);
        self.put_field(spec, &values, fill)
    }
}

/// Terrain height `zt`.
pub fn process_orography(ds: &mut PidsDataset, tile: &RasterTile) -> Result<(), PidsError> {
    info!("Processing orography");

    let spec = VariableSpec::variable("zt", &["y", "x"], "m").long_name("terrain_height");
    ds.put_horizontal(tile, spec, FILL_F32)
}

/// Buildings as heights (`buildings_2d`, lod 1) for 2D tiles
/// or as a flag mask (`buildings_3d`, lod 2) for 3D tiles.
pub fn process_buildings(ds: &mut PidsDataset, tile: &RasterTile) -> Result<(), PidsError> {
    match tile.ndim() {
        2 => {
            info!("Processing 2D buildings");

            let spec = VariableSpec::variable("buildings_2d", &["y", "x"], "m")
                .long_name("building_height")
                .lod(1);
            ds.put_horizontal(tile, spec, FILL_F32)
        }
        3 => {
            info!("Processing 3D buildings");

            let raster = tile.to_zyx()?;

            ds.ensure_x_dim(tile)?;
            ds.ensure_y_dim(tile)?;
            ds.ensure_z_dim(raster.shape()[0], tile.spacing_z())?;

            let spec = VariableSpec::variable("buildings_3d", &["z", "y", "x"], "")
                .long_name("building_flag")
                .lod(2);
            let values = convert(raster.iter().copied(), FILL_I8);
            ds.put_field(spec, &values, FILL_I8)
        }
        rank => Err(PidsError::BuildingsRank(rank)),
    }
}

pub fn process_building_ids(ds: &mut PidsDataset, tile: &RasterTile) -> Result<(), PidsError> {
    info!("Processing building ids");

    let spec = VariableSpec::variable("building_id", &["y", "x"], "").long_name("building id numbers");
    ds.put_horizontal(tile, spec, FILL_I32)
}

pub fn process_pavement_type(ds: &mut PidsDataset, tile: &RasterTile) -> Result<(), PidsError> {
    info!("Processing pavement type");

    let spec = VariableSpec::variable("pavement_type", &["y", "x"], "")
        .long_name("pavement type classification");
    ds.put_horizontal(tile, spec, FILL_I32)
}

pub fn process_vegetation_type(ds: &mut PidsDataset, tile: &RasterTile) -> Result<(), PidsError> {
    info!("Processing vegetation type");

    let spec = VariableSpec::variable("vegetation_type", &["y", "x"], "")
        .long_name("vegetation type classification");
    ds.put_horizontal(tile, spec, FILL_I32)
}

/// Leaf area density on `(zlad, y, x)`.
pub fn process_lad(ds: &mut PidsDataset, tile: &RasterTile) -> Result<(), PidsError> {
    info!("Processing leaf area density");

    let raster = tile.to_zyx()?;

    ds.ensure_x_dim(tile)?;
    ds.ensure_y_dim(tile)?;
    ds.ensure_zlad_dim(raster.shape()[0], tile.spacing_z())?;

    let spec = VariableSpec::variable("lad", &["zlad", "y", "x"], "m2 m-3")
        .long_name("leaf area density");
    let values = convert(raster.iter().copied(), FILL_F32);
    ds.put_field(spec, &values, FILL_F32)
}
