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

//! Conversion of a raster tile into NetCDF file, either
//! as a 3D topography mask or as a plain 2D field.

use crate::cli::RasterToNetcdfArgs;
use crate::constants::FILL_F32;
use crate::errors::{ConfigError, ToolError};
use crate::tools::netcdf_io::{
    create_output,
    variables::{
        convert, create_coordinate_axis, create_variable, fill_topography_array, VariableSpec,
    },
    write_and_close, OutputMode,
};
use crate::tools::raster::read_tile;
use crate::Float;
use log::info;

pub fn run(args: &RasterToNetcdfArgs) -> Result<(), ToolError> {
    let tile = read_tile(&args.filename)?;
    let raster = tile.to_2d()?;
    let (ny, nx) = raster.dim();

    let mask = !args.flat;

    info!("Input raster data:");
    info!("Size: [N,E] = [{}, {}]", ny, nx);
    info!(
        "Resolution: [dPy,dPx] = [{}, {}]",
        tile.spacing_y(),
        tile.spacing_x()
    );

    let mut file = create_output(&args.fileout, OutputMode::Write)?;

    create_coordinate_axis(&mut file, nx, tile.spacing_x(), "x", "m", None, args.compress)?;
    create_coordinate_axis(&mut file, ny, tile.spacing_y(), "y", "m", None, args.compress)?;

    if mask {
        let dz = args.dz.unwrap_or_else(|| tile.spacing_y());
        let nz = match args.nz {
            Some(nz) => nz,
            None => vertical_levels(tile.max_value(), dz),
        };

        if nz == 0 {
            return Err(ConfigError::OutOfBounds("Number of vertical levels cannot be 0").into());
        }

        info!("Vertical levels: {} with dz = {}", nz, dz);

        create_coordinate_axis(&mut file, nz, dz, "z", "m", None, args.compress)?;

        let topo = fill_topography_array(raster.view(), nz, dz);

        let spec = VariableSpec::variable(&args.varname, &["z", "y", "x"], "m")
            .lod(2)
            .zlib(args.compress);
        create_variable(&mut file, &spec, &topo.into_raw_vec(), None)?;
    } else {
        let spec = VariableSpec::variable(&args.varname, &["y", "x"], "m").zlib(args.compress);
        let values = convert(raster.iter().copied(), FILL_F32);
        create_variable(&mut file, &spec, &values, Some(FILL_F32))?;
    }

    write_and_close(file);

    Ok(())
}

/// Number of levels needed to cover the highest point.
fn vertical_levels(max_height: Float, dz: Float) -> usize {
    let levels = (max_height / dz).round();

    if levels.is_finite() && levels > 0.0 {
        levels as usize
    } else {
        0
    }
}
