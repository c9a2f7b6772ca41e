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

//! Summary of a raster tile: dimensions, origin and resolution.

use crate::errors::ToolError;
use crate::tools::raster::{read_tile, RasterTile};
use crate::Float;
use log::info;
use std::path::Path;

pub fn run(path: &Path) -> Result<(), ToolError> {
    let tile = read_tile(path)?;

    for line in describe(&tile) {
        info!("{}", line);
    }

    Ok(())
}

/// Lines describing the tile.
fn describe(tile: &RasterTile) -> Vec<String> {
    let mut lines = vec![
        format!("Dimensions [rows, cols] = {:?}", tile.shape()),
        format!("Origin [N, E] = [{}, {}]", tile.origin[0], tile.origin[1]),
        format!("Resolution = {:?}", tile.spacing),
    ];

    if let Some(rotation) = tile.rotation {
        lines.push(format!("Grid rotation [deg] = {}", rotation));
    }

    let (min, max) = tile
        .values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((Float::INFINITY, Float::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if min <= max {
        lines.push(format!("Value range = [{}, {}]", min, max));
    }

    lines
}
