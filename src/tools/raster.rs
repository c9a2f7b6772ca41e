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

//! Module responsible for reading raster tiles stored
//! as NumPy `.npz` archives.
//!
//! A tile archive contains the raster itself (`R`), the pixel size
//! (`dPx`, north and east spacing, optionally followed by vertical spacing),
//! the global coordinates of the top-left corner (`GlobOrig`) and optionally
//! the grid rotation (`gridRot`).
//!
//! Two-dimensional rasters are stored row-wise from north to south,
//! that is `R[row, col]` with the origin in the top-left corner.
//! Three-dimensional rasters (building masks, leaf area density)
//! are stored as `R[x, y, z]`.

use crate::{errors::RasterError, Float};
use log::debug;
use ndarray::{s, Array2, Array3, ArrayD, Ix2, Ix3, IxDyn, OwnedRepr};
use ndarray_npy::NpzReader;
use std::{fs::File, io::Read, io::Seek, path::Path};

/// Raster tile with its geometry.
#[derive(Clone, PartialEq, Debug)]
pub struct RasterTile {
    pub values: ArrayD<Float>,
    pub spacing: Vec<Float>,
    pub origin: [Float; 2],
    pub rotation: Option<Float>,
}

impl RasterTile {
    pub fn new(values: ArrayD<Float>, spacing: Vec<Float>) -> Self {
        RasterTile {
            values,
            spacing,
            origin: [0.0, 0.0],
            rotation: None,
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    /// Returns `[ny, nx]` of the tile regardless of its rank.
    pub fn horizontal_shape(&self) -> [usize; 2] {
        let shape = self.shape();

        match shape.len() {
            0 => [0, 0],
            1 => [1, shape[0]],
            2 => [shape[0], shape[1]],
            _ => [shape[1], shape[0]],
        }
    }

    /// Spacing in north-south direction.
    pub fn spacing_y(&self) -> Float {
        self.spacing.first().copied().unwrap_or(1.0).abs()
    }

    /// Spacing in west-east direction.
    pub fn spacing_x(&self) -> Float {
        self.spacing
            .get(1)
            .copied()
            .unwrap_or_else(|| self.spacing_y())
            .abs()
    }

    /// Vertical spacing, when the tile does not carry one
    /// the north-south spacing is used.
    pub fn spacing_z(&self) -> Float {
        self.spacing
            .get(2)
            .copied()
            .unwrap_or_else(|| self.spacing_y())
            .abs()
    }

    /// Largest finite value of the raster.
    pub fn max_value(&self) -> Float {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(Float::NEG_INFINITY, Float::max)
    }

    /// Two-dimensional view of the raster as stored.
    pub fn to_2d(&self) -> Result<Array2<Float>, RasterError> {
        self.values
            .clone()
            .into_dimensionality::<Ix2>()
            .map_err(|_| RasterError::Dimensionality {
                expected: 2,
                found: self.ndim(),
            })
    }

    /// Two-dimensional raster with rows reversed so that the
    /// row index grows northward, as `y` does in PALM.
    pub fn north_up(&self) -> Result<Array2<Float>, RasterError> {
        let raster = self.to_2d()?;

        Ok(raster.slice(s![..;-1, ..]).to_owned())
    }

    /// Three-dimensional raster reordered from `(x, y, z)` to `(z, y, x)`.
    pub fn to_zyx(&self) -> Result<Array3<Float>, RasterError> {
        let raster = self
            .values
            .clone()
            .into_dimensionality::<Ix3>()
            .map_err(|_| RasterError::Dimensionality {
                expected: 3,
                found: self.ndim(),
            })?;

        Ok(raster.permuted_axes([2, 1, 0]).as_standard_layout().to_owned())
    }
}

/// Reads the raster tile from `.npz` archive.
pub fn read_tile(path: &Path) -> Result<RasterTile, RasterError> {
    debug!("Reading raster tile {}", path.display());

    let mut npz = NpzReader::new(File::open(path)?)?;
    let names = npz.names()?;

    let values = read_entry(&mut npz, &names, "R")?.ok_or(RasterError::MissingArray("R"))?;
    let spacing = read_entry(&mut npz, &names, "dPx")?
        .ok_or(RasterError::MissingArray("dPx"))?
        .iter()
        .copied()
        .collect::<Vec<Float>>();

    if spacing.is_empty() {
        return Err(RasterError::MissingArray("dPx"));
    }

    let origin = match read_entry(&mut npz, &names, "GlobOrig")? {
        Some(orig) if orig.len() >= 2 => {
            let orig: Vec<Float> = orig.iter().copied().collect();
            [orig[0], orig[1]]
        }
        _ => [0.0, 0.0],
    };

    let rotation = read_entry(&mut npz, &names, "gridRot")?.and_then(|r| r.iter().next().copied());

    debug!(
        "Raster tile shape {:?}, spacing {:?}",
        values.shape(),
        spacing
    );

    Ok(RasterTile {
        values,
        spacing,
        origin,
        rotation,
    })
}

/// Reads named array from the archive as floats.
///
/// NumPy stores arrays as `<name>.npy` inside the archive, both
/// spellings are accepted. Returns `None` when the entry is not present.
pub(crate) fn read_entry<R: Read + Seek>(
    npz: &mut NpzReader<R>,
    names: &[String],
    key: &'static str,
) -> Result<Option<ArrayD<Float>>, RasterError> {
    let with_ext = format!("{}.npy", key);

    let entry = match names.iter().find(|n| n.as_str() == key || **n == with_ext) {
        Some(entry) => entry.clone(),
        None => return Ok(None),
    };

    macro_rules! try_element {
        ($($t:ty),*) => {
            $(
                if let Ok(array) = npz.by_name::<OwnedRepr<$t>, IxDyn>(&entry) {
                    return Ok(Some(array.mapv(|v| v as Float)));
                }
            )*
        };
    }

    try_element!(f64, f32, i64, i32, i16, i8, u64, u32, u16, u8);

    if let Ok(array) = npz.by_name::<OwnedRepr<bool>, IxDyn>(&entry) {
        return Ok(Some(array.mapv(|v| if v { 1.0 } else { 0.0 })));
    }

    Err(RasterError::UnsupportedType(key))
}

#[cfg(test)]
mod tests {
    use super::{read_tile, RasterTile};
    use float_cmp::approx_eq;
    use ndarray::{arr1, arr2, Array3, IxDyn};
    use ndarray_npy::NpzWriter;
    use std::fs::File;

    #[test]
    fn reads_tile_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topo.npz");

        let mut npz = NpzWriter::new(File::create(&path).unwrap());
        npz.add_array("R.npy", &arr2(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]))
            .unwrap();
        npz.add_array("dPx.npy", &arr1(&[-2.0f64, 2.0])).unwrap();
        npz.add_array("GlobOrig.npy", &arr1(&[6_700_000.0f64, 25_000.0]))
            .unwrap();
        npz.finish().unwrap();

        let tile = read_tile(&path).unwrap();

        assert_eq!(tile.shape(), &[2, 3]);
        assert_eq!(tile.horizontal_shape(), [2, 3]);
        assert!(approx_eq!(f64, tile.spacing_y(), 2.0));
        assert!(approx_eq!(f64, tile.spacing_x(), 2.0));
        assert!(approx_eq!(f64, tile.spacing_z(), 2.0));
        assert!(approx_eq!(f64, tile.origin[0], 6_700_000.0));
        assert!(tile.rotation.is_none());
        assert!(approx_eq!(f64, tile.max_value(), 6.0));
    }

    #[test]
    fn missing_raster_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.npz");

        let mut npz = NpzWriter::new(File::create(&path).unwrap());
        npz.add_array("dPx", &arr1(&[1.0f64, 1.0])).unwrap();
        npz.finish().unwrap();

        assert!(read_tile(&path).is_err());
    }

    #[test]
    fn north_up_reverses_rows() {
        let tile = RasterTile::new(
            arr2(&[[1.0, 2.0], [3.0, 4.0]]).into_dyn(),
            vec![1.0, 1.0],
        );

        let flipped = tile.north_up().unwrap();

        assert_eq!(flipped, arr2(&[[3.0, 4.0], [1.0, 2.0]]));
        assert!(tile.to_zyx().is_err());
    }

    #[test]
    fn three_dimensional_tile_is_reordered() {
        let values = Array3::from_shape_fn((4, 3, 2), |(x, y, z)| (100 * x + 10 * y + z) as f64);
        let tile = RasterTile::new(values.into_dyn(), vec![1.0, 1.0, 0.5]);

        let zyx = tile.to_zyx().unwrap();

        assert_eq!(zyx.shape(), &[2, 3, 4]);
        assert!(approx_eq!(f64, zyx[[1, 2, 3]], 321.0));
        assert_eq!(tile.horizontal_shape(), [3, 4]);
        assert!(approx_eq!(f64, tile.spacing_z(), 0.5));
        assert!(tile.to_2d().is_err());
        assert_eq!(tile.values.dim(), IxDyn(&[4, 3, 2]));
    }
}
