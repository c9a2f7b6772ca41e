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

//! Module responsible for reading PALM NetCDF output
//! and preparing NetCDF files for writing.
//!
//! All variables are read as floating point arrays, values equal
//! to `_FillValue` (or `missing_value`) are replaced with `NaN`.
//! Arrays can be coarsened, that is every `n`-th point is taken
//! along the spatial axes, and cropped with left/right offsets.

pub mod interpolation;
pub mod variables;

use crate::{errors::NetcdfIoError, Float};
use log::{debug, info, warn};
use ndarray::{Array1, ArrayD, Axis, IxDyn, Slice};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Opened NetCDF dataset with the lists of its
/// variables and dimensions.
pub struct Dataset {
    file: netcdf::File,
    pub path: PathBuf,
    pub variables: Vec<String>,
    pub dimensions: Vec<String>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("variables", &self.variables)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl Dataset {
    /// Opens the dataset for reading and collects names
    /// of its variables and dimensions.
    pub fn open(path: &Path) -> Result<Self, NetcdfIoError> {
        debug!("Opening NetCDF dataset {}", path.display());

        let file = netcdf::open(path)?;

        let variables: Vec<String> = file.variables().map(|v| v.name()).collect();
        let dimensions: Vec<String> = file.dimensions().map(|d| d.name()).collect();

        if variables.is_empty() {
            return Err(NetcdfIoError::EmptyListing("Variables"));
        }

        if dimensions.is_empty() {
            return Err(NetcdfIoError::EmptyListing("Dimensions"));
        }

        info!("Variable list: {:?}", variables);
        info!("Dimension list: {:?}", dimensions);

        Ok(Dataset {
            file,
            path: path.to_path_buf(),
            variables,
            dimensions,
        })
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    pub(crate) fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>, NetcdfIoError> {
        self.file
            .variable(name)
            .ok_or_else(|| NetcdfIoError::MissingVariable {
                name: name.to_string(),
                available: self.variables.clone(),
            })
    }

    /// Names of dimensions of the variable in storage order.
    pub fn variable_dimensions(&self, name: &str) -> Result<Vec<String>, NetcdfIoError> {
        let var = self.variable(name)?;

        Ok(var.dimensions().iter().map(|d| d.name()).collect())
    }
}

/// Variable read from a dataset together with coordinates
/// of its dimensions.
#[derive(Clone, PartialEq, Debug)]
pub struct FieldData {
    pub name: String,
    pub values: ArrayD<Float>,
    pub dimensions: Vec<String>,
    pub coords: FxHashMap<String, Array1<Float>>,
}

impl FieldData {
    pub fn coord(&self, key: &str) -> Option<&Array1<Float>> {
        self.coords.get(key)
    }
}

/// How the output file should be opened.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OutputMode {
    /// Create a new file, replacing the existing one.
    Write,
    /// Open an existing file for modification.
    Append,
}

/// Creates (or opens) a NetCDF-4 file for writing.
pub fn create_output(path: &Path, mode: OutputMode) -> Result<netcdf::FileMut, NetcdfIoError> {
    debug!("Opening output {} in {:?} mode", path.display(), mode);

    let file = match mode {
        OutputMode::Write => netcdf::create(path)?,
        OutputMode::Append => netcdf::append(path)?,
    };

    Ok(file)
}

/// Finishes writing, the data is flushed when the file handle is dropped.
pub fn write_and_close(file: netcdf::FileMut) {
    info!("Writing of output data ...");
    drop(file);
    info!("... done. File closed.");
}

/// Reads 1D variable and crops it with left and right offsets,
/// then takes every `coarsening`-th point.
///
/// Right offset equal to zero means no cropping on the right.
pub fn read_1d_variable(
    ds: &Dataset,
    name: &str,
    left_offset: usize,
    right_offset: usize,
    coarsening: usize,
) -> Result<Array1<Float>, NetcdfIoError> {
    if coarsening == 0 {
        return Err(NetcdfIoError::ZeroCoarsening);
    }

    debug!("Reading variable {}", name);

    let var = ds.variable(name)?;
    let values = read_as_float(&var)?;
    let values = values
        .into_dimensionality::<ndarray::Ix1>()
        .map_err(|_| NetcdfIoError::IncompatibleShape(name.to_string()))?;

    let len = values.len();

    if left_offset + right_offset >= len {
        return Err(NetcdfIoError::EmptySelection {
            name: name.to_string(),
            left: left_offset,
            right: right_offset,
        });
    }

    let cropped = values.slice_axis(
        Axis(0),
        Slice::new(left_offset as isize, Some((len - right_offset) as isize), coarsening as isize),
    );

    Ok(cropped.to_owned())
}

/// Reads a variable with coordinates of all its dimensions,
/// coarsening spatial axes.
///
/// Leading axis is treated as time (and kept intact) when the variable
/// is 4D or when one of its dimensions is called `time`.
/// Time coordinates are never coarsened.
pub fn read_variable(
    ds: &Dataset,
    name: &str,
    coarsening: usize,
) -> Result<FieldData, NetcdfIoError> {
    if coarsening == 0 {
        return Err(NetcdfIoError::ZeroCoarsening);
    }

    let var = ds.variable(name)?;
    let dimensions: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();

    let values = read_as_float(&var)?;

    let keep_leading =
        values.ndim() == 4 || (values.ndim() <= 3 && dimensions.iter().any(|d| d == "time"));

    let values = values
        .slice_each_axis(|ax| {
            if ax.axis.index() == 0 && keep_leading {
                Slice::from(..)
            } else {
                Slice::new(0, None, coarsening as isize)
            }
        })
        .to_owned();

    let mut coords = FxHashMap::default();

    for (i, dim_name) in dimensions.iter().enumerate() {
        let coord = if ds.has_variable(dim_name) {
            let coord_var = ds.variable(dim_name)?;
            read_as_float(&coord_var)?
                .into_dimensionality::<ndarray::Ix1>()
                .map_err(|_| NetcdfIoError::IncompatibleShape(dim_name.clone()))?
        } else {
            warn!(
                "Dimension {} has no coordinate variable, using indices",
                dim_name
            );
            let len = var.dimensions()[i].len();
            Array1::from_iter((0..len).map(|i| i as Float))
        };

        let coord = if dim_name.contains("time") {
            coord
        } else {
            coord
                .slice_axis(Axis(0), Slice::new(0, None, coarsening as isize))
                .to_owned()
        };

        coords.insert(dim_name.clone(), coord);
    }

    Ok(FieldData {
        name: name.to_string(),
        values,
        dimensions,
        coords,
    })
}

/// Reads a 4D `(time, z, y, x)` variable (or 3D `(z, y, x)` time-averaged
/// one when `mean_on`) and crops it.
///
/// Spatial offsets are given in points of the original grid
/// and are divided by the coarsening level. Right offset equal to
/// zero means no cropping on the right.
pub fn read_3d_variable(
    ds: &Dataset,
    name: &str,
    time_offset: usize,
    left_offset: usize,
    right_offset: usize,
    coarsening: usize,
    mean_on: bool,
) -> Result<FieldData, NetcdfIoError> {
    debug!("Reading variable {}", name);

    let mut field = read_variable(ds, name, coarsening)?;

    let expected_rank = if mean_on { 3 } else { 4 };

    if field.values.ndim() != expected_rank {
        return Err(NetcdfIoError::IncompatibleShape(name.to_string()));
    }

    let left = left_offset / coarsening;
    let right = right_offset / coarsening;
    let first_spatial = if mean_on { 0 } else { 1 };

    for (axis, &len) in field.values.shape().iter().enumerate() {
        let empty = if axis < first_spatial {
            time_offset >= len
        } else {
            left + right >= len
        };

        if empty {
            return Err(NetcdfIoError::EmptySelection {
                name: name.to_string(),
                left,
                right,
            });
        }
    }

    field.values = field
        .values
        .slice_each_axis(|ax| {
            if ax.axis.index() < first_spatial {
                Slice::new(time_offset as isize, None, 1)
            } else {
                Slice::new(left as isize, Some((ax.len - right) as isize), 1)
            }
        })
        .to_owned();

    for (axis, dim_name) in field.dimensions.iter().enumerate() {
        if let Some(coord) = field.coords.get_mut(dim_name) {
            let (start, end) = if axis < first_spatial {
                (time_offset, coord.len())
            } else {
                (left, coord.len().saturating_sub(right))
            };

            if start < end {
                *coord = coord.slice(ndarray::s![start..end]).to_owned();
            }
        }
    }

    Ok(field)
}

/// Reads variable from the file with its coordinates renamed
/// to `time`, `x`, `y` and `z` for easier postprocessing,
/// e.g. `zu_xy` becomes `z` and `xu` becomes `x`.
///
/// Missing (`NaN`) coordinate values are set to zero.
pub fn read_3d_data(path: &Path, name: &str, coarsening: usize) -> Result<FieldData, NetcdfIoError> {
    let ds = Dataset::open(path)?;

    info!("Extracting {} from dataset in {}", name, path.display());

    let field = read_variable(&ds, name, coarsening)?;

    info!("{}_dims = {:?}", name, field.values.shape());

    let mut coords = FxHashMap::default();

    for (dim_name, mut coord) in field.coords {
        coord.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
        coords.insert(canonical_coordinate_name(&dim_name).to_string(), coord);
    }

    Ok(FieldData { coords, ..field })
}

/// Maps PALM dimension names to one of `time`, `x`, `y`, `z`.
pub fn canonical_coordinate_name(name: &str) -> &str {
    if name.contains("time") {
        "time"
    } else if name.starts_with('x') {
        "x"
    } else if name.starts_with('y') {
        "y"
    } else if name.starts_with('z') {
        "z"
    } else {
        name
    }
}

/// Reads whole variable as array of floats with fill values set to `NaN`.
fn read_as_float(var: &netcdf::Variable) -> Result<ArrayD<Float>, NetcdfIoError> {
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let values: Vec<Float> = var.get_values::<Float, _>(..)?;

    let mut array = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|_| NetcdfIoError::IncompatibleShape(var.name()))?;

    for attr in ["_FillValue", "missing_value"] {
        if let Some(fill) = get_float_attr(var, attr) {
            array.mapv_inplace(|v| if v == fill { Float::NAN } else { v });
        }
    }

    Ok(array)
}

fn get_float_attr(var: &netcdf::Variable, name: &str) -> Option<Float> {
    use netcdf::AttributeValue as Value;

    let value = match var.attribute_value(name)?.ok()? {
        Value::Double(v) => v,
        Value::Float(v) => v as Float,
        Value::Int(v) => v as Float,
        Value::Short(v) => v as Float,
        Value::Schar(v) => v as Float,
        Value::Uchar(v) => v as Float,
        Value::Ushort(v) => v as Float,
        Value::Uint(v) => v as Float,
        Value::Longlong(v) => v as Float,
        Value::Ulonglong(v) => v as Float,
        _ => return None,
    };

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::{
        canonical_coordinate_name, read_1d_variable, read_3d_data, read_3d_variable,
        read_variable, Dataset,
    };
    use crate::errors::NetcdfIoError;
    use float_cmp::approx_eq;
    use std::path::Path;

    /// Writes a small PALM-like output file with a staggered `u`.
    fn write_sample(path: &Path) {
        let mut file = netcdf::create(path).unwrap();

        file.add_dimension("time", 2).unwrap();
        file.add_dimension("zu_3d", 4).unwrap();
        file.add_dimension("y", 6).unwrap();
        file.add_dimension("xu", 8).unwrap();

        let time: Vec<f64> = vec![0.0, 60.0];
        let z: Vec<f32> = vec![0.0, 1.0, 3.0, 5.0];
        let y: Vec<f32> = (0..6).map(|i| 2.0 * i as f32 + 1.0).collect();
        let x: Vec<f32> = (0..8).map(|i| 2.0 * i as f32).collect();

        file.add_variable::<f64>("time", &["time"])
            .unwrap()
            .put_values(&time, ..)
            .unwrap();
        file.add_variable::<f32>("zu_3d", &["zu_3d"])
            .unwrap()
            .put_values(&z, ..)
            .unwrap();
        file.add_variable::<f32>("y", &["y"])
            .unwrap()
            .put_values(&y, ..)
            .unwrap();
        file.add_variable::<f32>("xu", &["xu"])
            .unwrap()
            .put_values(&x, ..)
            .unwrap();

        let u: Vec<f32> = (0..(2 * 4 * 6 * 8)).map(|i| i as f32).collect();
        let mut u_var = file
            .add_variable::<f32>("u", &["time", "zu_3d", "y", "xu"])
            .unwrap();
        u_var.set_fill_value(-9999.0f32).unwrap();
        u_var.put_values(&u, ..).unwrap();
    }

    #[test]
    fn opens_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.nc");
        write_sample(&path);

        let ds = Dataset::open(&path).unwrap();

        assert!(ds.has_variable("u"));
        assert!(ds.dimensions.contains(&"zu_3d".to_string()));
        assert_eq!(
            ds.variable_dimensions("u").unwrap(),
            vec!["time", "zu_3d", "y", "xu"]
        );
        assert!(matches!(
            read_variable(&ds, "w", 1),
            Err(NetcdfIoError::MissingVariable { .. })
        ));
    }

    #[test]
    fn reads_1d_with_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.nc");
        write_sample(&path);
        let ds = Dataset::open(&path).unwrap();

        let x = read_1d_variable(&ds, "xu", 1, 2, 2).unwrap();
        assert_eq!(x.to_vec(), vec![2.0, 6.0, 10.0]);

        let x = read_1d_variable(&ds, "xu", 0, 0, 1).unwrap();
        assert_eq!(x.len(), 8);

        assert!(read_1d_variable(&ds, "xu", 4, 4, 1).is_err());
    }

    #[test]
    fn coarsening_keeps_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.nc");
        write_sample(&path);
        let ds = Dataset::open(&path).unwrap();

        let field = read_variable(&ds, "u", 2).unwrap();

        assert_eq!(field.values.shape(), &[2, 2, 3, 4]);
        assert_eq!(field.coord("time").unwrap().len(), 2);
        assert_eq!(field.coord("xu").unwrap().to_vec(), vec![0.0, 4.0, 8.0, 12.0]);
        assert!(approx_eq!(f64, field.values[[1, 1, 1, 1]], 192.0 + 96.0 + 16.0 + 2.0));
    }

    #[test]
    fn crops_3d_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.nc");
        write_sample(&path);
        let ds = Dataset::open(&path).unwrap();

        let field = read_3d_variable(&ds, "u", 1, 1, 1, 1, false).unwrap();

        assert_eq!(field.values.shape(), &[1, 2, 4, 6]);
        assert!(approx_eq!(f64, field.values[[0, 0, 0, 0]], 192.0 + 48.0 + 8.0 + 1.0));
        assert_eq!(field.coord("xu").unwrap().len(), 6);

        assert!(read_3d_variable(&ds, "u", 0, 0, 0, 1, true).is_err());
    }

    #[test]
    fn renames_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.nc");
        write_sample(&path);

        let field = read_3d_data(&path, "u", 1).unwrap();

        for key in ["time", "x", "y", "z"] {
            assert!(field.coord(key).is_some(), "missing {}", key);
        }
        assert_eq!(field.coord("z").unwrap().len(), 4);
    }

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_coordinate_name("zu_xy"), "z");
        assert_eq!(canonical_coordinate_name("xu"), "x");
        assert_eq!(canonical_coordinate_name("yv"), "y");
        assert_eq!(canonical_coordinate_name("time"), "time");
        assert_eq!(canonical_coordinate_name("ncat"), "ncat");
    }
}
