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

//! Sub-module responsible for creating NetCDF variables
//! with their dimensions, attributes and fill values.

use crate::Float;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use ndarray::{Array3, ArrayView2};
use netcdf::types::NcVariableType;
use netcdf::{FileMut, NcTypeDescriptor, VariableMut};

/// Element types that can be stored in NetCDF variables
/// created by the tools.
pub trait NcElement: Copy + NcTypeDescriptor {
    /// Name of the external type, as used by PALM documentation.
    const TYPE_NAME: &'static str;

    fn define<'f>(
        file: &'f mut FileMut,
        name: &str,
        dims: &[&str],
    ) -> Result<VariableMut<'f>, netcdf::Error>;

    fn set_fill(var: &mut VariableMut<'_>, fill: Self) -> Result<(), netcdf::Error>;

    fn write(var: &mut VariableMut<'_>, values: &[Self]) -> Result<(), netcdf::Error>;

    /// Converts floating point data, `NaN` is mapped to `fill`.
    fn from_float(value: Float, fill: Self) -> Self;
}

macro_rules! impl_nc_element {
    ($t:ty, $type_name:literal, $v:ident => $convert:expr) => {
        impl NcElement for $t {
            const TYPE_NAME: &'static str = $type_name;

            fn define<'f>(
                file: &'f mut FileMut,
                name: &str,
                dims: &[&str],
            ) -> Result<VariableMut<'f>, netcdf::Error> {
                file.add_variable::<$t>(name, dims)
            }

            fn set_fill(var: &mut VariableMut<'_>, fill: Self) -> Result<(), netcdf::Error> {
                var.set_fill_value(fill)
            }

            fn write(var: &mut VariableMut<'_>, values: &[Self]) -> Result<(), netcdf::Error> {
                var.put_values(values, ..)
            }

            fn from_float($v: Float, fill: Self) -> Self {
                if $v.is_nan() {
                    fill
                } else {
                    $convert
                }
            }
        }
    };
}

impl_nc_element!(f32, "f4", v => v as f32);
impl_nc_element!(f64, "f8", v => v);
impl_nc_element!(i8, "b", v => v.round() as i8);
impl_nc_element!(i32, "i4", v => v.round() as i32);
impl_nc_element!(u16, "u2", v => v.round() as u16);

/// Converts floating point data into element type of the variable.
pub fn convert<T: NcElement>(values: impl IntoIterator<Item = Float>, fill: T) -> Vec<T> {
    values.into_iter().map(|v| T::from_float(v, fill)).collect()
}

/// Description of the variable to create.
///
/// `coordinate` marks an independent variable (parameter), for which
/// a dimension of the same name and length is created first.
#[derive(Clone, PartialEq, Debug)]
pub struct VariableSpec<'a> {
    pub name: &'a str,
    pub dims: Vec<&'a str>,
    pub units: &'a str,
    pub long_name: Option<&'a str>,
    pub standard_name: Option<&'a str>,
    pub lod: Option<i32>,
    pub coordinate: bool,
    pub zlib: bool,
}

impl<'a> VariableSpec<'a> {
    pub fn variable(name: &'a str, dims: &[&'a str], units: &'a str) -> Self {
        VariableSpec {
            name,
            dims: dims.to_vec(),
            units,
            long_name: None,
            standard_name: None,
            lod: None,
            coordinate: false,
            zlib: false,
        }
    }

    pub fn coordinate(name: &'a str, units: &'a str) -> Self {
        VariableSpec {
            coordinate: true,
            ..VariableSpec::variable(name, &[name], units)
        }
    }

    pub fn long_name(mut self, long_name: &'a str) -> Self {
        self.long_name = Some(long_name);
        self
    }

    pub fn standard_name(mut self, standard_name: &'a str) -> Self {
        self.standard_name = Some(standard_name);
        self
    }

    pub fn lod(mut self, lod: i32) -> Self {
        self.lod = Some(lod);
        self
    }

    pub fn zlib(mut self, zlib: bool) -> Self {
        self.zlib = zlib;
        self
    }
}

/// Creates the variable (and its dimension if it is a coordinate)
/// and writes the values.
///
/// Fill value and compression must be set before any data is written,
/// so they are applied right after definition.
pub fn create_variable<T: NcElement>(
    file: &mut FileMut,
    spec: &VariableSpec,
    values: &[T],
    fill: Option<T>,
) -> Result<(), netcdf::Error> {
    if spec.coordinate {
        file.add_dimension(spec.name, values.len())?;
    }

    let mut var = T::define(file, spec.name, &spec.dims)?;

    if spec.zlib {
        var.set_compression(4, true)?;
    }

    if let Some(fill) = fill {
        T::set_fill(&mut var, fill)?;
    }

    put_attributes(&mut var, spec)?;
    T::write(&mut var, values)?;

    report_created(spec, T::TYPE_NAME);

    Ok(())
}

/// Single character of a `NC_CHAR` variable.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct NcChar(pub u8);

unsafe impl NcTypeDescriptor for NcChar {
    fn type_descriptor() -> NcVariableType {
        NcVariableType::Char
    }
}

/// Lays names out as rows of `width` characters padded with `NUL`,
/// longer names are cut at `width` bytes.
pub fn char_rows(names: &[String], width: usize) -> Vec<NcChar> {
    names
        .iter()
        .flat_map(|name| {
            name.bytes()
                .chain(std::iter::repeat(0))
                .take(width)
                .map(NcChar)
        })
        .collect()
}

/// Reads a row of characters back into a string, stopping at the first `NUL`.
pub fn row_to_string(row: &[NcChar]) -> String {
    let bytes: Vec<u8> = row.iter().map(|c| c.0).take_while(|&b| b != 0).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Creates a character array variable, the last dimension
/// is the string length.
pub fn create_char_variable(
    file: &mut FileMut,
    spec: &VariableSpec,
    values: &[NcChar],
) -> Result<(), netcdf::Error> {
    let mut var = file.add_variable::<NcChar>(spec.name, &spec.dims)?;

    if spec.zlib {
        var.set_compression(4, true)?;
    }

    put_attributes(&mut var, spec)?;
    var.put_values(values, ..)?;

    report_created(spec, "S1");

    Ok(())
}

/// Replaces values of already existing variable.
pub fn overwrite_values<T: NcTypeDescriptor>(
    file: &mut FileMut,
    name: &str,
    values: &[T],
) -> Result<bool, netcdf::Error> {
    match file.variable_mut(name) {
        Some(mut var) => {
            debug!("Overwriting values of existing variable {}", name);
            var.put_values(values, ..)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Creates coordinate axis with `n` points separated by `spacing`,
/// starting from zero.
pub fn create_coordinate_axis(
    file: &mut FileMut,
    n: usize,
    spacing: Float,
    name: &str,
    units: &str,
    long_name: Option<&str>,
    zlib: bool,
) -> Result<(), netcdf::Error> {
    let axis = coordinate_values(n, spacing);

    let mut spec = VariableSpec::coordinate(name, units).zlib(zlib);
    spec.long_name = long_name;

    create_variable(file, &spec, &axis, None)
}

pub fn coordinate_values(n: usize, spacing: Float) -> Vec<f32> {
    (0..n).map(|i| (i as Float * spacing) as f32).collect()
}

fn put_attributes(var: &mut VariableMut<'_>, spec: &VariableSpec) -> Result<(), netcdf::Error> {
    var.put_attribute("units", spec.units)?;

    if let Some(long_name) = spec.long_name {
        var.put_attribute("long_name", long_name)?;
    }

    if let Some(standard_name) = spec.standard_name {
        var.put_attribute("standard_name", standard_name)?;
    }

    if let Some(lod) = spec.lod {
        var.put_attribute("lod", lod)?;
    }

    Ok(())
}

fn report_created(spec: &VariableSpec, type_name: &str) {
    let kind = if spec.coordinate {
        "parameter"
    } else {
        "variable"
    };

    info!(
        "NetCDF {} {} ({}) successfully created",
        kind, spec.name, type_name
    );
}

/// Fills 3D `(z, y, x)` mask from 2D topography raster:
/// cells below the terrain/building height are set to `1`, cells above to `0`.
///
/// Raster rows go from north to south, so they are read bottom-up
/// to get `y` growing northward. Column heights are rounded to
/// the nearest level and clamped to `[0, nz]`.
pub fn fill_topography_array(topo: ArrayView2<Float>, nz: usize, dz: Float) -> Array3<i32> {
    let (ny, nx) = topo.dim();
    let mut mask = Array3::<i32>::zeros((nz, ny, nx));

    info!("Filling 3D array from topography data");
    info!("Dimensions [z,y,x]: [{}, {}, {}]", nz, ny, nx);
    info!("Total number of data points: {}", nz * ny * nx);

    let columns_bar = ProgressBar::new(nx as u64);
    columns_bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    columns_bar.set_prefix("Filled columns");

    for x in 0..nx {
        for y in 0..ny {
            let height = topo[[ny - 1 - y, x]];
            let top = column_top(height, dz, nz);

            for z in 0..top {
                mask[[z, y, x]] = 1;
            }
        }
        columns_bar.inc(1);
    }

    columns_bar.finish_with_message("done");

    mask
}

fn column_top(height: Float, dz: Float, nz: usize) -> usize {
    let levels = (height / dz).round();

    if levels.is_nan() || levels <= 0.0 {
        0
    } else {
        (levels as usize).min(nz)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        char_rows, convert, coordinate_values, create_char_variable, create_coordinate_axis,
        create_variable, fill_topography_array, overwrite_values, row_to_string, NcChar,
        VariableSpec,
    };
    use float_cmp::approx_eq;
    use ndarray::arr2;

    #[test]
    fn topography_mask() {
        // top row is the northern edge
        let topo = arr2(&[[4.0, 0.0], [1.0, 100.0]]);

        let mask = fill_topography_array(topo.view(), 3, 1.0);

        assert_eq!(mask.shape(), &[3, 2, 2]);
        // southern row (y = 0)
        assert_eq!(mask.slice(ndarray::s![.., 0, 0]).to_vec(), vec![1, 0, 0]);
        assert_eq!(mask.slice(ndarray::s![.., 0, 1]).to_vec(), vec![1, 1, 1]);
        // northern row (y = 1)
        assert_eq!(mask.slice(ndarray::s![.., 1, 0]).to_vec(), vec![1, 1, 1]);
        assert_eq!(mask.slice(ndarray::s![.., 1, 1]).to_vec(), vec![0, 0, 0]);
    }

    #[test]
    fn negative_and_missing_heights_are_empty() {
        let topo = arr2(&[[-3.0, f64::NAN]]);

        let mask = fill_topography_array(topo.view(), 2, 1.0);

        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn conversion_uses_fill_for_nan() {
        let converted: Vec<i32> = convert(vec![1.4, f64::NAN, 2.6], -9999);
        assert_eq!(converted, vec![1, -9999, 3]);

        let axis = coordinate_values(3, 2.5);
        assert!(approx_eq!(f32, axis[2], 5.0));
    }

    #[test]
    fn creates_variables_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.nc");

        {
            let mut file = netcdf::create(&path).unwrap();

            create_coordinate_axis(&mut file, 3, 2.0, "x", "m", Some("distance"), true).unwrap();
            create_coordinate_axis(&mut file, 2, 2.0, "y", "m", None, false).unwrap();

            let spec = VariableSpec::variable("zt", &["y", "x"], "m")
                .long_name("terrain_height")
                .lod(1);
            let values: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
            create_variable(&mut file, &spec, &values, Some(-9999.9f32)).unwrap();

            file.add_dimension("strlen", 4).unwrap();
            let spec = VariableSpec::variable("names", &["x", "strlen"], "");
            let names = vec!["a".to_string(), "bb".to_string(), "ccccc".to_string()];
            create_char_variable(&mut file, &spec, &char_rows(&names, 4)).unwrap();

            let replaced: Vec<f32> = vec![0.0; 6];
            assert!(overwrite_values(&mut file, "zt", &replaced).unwrap());
            assert!(!overwrite_values(&mut file, "missing", &replaced).unwrap());
        }

        let file = netcdf::open(&path).unwrap();
        let zt = file.variable("zt").unwrap();
        let values: Vec<f32> = zt.get_values(..).unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
        assert_eq!(file.dimension("x").unwrap().len(), 3);

        let x: Vec<f32> = file.variable("x").unwrap().get_values(..).unwrap();
        assert_eq!(x, vec![0.0, 2.0, 4.0]);

        let names: Vec<NcChar> = file.variable("names").unwrap().get_values(..).unwrap();
        assert_eq!(names.len(), 12);
        assert_eq!(row_to_string(&names[0..4]), "a");
        assert_eq!(row_to_string(&names[8..12]), "cccc");
    }

    #[test]
    fn names_are_padded_rows() {
        let rows = char_rows(&["ab".to_string(), "xyz".to_string()], 3);

        let bytes: Vec<u8> = rows.iter().map(|c| c.0).collect();
        assert_eq!(bytes, vec![b'a', b'b', 0, b'x', b'y', b'z']);
    }
}
