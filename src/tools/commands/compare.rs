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

//! Level by level comparison of a variable stored in two NetCDF files.
//!
//! For every selected vertical level the horizontal slices of both fields
//! are compared and the root-mean-square and skewness of their difference
//! are reported. Points where both fields are equal are left out of the sums
//! (but still counted), points missing in either field are left out entirely.

use crate::cli::{CompareArgs, DiffMode};
use crate::constants::{DIFF_EPS, NMSD_EPS};
use crate::errors::{CompareError, ToolError};
use crate::tools::netcdf_io::{read_3d_data, FieldData};
use crate::Float;
use float_cmp::approx_eq;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use ndarray::{s, Array1, ArrayD, ArrayView2, Axis, Ix3, Ix4, Zip};
use std::fs::File;
use std::ops::Range;
use std::path::Path;

/// Quantity compared, derived from the variable name.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum FieldKind {
    Plain,
    HorizontalSpeed,
    HorizontalDirection,
}

impl FieldKind {
    fn from_name(varname: &str) -> Self {
        let upper = varname.to_uppercase();

        if upper.contains("UD") {
            FieldKind::HorizontalDirection
        } else if upper.contains("UH") {
            FieldKind::HorizontalSpeed
        } else {
            FieldKind::Plain
        }
    }
}

/// Statistics of the difference on one level.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct LevelStats {
    pub rms: Float,
    pub skewness: Float,
    pub count: usize,
}

pub fn run(args: &CompareArgs) -> Result<(), ToolError> {
    compare(args, Path::new("."))
}

/// Compares the files and writes the RMS table, if requested, into `table_dir`.
fn compare(args: &CompareArgs, table_dir: &Path) -> Result<(), ToolError> {
    let vn = args.varname.split('_').next().unwrap_or(&args.varname);
    let kind = FieldKind::from_name(&args.varname);

    let (mut v1, z1) = load_field(&args.file1, &args.varname, kind)?;
    let (mut v2, z2) = load_field(&args.file2, &args.varname, kind)?;

    if kind != FieldKind::HorizontalDirection {
        normalize(&mut v1, args.vref[0], args.vstar[0]);
        normalize(&mut v2, args.vref[1], args.vstar[1]);
    }

    if v1.shape() == v2.shape() {
        info!("Dimensions of the two datasets match: dims = {:?}", v1.shape());
    } else {
        warn!(
            "Dataset dimensions do not match: dims_1 = {:?} vs. dims_2 = {:?}",
            v1.shape(),
            v2.shape()
        );
    }

    let levels: Vec<usize> = match &args.levels {
        Some(levels) => levels.clone(),
        None => (0..z1.len()).collect(),
    };

    let mut table = if args.write_rms {
        let path = table_dir.join(format!("RMS_d{}.dat", vn));
        Some(RmsTable::create(&path, &args.file1, &args.file2, vn)?)
    } else {
        None
    };

    let levels_bar = ProgressBar::new(levels.len() as u64);
    levels_bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    levels_bar.set_prefix("Compared levels");

    for k1 in levels {
        levels_bar.inc(1);

        if k1 >= z1.len() {
            return Err(CompareError::LevelIndex {
                index: k1,
                count: z1.len(),
            }
            .into());
        }

        let k2 = match z2.iter().position(|&z| approx_eq!(Float, z, z1[k1], ulps = 4)) {
            Some(k2) => k2,
            None => {
                warn!(
                    "Coordinate {} not in file {}. Skipping.",
                    z1[k1],
                    args.file2.display()
                );
                continue;
            }
        };

        let l1 = cropped_level(&v1, k1, &args.nexcl)?;
        let l2 = cropped_level(&v2, k2, &args.nexcl)?;

        if l1.shape() != l2.shape() {
            return Err(
                CompareError::LevelShapes(l1.shape().to_vec(), l2.shape().to_vec()).into(),
            );
        }

        let stats = level_statistics(l1, l2, args.mode);

        info!(
            "z = {}: RMS (d{}) = {}, Sk(d{}) = {}",
            z1[k1], vn, stats.rms, vn, stats.skewness
        );

        if let Some(table) = table.as_mut() {
            table.write(z1[k1], stats.rms)?;
        }
    }

    levels_bar.finish_with_message("done");

    if let Some(table) = table {
        table.finish()?;
    }

    Ok(())
}

/// Reads the field and its `z` coordinate.
fn load_field(
    path: &Path,
    varname: &str,
    kind: FieldKind,
) -> Result<(ArrayD<Float>, Array1<Float>), CompareError> {
    match kind {
        FieldKind::Plain => {
            let field = read_3d_data(path, varname, 1)?;
            let z = z_coordinate(&field)?;
            Ok((field.values, z))
        }
        FieldKind::HorizontalSpeed => horizontal_wind(path, false),
        FieldKind::HorizontalDirection => horizontal_wind(path, true),
    }
}

fn z_coordinate(field: &FieldData) -> Result<Array1<Float>, CompareError> {
    field
        .coord("z")
        .cloned()
        .ok_or(CompareError::MissingCoordinate("z"))
}

/// Horizontal wind speed (or direction in degrees) from `u_xy` and `v_xy`
/// moved to common points.
fn horizontal_wind(
    path: &Path,
    direction: bool,
) -> Result<(ArrayD<Float>, Array1<Float>), CompareError> {
    let u = read_3d_data(path, "u_xy", 1)?;
    let v = read_3d_data(path, "v_xy", 1)?;

    let zu = z_coordinate(&u)?;
    let zv = z_coordinate(&v)?;

    if zu.len() != zv.len() || u.values.shape() != v.values.shape() {
        return Err(CompareError::ComponentShapes(
            u.values.shape().to_vec(),
            v.values.shape().to_vec(),
        ));
    }

    let z = 0.5 * (&zu + &zv);
    let rank = u.values.ndim();

    let ut = u
        .values
        .into_dimensionality::<Ix4>()
        .map_err(|_| CompareError::Rank(rank))?;
    let vt = v
        .values
        .into_dimensionality::<Ix4>()
        .map_err(|_| CompareError::Rank(rank))?;

    let (_, _, ny, nx) = ut.dim();
    if ny < 2 || nx < 2 {
        return Err(CompareError::TooSmall(ut.shape().to_vec()));
    }

    let uc = 0.5 * (&ut.slice(s![.., .., ..-1, 1..]) + &ut.slice(s![.., .., ..-1, ..-1]));
    let vc = 0.5 * (&vt.slice(s![.., .., 1.., ..-1]) + &vt.slice(s![.., .., ..-1, ..-1]));

    let values = Zip::from(&uc).and(&vc).map_collect(|&u, &v| {
        let angle = (v / (u + DIFF_EPS)).atan();

        if direction {
            angle.to_degrees()
        } else {
            u * angle.cos() + v * angle.sin()
        }
    });

    Ok((values.into_dyn(), z))
}

/// `v+ = (v - v0) / v*`
fn normalize(values: &mut ArrayD<Float>, reference: Float, characteristic: Float) {
    values.mapv_inplace(|v| (v - reference) / characteristic);
}

/// Horizontal slice of level `k` (first time step of 4D fields)
/// with excluded nodes in x-direction removed.
fn cropped_level<'a>(
    values: &'a ArrayD<Float>,
    k: usize,
    nexcl: &[usize],
) -> Result<ArrayView2<'a, Float>, CompareError> {
    let view = values.view();

    let level = match view.ndim() {
        4 => {
            let view = view
                .into_dimensionality::<Ix4>()
                .map_err(|_| CompareError::Rank(4))?;
            check_level(view.len_of(Axis(1)), k)?;
            if view.len_of(Axis(0)) == 0 {
                return Err(CompareError::Rank(4));
            }
            view.index_axis_move(Axis(0), 0).index_axis_move(Axis(0), k)
        }
        3 => {
            let view = view
                .into_dimensionality::<Ix3>()
                .map_err(|_| CompareError::Rank(3))?;
            check_level(view.len_of(Axis(0)), k)?;
            view.index_axis_move(Axis(0), k)
        }
        rank => return Err(CompareError::Rank(rank)),
    };

    let first = nexcl.first().copied().unwrap_or(0);
    let last = nexcl.get(1).copied().unwrap_or(0);
    let range = exclusion_range(level.ncols(), first, last)?;

    Ok(level.slice_move(s![.., range]))
}

fn check_level(count: usize, index: usize) -> Result<(), CompareError> {
    if index >= count {
        return Err(CompareError::LevelIndex { index, count });
    }

    Ok(())
}

/// Range of x nodes left after excluding `first` and `last` nodes,
/// `last == 0` keeps nodes up to the end.
fn exclusion_range(len: usize, first: usize, last: usize) -> Result<Range<usize>, CompareError> {
    if first + last >= len {
        return Err(CompareError::Exclusion { first, last, len });
    }

    Ok(first..len - last)
}

/// Root-mean-square and skewness of the difference `v2 - v1`
/// computed according to `mode`.
pub fn level_statistics(v1: ArrayView2<Float>, v2: ArrayView2<Float>, mode: DiffMode) -> LevelStats {
    let pairs: Vec<(Float, Float)> = v1
        .iter()
        .zip(v2.iter())
        .map(|(&a, &b)| (a, b))
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .collect();

    let count = pairs.len();

    // equal points are masked only in fields without missing values
    let active: Vec<(Float, Float)> = if count == v1.len() {
        pairs.into_iter().filter(|(a, b)| a != b).collect()
    } else {
        pairs
    };

    if count == 0 {
        return LevelStats {
            rms: Float::NAN,
            skewness: Float::NAN,
            count,
        };
    }

    let mean_1 = if active.is_empty() {
        0.0
    } else {
        active.iter().map(|(a, _)| a).sum::<Float>() / active.len() as Float
    };

    let n = count as Float;

    let difference = |a: Float, b: Float| match mode {
        DiffMode::Relative => (b - a) / (a + DIFF_EPS).abs(),
        DiffMode::Scaled => (b - a) / (mean_1 + DIFF_EPS),
        DiffMode::Delta | DiffMode::Normalized => b - a,
    };

    let sum_sq: Float = active.iter().map(|&(a, b)| difference(a, b).powi(2)).sum();

    match mode {
        DiffMode::Normalized => {
            let sum_inv: Float = active
                .iter()
                .map(|&(a, b)| {
                    let product = a * b;
                    // zero products, including -0.0, count as positive
                    let sign = if product >= 0.0 { 1.0 } else { -1.0 };
                    1.0 / (sign * (product.abs() + NMSD_EPS))
                })
                .sum();

            LevelStats {
                rms: (sum_sq / n * sum_inv / n).abs().sqrt(),
                skewness: 0.0,
                count,
            }
        }
        _ => {
            let sum_cu: Float = active.iter().map(|&(a, b)| difference(a, b).powi(3)).sum();

            LevelStats {
                rms: (sum_sq / n).sqrt(),
                skewness: (sum_cu / n) * (sum_sq / (n - 1.0)).powf(-1.5),
                count,
            }
        }
    }
}

/// Tab separated table of RMS values per level.
struct RmsTable {
    writer: csv::Writer<File>,
}

impl RmsTable {
    fn create(path: &Path, file1: &Path, file2: &Path, vn: &str) -> Result<Self, csv::Error> {
        info!("Writing RMS values into {}", path.display());

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)?;

        writer.write_record(&[format!(
            "# file1 = {}, file2 = {}",
            file1.display(),
            file2.display()
        )])?;
        writer.write_record(&["# z_coord ".to_string(), format!(" RMS(d{})", vn)])?;

        Ok(RmsTable { writer })
    }

    fn write(&mut self, z: Float, rms: Float) -> Result<(), csv::Error> {
        self.writer
            .write_record(&[format!("{:.2}", z), scientific(rms, 2)])
    }

    fn finish(mut self) -> Result<(), csv::Error> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Scientific notation with at least two exponent digits and explicit
/// exponent sign, e.g. `1.23e-03`.
fn scientific(value: Float, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }

    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let formatted = format!("{:.*e}", precision, value);

    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}
