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

//! Sub-module writing aerosol emission PIDS variables.

use super::parsing::{parse_character_array, parse_index_list, parse_string_array_input};
use super::PidsDataset;
use crate::constants::{FILL_F32, FILL_I8, HOURS_PER_YEAR, MAX_NAME_LEN};
use crate::errors::{PidsError, RasterError};
use crate::tools::configuration::ConfigValue;
use crate::tools::netcdf_io::variables::{char_rows, convert, VariableSpec};
use crate::tools::raster::read_entry;
use crate::Float;
use log::info;
use ndarray::{Array2, Ix2};
use ndarray_npy::NpzReader;
use std::fs::File;
use std::path::Path;

fn narrow<T: TryFrom<i64>>(values: Vec<i64>, key: &'static str) -> Result<Vec<T>, PidsError> {
    values
        .into_iter()
        .map(|v| {
            T::try_from(v).map_err(|_| PidsError::InvalidInput {
                key,
                reason: format!("{} is out of range", v),
            })
        })
        .collect()
}

/// Emission category indices (`ncat`).
pub fn process_emission_category_index(ds: &mut PidsDataset, input: &str) -> Result<(), PidsError> {
    info!("Processing emission category indices");

    let key = "emission_category_index";
    let values: Vec<i8> = narrow(parse_index_list(input, key)?, key)?;

    ds.ensure_ncat_dim(values.len())?;

    let spec = VariableSpec::variable("emission_category_index", &["ncat"], "")
        .long_name("emission category index")
        .standard_name("emission_cat_index");
    ds.put_field(spec, &values, FILL_I8)
}

/// Emission species indices (`nspecies`).
pub fn process_emission_index(ds: &mut PidsDataset, input: &str) -> Result<(), PidsError> {
    info!("Processing emission species indices");

    let key = "emission_index";
    let values: Vec<u16> = narrow(parse_index_list(input, key)?, key)?;

    ds.ensure_nspecies_dim(values.len())?;

    let spec = VariableSpec::variable("emission_index", &["nspecies"], "")
        .long_name("emission species index")
        .standard_name("emission_index");
    ds.put_field(spec, &values, u16::MAX)
}

pub fn process_emission_category_names(
    ds: &mut PidsDataset,
    input: &str,
) -> Result<(), PidsError> {
    info!("Processing emission category names");

    let names = parse_character_array(input, MAX_NAME_LEN, "emission_category_name")?;

    ds.ensure_ncat_dim(names.len())?;
    ds.ensure_strlen_dim()?;

    let spec = VariableSpec::variable("emission_category_name", &["ncat", "strlen"], "")
        .long_name("emission category name")
        .standard_name("emission_cat_name");
    ds.put_chars(spec, &char_rows(&names, MAX_NAME_LEN))
}

pub fn process_emission_species_names(
    ds: &mut PidsDataset,
    input: &str,
) -> Result<(), PidsError> {
    info!("Processing emission species names");

    let names = parse_character_array(input, MAX_NAME_LEN, "emission_species_name")?;

    ds.ensure_nspecies_dim(names.len())?;
    ds.ensure_strlen_dim()?;

    let spec = VariableSpec::variable("emission_species_name", &["nspecies", "strlen"], "")
        .long_name("emission species name")
        .standard_name("emission_name");
    ds.put_chars(spec, &char_rows(&names, MAX_NAME_LEN))
}

/// Hourly emission time factors `(ncat, nhoursyear)`.
///
/// A single number is used as a constant factor for every category
/// (or one category if none is defined yet). Otherwise the value is a path
/// to `.npz` archive with `emission_time_factors` array, which requires `lod = 2`.
pub fn process_emission_time_factors(
    ds: &mut PidsDataset,
    value: &ConfigValue,
    lod: Option<u8>,
) -> Result<(), PidsError> {
    let lod_key = "emission_time_factors_lod";

    match lod {
        None | Some(2) => (),
        Some(1) => return Err(PidsError::LodNotImplemented(1)),
        Some(other) => {
            return Err(PidsError::InvalidInput {
                key: lod_key,
                reason: format!("{} is not a valid level of detail", other),
            })
        }
    }

    let factors = match value.as_float() {
        Some(constant) => {
            info!("Using constant emission time factor {}", constant);

            let ncat = if ds.has_dimension("ncat") {
                ds.dimension_len("ncat").unwrap_or(1)
            } else {
                1
            };
            Array2::<Float>::from_elem((ncat, HOURS_PER_YEAR), constant)
        }
        None => {
            if lod.is_none() {
                return Err(PidsError::InvalidInput {
                    key: lod_key,
                    reason: "must be given with emission_time_factors read from file"
                        .to_string(),
                });
            }

            read_time_factors(Path::new(&value.as_text()))?
        }
    };

    info!("Processing emission time factors");

    ds.ensure_ncat_dim(factors.nrows())?;
    ds.ensure_nhoursyear_dim()?;

    let spec = VariableSpec::variable("emission_time_factors", &["ncat", "nhoursyear"], "")
        .long_name("emission time scaling factors")
        .standard_name("emission_time_scaling_factors")
        .lod(2);
    let values = convert(factors.iter().copied(), FILL_F32);
    ds.put_field(spec, &values, FILL_F32)
}

fn read_time_factors(path: &Path) -> Result<Array2<Float>, PidsError> {
    let mut npz = NpzReader::new(File::open(path).map_err(RasterError::from)?)
        .map_err(RasterError::from)?;
    let names = npz.names().map_err(RasterError::from)?;

    let key = "emission_time_factors";
    let factors = read_entry(&mut npz, &names, key)?.ok_or(RasterError::MissingArray(key))?;

    let factors = match factors.ndim() {
        1 => factors.insert_axis(ndarray::Axis(0)),
        _ => factors,
    };

    let factors = factors
        .into_dimensionality::<Ix2>()
        .map_err(|_| PidsError::InvalidInput {
            key,
            reason: "array must be one or two dimensional".to_string(),
        })?;

    if factors.ncols() != HOURS_PER_YEAR {
        return Err(PidsError::InvalidInput {
            key,
            reason: format!(
                "{} time factors per category, expected {}",
                factors.ncols(),
                HOURS_PER_YEAR
            ),
        });
    }

    Ok(factors)
}

/// Aerosol composition `(ncat, composition_index)`.
pub fn process_composition_aerosol(ds: &mut PidsDataset, input: &str) -> Result<(), PidsError> {
    info!("Processing aerosol composition");

    let composition = parse_string_array_input(input, "composition_aerosol")?;

    ds.ensure_ncat_dim(composition.nrows())?;
    ds.ensure_composition_index_dim(composition.ncols())?;

    let spec = VariableSpec::variable("composition_aerosol", &["ncat", "composition_index"], "")
        .long_name("composition aerosol")
        .standard_name("composition_aerosol");
    let values = convert(composition.iter().copied(), FILL_F32);
    ds.put_field(spec, &values, FILL_F32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::netcdf_io::variables::{row_to_string, NcChar};
    use crate::tools::netcdf_io::OutputMode;
    use ndarray_npy::NpzWriter;

    #[test]
    fn categories_and_species() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PIDS_AERO");

        {
            let mut ds = PidsDataset::create(&path, OutputMode::Write, false).unwrap();
            process_emission_category_index(&mut ds, "1,2,3").unwrap();
            process_emission_category_names(&mut ds, "traffic, heating, shipping_and_ports")
                .unwrap();
            process_emission_index(&mut ds, "5, 7").unwrap();
            process_emission_species_names(&mut ds, "PM10,PM2.5").unwrap();

            // different number of categories
            assert!(process_emission_category_names(&mut ds, "a,b").is_err());
            assert!(process_emission_category_index(&mut ds, "1,200,3").is_err());
            ds.close();
        }

        let file = netcdf::open(&path).unwrap();
        let index: Vec<i8> = file
            .variable("emission_category_index")
            .unwrap()
            .get_values(..)
            .unwrap();
        assert_eq!(index, vec![1, 2, 3]);

        let species: Vec<u16> = file.variable("emission_index").unwrap().get_values(..).unwrap();
        assert_eq!(species, vec![5, 7]);

        let names = file.variable("emission_category_name").unwrap();
        let dims: Vec<String> = names.dimensions().iter().map(|d| d.name()).collect();
        assert_eq!(dims, vec!["ncat", "strlen"]);
        let chars: Vec<NcChar> = names.get_values(..).unwrap();
        assert_eq!(row_to_string(&chars[20..30]), "shipping_a");
        assert_eq!(row_to_string(&chars[0..10]), "traffic");

        let species: Vec<NcChar> = file
            .variable("emission_species_name")
            .unwrap()
            .get_values(..)
            .unwrap();
        let species: Vec<String> = species.chunks(MAX_NAME_LEN).map(row_to_string).collect();
        assert_eq!(species, vec!["PM10", "PM2.5"]);
        assert!(file.variable("emission_name").is_none());
        assert_eq!(file.dimension("nspecies").unwrap().len(), 2);
    }

    #[test]
    fn species_names_are_overwritten_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PIDS_AERO");

        {
            let mut ds = PidsDataset::create(&path, OutputMode::Write, false).unwrap();
            process_emission_species_names(&mut ds, "NO,NO2").unwrap();
            ds.close();
        }
        {
            let mut ds = PidsDataset::create(&path, OutputMode::Append, false).unwrap();
            assert!(ds.has_variable("emission_species_name"));
            process_emission_species_names(&mut ds, "O3,SO2").unwrap();
            ds.close();
        }

        let file = netcdf::open(&path).unwrap();
        let species: Vec<NcChar> = file
            .variable("emission_species_name")
            .unwrap()
            .get_values(..)
            .unwrap();
        assert_eq!(row_to_string(&species[0..10]), "O3");
        assert_eq!(row_to_string(&species[10..20]), "SO2");
    }

    #[test]
    fn constant_time_factors_follow_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PIDS_AERO");

        {
            let mut ds = PidsDataset::create(&path, OutputMode::Write, false).unwrap();
            process_emission_category_index(&mut ds, "1,2").unwrap();
            process_emission_time_factors(&mut ds, &ConfigValue::from("0.5"), None).unwrap();
            ds.close();
        }

        let file = netcdf::open(&path).unwrap();
        let var = file.variable("emission_time_factors").unwrap();
        assert_eq!(var.len(), 2 * HOURS_PER_YEAR);

        let factors: Vec<f32> = var.get_values(..).unwrap();
        assert!(factors.iter().all(|&f| f == 0.5));
    }

    #[test]
    fn time_factors_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let npz_path = dir.path().join("factors.npz");
        let path = dir.path().join("PIDS_AERO");

        let factors = Array2::from_shape_fn((3, HOURS_PER_YEAR), |(c, h)| (c * 10 + h % 24) as f64);
        let mut npz = NpzWriter::new(File::create(&npz_path).unwrap());
        npz.add_array("emission_time_factors", &factors).unwrap();
        npz.finish().unwrap();

        let value = ConfigValue::from(npz_path.to_string_lossy().as_ref());

        let mut ds = PidsDataset::create(&path, OutputMode::Write, false).unwrap();

        assert!(process_emission_time_factors(&mut ds, &value, None).is_err());
        assert!(matches!(
            process_emission_time_factors(&mut ds, &value, Some(1)),
            Err(PidsError::LodNotImplemented(1))
        ));
        assert!(process_emission_time_factors(&mut ds, &value, Some(3)).is_err());

        process_emission_time_factors(&mut ds, &value, Some(2)).unwrap();
        assert_eq!(ds.dimension_len("ncat"), Some(3));
        ds.close();

        let file = netcdf::open(&path).unwrap();
        let written: Vec<f32> = file
            .variable("emission_time_factors")
            .unwrap()
            .get_values(..)
            .unwrap();
        assert_eq!(written[HOURS_PER_YEAR + 25], 11.0);
    }

    #[test]
    fn composition_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PIDS_AERO");

        {
            let mut ds = PidsDataset::create(&path, OutputMode::Write, false).unwrap();
            process_composition_aerosol(&mut ds, "0.1,0.2,0.7\n0.5,0.5,0.0").unwrap();
            ds.close();
        }

        let file = netcdf::open(&path).unwrap();
        assert_eq!(file.dimension("ncat").unwrap().len(), 2);
        assert_eq!(file.dimension("composition_index").unwrap().len(), 3);

        let values: Vec<f32> = file
            .variable("composition_aerosol")
            .unwrap()
            .get_values(..)
            .unwrap();
        assert!((values[2] - 0.7).abs() < 1.0e-6);
    }
}
