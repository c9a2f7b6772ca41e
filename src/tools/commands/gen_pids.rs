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

//! Generation of PIDS static and aerosol input files
//! from the YAML configuration.

use crate::errors::{PidsError, ToolError};
use crate::tools::configuration::{Aerosol, Config};
use crate::tools::pids::{aerosol, set_global_attributes, static_input, PidsDataset};
use crate::tools::raster::{read_tile, RasterTile};
use log::{debug, info};
use std::path::Path;

pub fn run(config_path: &Path) -> Result<(), ToolError> {
    debug!("Reading configuration from {}", config_path.display());
    let config = Config::new_from_file(config_path)?;

    if config.has_static_input() {
        generate_static(&config)?;
    }

    if let Some(aerosol) = &config.aerosol {
        generate_aerosol(&config, aerosol)?;
    }

    Ok(())
}

fn generate_static(config: &Config) -> Result<(), ToolError> {
    let path = &config.output.static_file;
    info!("Writing static input into {}", path.display());

    let orography = config
        .topography
        .as_ref()
        .map(|topo| read_tile(&topo.orography))
        .transpose()?;
    let buildings = config
        .topography
        .as_ref()
        .and_then(|topo| topo.buildings.as_ref())
        .map(|p| read_tile(p))
        .transpose()?;
    let building_id = config
        .surface
        .as_ref()
        .and_then(|s| s.building_id.as_ref())
        .map(|p| read_tile(p))
        .transpose()?;

    if let Some(orography) = &orography {
        check_horizontal_shape("buildings", orography, buildings.as_ref())?;
        check_horizontal_shape("building_id", orography, building_id.as_ref())?;
    }

    let mut ds = PidsDataset::create(path, config.output.mode.into(), config.output.compress)?;
    set_global_attributes(&mut ds, &config.global)?;

    if let Some(tile) = &orography {
        static_input::process_orography(&mut ds, tile)?;
    }

    if let Some(tile) = &buildings {
        static_input::process_buildings(&mut ds, tile)?;
    }

    if let Some(tile) = &building_id {
        static_input::process_building_ids(&mut ds, tile)?;
    }

    if let Some(surface) = &config.surface {
        if let Some(path) = &surface.pavement_type {
            static_input::process_pavement_type(&mut ds, &read_tile(path)?)?;
        }

        if let Some(path) = &surface.vegetation_type {
            static_input::process_vegetation_type(&mut ds, &read_tile(path)?)?;
        }
    }

    if let Some(lad) = config.vegetation.as_ref().and_then(|v| v.lad.as_ref()) {
        static_input::process_lad(&mut ds, &read_tile(lad)?)?;
    }

    ds.close();

    Ok(())
}

fn generate_aerosol(config: &Config, input: &Aerosol) -> Result<(), ToolError> {
    let path = &config.output.aerosol_file;
    info!("Writing aerosol input into {}", path.display());

    let mut ds = PidsDataset::create(path, config.output.mode.into(), config.output.compress)?;
    set_global_attributes(&mut ds, &config.global)?;

    if let Some(value) = &input.emission_category_index {
        aerosol::process_emission_category_index(&mut ds, &value.as_text())?;
    }

    if let Some(value) = &input.emission_index {
        aerosol::process_emission_index(&mut ds, &value.as_text())?;
    }

    if let Some(value) = &input.emission_category_name {
        aerosol::process_emission_category_names(&mut ds, &value.as_text())?;
    }

    if let Some(value) = &input.emission_species_name {
        aerosol::process_emission_species_names(&mut ds, &value.as_text())?;
    }

    if let Some(value) = &input.emission_time_factors {
        aerosol::process_emission_time_factors(&mut ds, value, input.emission_time_factors_lod)?;
    }

    if let Some(value) = &input.composition_aerosol {
        aerosol::process_composition_aerosol(&mut ds, &value.as_text())?;
    }

    ds.close();

    Ok(())
}

fn check_horizontal_shape(
    name: &'static str,
    orography: &RasterTile,
    tile: Option<&RasterTile>,
) -> Result<(), PidsError> {
    if let Some(tile) = tile {
        if tile.horizontal_shape() != orography.horizontal_shape() {
            return Err(PidsError::ShapeMismatch {
                name,
                expected: orography.horizontal_shape().to_vec(),
                found: tile.horizontal_shape().to_vec(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_horizontal_shape, run};
    use crate::tools::raster::RasterTile;
    use ndarray::{arr1, Array2, Array3};
    use ndarray_npy::NpzWriter;
    use std::fs::{self, File};
    use std::path::Path;

    fn write_tile(path: &Path, values: ndarray::ArrayD<f64>) {
        let mut npz = NpzWriter::new(File::create(path).unwrap());
        npz.add_array("R", &values).unwrap();
        npz.add_array("dPx", &arr1(&[1.0f64, 1.0])).unwrap();
        npz.finish().unwrap();
    }

    #[test]
    fn shapes_must_match_orography() {
        let orography = RasterTile::new(Array2::<f64>::zeros((3, 4)).into_dyn(), vec![1.0]);
        // 3D tiles are stored (x, y, z)
        let buildings = RasterTile::new(Array3::<f64>::zeros((4, 3, 2)).into_dyn(), vec![1.0]);
        let ids = RasterTile::new(Array2::<f64>::zeros((4, 3)).into_dyn(), vec![1.0]);

        assert!(check_horizontal_shape("buildings", &orography, Some(&buildings)).is_ok());
        assert!(check_horizontal_shape("building_id", &orography, Some(&ids)).is_err());
        assert!(check_horizontal_shape("building_id", &orography, None).is_ok());
    }

    #[test]
    fn generates_static_and_aerosol_files() {
        let dir = tempfile::tempdir().unwrap();
        let topo = dir.path().join("topo.npz");
        let ids = dir.path().join("ids.npz");
        let static_file = dir.path().join("PIDS_STATIC");
        let aerosol_file = dir.path().join("PIDS_AERO");

        write_tile(&topo, Array2::from_elem((2, 3), 5.0).into_dyn());
        write_tile(&ids, Array2::from_elem((2, 3), 7.0).into_dyn());

        let yaml = format!(
            "output:\n  static_file: {}\n  aerosol_file: {}\n\
             global:\n  title: Test\n\
             topography:\n  orography: {}\n\
             surface:\n  building_id: {}\n\
             aerosol:\n  emission_category_index: 1,2\n  emission_time_factors: 1.0\n",
            static_file.display(),
            aerosol_file.display(),
            topo.display(),
            ids.display()
        );
        let config = dir.path().join("pids.yaml");
        fs::write(&config, yaml).unwrap();

        run(&config).unwrap();

        let file = netcdf::open(&static_file).unwrap();
        assert!(file.variable("zt").is_some());
        let ids: Vec<i32> = file.variable("building_id").unwrap().get_values(..).unwrap();
        assert!(ids.iter().all(|&id| id == 7));

        let file = netcdf::open(&aerosol_file).unwrap();
        assert_eq!(file.dimension("ncat").unwrap().len(), 2);
        assert!(file.variable("emission_time_factors").is_some());
        assert!(file.attribute("title").is_some());
    }
}
