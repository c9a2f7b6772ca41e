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

//! Module responsible for parsing and checking the configuration
//! file of PIDS input generation.
//!
//! The configuration file uses [YAML](https://en.wikipedia.org/wiki/YAML)
//! and `serde` to enforce strong typing and automatic type checking.
//! The structures and their fields in this module directly correspond to
//! the sections and fields of the configuration file:
//!
//! ```yaml
//! output:
//!   static_file: PIDS_STATIC
//!   aerosol_file: PIDS_AERO
//!   mode: write
//! global:
//!   title: Helsinki city centre
//!   origin_x: 25496.0
//! topography:
//!   orography: topo.npz
//!   buildings: buildings.npz
//! surface:
//!   building_id: building_id.npz
//! aerosol:
//!   emission_category_index: 1, 2
//!   emission_time_factors: 1.0
//! ```

use crate::errors::ConfigError;
use crate::tools::netcdf_io::OutputMode;
use crate::Float;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

/// Scalar value kept exactly as written in the configuration,
/// so `6.0` stays `6.0` when stored as text.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConfigValue(String);

impl ConfigValue {
    pub fn as_text(&self) -> String {
        self.0.clone()
    }

    /// Numeric value, if the text parses as one.
    pub fn as_float(&self) -> Option<Float> {
        self.0.trim().parse::<Float>().ok()
    }
}

impl From<&str> for ConfigValue {
    fn from(text: &str) -> Self {
        ConfigValue(text.to_string())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mode in which output files are opened.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Existing files are replaced.
    Write,
    /// Variables are added to existing files,
    /// variables already present get new values.
    Append,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Write
    }
}

impl From<Mode> for OutputMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Write => OutputMode::Write,
            Mode::Append => OutputMode::Append,
        }
    }
}

/// _(Optional)_ Fields with output files information.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Output {
    /// _(Optional)_ Path of static input file. Defaults to `PIDS_STATIC`.
    #[serde(default = "Output::default_static_file")]
    pub static_file: PathBuf,

    /// _(Optional)_ Path of aerosol input file. Defaults to `PIDS_AERO`.
    #[serde(default = "Output::default_aerosol_file")]
    pub aerosol_file: PathBuf,

    /// _(Optional)_ `write` or `append`. Defaults to `write`.
    #[serde(default)]
    pub mode: Mode,

    /// _(Optional)_ Use zlib compression for created variables.
    #[serde(default)]
    pub compress: bool,
}

impl Output {
    fn default_static_file() -> PathBuf {
        PathBuf::from("PIDS_STATIC")
    }

    fn default_aerosol_file() -> PathBuf {
        PathBuf::from("PIDS_AERO")
    }
}

impl Default for Output {
    fn default() -> Self {
        Output {
            static_file: Output::default_static_file(),
            aerosol_file: Output::default_aerosol_file(),
            mode: Mode::default(),
            compress: false,
        }
    }
}

/// Raster tiles with terrain and buildings.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Topography {
    pub orography: PathBuf,

    /// _(Optional)_ 2D tile gives building heights,
    /// 3D tile gives building mask.
    pub buildings: Option<PathBuf>,
}

/// Raster tiles with surface classification.
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct Surface {
    pub building_id: Option<PathBuf>,
    pub pavement_type: Option<PathBuf>,
    pub vegetation_type: Option<PathBuf>,
}

#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct Vegetation {
    /// 3D tile of leaf area density.
    pub lad: Option<PathBuf>,
}

/// Aerosol emission input, lists are comma-separated
/// and matrices have one comma-separated row per line.
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct Aerosol {
    pub emission_category_index: Option<ConfigValue>,
    pub emission_index: Option<ConfigValue>,
    pub emission_category_name: Option<ConfigValue>,
    pub emission_species_name: Option<ConfigValue>,

    /// Constant factor or path to `.npz` archive.
    pub emission_time_factors: Option<ConfigValue>,

    /// Level of detail of time factors, only `2` is supported.
    pub emission_time_factors_lod: Option<u8>,

    pub composition_aerosol: Option<ConfigValue>,
}

impl Aerosol {
    /// Checks that lists have no empty items and that
    /// time factors given as a path point to an existing file.
    fn check_bounds(&self) -> Result<(), ConfigError> {
        let lists = [
            ("emission_category_index", &self.emission_category_index),
            ("emission_index", &self.emission_index),
            ("emission_category_name", &self.emission_category_name),
            ("emission_species_name", &self.emission_species_name),
        ];

        for (key, value) in lists {
            if let Some(value) = value {
                if value.as_text().split(',').any(|item| item.trim().is_empty()) {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason: format!("'{}' contains an empty item", value),
                    });
                }
            }
        }

        if let Some(factors) = &self.emission_time_factors {
            if factors.as_float().is_none() {
                let path = PathBuf::from(factors.as_text().trim());

                if !path.is_file() {
                    return Err(ConfigError::MissingInput(path.display().to_string()));
                }
            }
        }

        Ok(())
    }
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: Output,

    /// Global attributes of created files.
    #[serde(default)]
    pub global: BTreeMap<String, ConfigValue>,

    pub topography: Option<Topography>,

    pub surface: Option<Surface>,

    pub vegetation: Option<Vegetation>,

    pub aerosol: Option<Aerosol>,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        let config: Config = serde_yaml::from_slice(data.as_slice())?;

        config.check_bounds()?;
        config.log_sections();

        Ok(config)
    }

    /// Checks that there is something to do
    /// and all input tiles exist.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if !self.has_static_input() && self.aerosol.is_none() {
            return Err(ConfigError::OutOfBounds(
                "Configuration has no input sections",
            ));
        }

        for (key, value) in &self.global {
            if crate::constants::PIDS_FLOAT_ATTRIBUTES.contains(&key.as_str())
                && value.as_float().is_none()
            {
                return Err(ConfigError::InvalidValue {
                    key: key.clone(),
                    reason: format!("{} is not a number", value),
                });
            }
        }

        for path in self.input_tiles() {
            if !path.is_file() {
                return Err(ConfigError::MissingInput(path.display().to_string()));
            }
        }

        if let Some(aerosol) = &self.aerosol {
            aerosol.check_bounds()?;
        }

        Ok(())
    }

    pub fn has_static_input(&self) -> bool {
        self.topography.is_some() || self.surface.is_some() || self.vegetation.is_some()
    }

    fn input_tiles(&self) -> Vec<&PathBuf> {
        let mut tiles = vec![];

        if let Some(topo) = &self.topography {
            tiles.push(&topo.orography);
            tiles.extend(topo.buildings.iter());
        }

        if let Some(surface) = &self.surface {
            tiles.extend(surface.building_id.iter());
            tiles.extend(surface.pavement_type.iter());
            tiles.extend(surface.vegetation_type.iter());
        }

        if let Some(vegetation) = &self.vegetation {
            tiles.extend(vegetation.lad.iter());
        }

        tiles
    }

    fn log_sections(&self) {
        info!("Configuration:");

        let sections = [
            ("output", serde_yaml::to_string(&self.output)),
            ("global", serde_yaml::to_string(&self.global)),
            ("topography", serde_yaml::to_string(&self.topography)),
            ("surface", serde_yaml::to_string(&self.surface)),
            ("vegetation", serde_yaml::to_string(&self.vegetation)),
            ("aerosol", serde_yaml::to_string(&self.aerosol)),
        ];

        for (name, section) in sections {
            if let Ok(section) = section {
                info!("[{}]", name);
                section
                    .lines()
                    .filter(|l| *l != "---" && *l != "~")
                    .for_each(|l| info!("  {}", l));
            }
        }
    }
}

/// Resources available for the tools.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Resources {
    /// Thread count of the global thread pool.
    ///
    /// Cannot be less than `1`.
    pub threads: u16,

    /// Heap memory limit in MB.
    ///
    /// Cannot be less than `128`.
    pub memory: usize,
}

impl Resources {
    /// Checks if thread count and memory limit are
    /// above limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.threads < 1 {
            return Err(ConfigError::OutOfBounds(
                "Available threads cannot be less than 1",
            ));
        }

        if self.memory < 128 {
            return Err(ConfigError::OutOfBounds(
                "Available memory cannot be less than 128 MB",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            threads: 1,
            memory: usize::MAX / (1024 * 1024),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigValue, Mode, Resources};
    use crate::errors::ConfigError;
    use std::fs;

    #[test]
    fn full_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let topo = dir.path().join("topo.npz");
        fs::write(&topo, b"placeholder").unwrap();

        let yaml = format!(
            "output:\n  static_file: OUT_STATIC\n  mode: append\n\
             global:\n  title: Test area\n  origin_x: 25000\n  palm_version: 6.0\n\
             topography:\n  orography: {}\n\
             aerosol:\n  emission_category_index: 1, 2\n  emission_time_factors: 0.5\n  \
             emission_time_factors_lod: 2\n  composition_aerosol: |\n    0.1,0.9\n    0.5,0.5\n",
            topo.display()
        );
        let path = dir.path().join("config.yaml");
        fs::write(&path, yaml).unwrap();

        let config = Config::new_from_file(&path).unwrap();

        assert_eq!(config.output.mode, Mode::Append);
        assert_eq!(config.output.static_file.to_str(), Some("OUT_STATIC"));
        assert_eq!(config.output.aerosol_file.to_str(), Some("PIDS_AERO"));
        assert_eq!(config.global["origin_x"].as_float(), Some(25000.0));
        assert_eq!(config.global["palm_version"].as_text(), "6.0");

        let aerosol = config.aerosol.unwrap();
        assert_eq!(
            aerosol.emission_category_index,
            Some(ConfigValue::from("1, 2"))
        );
        assert_eq!(aerosol.emission_time_factors, Some(ConfigValue::from("0.5")));
        assert_eq!(aerosol.emission_time_factors_lod, Some(2));
        assert_eq!(
            aerosol.composition_aerosol.unwrap().as_text(),
            "0.1,0.9\n0.5,0.5\n"
        );
    }

    #[test]
    fn missing_tiles_and_sections_are_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("empty.yaml");
        fs::write(&path, "global:\n  title: nothing\n").unwrap();
        assert!(Config::new_from_file(&path).is_err());

        let path = dir.path().join("missing.yaml");
        fs::write(&path, "topography:\n  orography: /nonexistent/topo.npz\n").unwrap();
        assert!(Config::new_from_file(&path).is_err());

        let path = dir.path().join("origin.yaml");
        fs::write(
            &path,
            "global:\n  origin_lat: north\naerosol:\n  emission_index: 1\n",
        )
        .unwrap();
        assert!(Config::new_from_file(&path).is_err());
    }

    #[test]
    fn aerosol_inputs_are_checked_at_load() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("empty_item.yaml");
        fs::write(&path, "aerosol:\n  emission_category_index: 1,,3\n").unwrap();
        assert!(matches!(
            Config::new_from_file(&path),
            Err(ConfigError::InvalidValue { .. })
        ));

        let path = dir.path().join("empty_list.yaml");
        fs::write(&path, "aerosol:\n  emission_species_name: \"\"\n").unwrap();
        assert!(Config::new_from_file(&path).is_err());

        let path = dir.path().join("missing_factors.yaml");
        fs::write(
            &path,
            "aerosol:\n  emission_time_factors: /nonexistent/factors.npz\n  \
             emission_time_factors_lod: 2\n",
        )
        .unwrap();
        assert!(matches!(
            Config::new_from_file(&path),
            Err(ConfigError::MissingInput(_))
        ));

        let factors = dir.path().join("factors.npz");
        fs::write(&factors, b"placeholder").unwrap();
        let path = dir.path().join("valid.yaml");
        fs::write(
            &path,
            format!(
                "aerosol:\n  emission_index: 1, 2\n  emission_time_factors: {}\n  \
                 emission_time_factors_lod: 2\n",
                factors.display()
            ),
        )
        .unwrap();
        assert!(Config::new_from_file(&path).is_ok());
    }

    #[test]
    fn resources_bounds() {
        assert!(Resources::default().check_bounds().is_ok());
        assert!(Resources {
            threads: 0,
            memory: 1024
        }
        .check_bounds()
        .is_err());
        assert!(Resources {
            threads: 4,
            memory: 64
        }
        .check_bounds()
        .is_err());
    }
}
