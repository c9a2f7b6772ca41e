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

//! Interpolation of a staggered velocity component from PALM
//! output onto cell centres, written into a new NetCDF file.

use crate::cli::InterpolateArgs;
use crate::constants::FILL_F32;
use crate::errors::{NetcdfIoError, ToolError};
use crate::tools::netcdf_io::{
    create_output,
    interpolation::{
        centred_coordinates, interpolate_palm_vectors, vector_prime_component, AxisRole, Component,
    },
    read_1d_variable, read_3d_variable,
    variables::{convert, create_variable, VariableSpec},
    write_and_close, Dataset, FieldData, OutputMode,
};
use crate::Float;
use log::info;
use ndarray::{Array1, Ix4};
use netcdf::FileMut;
use std::path::PathBuf;

const DIMS: [&str; 4] = ["time", "z", "y", "x"];

pub fn run(args: &InterpolateArgs) -> Result<(), ToolError> {
    let component: Component = args.component.parse()?;

    let ds = Dataset::open(&args.filename)?;
    let field = read_3d_variable(
        &ds,
        &args.varname,
        args.time_offset,
        args.left,
        args.right,
        args.coarsening,
        false,
    )?;

    let coords = output_coordinates(&ds, &field, component, args.time_offset)?;

    let v0 = field
        .values
        .into_dimensionality::<Ix4>()
        .map_err(|_| NetcdfIoError::IncompatibleShape(args.varname.clone()))?;

    let (vc, vm) = interpolate_palm_vectors(v0.view(), component, args.mean || args.primes)?;

    let fileout = args
        .fileout
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}_centred.nc", args.varname)));

    let mut file = create_output(&fileout, OutputMode::Write)?;

    for (i, (name, values)) in DIMS.iter().zip(coords.iter()).enumerate() {
        let units = if i == 0 { "s" } else { "m" };
        let spec = VariableSpec::coordinate(name, units).zlib(args.compress);
        create_variable(&mut file, &spec, &values.to_vec(), None)?;
    }

    let centred_name = format!("{}c", args.varname);
    write_field(&mut file, &centred_name, &DIMS, vc.iter().copied(), args.compress)?;

    if let Some(vm) = vm {
        if args.mean {
            let mean_name = format!("{}m", args.varname);
            write_field(&mut file, &mean_name, &DIMS[1..], vm.iter().copied(), args.compress)?;
        }

        if args.primes {
            let vp = vector_prime_component(&vc, &vm)?;
            let prime_name = format!("{}p", args.varname);
            write_field(&mut file, &prime_name, &DIMS, vp.iter().copied(), args.compress)?;
        }
    }

    write_and_close(file);

    Ok(())
}

/// Coordinates of the centred field in `(time, z, y, x)` order.
fn output_coordinates(
    ds: &Dataset,
    field: &FieldData,
    component: Component,
    time_offset: usize,
) -> Result<Vec<Array1<Float>>, ToolError> {
    if field.dimensions.len() != 4 {
        return Err(NetcdfIoError::IncompatibleShape(field.name.clone()).into());
    }

    let time_name = &field.dimensions[0];
    let time = if ds.has_variable(time_name) {
        read_1d_variable(ds, time_name, time_offset, 0, 1)?
    } else {
        field
            .coord(time_name)
            .cloned()
            .ok_or_else(|| NetcdfIoError::IncompatibleShape(time_name.clone()))?
    };

    let mut coords = vec![time];

    for axis in 1..4 {
        let dim_name = &field.dimensions[axis];
        let coord = field
            .coord(dim_name)
            .ok_or_else(|| NetcdfIoError::IncompatibleShape(dim_name.clone()))?;

        let role = if axis == 1 {
            AxisRole::Vertical
        } else {
            AxisRole::Horizontal
        };

        coords.push(centred_coordinates(coord, axis == component.axis(), role));
    }

    info!("Output coordinates: {:?}", coords.iter().map(|c| c.len()).collect::<Vec<_>>());

    Ok(coords)
}

fn write_field(
    file: &mut FileMut,
    name: &str,
    dims: &[&str],
    values: impl IntoIterator<Item = Float>,
    zlib: bool,
) -> Result<(), ToolError> {
    let spec = VariableSpec::variable(name, dims, "m s-1").zlib(zlib);
    let values: Vec<f32> = convert(values, FILL_F32);
    create_variable(file, &spec, &values, Some(FILL_F32))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::cli::InterpolateArgs;
    use float_cmp::approx_eq;
    use std::path::Path;

    fn write_staggered(path: &Path) {
        let mut file = netcdf::create(path).unwrap();

        file.add_dimension("time", 3).unwrap();
        file.add_dimension("zu_3d", 3).unwrap();
        file.add_dimension("y", 3).unwrap();
        file.add_dimension("xu", 4).unwrap();

        file.add_variable::<f64>("time", &["time"])
            .unwrap()
            .put_values(&[0.0f64, 10.0, 20.0], ..)
            .unwrap();
        file.add_variable::<f32>("zu_3d", &["zu_3d"])
            .unwrap()
            .put_values(&[0.0f32, 1.0, 3.0], ..)
            .unwrap();
        file.add_variable::<f32>("y", &["y"])
            .unwrap()
            .put_values(&[1.0f32, 3.0, 5.0], ..)
            .unwrap();
        file.add_variable::<f32>("xu", &["xu"])
            .unwrap()
            .put_values(&[0.0f32, 2.0, 4.0, 6.0], ..)
            .unwrap();

        // u grows along x only, by 2 per point, plus 1 per time step
        let u: Vec<f32> = (0..3 * 3 * 3 * 4)
            .map(|i| (2 * (i % 4) + i / 36) as f32)
            .collect();
        file.add_variable::<f32>("u", &["time", "zu_3d", "y", "xu"])
            .unwrap()
            .put_values(&u, ..)
            .unwrap();
    }

    #[test]
    fn writes_centred_component() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("palm.nc");
        let output = dir.path().join("uc.nc");
        write_staggered(&input);

        let args = InterpolateArgs {
            filename: input,
            fileout: Some(output.clone()),
            varname: "u".to_string(),
            component: "i".to_string(),
            time_offset: 1,
            left: 0,
            right: 0,
            coarsening: 1,
            mean: true,
            primes: true,
            compress: false,
        };

        run(&args).unwrap();

        let file = netcdf::open(&output).unwrap();

        assert_eq!(file.dimension("time").unwrap().len(), 2);
        assert_eq!(file.dimension("z").unwrap().len(), 2);
        assert_eq!(file.dimension("y").unwrap().len(), 2);
        assert_eq!(file.dimension("x").unwrap().len(), 3);

        let time: Vec<f64> = file.variable("time").unwrap().get_values(..).unwrap();
        assert_eq!(time, vec![10.0, 20.0]);

        let x: Vec<f64> = file.variable("x").unwrap().get_values(..).unwrap();
        assert_eq!(x, vec![1.0, 3.0, 5.0]);

        let z: Vec<f64> = file.variable("z").unwrap().get_values(..).unwrap();
        assert_eq!(z, vec![1.0, 3.0]);

        let uc: Vec<f32> = file.variable("uc").unwrap().get_values(..).unwrap();
        // first time step is skipped
        assert!(approx_eq!(f32, uc[0], 2.0));
        assert!(approx_eq!(f32, uc[2], 6.0));

        let um: Vec<f32> = file.variable("um").unwrap().get_values(..).unwrap();
        assert!(approx_eq!(f32, um[0], 2.5));

        let up: Vec<f32> = file.variable("up").unwrap().get_values(..).unwrap();
        assert!(approx_eq!(f32, up[0], -0.5));
        assert!(approx_eq!(f32, up[12], 0.5));
    }

    #[test]
    fn rejects_unknown_component() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("palm.nc");
        write_staggered(&input);

        let args = InterpolateArgs {
            filename: input,
            fileout: Some(dir.path().join("out.nc")),
            varname: "u".to_string(),
            component: "x".to_string(),
            time_offset: 0,
            left: 0,
            right: 0,
            coarsening: 1,
            mean: false,
            primes: false,
            compress: false,
        };

        assert!(run(&args).is_err());
    }
}
