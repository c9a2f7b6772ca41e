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

//! Sub-module with interpolation of PALM velocity components
//! from the staggered (Arakawa C) grid to cell centres.
//!
//! In PALM `u`, `v` and `w` are stored on the faces of grid cells
//! (shifted by half a cell along x, y and z respectively). To compare or
//! combine them they are averaged onto the cell centres. The centred
//! field has one point less along every spatial axis.

use crate::{errors::InterpolationError, Float};
use log::info;
use ndarray::{s, Array1, Array3, Array4, ArrayView3, ArrayView4, ArrayViewMut3, Axis, Zip};
use std::str::FromStr;

/// Velocity component, named after the index of the axis
/// along which it is staggered.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Component {
    /// x-component (`u`)
    I,
    /// y-component (`v`)
    J,
    /// z-component (`w`)
    K,
}

impl FromStr for Component {
    type Err = InterpolationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i" => Ok(Component::I),
            "j" => Ok(Component::J),
            "k" => Ok(Component::K),
            _ => Err(InterpolationError::InvalidComponent(s.to_string())),
        }
    }
}

impl Component {
    /// Axis of `(time, z, y, x)` array along which the component is staggered.
    pub fn axis(self) -> usize {
        match self {
            Component::I => 3,
            Component::J => 2,
            Component::K => 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Component::I => "i",
            Component::J => "j",
            Component::K => "k",
        }
    }
}

/// Interpolates staggered `(time, z, y, x)` component onto cell centres.
///
/// Neighbouring values along the staggering axis are averaged and the other two
/// spatial axes are trimmed so that all three components end up on the same points:
/// z loses its first level, y and x their last point.
///
/// When `mean_on` is set the time average of the centred field is returned as well.
pub fn interpolate_palm_vectors(
    v0: ArrayView4<Float>,
    component: Component,
    mean_on: bool,
) -> Result<(Array4<Float>, Option<Array3<Float>>), InterpolationError> {
    let (nt, nz, ny, nx) = v0.dim();

    if nz < 2 || ny < 2 || nx < 2 {
        return Err(InterpolationError::TooSmall(v0.shape().to_vec()));
    }

    let mut vc = Array4::<Float>::zeros((nt, nz - 1, ny - 1, nx - 1));

    Zip::from(vc.outer_iter_mut())
        .and(v0.outer_iter())
        .par_for_each(|out, frame| centre_frame(frame, out, component));

    let vm = if mean_on {
        Some(vc.mean_axis(Axis(0)).ok_or(InterpolationError::NoTimeSteps)?)
    } else {
        None
    };

    info!(
        "Interpolation along the {}^th direction completed",
        component.name()
    );

    Ok((vc, vm))
}

/// Centres a single `(z, y, x)` time step.
fn centre_frame(frame: ArrayView3<Float>, mut out: ArrayViewMut3<Float>, component: Component) {
    let (left, right) = match component {
        Component::I => (frame.slice(s![1.., ..-1, ..-1]), frame.slice(s![1.., ..-1, 1..])),
        Component::J => (frame.slice(s![1.., ..-1, ..-1]), frame.slice(s![1.., 1.., ..-1])),
        Component::K => (frame.slice(s![..-1, ..-1, ..-1]), frame.slice(s![1.., ..-1, ..-1])),
    };

    Zip::from(&mut out)
        .and(&left)
        .and(&right)
        .for_each(|o, &l, &r| *o = 0.5 * (l + r));
}

/// Fluctuating part of the centred field, `vc(t) - vm` for every time step.
pub fn vector_prime_component(
    vc: &Array4<Float>,
    vm: &Array3<Float>,
) -> Result<Array4<Float>, InterpolationError> {
    if vc.shape()[1..] != *vm.shape() {
        return Err(InterpolationError::MeanShape {
            field: vc.shape().to_vec(),
            mean: vm.shape().to_vec(),
        });
    }

    info!("Computing primes for {} times", vc.len_of(Axis(0)));

    let vp = vc - &vm.view().insert_axis(Axis(0));

    Ok(vp)
}

/// Role of a spatial coordinate with respect to the interpolated component.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AxisRole {
    Vertical,
    Horizontal,
}

/// Transforms a staggered coordinate the same way the component is transformed:
/// midpoints along the staggering axis, otherwise the first vertical
/// or the last horizontal point is dropped.
pub fn centred_coordinates(coord: &Array1<Float>, staggered: bool, role: AxisRole) -> Array1<Float> {
    let n = coord.len();

    if n < 2 {
        return Array1::zeros(0);
    }

    if staggered {
        Array1::from_iter((0..n - 1).map(|i| 0.5 * (coord[i] + coord[i + 1])))
    } else {
        match role {
            AxisRole::Vertical => coord.slice(s![1..]).to_owned(),
            AxisRole::Horizontal => coord.slice(s![..-1]).to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        centred_coordinates, interpolate_palm_vectors, vector_prime_component, AxisRole,
        Component,
    };
    use float_cmp::approx_eq;
    use ndarray::{arr1, Array4};

    fn sample() -> Array4<f64> {
        Array4::from_shape_fn((2, 3, 4, 5), |(t, z, y, x)| {
            (1000 * t + 100 * z + 10 * y + x) as f64
        })
    }

    #[test]
    fn parses_components() {
        assert_eq!("i".parse::<Component>().unwrap(), Component::I);
        assert_eq!("k".parse::<Component>().unwrap().axis(), 1);
        assert!("u".parse::<Component>().is_err());
    }

    #[test]
    fn i_component() {
        let v0 = sample();
        let (vc, vm) = interpolate_palm_vectors(v0.view(), Component::I, false).unwrap();

        assert_eq!(vc.shape(), &[2, 2, 3, 4]);
        assert!(vm.is_none());
        // z shifted by one, x averaged
        assert!(approx_eq!(f64, vc[[0, 0, 0, 0]], 100.5));
        assert!(approx_eq!(f64, vc[[1, 1, 2, 3]], 1000.0 + 200.0 + 20.0 + 3.5));
    }

    #[test]
    fn j_component() {
        let v0 = sample();
        let (vc, _) = interpolate_palm_vectors(v0.view(), Component::J, false).unwrap();

        assert_eq!(vc.shape(), &[2, 2, 3, 4]);
        assert!(approx_eq!(f64, vc[[0, 0, 0, 0]], 105.0));
        assert!(approx_eq!(f64, vc[[0, 1, 2, 3]], 200.0 + 25.0 + 3.0));
    }

    #[test]
    fn k_component_with_mean() {
        let v0 = sample();
        let (vc, vm) = interpolate_palm_vectors(v0.view(), Component::K, true).unwrap();

        assert_eq!(vc.shape(), &[2, 2, 3, 4]);
        assert!(approx_eq!(f64, vc[[0, 0, 0, 0]], 50.0));

        let vm = vm.unwrap();
        assert_eq!(vm.shape(), &[2, 3, 4]);
        assert!(approx_eq!(f64, vm[[0, 0, 0]], 550.0));

        let vp = vector_prime_component(&vc, &vm).unwrap();
        assert!(approx_eq!(f64, vp[[0, 1, 1, 1]], -500.0));
        assert!(approx_eq!(f64, vp[[1, 1, 1, 1]], 500.0));
    }

    #[test]
    fn rejects_degenerate_fields() {
        let v0 = Array4::<f64>::zeros((1, 1, 3, 3));
        assert!(interpolate_palm_vectors(v0.view(), Component::I, false).is_err());

        let vc = Array4::<f64>::zeros((1, 2, 2, 2));
        let vm = ndarray::Array3::<f64>::zeros((2, 2, 3));
        assert!(vector_prime_component(&vc, &vm).is_err());
    }

    #[test]
    fn coordinates_follow_the_field() {
        let x = arr1(&[0.0, 2.0, 4.0, 6.0]);

        assert_eq!(
            centred_coordinates(&x, true, AxisRole::Horizontal).to_vec(),
            vec![1.0, 3.0, 5.0]
        );
        assert_eq!(
            centred_coordinates(&x, false, AxisRole::Horizontal).to_vec(),
            vec![0.0, 2.0, 4.0]
        );
        assert_eq!(
            centred_coordinates(&x, false, AxisRole::Vertical).to_vec(),
            vec![2.0, 4.0, 6.0]
        );
    }
}
