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

//! Module containing constants used by the tools,
//! mostly conventions of PALM Input Data Standard.

use crate::Float;

/// Fill value of floating point PIDS variables.
pub const FILL_F32: f32 = -9999.9;

/// Fill value of integer PIDS variables.
pub const FILL_I32: i32 = -9999;

/// Fill value of byte PIDS variables (building flags).
pub const FILL_I8: i8 = -127;

/// Number of hours in a (non-leap) year, the length
/// of emission time factors with `lod = 2`.
pub const HOURS_PER_YEAR: usize = 24 * 365;

/// Maximum length of emission category and species names.
pub const MAX_NAME_LEN: usize = 10;

/// Small number keeping denominators of relative differences away from zero.
pub const DIFF_EPS: Float = 1.0e-5;

/// Offset added to products in normalized mean square difference.
pub const NMSD_EPS: Float = 1.0e-4;

/// Global string attributes of PIDS files.
pub const PIDS_STR_ATTRIBUTES: [&str; 18] = [
    "Conventions",
    "palm_version",
    "title",
    "acronym",
    "campaign",
    "institution",
    "author",
    "contact_person",
    "licence",
    "history",
    "keywords",
    "references",
    "comment",
    "data_content",
    "source",
    "dependencies",
    "location",
    "site",
];

/// Global floating point attributes of PIDS files.
pub const PIDS_FLOAT_ATTRIBUTES: [&str; 7] = [
    "origin_x",
    "origin_y",
    "origin_z",
    "origin_lat",
    "origin_lon",
    "rotation_angle",
    "origin_time",
];
