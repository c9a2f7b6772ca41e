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

//! Parsing of list and matrix values given as text in the configuration.

use crate::errors::PidsError;
use crate::Float;
use log::warn;
use ndarray::Array2;

/// Parses a matrix written as comma-separated rows, one row per line.
///
/// A leading row with a single item is treated as a header and skipped.
/// Rows that cannot be parsed or have a different number of items than
/// the first row are left as zeros.
pub fn parse_string_array_input(
    input: &str,
    key: &'static str,
) -> Result<Array2<Float>, PidsError> {
    let mut rows: Vec<&str> = input.trim().lines().collect();

    if rows.first().map_or(false, |r| r.split(',').count() == 1) {
        rows.remove(0);
    }

    let ncols = match rows.first() {
        Some(row) => row.split(',').count(),
        None => {
            return Err(PidsError::InvalidInput {
                key,
                reason: "no data rows".to_string(),
            })
        }
    };

    let mut array = Array2::<Float>::zeros((rows.len(), ncols));

    for (i, row) in rows.iter().enumerate() {
        let items: Result<Vec<Float>, _> = row.split(',').map(|s| s.trim().parse::<Float>()).collect();

        match items {
            Ok(items) if items.len() == ncols => {
                for (j, item) in items.into_iter().enumerate() {
                    array[[i, j]] = item;
                }
            }
            _ => warn!("Row {} of {} cannot be parsed, filled with zeros", i, key),
        }
    }

    Ok(array)
}

/// Splits comma-separated names, each truncated to `max_len` characters.
pub fn parse_character_array(
    input: &str,
    max_len: usize,
    key: &'static str,
) -> Result<Vec<String>, PidsError> {
    let names: Vec<String> = input
        .split(',')
        .map(|s| s.trim().chars().take(max_len).collect())
        .collect();

    if names.iter().any(|n| n.is_empty()) {
        return Err(PidsError::InvalidInput {
            key,
            reason: "list contains an empty name".to_string(),
        });
    }

    Ok(names)
}

/// Parses comma-separated list of integers.
pub fn parse_index_list(input: &str, key: &'static str) -> Result<Vec<i64>, PidsError> {
    input
        .split(',')
        .map(|s| {
            s.trim().parse::<i64>().map_err(|_| PidsError::InvalidInput {
                key,
                reason: format!("{} is not an integer", s.trim()),
            })
        })
        .collect()
}
