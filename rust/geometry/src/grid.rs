// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Regular grid meshes.
//!
//! A regular grid needs no general triangulator: its topology is known up
//! front, so vertices, triangles and hull come straight from the grid
//! dimensions.

use nalgebra::Point2;

use crate::error::{Error, Result};
use crate::hidden::HiddenSet;
use crate::types::Triangle;

/// One axis of a regular grid: `count` evenly spaced samples from `min` to
/// `max` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAxis {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl GridAxis {
    /// Validates an axis given as `(min, max, count)`.
    ///
    /// `count` must be a whole number of at least 2; `min` and `max` must
    /// differ.
    pub fn new(axis: char, min: f64, max: f64, count: f64) -> Result<Self> {
        if !(count >= 2.0) {
            return Err(Error::GridTooSmall { axis, count });
        }
        if count.fract() != 0.0 {
            return Err(Error::FractionalGridCount { axis, count });
        }
        if min == max {
            return Err(Error::EmptyGridRange { axis, value: min });
        }
        Ok(Self {
            min,
            max,
            count: count as usize,
        })
    }

    /// Distance between neighboring samples.
    #[inline]
    pub fn step(&self) -> f64 {
        (self.max - self.min) / (self.count - 1) as f64
    }

    /// Coordinate of sample `i`.
    #[inline]
    pub fn value(&self, i: usize) -> f64 {
        self.min + i as f64 * self.step()
    }
}

/// Number of triangles a `nx` by `ny` grid produces before hiding.
#[inline]
pub fn grid_triangle_count(nx: usize, ny: usize) -> usize {
    2 * nx.saturating_sub(1) * ny.saturating_sub(1)
}

/// Vertices of the grid, row-major (x varies fastest).
pub fn grid_vertices(x: &GridAxis, y: &GridAxis) -> Vec<Point2<f64>> {
    let mut vertices = Vec::with_capacity(x.count * y.count);
    for j in 0..y.count {
        let yv = y.value(j);
        for i in 0..x.count {
            vertices.push(Point2::new(x.value(i), yv));
        }
    }
    vertices
}

/// Triangles of an `nx` by `ny` row-major grid.
///
/// Each cell yields two counter-clockwise triangles split along the
/// diagonal from its lower-left to its upper-right corner. Ordinals count
/// cells row by row, two per cell; ordinals in `hidden` are skipped.
pub fn grid_triangles(nx: usize, ny: usize, hidden: &HiddenSet) -> Vec<Triangle> {
    let mut triangles = Vec::with_capacity(grid_triangle_count(nx, ny));
    let mut ordinal = 0;
    for j in 0..ny.saturating_sub(1) {
        for i in 0..nx.saturating_sub(1) {
            let lower_left = j * nx + i;
            let lower_right = lower_left + 1;
            let upper_left = lower_left + nx;
            let upper_right = upper_left + 1;
            for triangle in [
                Triangle::new(lower_left, lower_right, upper_right),
                Triangle::new(lower_left, upper_right, upper_left),
            ] {
                if !hidden.contains(ordinal) {
                    triangles.push(triangle);
                }
                ordinal += 1;
            }
        }
    }
    triangles
}

/// The four corners of an `nx` by `ny` grid, counter-clockwise from the
/// origin corner.
pub fn grid_hull(nx: usize, ny: usize) -> Vec<usize> {
    vec![0, nx - 1, nx * ny - 1, nx * (ny - 1)]
}
