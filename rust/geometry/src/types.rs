// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain value types shared by the hull and triangulation routines.

use std::fmt;

use nalgebra::Point2;

/// A triangle as three indices into a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

impl Triangle {
    #[inline]
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self { a, b, c }
    }

    /// The three indices in slot order.
    #[inline]
    pub fn indices(&self) -> [usize; 3] {
        [self.a, self.b, self.c]
    }

    /// Signed area of the triangle over `vertices` (positive when
    /// counter-clockwise).
    pub fn signed_area(&self, vertices: &[Point2<f64>]) -> f64 {
        let (p, q, r) = (vertices[self.a], vertices[self.b], vertices[self.c]);
        0.5 * ((q.x - p.x) * (r.y - p.y) - (r.x - p.x) * (q.y - p.y))
    }
}

/// Names one of the three index slots of a [`Triangle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleSlot {
    A,
    B,
    C,
}

impl fmt::Display for TriangleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriangleSlot::A => "first",
            TriangleSlot::B => "second",
            TriangleSlot::C => "third",
        })
    }
}

/// Axis-aligned bounds of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extents {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extents {
    /// Bounds of `points`, or `None` when there are no points.
    pub fn from_points(points: &[Point2<f64>]) -> Option<Self> {
        let first = points.first()?;
        let mut extents = Extents {
            x_min: first.x,
            x_max: first.x,
            y_min: first.y,
            y_max: first.y,
        };
        for p in &points[1..] {
            extents.x_min = extents.x_min.min(p.x);
            extents.x_max = extents.x_max.max(p.x);
            extents.y_min = extents.y_min.min(p.y);
            extents.y_max = extents.y_max.max(p.y);
        }
        Some(extents)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}
