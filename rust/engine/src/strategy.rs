// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-type mesh construction.
//!
//! Every mesh type turns its x and y values into vertices, a convex hull and
//! a triangle list:
//!
//! | type      | vertices                       | triangles                     |
//! |-----------|--------------------------------|-------------------------------|
//! | regular   | grid from `(min, max, count)`  | two per grid cell             |
//! | irregular | cross product of x and y       | Delaunay                      |
//! | cloud     | `(x[i], y[i])`, deduplicated   | Delaunay                      |
//! | triangle  | `(x[i], y[i])`                 | the explicit index triples    |
//!
//! Hidden ordinals are removed from every triangle list; the regular grid
//! skips them while generating.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use surfmesh_geometry::{
    compact_hidden, convex_hull, grid_hull, grid_triangle_count, grid_triangles, grid_vertices,
    point_key, triangulate, validate_triangles, Extents, GridAxis, HiddenSet, Point2, Triangle,
};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::source::{Axis, SourceValues};

/// The kind of mesh, fixed when the mesh is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshType {
    Regular,
    Irregular,
    Cloud,
    Triangle,
}

impl MeshType {
    pub fn as_str(self) -> &'static str {
        match self {
            MeshType::Regular => "regular",
            MeshType::Irregular => "irregular",
            MeshType::Cloud => "cloud",
            MeshType::Triangle => "triangle",
        }
    }
}

impl fmt::Display for MeshType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeshType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regular" => Ok(MeshType::Regular),
            "irregular" => Ok(MeshType::Irregular),
            "cloud" => Ok(MeshType::Cloud),
            "triangle" => Ok(MeshType::Triangle),
            _ => Err(Error::UnknownMeshType(s.to_string())),
        }
    }
}

/// Everything a recompute derives from the sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Point2<f64>>,
    /// Boundary vertex indices, counter-clockwise, implicitly closed.
    pub hull: Vec<usize>,
    pub triangles: Vec<Triangle>,
    pub extents: Option<Extents>,
}

/// Inputs to one recompute.
pub(crate) struct BuildInput<'a> {
    pub mesh: &'a str,
    pub x: &'a SourceValues,
    pub y: &'a SourceValues,
    pub requested: &'a [Triangle],
    pub hidden: &'a HiddenSet,
    pub config: &'a EngineConfig,
}

impl MeshType {
    /// Builds the mesh geometry for this type.
    pub(crate) fn build(self, input: &BuildInput<'_>) -> Result<Geometry> {
        check_finite(Axis::X, input.x)?;
        check_finite(Axis::Y, input.y)?;
        let mut geometry = match self {
            MeshType::Regular => return build_regular(input),
            MeshType::Irregular => build_irregular(input)?,
            MeshType::Cloud => build_cloud(input)?,
            MeshType::Triangle => build_triangle(input)?,
        };
        compact_hidden(&mut geometry.triangles, input.hidden);
        Ok(geometry)
    }
}

fn check_finite(axis: Axis, values: &SourceValues) -> Result<()> {
    match values.values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(Error::NonFinite { axis, index }),
        None => Ok(()),
    }
}

fn require_len(kind: MeshType, axis: Axis, values: &SourceValues, need: usize) -> Result<()> {
    if values.len() < need {
        return Err(Error::TooFewValues {
            kind,
            axis,
            need,
            got: values.len(),
        });
    }
    Ok(())
}

fn same_length(kind: MeshType, input: &BuildInput<'_>) -> Result<()> {
    if input.x.len() != input.y.len() {
        return Err(Error::LengthMismatch {
            kind,
            x: input.x.len(),
            y: input.y.len(),
        });
    }
    Ok(())
}

fn grid_axis(axis: Axis, values: &SourceValues) -> Result<GridAxis> {
    match values.values[..] {
        [min, max, count] => Ok(GridAxis::new(axis.as_char(), min, max, count)?),
        _ => Err(Error::BadGridSpec {
            axis,
            got: values.len(),
        }),
    }
}

fn build_regular(input: &BuildInput<'_>) -> Result<Geometry> {
    let x = grid_axis(Axis::X, input.x)?;
    let y = grid_axis(Axis::Y, input.y)?;
    let num_vertices = x.count.saturating_mul(y.count);
    input.config.check_alloc(num_vertices, "vertices")?;
    input
        .config
        .check_alloc(grid_triangle_count(x.count, y.count), "triangles")?;

    let vertices = grid_vertices(&x, &y);
    Ok(Geometry {
        hull: grid_hull(x.count, y.count),
        triangles: grid_triangles(x.count, y.count, input.hidden),
        extents: Extents::from_points(&vertices),
        vertices,
    })
}

/// Hull, Delaunay triangles and extents of `vertices`.
fn general(vertices: Vec<Point2<f64>>, config: &EngineConfig) -> Result<Geometry> {
    let hull = convex_hull(&vertices);
    let triangles = triangulate(&vertices);
    config.check_alloc(triangles.len(), "triangles")?;
    Ok(Geometry {
        hull,
        triangles,
        extents: Extents::from_points(&vertices),
        vertices,
    })
}

fn build_irregular(input: &BuildInput<'_>) -> Result<Geometry> {
    require_len(MeshType::Irregular, Axis::X, input.x, 2)?;
    require_len(MeshType::Irregular, Axis::Y, input.y, 2)?;
    let (nx, ny) = (input.x.len(), input.y.len());
    input.config.check_alloc(nx.saturating_mul(ny), "vertices")?;

    let mut vertices = Vec::with_capacity(nx * ny);
    for &yv in &input.y.values {
        for &xv in &input.x.values {
            vertices.push(Point2::new(xv, yv));
        }
    }
    general(vertices, input.config)
}

fn build_cloud(input: &BuildInput<'_>) -> Result<Geometry> {
    same_length(MeshType::Cloud, input)?;
    require_len(MeshType::Cloud, Axis::X, input.x, 3)?;
    input.config.check_alloc(input.x.len(), "vertices")?;

    let mut seen: FxHashMap<(u64, u64), usize> = FxHashMap::default();
    let mut vertices = Vec::with_capacity(input.x.len());
    for (i, (&xv, &yv)) in input.x.values.iter().zip(&input.y.values).enumerate() {
        let point = Point2::new(xv, yv);
        match seen.get(&point_key(&point)) {
            Some(&first) => {
                if input.config.warn_duplicates {
                    tracing::warn!(
                        mesh = input.mesh,
                        index = i,
                        first,
                        x = xv,
                        y = yv,
                        "Dropped duplicate cloud point"
                    );
                }
            }
            None => {
                seen.insert(point_key(&point), i);
                vertices.push(point);
            }
        }
    }
    general(vertices, input.config)
}

fn build_triangle(input: &BuildInput<'_>) -> Result<Geometry> {
    same_length(MeshType::Triangle, input)?;
    require_len(MeshType::Triangle, Axis::X, input.x, 2)?;
    input.config.check_alloc(input.x.len(), "vertices")?;
    input
        .config
        .check_alloc(input.requested.len(), "triangles")?;

    let vertices: Vec<Point2<f64>> = input
        .x
        .values
        .iter()
        .zip(&input.y.values)
        .map(|(&xv, &yv)| Point2::new(xv, yv))
        .collect();
    validate_triangles(input.requested, vertices.len())?;
    Ok(Geometry {
        hull: convex_hull(&vertices),
        triangles: input.requested.to_vec(),
        extents: Extents::from_points(&vertices),
        vertices,
    })
}
