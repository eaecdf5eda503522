//! Surfmesh Geometry
//!
//! Planar geometry for surfmesh: monotone-chain convex hulls,
//! sweep-and-flip Delaunay triangulation, regular-grid triangulation and the
//! triangle-list helpers (hidden-triangle compaction, explicit index
//! parsing and validation) the mesh engine builds on.

pub mod error;
pub mod grid;
pub mod hidden;
pub mod hull;
pub mod indices;
pub mod triangulation;
pub mod types;

// Re-export nalgebra types for convenience
pub use nalgebra::Point2;

pub use error::{Error, Result};
pub use grid::{grid_hull, grid_triangle_count, grid_triangles, grid_vertices, GridAxis};
pub use hidden::{compact_hidden, HiddenSet};
pub use hull::{convex_hull, is_left};
pub use indices::{parse_triangle_tokens, validate_triangles};
pub use triangulation::{in_circle, point_key, triangulate};
pub use types::{Extents, Triangle, TriangleSlot};
