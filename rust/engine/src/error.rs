// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for mesh configuration and lifecycle.

use thiserror::Error;

use crate::strategy::MeshType;
use crate::source::Axis;

/// Result type alias for mesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the mesh engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("a mesh \"{0}\" already exists")]
    MeshExists(String),

    #[error("can't find mesh \"{0}\"")]
    NoSuchMesh(String),

    #[error("unknown mesh type \"{0}\": should be regular, irregular, cloud, or triangle")]
    UnknownMeshType(String),

    #[error("bad {axis} value \"{token}\": expected a number")]
    BadNumber { axis: Axis, token: String },

    #[error("{axis} value {index} is not a finite number")]
    NonFinite { axis: Axis, index: usize },

    #[error("{kind} mesh needs at least {need} {axis} values, got {got}")]
    TooFewValues {
        kind: MeshType,
        axis: Axis,
        need: usize,
        got: usize,
    },

    #[error("{kind} mesh needs as many x values as y values (got {x} and {y})")]
    LengthMismatch { kind: MeshType, x: usize, y: usize },

    #[error("regular mesh {axis} values must be min, max and count, got {got} values")]
    BadGridSpec { axis: Axis, got: usize },

    #[error("explicit triangles are only valid for triangle meshes, not {0} meshes")]
    TrianglesNotAllowed(MeshType),

    #[error("can't allocate {count} {what}")]
    Allocation { count: usize, what: &'static str },

    #[error("unbalanced braces in list \"{0}\"")]
    UnbalancedBraces(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Table(#[from] surfmesh_core::Error),

    #[error(transparent)]
    Geometry(#[from] surfmesh_geometry::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
