use thiserror::Error;

use crate::types::TriangleSlot;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during hull, grid and triangle processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("triangle list must hold a multiple of 3 indices, got {0}")]
    TriangleIndexCount(usize),

    #[error("bad triangle index \"{token}\": expected a positive integer")]
    BadTriangleIndex { token: String },

    #[error(
        "{slot} index of triangle {triangle} is out of range: {} (mesh has {count} vertices)",
        .index + 1
    )]
    TriangleIndexOutOfRange {
        triangle: usize,
        slot: TriangleSlot,
        index: usize,
        count: usize,
    },

    #[error("bad hidden triangle \"{token}\": expected a non-negative integer")]
    BadHiddenIndex { token: String },

    #[error("{axis} grid needs at least 2 points, got {count}")]
    GridTooSmall { axis: char, count: f64 },

    #[error("{axis} grid count must be a whole number, got {count}")]
    FractionalGridCount { axis: char, count: f64 },

    #[error("{axis} grid has an empty range: min and max are both {value}")]
    EmptyGridRange { axis: char, value: f64 },
}
