// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Explicit triangle lists supplied by the user.

use crate::error::{Error, Result};
use crate::types::{Triangle, TriangleSlot};

/// Parses a flat list of 1-based vertex indices into 0-based triangles.
///
/// The list length must be a multiple of three and every token a positive
/// integer. An empty list is valid and yields no triangles. Nothing is
/// returned on failure, so a caller's previous list stays intact.
pub fn parse_triangle_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Triangle>> {
    if tokens.len() % 3 != 0 {
        return Err(Error::TriangleIndexCount(tokens.len()));
    }
    let mut indices = Vec::with_capacity(tokens.len());
    for token in tokens {
        let token = token.as_ref();
        match token.trim().parse::<usize>() {
            Ok(value) if value > 0 => indices.push(value - 1),
            _ => {
                return Err(Error::BadTriangleIndex {
                    token: token.to_string(),
                })
            }
        }
    }
    Ok(indices
        .chunks_exact(3)
        .map(|c| Triangle::new(c[0], c[1], c[2]))
        .collect())
}

/// Checks that every index of every triangle addresses one of
/// `num_vertices` vertices.
pub fn validate_triangles(triangles: &[Triangle], num_vertices: usize) -> Result<()> {
    for (ordinal, triangle) in triangles.iter().enumerate() {
        let slots = [
            (TriangleSlot::A, triangle.a),
            (TriangleSlot::B, triangle.b),
            (TriangleSlot::C, triangle.c),
        ];
        for (slot, index) in slots {
            if index >= num_vertices {
                return Err(Error::TriangleIndexOutOfRange {
                    triangle: ordinal,
                    slot,
                    index,
                    count: num_vertices,
                });
            }
        }
    }
    Ok(())
}
