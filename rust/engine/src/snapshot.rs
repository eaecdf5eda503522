// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON export of a mesh's current geometry.
//!
//! A snapshot is a read-only copy for consumers such as renderers and
//! debugging tools. It is not a persistence format: sources are not
//! recorded, so a snapshot cannot recreate a live mesh.

use serde::{Deserialize, Serialize};
use surfmesh_geometry::{Extents, HiddenSet};

use crate::error::Result;
use crate::strategy::{Geometry, MeshType};

/// Serializable copy of a mesh's geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub mesh_type: String,
    pub vertices: Vec<[f64; 2]>,
    pub hull: Vec<usize>,
    pub triangles: Vec<[usize; 3]>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub hidden: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub extents: Option<ExtentsSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtentsSnapshot {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl From<Extents> for ExtentsSnapshot {
    fn from(e: Extents) -> Self {
        Self {
            x_min: e.x_min,
            x_max: e.x_max,
            y_min: e.y_min,
            y_max: e.y_max,
        }
    }
}

impl MeshSnapshot {
    pub(crate) fn new(
        name: &str,
        kind: MeshType,
        geometry: &Geometry,
        hidden: &HiddenSet,
    ) -> Self {
        Self {
            name: name.to_string(),
            mesh_type: kind.to_string(),
            vertices: geometry.vertices.iter().map(|p| [p.x, p.y]).collect(),
            hull: geometry.hull.clone(),
            triangles: geometry.triangles.iter().map(|t| t.indices()).collect(),
            hidden: hidden.sorted(),
            extents: geometry.extents.map(Into::into),
        }
    }

    /// Serializes the snapshot to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surfmesh_geometry::{Point2, Triangle};

    fn sample() -> MeshSnapshot {
        let geometry = Geometry {
            vertices: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ],
            hull: vec![0, 1, 2],
            triangles: vec![Triangle::new(0, 1, 2)],
            extents: Extents::from_points(&[Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]),
        };
        MeshSnapshot::new("tri", MeshType::Cloud, &geometry, &HiddenSet::new())
    }

    #[test]
    fn json_field_names() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "cloud");
        assert_eq!(value["triangles"][0], serde_json::json!([0, 1, 2]));
        assert_eq!(value["extents"]["x_max"], 1.0);
        assert!(value.get("hidden").is_none());
    }

    #[test]
    fn parses_back() {
        let snapshot = sample();
        let parsed = MeshSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
        assert!(MeshSnapshot::from_json("{").is_err());
    }
}
