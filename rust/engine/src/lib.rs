// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Surfmesh Engine
//!
//! Named 2D meshes whose vertices come from table columns, vectors or
//! literal number lists, kept up to date as that data changes.
//!
//! ## Overview
//!
//! A [`MeshEngine`] owns the meshes built over one [`TableStore`] and one
//! [`VectorStore`]. Each [`Mesh`] has a fixed [`MeshType`] and two data
//! sources, one per axis:
//!
//! - **regular**: `min max count` per axis, a uniform grid
//! - **irregular**: arbitrary x and y samples, their cross product
//! - **cloud**: paired x/y samples, duplicates dropped
//! - **triangle**: paired x/y samples plus an explicit triangle list
//!
//! Configuring a mesh recomputes it synchronously. When the data behind a
//! source changes, the mesh queues one deferred recompute that runs on the
//! next [`MeshEngine::run_idle`].
//!
//! ## Quick Start
//!
//! ```
//! use surfmesh_engine::{MeshEngine, MeshOptions, MeshType};
//!
//! let engine = MeshEngine::default();
//! engine.tables().create_table("samples").unwrap();
//! let table = engine.tables().open("samples").unwrap();
//! let (x, y) = (table.create_column("x"), table.create_column("y"));
//! table.extend_rows(4);
//! for (row, (xv, yv)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].into_iter().enumerate() {
//!     table.set_double(row, x, xv).unwrap();
//!     table.set_double(row, y, yv).unwrap();
//! }
//!
//! let mesh = engine.create_mesh("square", MeshType::Cloud).unwrap();
//! mesh.configure(&MeshOptions::new().x("samples x").unwrap().y("samples y").unwrap())
//!     .unwrap();
//! assert_eq!(mesh.num_triangles(), 2);
//!
//! table.set_double(2, x, 3.0).unwrap();
//! assert!(mesh.is_config_pending());
//! assert!(engine.run_idle().is_empty());
//! assert_eq!(mesh.extents().unwrap().x_max, 3.0);
//! ```

pub mod config;
pub mod error;
pub mod idle;
pub mod mesh;
pub mod registry;
pub mod snapshot;
pub mod source;
pub mod strategy;

pub use config::{split_list, EngineConfig, MeshOptions, DEFAULT_MAX_POINTS};
pub use error::{Error, Result};
pub use idle::{IdleQueue, IdleTask};
pub use mesh::{ClientId, Mesh, MeshEvent, MeshNotifyProc, WeakMesh};
pub use registry::MeshEngine;
pub use snapshot::{ExtentsSnapshot, MeshSnapshot};
pub use source::{Axis, DataSource, SourceValues};
pub use strategy::{Geometry, MeshType};

// Re-export the collaborator and geometry types that appear in the API.
pub use surfmesh_core::{TableStore, VectorStore};
pub use surfmesh_geometry::{Extents, Point2, Triangle};
