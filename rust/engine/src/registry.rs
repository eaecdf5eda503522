// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The mesh registry.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use surfmesh_core::{TableStore, VectorStore};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::idle::IdleQueue;
use crate::mesh::{Mesh, Shared};
use crate::strategy::MeshType;

/// Owns the named meshes built over one set of tables and vectors.
///
/// The engine is the embedding application's handle on everything: mesh
/// names are unique within it, deferred recomputes wait in its idle queue
/// until [`run_idle`](MeshEngine::run_idle), and dropping it deletes every
/// mesh it still holds.
///
/// # Example
///
/// ```
/// use surfmesh_engine::{MeshEngine, MeshOptions, MeshType};
///
/// let engine = MeshEngine::default();
/// engine.vectors().create("xs", vec![0.0, 1.0, 0.0]).unwrap();
///
/// let mesh = engine.create_mesh("cloud", MeshType::Cloud).unwrap();
/// mesh.configure(&MeshOptions::new().x("xs").unwrap().y("0 0 1").unwrap())
///     .unwrap();
/// assert_eq!(mesh.num_triangles(), 1);
///
/// // Upstream changes are picked up on the next idle pass.
/// engine.vectors().set("xs", vec![0.0, 2.0, 0.0, 2.0]).unwrap();
/// let errors = engine.run_idle();
/// assert_eq!(errors.len(), 1); // four x values, three y values
/// assert_eq!(mesh.num_triangles(), 1);
/// ```
pub struct MeshEngine {
    shared: Rc<Shared>,
    meshes: RefCell<FxHashMap<String, Mesh>>,
}

impl MeshEngine {
    /// Creates an engine over `tables` and `vectors`.
    pub fn new(tables: TableStore, vectors: VectorStore) -> Self {
        Self::with_config(tables, vectors, EngineConfig::default())
    }

    pub fn with_config(tables: TableStore, vectors: VectorStore, config: EngineConfig) -> Self {
        tracing::debug!(max_points = config.max_points, "Created mesh engine");
        Self {
            shared: Rc::new(Shared {
                tables,
                vectors,
                idle: IdleQueue::new(),
                config,
            }),
            meshes: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn tables(&self) -> &TableStore {
        &self.shared.tables
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.shared.vectors
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Creates an unconfigured mesh called `name`.
    pub fn create_mesh(&self, name: &str, kind: MeshType) -> Result<Mesh> {
        let mut meshes = self.meshes.borrow_mut();
        if meshes.contains_key(name) {
            return Err(Error::MeshExists(name.to_string()));
        }
        let mesh = Mesh::new(name, kind, Rc::clone(&self.shared));
        meshes.insert(name.to_string(), mesh.clone());
        Ok(mesh)
    }

    /// Returns `true` if a mesh called `name` is registered.
    pub fn exists(&self, name: &str) -> bool {
        self.meshes.borrow().contains_key(name)
    }

    /// Acquires another handle on the mesh called `name`.
    pub fn acquire(&self, name: &str) -> Result<Mesh> {
        self.meshes
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchMesh(name.to_string()))
    }

    /// Removes `name` from the registry and tells its notifiers.
    ///
    /// The name is free for reuse at once. The mesh itself lives on until
    /// every outstanding handle is dropped.
    pub fn destroy_mesh(&self, name: &str) -> Result<()> {
        let mesh = self
            .meshes
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| Error::NoSuchMesh(name.to_string()))?;
        mesh.mark_deleted();
        Ok(())
    }

    /// Registered mesh names, sorted.
    pub fn mesh_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.meshes.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Runs the deferred recomputes queued so far.
    ///
    /// Returns the errors of the recomputes that failed; the meshes involved
    /// keep their last good geometry.
    pub fn run_idle(&self) -> Vec<Error> {
        self.shared.idle.run()
    }

    /// Number of deferred tasks waiting for [`run_idle`](Self::run_idle).
    pub fn pending_tasks(&self) -> usize {
        self.shared.idle.len()
    }
}

impl Default for MeshEngine {
    fn default() -> Self {
        Self::new(TableStore::new(), VectorStore::new())
    }
}

impl Drop for MeshEngine {
    fn drop(&mut self) {
        let meshes: Vec<Mesh> = self.meshes.get_mut().drain().map(|(_, mesh)| mesh).collect();
        for mesh in meshes {
            mesh.mark_deleted();
        }
    }
}

impl std::fmt::Debug for MeshEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshEngine")
            .field("meshes", &self.mesh_names())
            .field("pending", &self.pending_tasks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ClientId, MeshEvent};
    use std::cell::Cell;

    #[test]
    fn names_are_unique_until_destroyed() {
        let engine = MeshEngine::default();
        engine.create_mesh("a", MeshType::Regular).unwrap();
        engine.create_mesh("b", MeshType::Cloud).unwrap();
        assert_eq!(
            engine.create_mesh("a", MeshType::Cloud).unwrap_err(),
            Error::MeshExists("a".into())
        );
        assert_eq!(engine.mesh_names(), vec!["a", "b"]);

        engine.destroy_mesh("a").unwrap();
        assert!(!engine.exists("a"));
        let again = engine.create_mesh("a", MeshType::Triangle).unwrap();
        assert_eq!(again.mesh_type(), MeshType::Triangle);
    }

    #[test]
    fn destroy_notifies_and_frees_after_last_handle() {
        let engine = MeshEngine::default();
        let mesh = engine.create_mesh("m", MeshType::Cloud).unwrap();
        let deleted = Rc::new(Cell::new(0));
        let d = Rc::clone(&deleted);
        mesh.add_notifier(
            ClientId(7),
            Rc::new(move |m: &Mesh, event: MeshEvent| {
                if event == MeshEvent::Deleted {
                    assert_eq!(m.name(), "m");
                    d.set(d.get() + 1);
                }
            }),
        );
        let weak = mesh.downgrade();
        assert_eq!(mesh.ref_count(), 2);

        engine.destroy_mesh("m").unwrap();
        assert_eq!(deleted.get(), 1);
        assert!(mesh.is_deleted());
        assert_eq!(mesh.ref_count(), 1);
        assert!(engine.acquire("m").is_err());

        drop(mesh);
        assert!(weak.is_freed());
        assert_eq!(
            engine.destroy_mesh("m"),
            Err(Error::NoSuchMesh("m".into()))
        );
    }

    #[test]
    fn dropping_the_engine_deletes_its_meshes() {
        let engine = MeshEngine::default();
        let mesh = engine.create_mesh("m", MeshType::Irregular).unwrap();
        drop(engine);
        assert!(mesh.is_deleted());
        assert_eq!(mesh.ref_count(), 1);
    }
}
