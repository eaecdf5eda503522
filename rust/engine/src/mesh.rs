// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh handles.
//!
//! A [`Mesh`] is a shared handle: cloning it acquires another reference and
//! dropping it releases one. The mesh's sources stay subscribed to their
//! vectors and tables for as long as any handle is alive.
//!
//! Upstream changes never recompute a mesh on the spot. They mark it
//! pending and queue one recompute on the engine's idle queue, so a burst
//! of writes costs a single recompute.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use surfmesh_core::{TableStore, VectorStore};
use surfmesh_geometry::{parse_triangle_tokens, Extents, HiddenSet, Point2, Triangle};

use crate::config::{EngineConfig, MeshOptions};
use crate::error::{Error, Result};
use crate::idle::IdleQueue;
use crate::snapshot::MeshSnapshot;
use crate::source::{Axis, DataSource, SourceContext, SourceHooks, TableClients};
use crate::strategy::{BuildInput, Geometry, MeshType};

/// What happened to a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshEvent {
    /// A recompute produced new geometry.
    Changed,
    /// The mesh was removed from its engine.
    Deleted,
}

/// Opaque identity of a notifier's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// Callback invoked for mesh events.
pub type MeshNotifyProc = Rc<dyn Fn(&Mesh, MeshEvent)>;

/// State shared by an engine and all of its meshes.
pub(crate) struct Shared {
    pub tables: TableStore,
    pub vectors: VectorStore,
    pub idle: IdleQueue,
    pub config: EngineConfig,
}

struct BoundSource {
    /// Distinguishes this source from a later one on the same axis.
    id: u64,
    /// Shared so a recompute can read it without borrowing the mesh.
    source: Rc<DataSource>,
}

/// Settings displaced by a configure call, kept until the recompute
/// succeeds.
#[derive(Default)]
struct Displaced {
    x: Option<Option<BoundSource>>,
    y: Option<Option<BoundSource>>,
    requested: Option<Vec<Triangle>>,
    hidden: Option<HiddenSet>,
}

struct MeshInner {
    name: String,
    kind: MeshType,
    this: Weak<RefCell<MeshInner>>,
    shared: Rc<Shared>,
    x: Option<BoundSource>,
    y: Option<BoundSource>,
    next_source_id: u64,
    table_clients: TableClients,
    requested: Vec<Triangle>,
    hidden: HiddenSet,
    geometry: Geometry,
    notifiers: Vec<(ClientId, MeshNotifyProc)>,
    config_pending: bool,
    deleted: bool,
}

impl MeshInner {
    fn slot_mut(&mut self, axis: Axis) -> &mut Option<BoundSource> {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }

    fn slot(&self, axis: Axis) -> &Option<BoundSource> {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    /// Hooks routing a source's upstream events back into this mesh.
    fn hooks(&self, axis: Axis, id: u64) -> SourceHooks {
        let changed = {
            let this = Weak::clone(&self.this);
            Rc::new(move || {
                if let Some(inner) = this.upgrade() {
                    Mesh { inner }.eventually_configure();
                }
            })
        };
        let deleted = {
            let this = Weak::clone(&self.this);
            Rc::new(move || {
                if let Some(inner) = this.upgrade() {
                    Mesh { inner }.source_deleted(axis, id);
                }
            })
        };
        SourceHooks { changed, deleted }
    }

    /// Swaps in whatever `displaced` holds, returning what it replaced.
    fn swap(&mut self, displaced: Displaced) -> Displaced {
        Displaced {
            x: displaced.x.map(|s| mem::replace(&mut self.x, s)),
            y: displaced.y.map(|s| mem::replace(&mut self.y, s)),
            requested: displaced
                .requested
                .map(|t| mem::replace(&mut self.requested, t)),
            hidden: displaced.hidden.map(|h| mem::replace(&mut self.hidden, h)),
        }
    }
}

impl Drop for MeshInner {
    fn drop(&mut self) {
        tracing::debug!(mesh = %self.name, "Freed mesh");
    }
}

/// A reference-counted handle on a mesh.
///
/// # Example
///
/// ```
/// use surfmesh_engine::{MeshEngine, MeshOptions, MeshType};
///
/// let engine = MeshEngine::default();
/// let mesh = engine.create_mesh("grid", MeshType::Regular).unwrap();
/// mesh.configure(&MeshOptions::new().x("0 2 3").unwrap().y("0 1 2").unwrap())
///     .unwrap();
///
/// assert_eq!(mesh.num_vertices(), 6);
/// assert_eq!(mesh.num_triangles(), 4);
/// assert_eq!(mesh.hull(), vec![0, 2, 5, 3]);
/// ```
#[derive(Clone)]
pub struct Mesh {
    inner: Rc<RefCell<MeshInner>>,
}

/// A non-owning reference to a mesh.
#[derive(Clone)]
pub struct WeakMesh {
    inner: Weak<RefCell<MeshInner>>,
}

impl WeakMesh {
    /// Re-acquires the mesh if any handle is still alive.
    pub fn upgrade(&self) -> Option<Mesh> {
        self.inner.upgrade().map(|inner| Mesh { inner })
    }

    /// Returns `true` once every handle has been dropped.
    pub fn is_freed(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

impl Mesh {
    pub(crate) fn new(name: &str, kind: MeshType, shared: Rc<Shared>) -> Self {
        let inner = Rc::new_cyclic(|this| {
            RefCell::new(MeshInner {
                name: name.to_string(),
                kind,
                this: Weak::clone(this),
                shared,
                x: None,
                y: None,
                next_source_id: 0,
                table_clients: TableClients::default(),
                requested: Vec::new(),
                hidden: HiddenSet::new(),
                geometry: Geometry::default(),
                notifiers: Vec::new(),
                config_pending: false,
                deleted: false,
            })
        });
        tracing::debug!(mesh = name, kind = %kind, "Created mesh");
        Self { inner }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn mesh_type(&self) -> MeshType {
        self.inner.borrow().kind
    }

    pub fn vertices(&self) -> Vec<Point2<f64>> {
        self.inner.borrow().geometry.vertices.clone()
    }

    /// Indices of the convex hull's vertices, counter-clockwise. The ring is
    /// implicitly closed.
    pub fn hull(&self) -> Vec<usize> {
        self.inner.borrow().geometry.hull.clone()
    }

    /// Coordinates of the convex hull's vertices.
    pub fn hull_points(&self) -> Vec<Point2<f64>> {
        let inner = self.inner.borrow();
        let geometry = &inner.geometry;
        geometry.hull.iter().map(|&i| geometry.vertices[i]).collect()
    }

    /// The published triangles, hidden ones removed.
    pub fn triangles(&self) -> Vec<Triangle> {
        self.inner.borrow().geometry.triangles.clone()
    }

    /// Bounds of the vertices, `None` before the first successful compute.
    pub fn extents(&self) -> Option<Extents> {
        self.inner.borrow().geometry.extents
    }

    pub fn num_vertices(&self) -> usize {
        self.inner.borrow().geometry.vertices.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.inner.borrow().geometry.triangles.len()
    }

    /// Hidden triangle ordinals, ascending.
    pub fn hidden(&self) -> Vec<usize> {
        self.inner.borrow().hidden.sorted()
    }

    /// The explicit triangle list, 0-based.
    pub fn requested_triangles(&self) -> Vec<Triangle> {
        self.inner.borrow().requested.clone()
    }

    /// The x source in configuration form, if one is bound.
    pub fn x_source(&self) -> Option<String> {
        self.source_string(Axis::X)
    }

    /// The y source in configuration form, if one is bound.
    pub fn y_source(&self) -> Option<String> {
        self.source_string(Axis::Y)
    }

    fn source_string(&self, axis: Axis) -> Option<String> {
        self.inner
            .borrow()
            .slot(axis)
            .as_ref()
            .map(|bound| bound.source.to_string())
    }

    /// Number of live handles on this mesh.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn downgrade(&self) -> WeakMesh {
        WeakMesh {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns `true` if both handles refer to the same mesh.
    pub fn ptr_eq(&self, other: &Mesh) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns `true` while a deferred recompute is queued.
    pub fn is_config_pending(&self) -> bool {
        self.inner.borrow().config_pending
    }

    /// Returns `true` once the mesh has been removed from its engine.
    pub fn is_deleted(&self) -> bool {
        self.inner.borrow().deleted
    }

    /// Serializable copy of the current geometry.
    pub fn snapshot(&self) -> MeshSnapshot {
        let inner = self.inner.borrow();
        MeshSnapshot::new(&inner.name, inner.kind, &inner.geometry, &inner.hidden)
    }

    /// Applies `options` and recomputes the mesh.
    ///
    /// Every option is parsed and every source resolved before anything
    /// changes. If the recompute then fails, the previous sources, triangle
    /// list and hidden set are put back and the mesh keeps its last good
    /// geometry. Notifiers fire only on success.
    pub fn configure(&self, options: &MeshOptions) -> Result<()> {
        let kind = self.mesh_type();
        let requested = match options.triangles.as_deref() {
            Some(tokens) if kind != MeshType::Triangle && !tokens.is_empty() => {
                return Err(Error::TrianglesNotAllowed(kind));
            }
            Some(tokens) => Some(parse_triangle_tokens(tokens)?),
            None => None,
        };
        let hidden = options
            .hide
            .as_deref()
            .map(HiddenSet::from_tokens)
            .transpose()?;
        let x = options
            .x
            .as_deref()
            .map(|tokens| self.bind_source(Axis::X, tokens))
            .transpose()?;
        let y = options
            .y
            .as_deref()
            .map(|tokens| self.bind_source(Axis::Y, tokens))
            .transpose()?;

        let displaced = self.inner.borrow_mut().swap(Displaced {
            x,
            y,
            requested,
            hidden,
        });
        match self.compute() {
            Ok(()) => {
                drop(displaced);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(mesh = %self.name(), error = %err, "Configure failed, restoring previous settings");
                let rejected = self.inner.borrow_mut().swap(displaced);
                drop(rejected);
                Err(err)
            }
        }
    }

    /// Recomputes the mesh from its current settings.
    pub fn recompute(&self) -> Result<()> {
        self.compute()
    }

    /// Registers `proc` for this mesh's events.
    ///
    /// A `(client, proc)` pair is registered at most once; returns `false`
    /// if it already was.
    pub fn add_notifier(&self, client: ClientId, proc: MeshNotifyProc) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner
            .notifiers
            .iter()
            .any(|(c, p)| *c == client && same_proc(p, &proc))
        {
            return false;
        }
        inner.notifiers.push((client, proc));
        true
    }

    /// Unregisters a `(client, proc)` pair. Returns `false` if it wasn't
    /// registered.
    pub fn remove_notifier(&self, client: ClientId, proc: &MeshNotifyProc) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.notifiers.len();
        inner
            .notifiers
            .retain(|(c, p)| !(*c == client && same_proc(p, proc)));
        inner.notifiers.len() != before
    }

    /// Unregisters every notifier `client` owns.
    pub fn remove_client(&self, client: ClientId) -> usize {
        let mut inner = self.inner.borrow_mut();
        let before = inner.notifiers.len();
        inner.notifiers.retain(|(c, _)| *c != client);
        before - inner.notifiers.len()
    }

    /// Marks the mesh removed from its engine and tells its notifiers.
    pub(crate) fn mark_deleted(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.deleted {
                return;
            }
            inner.deleted = true;
            tracing::debug!(mesh = %inner.name, refs = Rc::strong_count(&self.inner), "Deleted mesh");
        }
        self.notify(MeshEvent::Deleted);
    }

    fn notify(&self, event: MeshEvent) {
        let procs: Vec<MeshNotifyProc> = self
            .inner
            .borrow()
            .notifiers
            .iter()
            .map(|(_, proc)| Rc::clone(proc))
            .collect();
        for proc in procs {
            proc(self, event);
        }
    }

    /// Resolves `tokens` into a source for `axis`. The mesh is not borrowed
    /// while the source subscribes upstream.
    fn bind_source(&self, axis: Axis, tokens: &[String]) -> Result<Option<BoundSource>> {
        let (id, hooks, shared, mut clients) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_source_id;
            inner.next_source_id += 1;
            let hooks = inner.hooks(axis, id);
            let clients = mem::take(&mut inner.table_clients);
            (id, hooks, Rc::clone(&inner.shared), clients)
        };
        let ctx = SourceContext {
            tables: &shared.tables,
            vectors: &shared.vectors,
            clients: &mut clients,
        };
        let source = DataSource::resolve(axis, tokens, ctx, hooks);
        self.inner.borrow_mut().table_clients.extend(clients);
        Ok(source?.map(|source| BoundSource {
            id,
            source: Rc::new(source),
        }))
    }

    /// Runs the mesh type's construction over the current sources.
    ///
    /// Without both sources this does nothing and succeeds. Sources are read
    /// with the mesh unborrowed: a table read may fire traces that write
    /// back into the columns this mesh watches.
    fn compute(&self) -> Result<()> {
        let (x, y) = {
            let inner = self.inner.borrow();
            let (Some(x), Some(y)) = (&inner.x, &inner.y) else {
                tracing::debug!(mesh = %inner.name, "Sources incomplete, skipping recompute");
                return Ok(());
            };
            (Rc::clone(&x.source), Rc::clone(&y.source))
        };
        let x = x.get()?;
        let y = y.get()?;

        let geometry = {
            let inner = self.inner.borrow();
            inner.kind.build(&BuildInput {
                mesh: &inner.name,
                x: &x,
                y: &y,
                requested: &inner.requested,
                hidden: &inner.hidden,
                config: &inner.shared.config,
            })?
        };

        let changed = !geometry.vertices.is_empty();
        {
            let mut inner = self.inner.borrow_mut();
            tracing::debug!(
                mesh = %inner.name,
                vertices = geometry.vertices.len(),
                hull = geometry.hull.len(),
                triangles = geometry.triangles.len(),
                "Recomputed mesh"
            );
            inner.geometry = geometry;
        }
        if changed {
            self.notify(MeshEvent::Changed);
        }
        Ok(())
    }

    /// Queues one recompute for the next idle pass unless one is queued.
    fn eventually_configure(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.config_pending || inner.deleted {
            return;
        }
        inner.config_pending = true;
        let this = Rc::downgrade(&self.inner);
        inner.shared.idle.do_when_idle(Box::new(move || match this.upgrade() {
            Some(inner) => Mesh { inner }.deferred_configure(),
            None => Ok(()),
        }));
    }

    fn deferred_configure(&self) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.config_pending = false;
            if inner.deleted {
                return Ok(());
            }
        }
        self.compute()
    }

    /// Drops the source on `axis` if it is still source `id`, then queues
    /// a recompute.
    fn source_deleted(&self, axis: Axis, id: u64) {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let slot = inner.slot_mut(axis);
            if slot.as_ref().is_some_and(|bound| bound.id == id) {
                slot.take()
            } else {
                None
            }
        };
        if removed.is_some() {
            tracing::debug!(mesh = %self.name(), axis = %axis, "Source went away");
        }
        drop(removed);
        self.eventually_configure();
    }
}

fn same_proc(a: &MeshNotifyProc, b: &MeshNotifyProc) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Mesh")
            .field("name", &inner.name)
            .field("type", &inner.kind)
            .field("vertices", &inner.geometry.vertices.len())
            .field("triangles", &inner.geometry.triangles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn shared() -> Rc<Shared> {
        Rc::new(Shared {
            tables: TableStore::new(),
            vectors: VectorStore::new(),
            idle: IdleQueue::new(),
            config: EngineConfig {
                max_points: 10_000,
                warn_duplicates: true,
            },
        })
    }

    fn counter(mesh: &Mesh, client: u64) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        mesh.add_notifier(
            ClientId(client),
            Rc::new(move |_: &Mesh, event: MeshEvent| {
                if event == MeshEvent::Changed {
                    c.set(c.get() + 1);
                }
            }),
        );
        count
    }

    #[test]
    fn unconfigured_axis_is_a_silent_no_op() {
        let mesh = Mesh::new("m", MeshType::Cloud, shared());
        let changes = counter(&mesh, 1);
        mesh.configure(&MeshOptions::new().x("0 1 2").unwrap()).unwrap();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(changes.get(), 0);
        assert_eq!(mesh.x_source().as_deref(), Some("0 1 2"));
        assert!(mesh.y_source().is_none());
    }

    #[test]
    fn failed_configure_keeps_last_good_state() {
        let mesh = Mesh::new("m", MeshType::Cloud, shared());
        let changes = counter(&mesh, 1);
        mesh.configure(&MeshOptions::new().x("0 1 0").unwrap().y("0 0 1").unwrap())
            .unwrap();
        assert_eq!(changes.get(), 1);
        let before = mesh.vertices();

        let err = mesh
            .configure(&MeshOptions::new().x("0 1").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
        assert_eq!(mesh.vertices(), before);
        assert_eq!(mesh.x_source().as_deref(), Some("0 1 0"));
        assert_eq!(changes.get(), 1);

        assert!(mesh
            .configure(&MeshOptions::new().x("0 nope 1").unwrap())
            .is_err());
        assert_eq!(mesh.x_source().as_deref(), Some("0 1 0"));
    }

    #[test]
    fn triangles_option_needs_triangle_mesh() {
        let mesh = Mesh::new("m", MeshType::Cloud, shared());
        assert_eq!(
            mesh.configure(&MeshOptions::new().triangles("1 2 3").unwrap()),
            Err(Error::TrianglesNotAllowed(MeshType::Cloud))
        );
        assert!(mesh
            .configure(&MeshOptions::new().triangles("").unwrap())
            .is_ok());
    }

    #[test]
    fn notifier_pairs_are_deduplicated() {
        let mesh = Mesh::new("m", MeshType::Cloud, shared());
        let proc: MeshNotifyProc = Rc::new(|_: &Mesh, _: MeshEvent| {});
        assert!(mesh.add_notifier(ClientId(1), Rc::clone(&proc)));
        assert!(!mesh.add_notifier(ClientId(1), Rc::clone(&proc)));
        assert!(mesh.add_notifier(ClientId(2), Rc::clone(&proc)));
        assert!(mesh.remove_notifier(ClientId(1), &proc));
        assert!(!mesh.remove_notifier(ClientId(1), &proc));
        assert_eq!(mesh.remove_client(ClientId(2)), 1);
    }

    #[test]
    fn upstream_changes_coalesce() {
        let shared = shared();
        shared.vectors.create("xs", vec![0.0, 1.0, 0.0]).unwrap();
        let mesh = Mesh::new("m", MeshType::Cloud, Rc::clone(&shared));
        mesh.configure(&MeshOptions::new().x("xs").unwrap().y("0 0 1").unwrap())
            .unwrap();
        let changes = counter(&mesh, 1);

        shared.vectors.set("xs", vec![0.0, 2.0, 0.0]).unwrap();
        shared.vectors.set("xs", vec![0.0, 3.0, 0.0]).unwrap();
        assert!(mesh.is_config_pending());
        assert_eq!(shared.idle.len(), 1);

        assert!(shared.idle.run().is_empty());
        assert!(!mesh.is_config_pending());
        assert_eq!(changes.get(), 1);
        assert_eq!(mesh.vertices()[1], Point2::new(3.0, 0.0));
    }

    #[test]
    fn queued_recompute_of_a_freed_mesh_is_a_no_op() {
        let shared = shared();
        shared.vectors.create("xs", vec![0.0, 1.0, 0.0]).unwrap();
        let mesh = Mesh::new("m", MeshType::Cloud, Rc::clone(&shared));
        mesh.configure(&MeshOptions::new().x("xs").unwrap().y("0 0 1").unwrap())
            .unwrap();
        shared.vectors.set("xs", vec![0.0, 2.0, 0.0]).unwrap();
        let weak = mesh.downgrade();
        drop(mesh);
        assert!(weak.is_freed());
        assert!(shared.idle.run().is_empty());
    }
}
