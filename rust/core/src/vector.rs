// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named numeric vectors.
//!
//! Consumers hold a [`VectorClient`] (an allocated id on a named vector) and
//! may install one change callback per client. The callback learns when the
//! vector's contents are replaced and when the vector is destroyed.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::keys::VectorId;

/// What happened to a watched vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorEvent {
    Updated,
    Destroyed,
}

/// Callback invoked when a watched vector changes.
pub type VectorProc = Rc<dyn Fn(VectorEvent)>;

struct VectorData {
    values: Vec<f64>,
    clients: SlotMap<VectorId, Option<VectorProc>>,
}

impl VectorData {
    fn procs(&self) -> Vec<VectorProc> {
        self.clients.values().flatten().cloned().collect()
    }
}

type Registry = Rc<RefCell<FxHashMap<String, VectorData>>>;

/// The set of named vectors. Cloning yields another handle to the same set.
#[derive(Clone, Default)]
pub struct VectorStore {
    vectors: Registry,
}

impl VectorStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vector called `name` holding `values`.
    pub fn create(&self, name: &str, values: Vec<f64>) -> Result<()> {
        let mut vectors = self.vectors.borrow_mut();
        if vectors.contains_key(name) {
            return Err(Error::VectorExists(name.to_string()));
        }
        vectors.insert(
            name.to_string(),
            VectorData {
                values,
                clients: SlotMap::with_key(),
            },
        );
        Ok(())
    }

    /// Returns `true` if a vector called `name` exists.
    pub fn exists(&self, name: &str) -> bool {
        self.vectors.borrow().contains_key(name)
    }

    /// Replaces the contents of `name` and notifies its clients.
    pub fn set(&self, name: &str, values: Vec<f64>) -> Result<()> {
        let procs = {
            let mut vectors = self.vectors.borrow_mut();
            let data = vectors
                .get_mut(name)
                .ok_or_else(|| Error::NoSuchVector(name.to_string()))?;
            data.values = values;
            data.procs()
        };
        for proc in procs {
            proc(VectorEvent::Updated);
        }
        Ok(())
    }

    /// Destroys `name`, telling every client it is gone.
    pub fn destroy(&self, name: &str) -> Result<()> {
        let data = self
            .vectors
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| Error::NoSuchVector(name.to_string()))?;
        tracing::debug!(vector = name, clients = data.clients.len(), "Destroyed vector");
        for proc in data.procs() {
            proc(VectorEvent::Destroyed);
        }
        Ok(())
    }

    /// Allocates a client id on `name`.
    pub fn alloc_id(&self, name: &str) -> Result<VectorClient> {
        let id = self
            .vectors
            .borrow_mut()
            .get_mut(name)
            .ok_or_else(|| Error::NoSuchVector(name.to_string()))?
            .clients
            .insert(None);
        Ok(VectorClient {
            vectors: Rc::clone(&self.vectors),
            name: name.to_string(),
            id,
        })
    }
}

/// An allocated id on a named vector. Dropping the client frees the id.
pub struct VectorClient {
    vectors: Registry,
    name: String,
    id: VectorId,
}

impl VectorClient {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current contents of the vector.
    pub fn values(&self) -> Result<Vec<f64>> {
        self.vectors
            .borrow()
            .get(&self.name)
            .filter(|data| data.clients.contains_key(self.id))
            .map(|data| data.values.clone())
            .ok_or_else(|| Error::NoSuchVector(self.name.clone()))
    }

    /// Installs (or with `None`, removes) this client's change callback.
    pub fn set_changed_callback(&self, proc: Option<VectorProc>) -> Result<()> {
        let mut vectors = self.vectors.borrow_mut();
        let slot = vectors
            .get_mut(&self.name)
            .and_then(|data| data.clients.get_mut(self.id))
            .ok_or_else(|| Error::NoSuchVector(self.name.clone()))?;
        *slot = proc;
        Ok(())
    }
}

impl Drop for VectorClient {
    fn drop(&mut self) {
        if let Some(data) = self.vectors.borrow_mut().get_mut(&self.name) {
            data.clients.remove(self.id);
        }
    }
}

impl std::fmt::Debug for VectorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorClient")
            .field("name", &self.name)
            .finish()
    }
}
