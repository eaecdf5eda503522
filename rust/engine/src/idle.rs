// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deferred work run at the host's next idle point.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{Error, Result};

/// A unit of deferred work.
pub type IdleTask = Box<dyn FnOnce() -> Result<()>>;

/// FIFO of tasks waiting for the next idle pass.
#[derive(Default)]
pub struct IdleQueue {
    tasks: RefCell<VecDeque<IdleTask>>,
}

impl IdleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` for the next idle pass.
    pub fn do_when_idle(&self, task: IdleTask) {
        self.tasks.borrow_mut().push_back(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Runs every task queued before the pass started.
    ///
    /// Tasks queued while the pass runs wait for the next one. Failures
    /// don't stop the pass; they are logged and returned in queue order.
    pub fn run(&self) -> Vec<Error> {
        let batch = std::mem::take(&mut *self.tasks.borrow_mut());
        let mut errors = Vec::new();
        for task in batch {
            if let Err(err) = task() {
                tracing::error!(error = %err, "Deferred task failed");
                errors.push(err);
            }
        }
        errors
    }
}

impl std::fmt::Debug for IdleQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleQueue")
            .field("pending", &self.len())
            .finish()
    }
}
