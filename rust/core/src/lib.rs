// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Surfmesh Core
//!
//! The data collaborators a mesh is derived from:
//!
//! - **Tables** ([`TableStore`], [`TableClient`]): named column tables with
//!   label/tag column resolution, structural notifiers and value traces.
//! - **Vectors** ([`VectorStore`], [`VectorClient`]): named numeric arrays
//!   with an update/destroy callback per client.
//!
//! Everything here is single-threaded and shared through `Rc`. Callbacks run
//! synchronously, on the caller's stack, with no internal borrow held.

pub mod error;
pub mod events;
pub mod keys;
pub mod table;
pub mod vector;

pub use error::{Error, Result};
pub use events::{
    ColumnEvent, ColumnEventKind, NotifyMask, NotifyProc, TraceEvent, TraceMask, TraceProc,
};
pub use keys::{ColumnKey, NotifierId, TraceId, VectorId};
pub use table::{TableClient, TableStore};
pub use vector::{VectorClient, VectorEvent, VectorProc, VectorStore};
