// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based table storage.
//!
//! Columns, notifiers and traces live in `slotmap::SlotMap`s, so a key stays
//! valid (or detectably stale) no matter what else is removed.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a column within one table.
    pub struct ColumnKey;

    /// Key for a registered column notifier.
    pub struct NotifierId;

    /// Key for a registered column trace.
    pub struct TraceId;

    /// Key for an allocated vector client id.
    pub struct VectorId;
}
