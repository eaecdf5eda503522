// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Column tables shared between clients.
//!
//! A [`TableStore`] owns every named table. Consumers never touch table data
//! directly: they [`open`](TableStore::open) a [`TableClient`], resolve
//! columns through it and subscribe to structural changes (notifiers) or
//! value changes (traces). Dropping the client closes it.
//!
//! Callbacks are always invoked with no internal borrow held, so a callback
//! may freely call back into the store, including deleting its own
//! notifier or trace.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::events::{
    ColumnEvent, ColumnEventKind, NotifyMask, NotifyProc, TraceEvent, TraceMask, TraceProc,
};
use crate::keys::{ColumnKey, NotifierId, TraceId};

/// Tags every column carries implicitly.
const RESERVED_TAGS: [&str; 2] = ["all", "end"];

#[derive(Debug)]
struct ColumnData {
    label: String,
    tags: SmallVec<[String; 2]>,
    values: Vec<Option<f64>>,
}

struct Notifier {
    /// `None` watches every column of the table.
    column: Option<ColumnKey>,
    mask: NotifyMask,
    proc: NotifyProc,
}

struct Trace {
    column: ColumnKey,
    mask: TraceMask,
    proc: TraceProc,
}

struct TableData {
    name: String,
    columns: SlotMap<ColumnKey, ColumnData>,
    order: Vec<ColumnKey>,
    num_rows: usize,
    notifiers: SlotMap<NotifierId, Notifier>,
    traces: SlotMap<TraceId, Trace>,
    open_count: usize,
}

impl TableData {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: SlotMap::with_key(),
            order: Vec::new(),
            num_rows: 0,
            notifiers: SlotMap::with_key(),
            traces: SlotMap::with_key(),
            open_count: 0,
        }
    }

    fn column(&self, column: ColumnKey) -> Result<&ColumnData> {
        self.columns
            .get(column)
            .ok_or_else(|| Error::StaleColumn(self.name.clone()))
    }

    fn column_mut(&mut self, column: ColumnKey) -> Result<&mut ColumnData> {
        let name = &self.name;
        self.columns
            .get_mut(column)
            .ok_or_else(|| Error::StaleColumn(name.clone()))
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.num_rows {
            return Err(Error::RowOutOfRange {
                table: self.name.clone(),
                row,
                count: self.num_rows,
            });
        }
        Ok(())
    }

    fn no_such_column(&self, spec: &str) -> Error {
        Error::NoSuchColumn {
            table: self.name.clone(),
            spec: spec.to_string(),
        }
    }

    /// Picks the single column out of `matches`, or reports why it can't.
    fn single(&self, spec: &str, matches: &[ColumnKey]) -> Result<ColumnKey> {
        match matches {
            [] => Err(self.no_such_column(spec)),
            [column] => Ok(*column),
            _ => Err(Error::AmbiguousColumn {
                table: self.name.clone(),
                spec: spec.to_string(),
            }),
        }
    }

    fn resolve(&self, spec: &str) -> Result<ColumnKey> {
        if let Ok(position) = spec.parse::<usize>() {
            return self
                .order
                .get(position)
                .copied()
                .ok_or_else(|| self.no_such_column(spec));
        }
        match spec {
            "end" => return self.order.last().copied().ok_or_else(|| self.no_such_column(spec)),
            "all" => return self.single(spec, &self.order),
            _ => {}
        }
        let labeled: Vec<ColumnKey> = self
            .order
            .iter()
            .copied()
            .filter(|&c| self.columns[c].label == spec)
            .collect();
        if !labeled.is_empty() {
            return self.single(spec, &labeled);
        }
        let tagged: Vec<ColumnKey> = self
            .order
            .iter()
            .copied()
            .filter(|&c| self.columns[c].tags.iter().any(|t| t == spec))
            .collect();
        self.single(spec, &tagged)
    }

    fn notify_procs(&self, column: ColumnKey, kind: ColumnEventKind) -> Vec<NotifyProc> {
        self.notifiers
            .values()
            .filter(|n| n.mask.contains(kind) && n.column.map_or(true, |c| c == column))
            .map(|n| Rc::clone(&n.proc))
            .collect()
    }

    fn trace_procs(&self, column: ColumnKey, flags: TraceMask) -> Vec<TraceProc> {
        self.traces
            .values()
            .filter(|t| t.column == column && t.mask.intersects(flags))
            .map(|t| Rc::clone(&t.proc))
            .collect()
    }
}

type SharedTable = Rc<RefCell<TableData>>;

/// Fires `kind` to every interested notifier of `column`.
fn notify(table: &SharedTable, column: ColumnKey, kind: ColumnEventKind) {
    let (event, procs) = {
        let data = table.borrow();
        let label = data
            .columns
            .get(column)
            .map(|c| c.label.clone())
            .unwrap_or_default();
        let event = ColumnEvent {
            table: data.name.clone(),
            column,
            label,
            kind,
        };
        (event, data.notify_procs(column, kind))
    };
    for proc in procs {
        proc(&event);
    }
}

/// Fires `flags` to every interested trace on `column`.
fn trace(table: &SharedTable, column: ColumnKey, row: usize, flags: TraceMask) {
    let (event, procs) = {
        let data = table.borrow();
        let procs = data.trace_procs(column, flags);
        if procs.is_empty() {
            return;
        }
        let event = TraceEvent {
            table: data.name.clone(),
            column,
            row,
            flags,
        };
        (event, procs)
    };
    for proc in procs {
        proc(&event);
    }
}

/// Removes a column together with every notifier and trace bound to it.
fn drop_column(table: &SharedTable, column: ColumnKey) {
    let mut data = table.borrow_mut();
    data.columns.remove(column);
    data.order.retain(|&c| c != column);
    data.notifiers.retain(|_, n| n.column != Some(column));
    data.traces.retain(|_, t| t.column != column);
}

/// The set of named tables. Cloning yields another handle to the same set.
///
/// # Example
///
/// ```
/// use surfmesh_core::TableStore;
///
/// let store = TableStore::new();
/// store.create_table("samples").unwrap();
/// let client = store.open("samples").unwrap();
/// let col = client.create_column("x");
/// client.extend_rows(2);
/// client.set_double(0, col, 1.5).unwrap();
///
/// assert_eq!(store.open_count("samples"), Some(1));
/// assert_eq!(client.get_double(0, col).unwrap(), 1.5);
/// assert!(client.get_double(1, col).unwrap().is_nan());
/// ```
#[derive(Clone, Default)]
pub struct TableStore {
    tables: Rc<RefCell<FxHashMap<String, SharedTable>>>,
}

impl TableStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table called `name`.
    pub fn create_table(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.borrow_mut();
        if tables.contains_key(name) {
            return Err(Error::TableExists(name.to_string()));
        }
        tables.insert(name.to_string(), Rc::new(RefCell::new(TableData::new(name))));
        tracing::debug!(table = name, "Created table");
        Ok(())
    }

    /// Returns `true` if a table called `name` exists.
    pub fn exists(&self, name: &str) -> bool {
        self.tables.borrow().contains_key(name)
    }

    /// Returns the names of every table, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Opens a client handle on the table called `name`.
    pub fn open(&self, name: &str) -> Result<TableClient> {
        let table = self
            .tables
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))?;
        Ok(TableClient::attach(table))
    }

    /// Number of open clients on `name`, or `None` if there is no such table.
    pub fn open_count(&self, name: &str) -> Option<usize> {
        self.tables.borrow().get(name).map(|t| t.borrow().open_count)
    }

    /// Deletes the table called `name`.
    ///
    /// Every column is reported as deleted to its notifiers first. Clients
    /// that are still open keep a valid, but empty, table.
    pub fn delete_table(&self, name: &str) -> Result<()> {
        let table = self
            .tables
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))?;
        let columns: Vec<ColumnKey> = table.borrow().order.clone();
        for column in columns {
            notify(&table, column, ColumnEventKind::Deleted);
            drop_column(&table, column);
        }
        tracing::debug!(table = name, "Deleted table");
        Ok(())
    }
}

/// An open handle on one table. Dropping the handle closes it.
pub struct TableClient {
    table: SharedTable,
}

impl TableClient {
    fn attach(table: SharedTable) -> Self {
        {
            let mut data = table.borrow_mut();
            data.open_count += 1;
            tracing::debug!(table = %data.name, open = data.open_count, "Opened table client");
        }
        Self { table }
    }

    /// Name of the underlying table.
    pub fn name(&self) -> String {
        self.table.borrow().name.clone()
    }

    /// Returns `true` if both clients refer to the same table.
    pub fn same_table(&self, other: &TableClient) -> bool {
        Rc::ptr_eq(&self.table, &other.table)
    }

    pub fn num_rows(&self) -> usize {
        self.table.borrow().num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.table.borrow().order.len()
    }

    /// Appends `count` empty rows.
    pub fn extend_rows(&self, count: usize) {
        let mut data = self.table.borrow_mut();
        data.num_rows += count;
        let rows = data.num_rows;
        for column in data.columns.values_mut() {
            column.values.resize(rows, None);
        }
    }

    /// Appends a new, empty column labeled `label`.
    pub fn create_column(&self, label: &str) -> ColumnKey {
        let column = {
            let mut data = self.table.borrow_mut();
            let rows = data.num_rows;
            let column = data.columns.insert(ColumnData {
                label: label.to_string(),
                tags: SmallVec::new(),
                values: vec![None; rows],
            });
            data.order.push(column);
            column
        };
        notify(&self.table, column, ColumnEventKind::Created);
        column
    }

    /// Deletes a column, reporting it to notifiers before it disappears.
    pub fn delete_column(&self, column: ColumnKey) -> Result<()> {
        self.table.borrow().column(column)?;
        notify(&self.table, column, ColumnEventKind::Deleted);
        drop_column(&self.table, column);
        Ok(())
    }

    /// Changes a column's label.
    pub fn relabel_column(&self, column: ColumnKey, label: &str) -> Result<()> {
        self.table.borrow_mut().column_mut(column)?.label = label.to_string();
        notify(&self.table, column, ColumnEventKind::Relabeled);
        Ok(())
    }

    /// Moves a column to `position` in the column order.
    pub fn move_column(&self, column: ColumnKey, position: usize) -> Result<()> {
        {
            let mut data = self.table.borrow_mut();
            data.column(column)?;
            if position >= data.order.len() {
                return Err(Error::ColumnPositionOutOfRange {
                    table: data.name.clone(),
                    position,
                    count: data.order.len(),
                });
            }
            data.order.retain(|&c| c != column);
            data.order.insert(position, column);
        }
        notify(&self.table, column, ColumnEventKind::Moved);
        Ok(())
    }

    /// Attaches `tag` to a column.
    pub fn add_tag(&self, column: ColumnKey, tag: &str) -> Result<()> {
        if RESERVED_TAGS.contains(&tag) {
            return Err(Error::ReservedTag(tag.to_string()));
        }
        let mut data = self.table.borrow_mut();
        let tags = &mut data.column_mut(column)?.tags;
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        Ok(())
    }

    /// Resolves a column specification: a position, a label, or a tag.
    ///
    /// The specification must identify exactly one column.
    pub fn resolve_column(&self, spec: &str) -> Result<ColumnKey> {
        self.table.borrow().resolve(spec)
    }

    pub fn column_label(&self, column: ColumnKey) -> Result<String> {
        Ok(self.table.borrow().column(column)?.label.clone())
    }

    /// Position of a column in the column order.
    pub fn column_index(&self, column: ColumnKey) -> Result<usize> {
        let data = self.table.borrow();
        data.column(column)?;
        data.order
            .iter()
            .position(|&c| c == column)
            .ok_or_else(|| Error::StaleColumn(data.name.clone()))
    }

    /// Stores `value` in a cell.
    pub fn set_double(&self, row: usize, column: ColumnKey, value: f64) -> Result<()> {
        let flags = {
            let mut data = self.table.borrow_mut();
            data.check_row(row)?;
            let cell = &mut data.column_mut(column)?.values[row];
            let flags = if cell.is_none() {
                TraceMask::CREATES | TraceMask::WRITES
            } else {
                TraceMask::WRITES
            };
            *cell = Some(value);
            flags
        };
        trace(&self.table, column, row, flags);
        Ok(())
    }

    /// Clears a cell. Clearing an empty cell is a no-op.
    pub fn unset(&self, row: usize, column: ColumnKey) -> Result<()> {
        let was_set = {
            let mut data = self.table.borrow_mut();
            data.check_row(row)?;
            data.column_mut(column)?.values[row].take().is_some()
        };
        if was_set {
            trace(&self.table, column, row, TraceMask::UNSETS);
        }
        Ok(())
    }

    /// Reads a cell; an empty cell reads as NaN.
    pub fn get_double(&self, row: usize, column: ColumnKey) -> Result<f64> {
        let value = {
            let data = self.table.borrow();
            data.check_row(row)?;
            data.column(column)?.values[row].unwrap_or(f64::NAN)
        };
        trace(&self.table, column, row, TraceMask::READS);
        Ok(value)
    }

    /// Reads every row of a column, in row order.
    pub fn column_values(&self, column: ColumnKey) -> Result<Vec<f64>> {
        let rows = self.num_rows();
        (0..rows).map(|row| self.get_double(row, column)).collect()
    }

    /// Registers a structural-change callback on one column, or on every
    /// column when `column` is `None`.
    pub fn create_column_notifier(
        &self,
        column: Option<ColumnKey>,
        mask: NotifyMask,
        proc: NotifyProc,
    ) -> Result<NotifierId> {
        let mut data = self.table.borrow_mut();
        if let Some(column) = column {
            data.column(column)?;
        }
        Ok(data.notifiers.insert(Notifier { column, mask, proc }))
    }

    /// Unregisters a notifier. Unknown ids are ignored.
    pub fn delete_notifier(&self, id: NotifierId) {
        self.table.borrow_mut().notifiers.remove(id);
    }

    /// Registers a value-change callback on a column.
    pub fn create_column_trace(
        &self,
        column: ColumnKey,
        mask: TraceMask,
        proc: TraceProc,
    ) -> Result<TraceId> {
        let mut data = self.table.borrow_mut();
        data.column(column)?;
        Ok(data.traces.insert(Trace { column, mask, proc }))
    }

    /// Unregisters a trace. Unknown ids are ignored.
    pub fn delete_trace(&self, id: TraceId) {
        self.table.borrow_mut().traces.remove(id);
    }
}

impl Clone for TableClient {
    fn clone(&self) -> Self {
        TableClient::attach(Rc::clone(&self.table))
    }
}

impl Drop for TableClient {
    fn drop(&mut self) {
        let mut data = self.table.borrow_mut();
        data.open_count = data.open_count.saturating_sub(1);
        tracing::debug!(table = %data.name, open = data.open_count, "Closed table client");
    }
}

impl std::fmt::Debug for TableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.table.borrow();
        f.debug_struct("TableClient")
            .field("table", &data.name)
            .field("rows", &data.num_rows)
            .field("columns", &data.order.len())
            .finish()
    }
}
