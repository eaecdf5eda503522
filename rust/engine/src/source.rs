// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data sources feeding a mesh axis.
//!
//! A [`DataSource`] yields a flat sequence of doubles from a literal list, a
//! named vector or a table column. Vector and table sources subscribe to
//! their backing data and forward changes through [`SourceHooks`]; dropping
//! a source unsubscribes it and releases its handle.

use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use surfmesh_core::{
    ColumnEvent, ColumnEventKind, ColumnKey, NotifierId, NotifyMask, TableClient, TableStore,
    TraceEvent, TraceId, TraceMask, VectorClient, VectorEvent, VectorStore,
};

use crate::error::{Error, Result};

/// Which mesh coordinate a source feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn as_char(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Values read from a source, with their range.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceValues {
    pub values: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

impl SourceValues {
    pub fn new(values: Vec<f64>) -> Self {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Self { values, min, max }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Where a source reports upstream events.
#[derive(Clone)]
pub struct SourceHooks {
    /// The backing values changed.
    pub changed: Rc<dyn Fn()>,
    /// The backing vector or column went away.
    pub deleted: Rc<dyn Fn()>,
}

/// Open table handles shared by the sources of one mesh, keyed by table
/// name. The last source using a table closes it.
pub type TableClients = FxHashMap<String, Weak<TableClient>>;

/// Collaborators a source spec is resolved against.
pub struct SourceContext<'a> {
    pub tables: &'a TableStore,
    pub vectors: &'a VectorStore,
    pub clients: &'a mut TableClients,
}

/// A literal list of numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSource {
    values: Vec<f64>,
}

impl ListSource {
    /// Parses every token as a number; one bad token fails the whole list.
    pub fn parse<S: AsRef<str>>(axis: Axis, tokens: &[S]) -> Result<Self> {
        let values = tokens
            .iter()
            .map(|token| {
                let token = token.as_ref();
                token.trim().parse::<f64>().map_err(|_| Error::BadNumber {
                    axis,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self { values })
    }
}

/// A subscription to a named vector. Dropping it frees the client id.
#[derive(Debug)]
pub struct VectorSource {
    client: VectorClient,
}

/// A subscription to one table column.
pub struct TableSource {
    client: Rc<TableClient>,
    table: String,
    column: ColumnKey,
    notifier: NotifierId,
    trace: TraceId,
}

impl Drop for TableSource {
    fn drop(&mut self) {
        self.client.delete_notifier(self.notifier);
        self.client.delete_trace(self.trace);
    }
}

impl fmt::Debug for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSource")
            .field("table", &self.table)
            .field("column", &self.column)
            .finish()
    }
}

/// One axis worth of mesh input.
#[derive(Debug)]
pub enum DataSource {
    List(ListSource),
    Vector(VectorSource),
    Table(TableSource),
}

impl DataSource {
    /// Resolves a source spec.
    ///
    /// - no tokens: no source;
    /// - one token naming a vector: that vector;
    /// - two tokens, the first naming a table: the column the second one
    ///   resolves to in that table;
    /// - anything else: a literal list of numbers.
    pub fn resolve<S: AsRef<str>>(
        axis: Axis,
        tokens: &[S],
        ctx: SourceContext<'_>,
        hooks: SourceHooks,
    ) -> Result<Option<DataSource>> {
        match tokens {
            [] => Ok(None),
            [name] if ctx.vectors.exists(name.as_ref()) => {
                Self::vector(ctx.vectors, name.as_ref(), hooks).map(Some)
            }
            [table, column] if ctx.tables.exists(table.as_ref()) => {
                Self::table(ctx, table.as_ref(), column.as_ref(), hooks).map(Some)
            }
            _ => Ok(Some(DataSource::List(ListSource::parse(axis, tokens)?))),
        }
    }

    fn vector(vectors: &VectorStore, name: &str, hooks: SourceHooks) -> Result<DataSource> {
        let client = vectors.alloc_id(name)?;
        client.set_changed_callback(Some(Rc::new(move |event: VectorEvent| match event {
            VectorEvent::Updated => (hooks.changed)(),
            VectorEvent::Destroyed => (hooks.deleted)(),
        })))?;
        Ok(DataSource::Vector(VectorSource { client }))
    }

    fn table(
        ctx: SourceContext<'_>,
        table: &str,
        spec: &str,
        hooks: SourceHooks,
    ) -> Result<DataSource> {
        let client = match ctx.clients.get(table).and_then(Weak::upgrade) {
            Some(client) => client,
            None => {
                let client = Rc::new(ctx.tables.open(table)?);
                ctx.clients.insert(table.to_string(), Rc::downgrade(&client));
                client
            }
        };
        let column = client.resolve_column(spec)?;

        let deleted = Rc::clone(&hooks.deleted);
        let notifier = client.create_column_notifier(
            Some(column),
            NotifyMask::COLUMN_CHANGED,
            Rc::new(move |event: &ColumnEvent| {
                if event.kind == ColumnEventKind::Deleted {
                    tracing::debug!(table = %event.table, column = %event.label, "Source column deleted");
                    deleted();
                }
            }),
        )?;
        let changed = Rc::clone(&hooks.changed);
        let trace = match client.create_column_trace(
            column,
            TraceMask::WRITES | TraceMask::CREATES | TraceMask::UNSETS,
            Rc::new(move |_: &TraceEvent| changed()),
        ) {
            Ok(trace) => trace,
            Err(err) => {
                client.delete_notifier(notifier);
                return Err(err.into());
            }
        };
        ctx.clients.retain(|_, weak| weak.strong_count() > 0);
        Ok(DataSource::Table(TableSource {
            client,
            table: table.to_string(),
            column,
            notifier,
            trace,
        }))
    }

    /// Reads the current values.
    pub fn get(&self) -> Result<SourceValues> {
        let values = match self {
            DataSource::List(list) => list.values.clone(),
            DataSource::Vector(vector) => vector.client.values()?,
            DataSource::Table(table) => table.client.column_values(table.column)?,
        };
        Ok(SourceValues::new(values))
    }
}

/// The source in the same form it is configured with.
impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::List(list) => {
                for (i, value) in list.values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
            DataSource::Vector(vector) => f.write_str(&brace(vector.client.name())),
            DataSource::Table(table) => {
                let label = table
                    .client
                    .column_label(table.column)
                    .unwrap_or_default();
                write!(f, "{} {}", brace(&table.table), brace(&label))
            }
        }
    }
}

fn brace(element: &str) -> String {
    if element.is_empty() || element.contains(char::is_whitespace) {
        format!("{{{}}}", element)
    } else {
        element.to_string()
    }
}
