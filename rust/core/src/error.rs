// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for table and vector operations.

/// Result type alias for table and vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while working with tables or vectors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No table is registered under the given name.
    #[error("can't find a table \"{0}\"")]
    NoSuchTable(String),

    /// A table with the given name already exists.
    #[error("a table \"{0}\" already exists")]
    TableExists(String),

    /// The column specification did not match any column.
    #[error("no such column \"{spec}\" in table \"{table}\"")]
    NoSuchColumn { table: String, spec: String },

    /// The column specification matched more than one column.
    #[error("multiple columns specified by \"{spec}\" in table \"{table}\"")]
    AmbiguousColumn { table: String, spec: String },

    /// A column key no longer refers to a live column.
    #[error("column has been deleted from table \"{0}\"")]
    StaleColumn(String),

    /// A row index beyond the table's row count.
    #[error("row {row} is out of range (table \"{table}\" has {count} rows)")]
    RowOutOfRange {
        table: String,
        row: usize,
        count: usize,
    },

    /// A column position beyond the table's column count.
    #[error("column position {position} is out of range (table \"{table}\" has {count} columns)")]
    ColumnPositionOutOfRange {
        table: String,
        position: usize,
        count: usize,
    },

    /// A tag name that collides with a built-in tag.
    #[error("can't add reserved tag \"{0}\"")]
    ReservedTag(String),

    /// No vector is registered under the given name.
    #[error("can't find vector \"{0}\"")]
    NoSuchVector(String),

    /// A vector with the given name already exists.
    #[error("a vector \"{0}\" already exists")]
    VectorExists(String),
}
