// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event masks and payloads delivered to notifier and trace callbacks.

use std::fmt;
use std::ops::BitOr;
use std::rc::Rc;

use crate::keys::ColumnKey;

/// Bit mask selecting which structural column events a notifier receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NotifyMask(u32);

impl NotifyMask {
    pub const CREATE: NotifyMask = NotifyMask(1 << 0);
    pub const DELETE: NotifyMask = NotifyMask(1 << 1);
    pub const MOVE: NotifyMask = NotifyMask(1 << 2);
    pub const RELABEL: NotifyMask = NotifyMask(1 << 3);
    /// Every structural change to a column.
    pub const COLUMN_CHANGED: NotifyMask = NotifyMask(0b1111);

    /// Returns `true` if events of `kind` pass this mask.
    #[inline]
    pub fn contains(self, kind: ColumnEventKind) -> bool {
        self.0 & kind.mask().0 != 0
    }
}

impl BitOr for NotifyMask {
    type Output = NotifyMask;

    fn bitor(self, rhs: NotifyMask) -> NotifyMask {
        NotifyMask(self.0 | rhs.0)
    }
}

/// The structural change a column went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnEventKind {
    Created,
    Deleted,
    Moved,
    Relabeled,
}

impl ColumnEventKind {
    /// The single-bit mask matching this kind.
    pub fn mask(self) -> NotifyMask {
        match self {
            ColumnEventKind::Created => NotifyMask::CREATE,
            ColumnEventKind::Deleted => NotifyMask::DELETE,
            ColumnEventKind::Moved => NotifyMask::MOVE,
            ColumnEventKind::Relabeled => NotifyMask::RELABEL,
        }
    }
}

/// Payload passed to a column notifier.
#[derive(Debug, Clone)]
pub struct ColumnEvent {
    /// Name of the table the column belongs to.
    pub table: String,
    pub column: ColumnKey,
    /// Label of the column at the time of the event.
    pub label: String,
    pub kind: ColumnEventKind,
}

/// Callback invoked for structural column events.
pub type NotifyProc = Rc<dyn Fn(&ColumnEvent)>;

/// Bit mask selecting which value-level operations a trace observes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceMask(u32);

impl TraceMask {
    pub const READS: TraceMask = TraceMask(1 << 0);
    pub const WRITES: TraceMask = TraceMask(1 << 1);
    pub const CREATES: TraceMask = TraceMask(1 << 2);
    pub const UNSETS: TraceMask = TraceMask(1 << 3);

    /// Returns `true` if the two masks share at least one bit.
    #[inline]
    pub fn intersects(self, other: TraceMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: TraceMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TraceMask {
    type Output = TraceMask;

    fn bitor(self, rhs: TraceMask) -> TraceMask {
        TraceMask(self.0 | rhs.0)
    }
}

impl fmt::Debug for TraceMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (TraceMask::READS, "READS"),
            (TraceMask::WRITES, "WRITES"),
            (TraceMask::CREATES, "CREATES"),
            (TraceMask::UNSETS, "UNSETS"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "TraceMask({})", set.join("|"))
    }
}

/// Payload passed to a column trace.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub table: String,
    pub column: ColumnKey,
    pub row: usize,
    /// The operations that happened to the cell, e.g. `CREATES | WRITES`
    /// for the first write to an empty cell.
    pub flags: TraceMask,
}

/// Callback invoked for traced value operations.
pub type TraceProc = Rc<dyn Fn(&TraceEvent)>;
