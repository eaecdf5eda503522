// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hidden triangles.

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::types::Triangle;

/// Ordinals of triangles, counted in the order a triangulation produced
/// them, that are left out of the published triangle list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenSet {
    ordinals: FxHashSet<usize>,
}

impl HiddenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a list of non-negative integer ordinals.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        tokens
            .iter()
            .map(|token| {
                let token = token.as_ref();
                token.trim().parse::<usize>().map_err(|_| Error::BadHiddenIndex {
                    token: token.to_string(),
                })
            })
            .collect()
    }

    #[inline]
    pub fn contains(&self, ordinal: usize) -> bool {
        self.ordinals.contains(&ordinal)
    }

    pub fn insert(&mut self, ordinal: usize) -> bool {
        self.ordinals.insert(ordinal)
    }

    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }

    /// The ordinals in ascending order.
    pub fn sorted(&self) -> Vec<usize> {
        let mut ordinals: Vec<usize> = self.ordinals.iter().copied().collect();
        ordinals.sort_unstable();
        ordinals
    }
}

impl FromIterator<usize> for HiddenSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            ordinals: iter.into_iter().collect(),
        }
    }
}

/// Drops every triangle whose ordinal is in `hidden`, keeping the order of
/// the survivors, and releases the spare capacity.
pub fn compact_hidden(triangles: &mut Vec<Triangle>, hidden: &HiddenSet) {
    if !hidden.is_empty() {
        let mut ordinal = 0;
        triangles.retain(|_| {
            let keep = !hidden.contains(ordinal);
            ordinal += 1;
            keep
        });
    }
    triangles.shrink_to_fit();
}
