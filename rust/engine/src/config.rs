// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration loaded from environment variables, and the
//! per-call mesh configuration record.

use crate::error::{Error, Result};

/// Largest vertex or triangle count a recompute may allocate by default.
pub const DEFAULT_MAX_POINTS: usize = 1 << 24;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on the vertices or triangles one recompute may produce.
    pub max_points: usize,
    /// Emit a warning for every duplicate point dropped from a cloud mesh.
    pub warn_duplicates: bool,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_points: std::env::var("SURFMESH_MAX_POINTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(DEFAULT_MAX_POINTS),
            warn_duplicates: std::env::var("SURFMESH_WARN_DUPLICATES")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
        }
    }

    /// Fails with an allocation error when `count` exceeds `max_points`.
    pub(crate) fn check_alloc(&self, count: usize, what: &'static str) -> Result<()> {
        if count > self.max_points {
            return Err(Error::Allocation { count, what });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Splits a configuration value into list elements.
///
/// Elements are separated by whitespace; braces group an element that
/// contains whitespace (`{col label} 2` yields `col label` and `2`). Nested
/// braces are kept verbatim inside the outer group.
pub fn split_list(list: &str) -> Result<Vec<String>> {
    let mut elements = Vec::new();
    let mut chars = list.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(first) = chars.next() else {
            break;
        };
        let mut element = String::new();
        if first == '{' {
            let mut depth = 1;
            loop {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        element.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        element.push('}');
                    }
                    Some(c) => element.push(c),
                    None => return Err(Error::UnbalancedBraces(list.to_string())),
                }
            }
            if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                return Err(Error::UnbalancedBraces(list.to_string()));
            }
        } else {
            if first == '}' {
                return Err(Error::UnbalancedBraces(list.to_string()));
            }
            element.push(first);
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                element.push(c);
                chars.next();
            }
        }
        elements.push(element);
    }
    Ok(elements)
}

/// Options for one [`Mesh::configure`](crate::Mesh::configure) call.
///
/// Fields left as `None` keep the mesh's current setting. An empty list
/// clears the setting.
///
/// # Example
///
/// ```
/// use surfmesh_engine::MeshOptions;
///
/// let options = MeshOptions::new().x("0 2 3").unwrap().y("{0} 1 2").unwrap();
/// assert_eq!(options.x.as_deref(), Some(&["0".to_string(), "2".into(), "3".into()][..]));
/// assert!(options.triangles.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshOptions {
    /// Source of x values: a vector name, a table name and column, or
    /// literal numbers.
    pub x: Option<Vec<String>>,
    /// Source of y values, in the same forms as `x`.
    pub y: Option<Vec<String>>,
    /// Explicit 1-based vertex index triples (triangle meshes only).
    pub triangles: Option<Vec<String>>,
    /// Ordinals of triangles to leave out.
    pub hide: Option<Vec<String>>,
}

impl MeshOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(mut self, list: &str) -> Result<Self> {
        self.x = Some(split_list(list)?);
        Ok(self)
    }

    pub fn y(mut self, list: &str) -> Result<Self> {
        self.y = Some(split_list(list)?);
        Ok(self)
    }

    pub fn triangles(mut self, list: &str) -> Result<Self> {
        self.triangles = Some(split_list(list)?);
        Ok(self)
    }

    pub fn hide(mut self, list: &str) -> Result<Self> {
        self.hide = Some(split_list(list)?);
        Ok(self)
    }

    /// Sets the x source from already-split elements.
    pub fn x_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.x = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the y source from already-split elements.
    pub fn y_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.y = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.triangles.is_none() && self.hide.is_none()
    }
}
