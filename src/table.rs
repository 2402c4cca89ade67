// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

use crate::error::{LocError, Result};

/// Sentinel stored in tables for cells without data.
pub const HOLE: f64 = -1.0;

/// Upper bound on the node count of either axis.
pub const MAX_NODES: usize = 10_000;

/// Returns true if `v` is a usable sample for the sentinel `fbad`.
#[inline]
pub fn is_valid(v: f64, fbad: f64) -> bool {
    v.is_finite() && v != fbad
}

/// A function tabulated over distance (`x`, degrees) and depth (`y`, km).
///
/// Values are stored row-major with one row per depth node, so the sample for
/// depth node `j` and distance node `i` lives at `j * nx + i`. Cells equal to
/// [`HOLE`] carry no data; any sample at or below it, or not finite, is stored
/// as [`HOLE`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTable {
    name: String,
    header: String,
    x: Box<[f64]>,
    y: Box<[f64]>,
    values: Box<[f64]>,
    undefined_x: Option<(f64, f64)>,
}

impl GeoTable {
    /// Create a table from its nodes and row-major samples.
    ///
    /// # Errors
    /// Returns an error if either axis is empty, exceeds [`MAX_NODES`], is not
    /// non-decreasing, or if `values.len() != x.len() * y.len()`.
    pub fn new(
        header: impl Into<String>,
        x: Vec<f64>,
        y: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        Self::build(String::new(), header.into(), x, y, values)
    }

    fn build(
        name: String,
        header: String,
        x: Vec<f64>,
        y: Vec<f64>,
        mut values: Vec<f64>,
    ) -> Result<Self> {
        check_axis(&name, "distance", &x)?;
        check_axis(&name, "depth", &y)?;

        let expected = x.len() * y.len();
        if values.len() != expected {
            return Err(LocError::DimensionMismatch {
                path: name,
                expected,
                got: values.len(),
            });
        }

        for v in values.iter_mut() {
            if !v.is_finite() || *v <= HOLE {
                *v = HOLE;
            }
        }
        let undefined_x = undefined_range(&x, &values[..x.len()]);

        Ok(GeoTable {
            name,
            header,
            x: x.into_boxed_slice(),
            y: y.into_boxed_slice(),
            values: values.into_boxed_slice(),
            undefined_x,
        })
    }

    /// Attach a display name (usually the source path) used in error messages.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Read a table in the ASCII travel-time table format.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text, &path.display().to_string())?;
        debug!(
            path = %path.display(),
            distances = table.nx(),
            depths = table.ny(),
            "read table"
        );
        Ok(table)
    }

    /// Parse the ASCII table format from a string.
    ///
    /// The first line is a free-form header; anything after `#` on any line is
    /// a comment. The remaining tokens are: depth count, depth nodes, distance
    /// count, distance nodes, then one row of distance samples per depth node.
    /// Whitespace and line breaks between tokens are not significant.
    pub fn parse(text: &str, name: &str) -> Result<Self> {
        let mut lines = text.lines();
        let header = lines
            .next()
            .map(|l| strip_comment(l).trim().to_string())
            .unwrap_or_default();

        let mut tokens = lines.flat_map(|l| strip_comment(l).split_whitespace());

        let ny = read_count(&mut tokens, name, "depth")?;
        let y = read_values(&mut tokens, name, ny, "depth node")?;
        let nx = read_count(&mut tokens, name, "distance")?;
        let x = read_values(&mut tokens, name, nx, "distance node")?;

        let expected = nx * ny;
        let mut values = Vec::with_capacity(expected);
        for tok in tokens.by_ref().take(expected) {
            values.push(parse_f64(tok, name)?);
        }
        if values.len() != expected {
            return Err(LocError::DimensionMismatch {
                path: name.to_string(),
                expected,
                got: values.len(),
            });
        }

        Self::build(name.to_string(), header, x, y, values)
    }

    /// Render the table in the ASCII format accepted by [`GeoTable::parse`].
    pub fn to_ascii(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.header);
        let _ = writeln!(out, "{:>8}    # number of depth samples", self.ny());
        write_wrapped(&mut out, &self.y);
        let _ = writeln!(out, "{:>8}    # number of distance samples", self.nx());
        write_wrapped(&mut out, &self.x);
        for (j, depth) in self.y.iter().enumerate() {
            let _ = writeln!(out, "# depth {}", depth);
            write_wrapped(&mut out, self.row(j));
        }
        out
    }

    /// Write the table to `path` in ASCII format.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_ascii())?;
        Ok(())
    }

    /// Header line without its comment.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Display name, usually the file the table was read from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Distance nodes in degrees.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Depth nodes in km.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Number of distance nodes.
    pub fn nx(&self) -> usize {
        self.x.len()
    }

    /// Number of depth nodes.
    pub fn ny(&self) -> usize {
        self.y.len()
    }

    /// All samples in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Samples along distance for depth node `j`.
    pub fn row(&self, j: usize) -> &[f64] {
        let nx = self.nx();
        &self.values[j * nx..(j + 1) * nx]
    }

    /// Sample at depth node `j`, distance node `i`.
    pub fn value(&self, j: usize, i: usize) -> f64 {
        self.values[j * self.nx() + i]
    }

    /// True if the cell at depth node `j`, distance node `i` carries no data.
    pub fn is_hole(&self, j: usize, i: usize) -> bool {
        !is_valid(self.value(j, i), HOLE)
    }

    /// Distance interval left undefined by the shallowest row, if any.
    ///
    /// `lower` is the last valid node before the first hole run and `upper`
    /// the first valid node after it.
    pub fn undefined_x(&self) -> Option<(f64, f64)> {
        self.undefined_x
    }

    /// True if `x0` lies strictly inside [`GeoTable::undefined_x`].
    pub fn in_undefined_range(&self, x0: f64) -> bool {
        matches!(self.undefined_x, Some((lo, hi)) if x0 > lo && x0 < hi)
    }
}

fn check_axis(name: &str, axis: &str, nodes: &[f64]) -> Result<()> {
    if nodes.is_empty() || nodes.len() > MAX_NODES {
        return Err(LocError::TableFormat {
            path: name.to_string(),
            reason: format!("invalid number of {} samples: {}", axis, nodes.len()),
        });
    }
    if let Some(k) = nodes.iter().position(|v| !v.is_finite()) {
        return Err(LocError::TableFormat {
            path: name.to_string(),
            reason: format!("{} node {} is not finite", axis, k),
        });
    }
    if let Some(k) = nodes.windows(2).position(|w| w[1] < w[0]) {
        return Err(LocError::TableFormat {
            path: name.to_string(),
            reason: format!("{} nodes decrease at index {}", axis, k + 1),
        });
    }
    Ok(())
}

fn undefined_range(x: &[f64], first_row: &[f64]) -> Option<(f64, f64)> {
    let mut lower = None;
    for i in 1..x.len() {
        let prev = is_valid(first_row[i - 1], HOLE);
        let cur = is_valid(first_row[i], HOLE);
        if prev && !cur {
            lower = Some(x[i - 1]);
        } else if cur {
            if let Some(lo) = lower {
                return Some((lo, x[i]));
            }
        }
    }
    None
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_f64(tok: &str, name: &str) -> Result<f64> {
    tok.parse::<f64>().map_err(|_| LocError::TableFormat {
        path: name.to_string(),
        reason: format!("cannot parse '{}' as a number", tok),
    })
}

fn read_count<'a, I>(tokens: &mut I, name: &str, axis: &str) -> Result<usize>
where
    I: Iterator<Item = &'a str>,
{
    let tok = tokens.next().ok_or_else(|| LocError::TableFormat {
        path: name.to_string(),
        reason: format!("missing number of {} samples", axis),
    })?;
    let n: usize = tok.parse().map_err(|_| LocError::TableFormat {
        path: name.to_string(),
        reason: format!("invalid number of {} samples: '{}'", axis, tok),
    })?;
    if n == 0 || n > MAX_NODES {
        return Err(LocError::TableFormat {
            path: name.to_string(),
            reason: format!("invalid number of {} samples: {}", axis, n),
        });
    }
    Ok(n)
}

fn read_values<'a, I>(tokens: &mut I, name: &str, n: usize, what: &str) -> Result<Vec<f64>>
where
    I: Iterator<Item = &'a str>,
{
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let tok = tokens.next().ok_or_else(|| LocError::TableFormat {
            path: name.to_string(),
            reason: format!("expected {} {}s, found {}", n, what, out.len()),
        })?;
        out.push(parse_f64(tok, name)?);
    }
    Ok(out)
}

fn write_wrapped(out: &mut String, values: &[f64]) {
    for chunk in values.chunks(10) {
        let line: Vec<String> = chunk.iter().map(|v| format!("{:?}", v)).collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
}
