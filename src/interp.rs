// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Hole-aware interpolation kernels over tabulated functions.
//!
//! All kernels are pure. Samples equal to the caller's `fbad` sentinel mark
//! holes; a query whose supporting interval touches a hole is reported as a
//! hole instead of being smoothed across it. Duplicated nodes are treated as
//! discontinuities.

use std::ops::Range;

use crate::table::{is_valid, GeoTable};

/// Result of a 1D interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interp1 {
    /// Interpolated value, or `fbad` inside a hole.
    pub value: f64,
    /// First derivative with respect to the abscissa.
    pub slope: f64,
    /// -1 below the first node, +1 above the last node, 0 inside.
    pub extrapolation: i8,
    /// True when `value == fbad && slope == 0`.
    pub hole: bool,
}

/// Result of a 2D interpolation over (x, y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interp2 {
    /// Interpolated value, or `fbad` inside a hole.
    pub value: f64,
    /// Derivative along x.
    pub dfdx: f64,
    /// Derivative along y.
    pub dfdy: f64,
    /// Mixed derivative.
    pub d2fdxdy: f64,
    /// Extrapolation flag along x.
    pub x_extrapolation: i8,
    /// Extrapolation flag along y.
    pub y_extrapolation: i8,
    /// True if the point is undefined.
    pub hole: bool,
}

impl Interp2 {
    fn undefined(fbad: f64, x_extrapolation: i8, y_extrapolation: i8) -> Self {
        Interp2 {
            value: fbad,
            dfdx: 0.0,
            dfdy: 0.0,
            d2fdxdy: 0.0,
            x_extrapolation,
            y_extrapolation,
            hole: true,
        }
    }
}

/// Locate `x0` among ascending `nodes`.
///
/// Returns `(i, flag)` such that `nodes[i] <= x0 < nodes[i + 1]` when
/// `flag == 0`. `flag` is -1 if `x0` lies below the first node and +1 if it
/// lies above the last one; the index is then the first or last interval.
/// A query equal to the last node maps to the last interval. When nodes are
/// duplicated the interval starting at the later duplicate is returned.
pub fn bracket(nodes: &[f64], x0: f64) -> (usize, i8) {
    let n = nodes.len();
    if n == 0 {
        return (0, 0);
    }
    let last = n.saturating_sub(2);
    if x0 < nodes[0] {
        return (0, -1);
    }
    if x0 > nodes[n - 1] {
        return (last, 1);
    }
    let k = nodes.partition_point(|&v| v <= x0);
    (k.saturating_sub(1).min(last), 0)
}

/// Maximal run of valid samples containing `anchor`.
///
/// The run never spans a duplicated node. Returns an empty range at `anchor`
/// if the anchor itself is a hole.
pub fn fix_holes(x: &[f64], f: &[f64], fbad: f64, anchor: usize) -> Range<usize> {
    valid_run(x, |k| is_valid(f[k], fbad), anchor)
}

fn valid_run(x: &[f64], ok: impl Fn(usize) -> bool, anchor: usize) -> Range<usize> {
    if anchor >= x.len() || !ok(anchor) {
        return anchor..anchor;
    }
    let mut lo = anchor;
    while lo > 0 && ok(lo - 1) && x[lo - 1] < x[lo] {
        lo -= 1;
    }
    let mut hi = anchor + 1;
    while hi < x.len() && ok(hi) && x[hi] > x[hi - 1] {
        hi += 1;
    }
    lo..hi
}

/// Interpolate `f(x0)` from samples with holes.
///
/// Uses a monotone piecewise cubic Hermite fit on up to four samples around
/// the bracketing interval. Queries outside the node range are extrapolated
/// linearly from the boundary segment. A query exactly on a valid node
/// returns the stored sample unchanged.
pub fn holint1d(x: &[f64], f: &[f64], fbad: f64, x0: f64) -> Interp1 {
    debug_assert_eq!(x.len(), f.len());
    let r = interp_masked(x, f, |k| is_valid(f[k], fbad), fbad, x0);
    Interp1 {
        hole: r.value == fbad && r.slope == 0.0,
        ..r
    }
}

/// Interpolate `f(x0, y0)` on a table.
///
/// The x pass runs [`holint1d`] along each of up to four depth rows around
/// `y0`; the y pass then interpolates those row values and their x slopes.
pub fn holint2d(table: &GeoTable, fbad: f64, x0: f64, y0: f64) -> Interp2 {
    let window = RowWindow::locate(table.y(), y0);
    holint2d_rows(table, fbad, x0, &window)
}

/// Depth rows supporting a query at one depth.
///
/// Depends only on the query depth and the depth nodes, so it can be reused
/// for every distance query at that depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowWindow {
    /// Query depth.
    pub depth: f64,
    /// First row of the window.
    pub start: usize,
    /// One past the last row of the window.
    pub end: usize,
    /// Extrapolation flag along depth.
    pub extrapolation: i8,
}

impl RowWindow {
    /// Bracket `y0` in `nodes` and take up to four rows around it.
    pub fn locate(nodes: &[f64], y0: f64) -> Self {
        let (j, extrapolation) = bracket(nodes, y0);
        RowWindow {
            depth: y0,
            start: j.saturating_sub(1),
            end: (j + 3).min(nodes.len()),
            extrapolation,
        }
    }

    /// Number of rows in the window.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if the window holds no rows.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// [`holint2d`] with a precomputed depth window.
pub fn holint2d_rows(table: &GeoTable, fbad: f64, x0: f64, window: &RowWindow) -> Interp2 {
    let (_, x_ext) = bracket(table.x(), x0);
    let y_ext = window.extrapolation;
    if window.is_empty() || table.in_undefined_range(x0) {
        return Interp2::undefined(fbad, x_ext, y_ext);
    }

    let m = window.len().min(4);
    let mut vals = [fbad; 4];
    let mut dx = [0.0; 4];
    let mut ok = [false; 4];
    for k in 0..m {
        let r = holint1d(table.x(), table.row(window.start + k), fbad, x0);
        vals[k] = r.value;
        dx[k] = r.slope;
        ok[k] = !r.hole;
    }

    let ys = &table.y()[window.start..window.start + m];
    let vy = interp_masked(ys, &vals[..m], |k| ok[k], fbad, window.depth);
    if vy.value == fbad && vy.slope == 0.0 {
        return Interp2::undefined(fbad, x_ext, y_ext);
    }
    let dxy = interp_masked(ys, &dx[..m], |k| ok[k], fbad, window.depth);

    Interp2 {
        value: vy.value,
        dfdx: dxy.value,
        dfdy: vy.slope,
        d2fdxdy: dxy.slope,
        x_extrapolation: x_ext,
        y_extrapolation: y_ext,
        hole: false,
    }
}

fn hole(fbad: f64, extrapolation: i8) -> Interp1 {
    Interp1 {
        value: fbad,
        slope: 0.0,
        extrapolation,
        hole: true,
    }
}

fn interp_masked(
    x: &[f64],
    f: &[f64],
    ok: impl Fn(usize) -> bool,
    fbad: f64,
    x0: f64,
) -> Interp1 {
    let n = x.len();
    if n == 0 {
        return hole(fbad, 0);
    }
    let (i, flag) = bracket(x, x0);
    if n == 1 {
        if !ok(0) {
            return hole(fbad, flag);
        }
        return Interp1 {
            value: f[0],
            slope: 0.0,
            extrapolation: flag,
            hole: false,
        };
    }

    let lo = i.saturating_sub(1);
    let hi = (i + 3).min(n);
    let wx = &x[lo..hi];
    let wf = &f[lo..hi];
    let wok = |k: usize| ok(lo + k);
    let il = i - lo;

    let anchor = match flag {
        -1 => 0,
        1 => wx.len() - 1,
        _ => {
            for node in [il, il + 1] {
                if x0 == wx[node] && wok(node) {
                    let run = valid_run(wx, wok, node);
                    return Interp1 {
                        value: wf[node],
                        slope: node_slope_limited(wx, wf, &run, node),
                        extrapolation: 0,
                        hole: false,
                    };
                }
            }
            if !wok(il) || !wok(il + 1) {
                return hole(fbad, 0);
            }
            il
        }
    };

    let run = valid_run(wx, wok, anchor);
    if run.is_empty() {
        return hole(fbad, flag);
    }
    if run.len() == 1 {
        return Interp1 {
            value: wf[anchor],
            slope: 0.0,
            extrapolation: flag,
            hole: false,
        };
    }

    if flag != 0 {
        let (a, b) = if flag < 0 {
            (run.start, run.start + 1)
        } else {
            (run.end - 2, run.end - 1)
        };
        let slope = secant(wx, wf, a, b);
        return Interp1 {
            value: wf[anchor] + slope * (x0 - wx[anchor]),
            slope,
            extrapolation: flag,
            hole: false,
        };
    }

    if !run.contains(&(il + 1)) {
        return hole(fbad, 0);
    }
    hermite(wx, wf, &run, il, x0)
}

fn secant(x: &[f64], f: &[f64], a: usize, b: usize) -> f64 {
    (f[b] - f[a]) / (x[b] - x[a])
}

/// Quadratic slope estimate at `k` using up to two neighbours inside `run`.
fn node_slope(x: &[f64], f: &[f64], run: &Range<usize>, k: usize) -> f64 {
    let has_left = k > run.start;
    let has_right = k + 1 < run.end;
    match (has_left, has_right) {
        (true, true) => {
            let h0 = x[k] - x[k - 1];
            let h1 = x[k + 1] - x[k];
            let d0 = secant(x, f, k - 1, k);
            let d1 = secant(x, f, k, k + 1);
            (h1 * d0 + h0 * d1) / (h0 + h1)
        }
        (false, true) => {
            if k + 2 < run.end {
                let h0 = x[k + 1] - x[k];
                let h1 = x[k + 2] - x[k + 1];
                let d0 = secant(x, f, k, k + 1);
                let d1 = secant(x, f, k + 1, k + 2);
                ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1)
            } else {
                secant(x, f, k, k + 1)
            }
        }
        (true, false) => {
            if k >= run.start + 2 {
                let h0 = x[k - 1] - x[k - 2];
                let h1 = x[k] - x[k - 1];
                let d0 = secant(x, f, k - 2, k - 1);
                let d1 = secant(x, f, k - 1, k);
                ((2.0 * h1 + h0) * d1 - h1 * d0) / (h0 + h1)
            } else {
                secant(x, f, k - 1, k)
            }
        }
        (false, false) => 0.0,
    }
}

/// Clamp a node slope so the cubic on an interval with secant `delta` stays
/// monotone.
fn limit(d: f64, delta: f64) -> f64 {
    if delta == 0.0 || d.signum() != delta.signum() || d == 0.0 {
        0.0
    } else if d.abs() > 3.0 * delta.abs() {
        3.0 * delta
    } else {
        d
    }
}

fn node_slope_limited(x: &[f64], f: &[f64], run: &Range<usize>, k: usize) -> f64 {
    let d = node_slope(x, f, run, k);
    if k + 1 < run.end {
        limit(d, secant(x, f, k, k + 1))
    } else if k > run.start {
        limit(d, secant(x, f, k - 1, k))
    } else {
        d
    }
}

fn hermite(x: &[f64], f: &[f64], run: &Range<usize>, i: usize, x0: f64) -> Interp1 {
    let h = x[i + 1] - x[i];
    let delta = (f[i + 1] - f[i]) / h;
    let d0 = limit(node_slope(x, f, run, i), delta);
    let d1 = limit(node_slope(x, f, run, i + 1), delta);

    let t = (x0 - x[i]) / h;
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    let value = h00 * f[i] + h10 * h * d0 + h01 * f[i + 1] + h11 * h * d1;

    let g00 = 6.0 * t2 - 6.0 * t;
    let g10 = 3.0 * t2 - 4.0 * t + 1.0;
    let g01 = -6.0 * t2 + 6.0 * t;
    let g11 = 3.0 * t2 - 2.0 * t;
    let slope = (g00 * f[i] + g01 * f[i + 1]) / h + g10 * d0 + g11 * d1;

    Interp1 {
        value,
        slope,
        extrapolation: 0,
        hole: false,
    }
}
