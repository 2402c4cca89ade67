// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use tracing::trace;

use crate::error::GeometryError;
use crate::geo::{distaz, normalize_180, project, LatLon};

/// Intersection of two great-circle rays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Latitude of the crossing in degrees.
    pub lat: f64,
    /// Longitude of the crossing in degrees.
    pub lon: f64,
    /// Arc from the first reference point to the crossing, degrees.
    pub dist1: f64,
    /// Arc from the second reference point to the crossing, degrees.
    pub dist2: f64,
}

/// Intersect the ray leaving `p1` along `az1` with the ray leaving `p2` along
/// `az2`.
///
/// The two rays and the baseline `p1`-`p2` form a spherical triangle whose
/// remaining sides are solved with Napier's analogies. The crossing is then
/// projected from whichever reference point is closer to it.
///
/// # Errors
/// Returns a [`GeometryError`] if the points coincide, a ray runs along the
/// baseline, the rays point to opposite sides of the baseline, the interior
/// angles sum to more than 180 degrees, or the solved triangle is not real.
pub fn intersect(
    p1: LatLon,
    az1: f64,
    p2: LatLon,
    az2: f64,
) -> Result<Crossing, GeometryError> {
    let (delta, az12, az21) = distaz(p1, p2);
    if delta == 0.0 {
        return Err(GeometryError::Coincident);
    }

    let ra = normalize_180(az1 - az12);
    let rb = normalize_180(az2 - az21);
    if ra == 0.0 || rb == 0.0 || ra.abs() == 180.0 || rb.abs() == 180.0 {
        return Err(GeometryError::Degenerate);
    }
    if ra.signum() == rb.signum() {
        return Err(GeometryError::Diverging);
    }

    let a = ra.abs();
    let b = rb.abs();
    if a + b > 180.0 {
        return Err(GeometryError::NoReasonableCrossing);
    }

    let half_c = (0.5 * delta).to_radians().tan();
    let half_sum = 0.5 * (a + b).to_radians();
    let half_diff = 0.5 * (a - b).to_radians();

    let sum = half_c * half_diff.cos();
    let s = sum.atan2(half_sum.cos());
    let d = (half_c * half_diff.sin() / half_sum.sin()).atan();

    // side opposite the angle at p1 ends at p2, and vice versa
    let dist2 = (s + d).to_degrees();
    let dist1 = (s - d).to_degrees();
    trace!(delta, ra, rb, dist1, dist2, "solved crossing triangle");
    if dist1 < 0.0 || dist2 < 0.0 {
        return Err(GeometryError::NegativeDistance);
    }

    let point = if dist1 <= dist2 {
        project(p1, dist1, az1)
    } else {
        project(p2, dist2, az2)
    };

    Ok(Crossing {
        lat: point.lat,
        lon: point.lon,
        dist1,
        dist2,
    })
}
