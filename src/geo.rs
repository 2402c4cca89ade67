// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Spherical geodesy on a unit sphere. Angles are in degrees.

/// Mean Earth radius in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of arc on the mean sphere.
pub const KM_PER_DEG: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// Geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl LatLon {
    /// Create a point.
    pub fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }
}

/// Wrap an angle into (-180, 180].
pub fn normalize_180(a: f64) -> f64 {
    let mut r = a % 360.0;
    if r > 180.0 {
        r -= 360.0;
    } else if r <= -180.0 {
        r += 360.0;
    }
    r
}

/// Wrap an angle into [0, 360).
pub fn normalize_360(a: f64) -> f64 {
    let r = a % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}

/// Distance, azimuth and back-azimuth between two points.
///
/// Returns `(delta, az, baz)` where `delta` is the great-circle arc, `az` the
/// azimuth at `a` towards `b` and `baz` the azimuth at `b` towards `a`, all in
/// degrees with azimuths in [0, 360).
pub fn distaz(a: LatLon, b: LatLon) -> (f64, f64, f64) {
    let (p1, p2) = (a.lat.to_radians(), b.lat.to_radians());
    let dl = (b.lon - a.lon).to_radians();

    let (s1, c1) = p1.sin_cos();
    let (s2, c2) = p2.sin_cos();
    let (sdl, cdl) = dl.sin_cos();

    let y = ((c2 * sdl).powi(2) + (c1 * s2 - s1 * c2 * cdl).powi(2)).sqrt();
    let x = s1 * s2 + c1 * c2 * cdl;
    let delta = y.atan2(x).to_degrees();

    let az = (sdl * c2).atan2(c1 * s2 - s1 * c2 * cdl).to_degrees();
    let baz = (-sdl * c1).atan2(c2 * s1 - s2 * c1 * cdl).to_degrees();

    (delta, normalize_360(az), normalize_360(baz))
}

/// Point reached from `from` after travelling `delta` degrees along azimuth `az`.
pub fn project(from: LatLon, delta: f64, az: f64) -> LatLon {
    let p1 = from.lat.to_radians();
    let d = delta.to_radians();
    let a = az.to_radians();

    let (s1, c1) = p1.sin_cos();
    let (sd, cd) = d.sin_cos();

    let s2 = (s1 * cd + c1 * sd * a.cos()).clamp(-1.0, 1.0);
    let p2 = s2.asin();
    let dl = (a.sin() * sd * c1).atan2(cd - s1 * s2);

    LatLon {
        lat: p2.to_degrees(),
        lon: normalize_180(from.lon + dl.to_degrees()),
    }
}
