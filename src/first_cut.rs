// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Crude epicenter estimates from a handful of station observations.
//!
//! Strategies are tried from most to least constraining; the first that
//! yields a point wins.

use tracing::debug;

use crate::crossing::intersect;
use crate::geo::{project, LatLon};

/// Distance nodes of the surface-source lookup curves, degrees.
const DISTANCE: [f64; 19] = [
    0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0, 120.0, 130.0, 140.0,
    150.0, 160.0, 170.0, 180.0,
];

/// IASPEI P slowness at [`DISTANCE`], s/deg.
const P_SLOWNESS: [f64; 19] = [
    19.17, 13.7, 10.9, 8.85, 8.3, 7.6, 6.88, 6.15, 5.4, 4.66, 4.44, 1.96, 1.91, 1.88, 1.79, 1.57,
    1.14, 0.59, 0.01,
];

/// S minus P time at the first 12 [`DISTANCE`] nodes, seconds.
const S_MINUS_P: [f64; 12] = [
    0.0, 114.2, 226.76, 300.0, 367.49, 432.64, 494.45, 552.32, 605.82, 654.47, 695.75, 734.6,
];

/// Azimuth pairs closer than this are not intersected, degrees.
const MIN_AZIMUTH_SEPARATION: f64 = 10.0;
/// Crossings farther than this from their stations are rejected, degrees.
const MAX_CROSSING_DISTANCE: f64 = 80.0;
/// Offset from a single station when no distance estimate exists, degrees.
const DEFAULT_OFFSET: f64 = 5.0;

/// What a single station contributes to the estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct StationObservation {
    /// Station identifier, for logging.
    pub station: String,
    /// Station position.
    pub position: LatLon,
    /// Earliest P-type arrival time.
    pub p_time: Option<f64>,
    /// Earliest S-type arrival time.
    pub s_time: Option<f64>,
    /// Best back-azimuth and its standard deviation, degrees.
    pub azimuth: Option<(f64, f64)>,
    /// Best P slowness and its standard deviation, s/deg.
    pub slowness: Option<(f64, f64)>,
}

impl StationObservation {
    /// Observation with position only.
    pub fn new(station: &str, position: LatLon) -> Self {
        StationObservation {
            station: station.to_string(),
            position,
            p_time: None,
            s_time: None,
            azimuth: None,
            slowness: None,
        }
    }

    fn good_azimuth(&self) -> Option<(f64, f64)> {
        self.azimuth
            .filter(|&(az, sd)| (-180.0..=360.0).contains(&az) && sd > 0.0)
    }

    fn good_slowness(&self) -> Option<(f64, f64)> {
        self.slowness.filter(|&(s, sd)| s > 0.02 && s < 19.16 && sd > 0.0)
    }

    fn s_minus_p(&self) -> Option<f64> {
        match (self.p_time, self.s_time) {
            (Some(p), Some(s)) if s > p => Some(s - p),
            _ => None,
        }
    }
}

/// Strategy that produced a [`FirstCut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstCutMethod {
    /// S-P time and azimuth at one station.
    SMinusPAzimuth,
    /// Crossing of the azimuths of two stations.
    AzimuthCrossing,
    /// P slowness and azimuth at one station.
    SlownessAzimuth,
    /// Near the station with the earliest P arrival.
    EarliestArrival,
    /// Near the station with the best azimuth.
    BestAzimuth,
    /// At the slowness distance of the station with the best slowness.
    BestSlowness,
}

/// A first-cut epicenter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstCut {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Strategy that produced it.
    pub method: FirstCutMethod,
}

/// Distance at which a surface P wave has horizontal slowness `s`.
pub fn slowness_distance(s: f64) -> Option<f64> {
    (1..P_SLOWNESS.len()).find_map(|j| {
        let (s0, s1) = (P_SLOWNESS[j - 1], P_SLOWNESS[j]);
        (s < s0 && s >= s1).then(|| lerp(s, s0, s1, DISTANCE[j - 1], DISTANCE[j]))
    })
}

/// Distance at which S trails P by `t` seconds.
pub fn s_minus_p_distance(t: f64) -> Option<f64> {
    (1..S_MINUS_P.len()).find_map(|j| {
        let (t0, t1) = (S_MINUS_P[j - 1], S_MINUS_P[j]);
        (t > t0 && t <= t1).then(|| lerp(t, t0, t1, DISTANCE[j - 1], DISTANCE[j]))
    })
}

fn lerp(v: f64, v0: f64, v1: f64, d0: f64, d1: f64) -> f64 {
    (d1 - d0) * (v - v0) / (v1 - v0) + d0
}

fn at(obs: &StationObservation, distance: f64, azimuth: f64, method: FirstCutMethod) -> FirstCut {
    let p = project(obs.position, distance, azimuth);
    debug!(station = %obs.station, distance, azimuth, ?method, "first-cut location");
    FirstCut {
        lat: p.lat,
        lon: p.lon,
        method,
    }
}

/// Estimate an epicenter from station observations.
///
/// Returns `None` if no station carries a usable time, azimuth or slowness.
pub fn first_cut(observations: &[StationObservation]) -> Option<FirstCut> {
    // stations ordered by azimuth quality
    let mut by_azimuth: Vec<(&StationObservation, f64, f64)> = observations
        .iter()
        .filter_map(|o| o.good_azimuth().map(|(az, sd)| (o, az, sd)))
        .collect();
    by_azimuth.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut by_slowness: Vec<(&StationObservation, f64, f64)> = observations
        .iter()
        .filter_map(|o| o.good_slowness().map(|(s, sd)| (o, s, sd)))
        .collect();
    by_slowness.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut by_s_minus_p: Vec<(&StationObservation, f64)> = observations
        .iter()
        .filter_map(|o| o.s_minus_p().map(|t| (o, t)))
        .collect();
    by_s_minus_p.sort_by(|a, b| a.1.total_cmp(&b.1));

    for (obs, t) in &by_s_minus_p {
        if let Some((az, _)) = obs.good_azimuth() {
            if let Some(d) = s_minus_p_distance(*t) {
                return Some(at(obs, d, az, FirstCutMethod::SMinusPAzimuth));
            }
        }
    }

    let mut best: Option<(f64, FirstCut)> = None;
    for (i, (o1, az1, _)) in by_azimuth.iter().enumerate() {
        for (o2, az2, _) in by_azimuth.iter().take(i) {
            let mut sep = (az1 - az2).abs();
            if sep > 350.0 {
                sep = 360.0 - sep;
            }
            if sep < MIN_AZIMUTH_SEPARATION {
                continue;
            }
            let Ok(c) = intersect(o1.position, *az1, o2.position, *az2) else {
                continue;
            };
            let mean = 0.5 * (c.dist1 + c.dist2);
            if best.map_or(true, |(d, _)| mean < d) {
                best = Some((
                    mean,
                    FirstCut {
                        lat: c.lat,
                        lon: c.lon,
                        method: FirstCutMethod::AzimuthCrossing,
                    },
                ));
            }
        }
    }
    if let Some((mean, cut)) = best {
        if mean < MAX_CROSSING_DISTANCE {
            debug!(mean, "first-cut location from azimuth crossing");
            return Some(cut);
        }
    }

    if let (Some((obs, s, _)), false) = (by_slowness.first(), by_azimuth.is_empty()) {
        if let (Some((az, _)), Some(d)) = (obs.good_azimuth(), slowness_distance(*s)) {
            return Some(at(obs, d, az, FirstCutMethod::SlownessAzimuth));
        }
    }

    let earliest = observations
        .iter()
        .filter(|o| o.p_time.is_some())
        .min_by(|a, b| a.p_time.unwrap_or(0.0).total_cmp(&b.p_time.unwrap_or(0.0)));
    if let Some(obs) = earliest {
        let az = obs.good_azimuth().map_or(0.0, |(az, _)| az);
        return Some(at(obs, DEFAULT_OFFSET, az, FirstCutMethod::EarliestArrival));
    }

    if let Some((obs, az, _)) = by_azimuth.first() {
        return Some(at(obs, DEFAULT_OFFSET, *az, FirstCutMethod::BestAzimuth));
    }

    if let Some((obs, s, _)) = by_slowness.first() {
        let d = slowness_distance(*s).unwrap_or(DEFAULT_OFFSET);
        return Some(at(obs, d, 0.0, FirstCutMethod::BestSlowness));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distaz;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn slowness_lookup() {
        assert!(approx(slowness_distance(13.7).unwrap(), 10.0, 1e-12));
        assert!(approx(slowness_distance(8.575).unwrap(), 35.0, 1e-9));
        assert_eq!(slowness_distance(20.0), None);
        assert_eq!(slowness_distance(0.0), None);
    }

    #[test]
    fn s_minus_p_lookup() {
        assert!(approx(s_minus_p_distance(114.2).unwrap(), 10.0, 1e-12));
        assert!(approx(s_minus_p_distance(57.1).unwrap(), 5.0, 1e-12));
        assert_eq!(s_minus_p_distance(800.0), None);
    }

    #[test]
    fn empty_input() {
        assert_eq!(first_cut(&[]), None);
        let lonely = StationObservation::new("APE", LatLon::new(0.0, 0.0));
        assert_eq!(first_cut(&[lonely]), None);
    }

    #[test]
    fn s_minus_p_preferred() {
        let mut obs = StationObservation::new("APE", LatLon::new(0.0, 0.0));
        obs.p_time = Some(100.0);
        obs.s_time = Some(214.2);
        obs.azimuth = Some((90.0, 5.0));
        let cut = first_cut(&[obs]).unwrap();
        assert_eq!(cut.method, FirstCutMethod::SMinusPAzimuth);
        assert!(approx(cut.lat, 0.0, 1e-9));
        assert!(approx(cut.lon, 10.0, 1e-9));
    }

    #[test]
    fn azimuth_crossing() {
        let target = LatLon::new(10.0, 20.0);
        let sta = [LatLon::new(0.0, 0.0), LatLon::new(0.0, 30.0), LatLon::new(30.0, 15.0)];
        let obs: Vec<StationObservation> = sta
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let (_, az, _) = distaz(p, target);
                let mut o = StationObservation::new(&format!("S{}", i), p);
                o.azimuth = Some((az, 2.0 + i as f64));
                o
            })
            .collect();
        let cut = first_cut(&obs).unwrap();
        assert_eq!(cut.method, FirstCutMethod::AzimuthCrossing);
        assert!(approx(cut.lat, 10.0, 1e-6));
        assert!(approx(cut.lon, 20.0, 1e-6));
    }

    #[test]
    fn slowness_with_azimuth() {
        let mut obs = StationObservation::new("KBS", LatLon::new(0.0, 0.0));
        obs.azimuth = Some((0.0, 5.0));
        obs.slowness = Some((13.7, 0.5));
        let cut = first_cut(&[obs]).unwrap();
        assert_eq!(cut.method, FirstCutMethod::SlownessAzimuth);
        assert!(approx(cut.lat, 10.0, 1e-9));
    }

    #[test]
    fn earliest_arrival() {
        let mut a = StationObservation::new("A", LatLon::new(0.0, 0.0));
        a.p_time = Some(20.0);
        let mut b = StationObservation::new("B", LatLon::new(40.0, 40.0));
        b.p_time = Some(10.0);
        let cut = first_cut(&[a, b]).unwrap();
        assert_eq!(cut.method, FirstCutMethod::EarliestArrival);
        assert!(approx(cut.lat, 45.0, 1e-9));
        assert!(approx(cut.lon, 40.0, 1e-9));
    }

    #[test]
    fn best_azimuth_without_times() {
        let mut a = StationObservation::new("A", LatLon::new(0.0, 0.0));
        a.azimuth = Some((180.0, 9.0));
        let mut b = StationObservation::new("B", LatLon::new(0.0, 10.0));
        b.azimuth = Some((185.0, 3.0));
        let cut = first_cut(&[a, b]).unwrap();
        assert_eq!(cut.method, FirstCutMethod::BestAzimuth);
        let expected = project(LatLon::new(0.0, 10.0), 5.0, 185.0);
        assert!(approx(cut.lat, expected.lat, 1e-9));
        assert!(approx(cut.lon, expected.lon, 1e-9));
    }

    #[test]
    fn best_slowness_only() {
        let mut a = StationObservation::new("A", LatLon::new(0.0, 0.0));
        a.slowness = Some((10.9, 1.0));
        let cut = first_cut(&[a]).unwrap();
        assert_eq!(cut.method, FirstCutMethod::BestSlowness);
        assert!(approx(cut.lat, 20.0, 1e-9));
    }
}
