// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Arrival, PickCatalog};

/// Arrivals at or above this weight count as used.
pub const USED_WEIGHT: f64 = 0.5;

/// Summary statistics of a solution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginQuality {
    /// Number of associated arrivals.
    pub associated_phase_count: usize,
    /// Number of arrivals used in the solution.
    pub used_phase_count: usize,
    /// Used arrivals of depth phases (`pP`, `sP`, ...).
    pub depth_phase_count: usize,
    /// Distinct stations among associated arrivals.
    pub associated_station_count: usize,
    /// Distinct stations among used arrivals.
    pub used_station_count: usize,
    /// RMS of the time residuals of used arrivals, seconds.
    pub standard_error: Option<f64>,
    /// Largest azimuthal gap between used stations, degrees.
    pub azimuthal_gap: Option<f64>,
    /// Smallest used epicentral distance, degrees.
    pub minimum_distance: Option<f64>,
    /// Largest used epicentral distance, degrees.
    pub maximum_distance: Option<f64>,
    /// Median used epicentral distance, degrees.
    pub median_distance: Option<f64>,
}

impl OriginQuality {
    /// Compute statistics from arrivals; `catalog` resolves station codes.
    pub fn from_arrivals(arrivals: &[Arrival], catalog: &dyn PickCatalog) -> Self {
        let mut q = OriginQuality {
            associated_phase_count: arrivals.len(),
            ..Default::default()
        };

        let mut assoc_stations = BTreeSet::new();
        let mut used_stations = BTreeSet::new();
        let mut sum_sq = 0.0;
        let mut n_res = 0usize;
        let mut azimuths = Vec::new();
        let mut distances = Vec::new();

        for arr in arrivals {
            let station = catalog.pick(arr).map(|p| p.waveform_id.station_id());
            if let Some(s) = &station {
                assoc_stations.insert(s.clone());
            }
            if arr.weight_or_zero() < USED_WEIGHT {
                continue;
            }

            q.used_phase_count += 1;
            if arr.phase.starts_with('p') || arr.phase.starts_with('s') {
                q.depth_phase_count += 1;
            }
            if let Some(s) = station {
                used_stations.insert(s);
            }
            if let Some(r) = arr.time_residual {
                sum_sq += r * r;
                n_res += 1;
            }
            if let Some(az) = arr.azimuth {
                azimuths.push(az);
            }
            if let Some(d) = arr.distance {
                distances.push(d);
            }
        }

        q.associated_station_count = assoc_stations.len();
        q.used_station_count = used_stations.len();
        if n_res > 0 {
            q.standard_error = Some((sum_sq / n_res as f64).sqrt());
        }
        q.azimuthal_gap = azimuthal_gap(&azimuths);

        distances.sort_by(f64::total_cmp);
        q.minimum_distance = distances.first().copied();
        q.maximum_distance = distances.last().copied();
        q.median_distance = median(&distances);
        q
    }
}

/// Largest step between consecutive sorted azimuths, wrapping through north.
///
/// Defined for at least two azimuths.
pub fn azimuthal_gap(azimuths: &[f64]) -> Option<f64> {
    if azimuths.len() < 2 {
        return None;
    }
    let mut az: Vec<f64> = azimuths.iter().map(|a| a.rem_euclid(360.0)).collect();
    az.sort_by(f64::total_cmp);
    az.push(az[0] + 360.0);
    let gap = az
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(0.0_f64, f64::max);
    if gap > 0.0 && gap < 360.0 {
        Some(gap)
    } else {
        None
    }
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some(0.5 * (sorted[n / 2 - 1] + sorted[n / 2])),
    }
}
