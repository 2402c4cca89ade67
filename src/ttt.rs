// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{LocError, Result};
use crate::geo::{distaz, LatLon};
use crate::interp::{holint2d_rows, RowWindow};
use crate::table::{GeoTable, HOLE};

/// Phases looked up when no explicit list is configured.
pub const DEFAULT_PHASES: [&str; 20] = [
    "LQ", "LR", "Lg", "P", "PKP", "PP", "PcP", "Pg", "Pn", "Rg", "S", "SKS", "SS", "ScS", "Sn",
    "Sg", "pP", "sP", "Pb", "Sb",
];

/// Near-surface P velocity used for the receiver elevation correction, km/s.
pub const SURFACE_VP: f64 = 5.8;
/// Near-surface S velocity used for the receiver elevation correction, km/s.
pub const SURFACE_VS: f64 = 3.46;

/// Travel time of one phase for one source-receiver pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelTime {
    /// Phase code.
    pub phase: String,
    /// Travel time in seconds.
    pub time: f64,
    /// Derivative with respect to distance, s/deg.
    pub dtdd: f64,
    /// Derivative with respect to depth, s/km.
    pub dtdh: f64,
    /// Mixed second derivative.
    pub d2tdddh: f64,
    /// -1/0/+1 if the distance lies below/inside/above the table.
    pub distance_extrapolation: i8,
    /// -1/0/+1 if the depth lies below/inside/above the table.
    pub depth_extrapolation: i8,
    /// True if the query fell into a hole.
    pub hole: bool,
}

impl TravelTime {
    /// True if either coordinate lies outside the tabulated range.
    pub fn is_extrapolated(&self) -> bool {
        self.distance_extrapolation != 0 || self.depth_extrapolation != 0
    }

    /// Interpolation status as a numeric code.
    ///
    /// 0 is a clean interpolation and 11 a hole. 12/13 flag a distance below
    /// or above the table, 14/15 a depth below or above it, and 16..19 the
    /// combinations (distance low/high with depth low, then with depth high).
    pub fn interp_error_code(&self) -> i32 {
        if self.hole {
            return 11;
        }
        match (self.distance_extrapolation, self.depth_extrapolation) {
            (0, 0) => 0,
            (d, 0) if d < 0 => 12,
            (_, 0) => 13,
            (0, z) if z < 0 => 14,
            (0, _) => 15,
            (d, z) if d < 0 && z < 0 => 16,
            (_, z) if z < 0 => 17,
            (d, _) if d < 0 => 18,
            _ => 19,
        }
    }
}

struct DepthCache {
    depth: f64,
    windows: Vec<RowWindow>,
}

/// Per-model collection of phase tables.
///
/// Loads one [`GeoTable`] per phase from `<directory>/<model>.<phase>` and
/// answers travel-time queries for every loaded phase. The depth brackets of
/// the last queried depth are cached, so a series of queries at one depth
/// only pays for the distance interpolation.
pub struct TravelTimeTable {
    directory: PathBuf,
    model: String,
    requested: Vec<String>,
    tables: Vec<(String, GeoTable)>,
    extrapolate: bool,
    elevation_correction: bool,
    cache: Option<DepthCache>,
}

impl TravelTimeTable {
    /// Load the tables of `model` for the given phases.
    ///
    /// Missing phase files are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error if a phase file exists but cannot be parsed, or if no
    /// phase file could be loaded at all.
    pub fn load<P: AsRef<Path>, S: AsRef<str>>(
        directory: P,
        model: &str,
        phases: &[S],
    ) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let requested: Vec<String> = phases.iter().map(|p| p.as_ref().to_string()).collect();
        let tables = load_tables(&directory, model, &requested)?;
        Ok(TravelTimeTable {
            directory,
            model: model.to_string(),
            requested,
            tables,
            extrapolate: false,
            elevation_correction: false,
            cache: None,
        })
    }

    /// Build from tables that are already in memory.
    pub fn from_tables(model: &str, tables: Vec<(String, GeoTable)>) -> Result<Self> {
        if tables.is_empty() {
            return Err(LocError::ModelNotFound(model.to_string()));
        }
        Ok(TravelTimeTable {
            directory: PathBuf::new(),
            model: model.to_string(),
            requested: tables.iter().map(|(p, _)| p.clone()).collect(),
            tables,
            extrapolate: false,
            elevation_correction: false,
            cache: None,
        })
    }

    /// Switch to another model from the same directory and phase list.
    ///
    /// On failure the current model stays loaded.
    pub fn set_model(&mut self, model: &str) -> Result<()> {
        if model == self.model {
            return Ok(());
        }
        let tables = load_tables(&self.directory, model, &self.requested)?;
        self.tables = tables;
        self.model = model.to_string();
        self.cache = None;
        Ok(())
    }

    /// Keep entries that lie outside the tabulated range in query results.
    pub fn with_extrapolation(mut self, enabled: bool) -> Self {
        self.extrapolate = enabled;
        self
    }

    /// Add `elevation / v` to each travel time, with `v` the surface velocity
    /// of the phase's last leg.
    pub fn with_elevation_correction(mut self, enabled: bool) -> Self {
        self.elevation_correction = enabled;
        self
    }

    /// Name of the loaded model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Loaded phase codes in load order.
    pub fn phases(&self) -> Vec<&str> {
        self.tables.iter().map(|(p, _)| p.as_str()).collect()
    }

    /// Table of one phase.
    pub fn table(&self, phase: &str) -> Option<&GeoTable> {
        self.tables.iter().find(|(p, _)| p == phase).map(|(_, t)| t)
    }

    /// Depth the cached brackets belong to.
    pub fn cached_depth(&self) -> Option<f64> {
        self.cache.as_ref().map(|c| c.depth)
    }

    fn ensure_depth(&mut self, depth: f64) {
        if let Some(cache) = &self.cache {
            if cache.depth.to_bits() == depth.to_bits() {
                return;
            }
        }
        debug!(depth, model = %self.model, "rebuilding depth cache");
        let windows = self
            .tables
            .iter()
            .map(|(_, t)| RowWindow::locate(t.y(), depth))
            .collect();
        self.cache = Some(DepthCache { depth, windows });
    }

    fn evaluate(&self, k: usize, distance: f64) -> Option<TravelTime> {
        let cache = self.cache.as_ref()?;
        let (phase, table) = &self.tables[k];
        let r = holint2d_rows(table, HOLE, distance, &cache.windows[k]);
        Some(TravelTime {
            phase: phase.clone(),
            time: r.value,
            dtdd: r.dfdx,
            dtdh: r.dfdy,
            d2tdddh: r.d2fdxdy,
            distance_extrapolation: r.x_extrapolation,
            depth_extrapolation: r.y_extrapolation,
            hole: r.hole,
        })
    }

    /// Travel times of all phases at a distance (degrees) and depth (km).
    ///
    /// Entries in holes are dropped, as are extrapolated entries unless
    /// extrapolation is enabled. The result is sorted by time, ties broken by
    /// phase code.
    pub fn compute_distance(&mut self, distance: f64, depth: f64) -> Vec<TravelTime> {
        self.ensure_depth(depth);
        let mut out: Vec<TravelTime> = (0..self.tables.len())
            .filter_map(|k| self.evaluate(k, distance))
            .filter(|tt| !tt.hole && (self.extrapolate || !tt.is_extrapolated()))
            .collect();
        sort_entries(&mut out);
        out
    }

    /// Travel times of all phases between a source and a receiver.
    ///
    /// `rcv_elev` is the receiver elevation in metres; it only affects the
    /// result when the elevation correction is enabled.
    pub fn compute(
        &mut self,
        src_lat: f64,
        src_lon: f64,
        src_depth: f64,
        rcv_lat: f64,
        rcv_lon: f64,
        rcv_elev: f64,
    ) -> Vec<TravelTime> {
        let (delta, _, _) = distaz(
            LatLon::new(src_lat, src_lon),
            LatLon::new(rcv_lat, rcv_lon),
        );
        let mut out = self.compute_distance(delta, src_depth);
        if self.elevation_correction && rcv_elev != 0.0 {
            for tt in &mut out {
                tt.time += elevation_correction(&tt.phase, rcv_elev);
            }
            sort_entries(&mut out);
        }
        out
    }

    /// Fastest phase between a source and a receiver.
    ///
    /// # Errors
    /// Returns [`LocError::NoPhaseAvailable`] if no phase is defined there.
    pub fn compute_first(
        &mut self,
        src_lat: f64,
        src_lon: f64,
        src_depth: f64,
        rcv_lat: f64,
        rcv_lon: f64,
        rcv_elev: f64,
    ) -> Result<TravelTime> {
        self.compute(src_lat, src_lon, src_depth, rcv_lat, rcv_lon, rcv_elev)
            .into_iter()
            .next()
            .ok_or(LocError::NoPhaseAvailable)
    }

    /// Travel time of one phase at a distance (degrees) and depth (km).
    ///
    /// Extrapolated values are returned with their flags set.
    ///
    /// # Errors
    /// Returns [`LocError::UnknownPhase`] if the phase has no table and
    /// [`LocError::InHole`] if the point is undefined.
    pub fn compute_phase(&mut self, phase: &str, distance: f64, depth: f64) -> Result<TravelTime> {
        let k = self
            .tables
            .iter()
            .position(|(p, _)| p == phase)
            .ok_or_else(|| LocError::UnknownPhase(phase.to_string()))?;
        self.ensure_depth(depth);
        match self.evaluate(k, distance) {
            Some(tt) if !tt.hole => Ok(tt),
            _ => Err(LocError::InHole {
                phase: phase.to_string(),
                distance,
                depth,
            }),
        }
    }
}

fn load_tables(directory: &Path, model: &str, phases: &[String]) -> Result<Vec<(String, GeoTable)>> {
    let mut tables: Vec<(String, GeoTable)> = Vec::new();
    for phase in phases {
        if tables.iter().any(|(p, _)| p == phase) {
            continue;
        }
        let path = directory.join(format!("{}.{}", model, phase));
        if !path.is_file() {
            warn!(path = %path.display(), "travel-time table not found, skipping phase");
            continue;
        }
        let table = GeoTable::read(&path)?;
        tables.push((phase.clone(), table));
    }
    if tables.is_empty() {
        return Err(LocError::ModelNotFound(model.to_string()));
    }
    info!(
        model,
        directory = %directory.display(),
        phases = tables.len(),
        "loaded travel-time tables"
    );
    Ok(tables)
}

fn sort_entries(entries: &mut [TravelTime]) {
    entries.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| a.phase.cmp(&b.phase))
    });
}

/// Correction for a receiver `elevation` metres above the datum.
fn elevation_correction(phase: &str, elevation: f64) -> f64 {
    let velocity = match phase.chars().rev().find(|c| "PpSs".contains(*c)) {
        Some('P') | Some('p') => SURFACE_VP,
        Some(_) => SURFACE_VS,
        None => return 0.0,
    };
    elevation / 1000.0 / velocity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_table(slope_x: f64, slope_z: f64) -> GeoTable {
        let x: Vec<f64> = (0..=20).map(|i| i as f64 * 5.0).collect();
        let y = vec![0.0, 15.0, 35.0, 100.0, 300.0];
        let mut values = Vec::new();
        for &z in &y {
            for &d in &x {
                values.push(slope_x * d + slope_z * z);
            }
        }
        GeoTable::new("n", x, y, values).unwrap()
    }

    fn holed_table() -> GeoTable {
        let x = vec![0.0, 50.0, 100.0];
        let y = vec![0.0, 100.0];
        let values = vec![
            1.0, HOLE, HOLE, //
            1.0, HOLE, HOLE,
        ];
        GeoTable::new("n", x, y, values).unwrap()
    }

    fn table_set() -> TravelTimeTable {
        TravelTimeTable::from_tables(
            "test",
            vec![
                ("S".to_string(), linear_table(18.0, 0.2)),
                ("P".to_string(), linear_table(10.0, 0.1)),
                ("PcP".to_string(), holed_table()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn compute_sorts_by_time() {
        let mut ttt = table_set();
        let out = ttt.compute(0.0, 0.0, 10.0, 0.0, 10.0, 0.0);
        let phases: Vec<&str> = out.iter().map(|t| t.phase.as_str()).collect();
        assert_eq!(phases, vec!["P", "S"]);
        assert!((out[0].time - 101.0).abs() < 1e-9);
        assert!((out[0].dtdd - 10.0).abs() < 1e-9);
        assert!((out[0].dtdh - 0.1).abs() < 1e-9);
    }

    #[test]
    fn ties_break_by_phase_code() {
        let mut ttt = TravelTimeTable::from_tables(
            "test",
            vec![
                ("Pn".to_string(), linear_table(10.0, 0.1)),
                ("Pb".to_string(), linear_table(10.0, 0.1)),
            ],
        )
        .unwrap();
        let out = ttt.compute_distance(20.0, 15.0);
        assert_eq!(out[0].phase, "Pb");
        assert_eq!(out[1].phase, "Pn");
    }

    #[test]
    fn holes_are_excluded() {
        let mut ttt = table_set();
        let out = ttt.compute_distance(70.0, 50.0);
        assert!(out.iter().all(|t| t.phase != "PcP"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn compute_first_without_phase() {
        let mut ttt =
            TravelTimeTable::from_tables("test", vec![("PcP".to_string(), holed_table())]).unwrap();
        let err = ttt.compute_first(0.0, 0.0, 10.0, 0.0, 60.0, 0.0).unwrap_err();
        assert!(matches!(err, LocError::NoPhaseAvailable));
    }

    #[test]
    fn extrapolated_entries_dropped_by_default() {
        let mut ttt = table_set();
        assert!(ttt.compute_distance(120.0, 10.0).is_empty());
        let mut ttt = table_set().with_extrapolation(true);
        let out = ttt.compute_distance(120.0, 10.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].distance_extrapolation, 1);
        assert_eq!(out[0].interp_error_code(), 13);
    }

    #[test]
    fn depth_cache_follows_depth() {
        let mut ttt = table_set();
        assert_eq!(ttt.cached_depth(), None);
        ttt.compute_distance(10.0, 33.0);
        assert_eq!(ttt.cached_depth(), Some(33.0));
        let first = ttt.compute_distance(12.0, 33.0);
        assert_eq!(ttt.cached_depth(), Some(33.0));
        ttt.compute_distance(12.0, 80.0);
        assert_eq!(ttt.cached_depth(), Some(80.0));
        let again = ttt.compute_distance(12.0, 33.0);
        assert_eq!(first, again);
    }

    #[test]
    fn compute_phase_errors() {
        let mut ttt = table_set();
        assert!(matches!(
            ttt.compute_phase("SKS", 50.0, 10.0),
            Err(LocError::UnknownPhase(_))
        ));
        assert!(matches!(
            ttt.compute_phase("PcP", 70.0, 10.0),
            Err(LocError::InHole { .. })
        ));
        let tt = ttt.compute_phase("S", 40.0, 0.0).unwrap();
        assert_eq!(tt.time, 720.0);
    }

    #[test]
    fn elevation_correction_uses_last_leg() {
        assert!((elevation_correction("P", 580.0) - 0.1).abs() < 1e-12);
        assert!((elevation_correction("ScS", 346.0) - 0.1).abs() < 1e-12);
        assert!((elevation_correction("sP", 580.0) - 0.1).abs() < 1e-12);
        assert_eq!(elevation_correction("Lg", 1000.0), 0.0);
    }

    #[test]
    fn elevation_correction_applied() {
        let mut ttt = table_set().with_elevation_correction(true);
        let out = ttt.compute(0.0, 0.0, 0.0, 0.0, 10.0, 1160.0);
        assert!((out[0].time - 100.2).abs() < 1e-9);
    }

    #[test]
    fn error_codes() {
        let mut tt = TravelTime {
            phase: "P".to_string(),
            time: 1.0,
            dtdd: 0.0,
            dtdh: 0.0,
            d2tdddh: 0.0,
            distance_extrapolation: -1,
            depth_extrapolation: 1,
            hole: false,
        };
        assert_eq!(tt.interp_error_code(), 18);
        tt.distance_extrapolation = 1;
        tt.depth_extrapolation = -1;
        assert_eq!(tt.interp_error_code(), 17);
        tt.depth_extrapolation = 0;
        assert_eq!(tt.interp_error_code(), 13);
        tt.hole = true;
        assert_eq!(tt.interp_error_code(), 11);
    }

    #[test]
    fn load_skips_missing_phases() {
        let dir = tempfile::tempdir().unwrap();
        linear_table(10.0, 0.1)
            .write(dir.path().join("iasp91.P"))
            .unwrap();
        let ttt = TravelTimeTable::load(dir.path(), "iasp91", &["P", "S"]).unwrap();
        assert_eq!(ttt.phases(), vec!["P"]);
        assert_eq!(ttt.model(), "iasp91");
    }

    #[test]
    fn load_without_tables_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = TravelTimeTable::load(dir.path(), "ak135", &DEFAULT_PHASES);
        assert!(matches!(result, Err(LocError::ModelNotFound(_))));
    }

    #[test]
    fn set_model_keeps_old_tables_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        linear_table(10.0, 0.1)
            .write(dir.path().join("iasp91.P"))
            .unwrap();
        let mut ttt = TravelTimeTable::load(dir.path(), "iasp91", &["P"]).unwrap();
        assert!(ttt.set_model("ak135").is_err());
        assert_eq!(ttt.model(), "iasp91");
        linear_table(9.0, 0.1)
            .write(dir.path().join("ak135.P"))
            .unwrap();
        ttt.set_model("ak135").unwrap();
        assert_eq!(ttt.compute_phase("P", 10.0, 0.0).unwrap().time, 90.0);
    }
}
