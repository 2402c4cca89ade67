// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LocError, Result};
use crate::interp::holint2d;
use crate::model::{MemoryCatalog, Origin, Pick, Station};
use crate::table::{GeoTable, HOLE};

/// An origin together with the picks and stations it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBundle {
    /// Origin to relocate.
    pub origin: Origin,
    /// Picks referenced by the origin's arrivals.
    #[serde(default)]
    pub picks: Vec<Pick>,
    /// Stations of the picks.
    #[serde(default)]
    pub stations: Vec<Station>,
}

impl EventBundle {
    /// In-memory catalog of the bundle's picks and stations.
    pub fn catalog(&self) -> MemoryCatalog {
        MemoryCatalog::from_parts(self.picks.clone(), self.stations.clone())
    }
}

/// Load an event bundle from a JSON file.
pub fn load_event(path: &Path) -> Result<EventBundle> {
    let reader = BufReader::new(File::open(path)?);
    let bundle: EventBundle = serde_json::from_reader(reader)?;
    info!(
        path = %path.display(),
        arrivals = bundle.origin.arrivals.len(),
        picks = bundle.picks.len(),
        stations = bundle.stations.len(),
        "loaded event"
    );
    Ok(bundle)
}

/// Write an origin as pretty-printed JSON.
pub fn save_origin(origin: &Origin, path: &Path) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, origin)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

/// Sample a table on a regular grid.
///
/// The result has shape `[ys.len(), xs.len()]`. Cells that fall into a hole
/// hold [`HOLE`].
pub fn resample(table: &GeoTable, xs: &[f64], ys: &[f64]) -> Array2<f64> {
    Array2::from_shape_fn((ys.len(), xs.len()), |(j, i)| {
        let r = holint2d(table, HOLE, xs[i], ys[j]);
        if r.hole {
            HOLE
        } else {
            r.value
        }
    })
}

/// Save a 2-D array to a .npy file.
pub fn save_npy(data: &Array2<f64>, path: &Path) -> Result<()> {
    ndarray_npy::write_npy(path, data)
        .map_err(|e| LocError::Serialization(format!("npy write error: {}", e)))
}

/// Supported file formats for grid export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// ASCII travel-time table.
    Table,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("tbl") | Some("tab") => Ok(FileFormat::Table),
        Some(ext) => Err(LocError::UnsupportedFileFormat(ext.to_string())),
        None => Err(LocError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Resample `table` at distances `xs` and depths `ys` and save the result,
/// inferring the format from the extension.
pub fn export_grid(table: &GeoTable, xs: &[f64], ys: &[f64], path: &Path) -> Result<()> {
    let grid = resample(table, xs, ys);
    match infer_format(path)? {
        FileFormat::Npy => save_npy(&grid, path)?,
        FileFormat::Table => {
            let header = format!("{} (resampled)", table.header());
            let values = grid.iter().copied().collect();
            GeoTable::new(&header, xs.to_vec(), ys.to_vec(), values)?.write(path)?;
        }
    }
    info!(
        path = %path.display(),
        ndist = xs.len(),
        ndepth = ys.len(),
        "exported grid"
    );
    Ok(())
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + i as f64 * step).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Arrival, SensorLocation, WaveformId};
    use crate::model::PickCatalog;

    fn table() -> GeoTable {
        let x = vec![0.0, 10.0, 20.0, 30.0];
        let y = vec![0.0, 100.0];
        let values = vec![
            0.0, 10.0, HOLE, 30.0, //
            5.0, 15.0, HOLE, 35.0,
        ];
        GeoTable::new("synthetic", x, y, values).unwrap()
    }

    #[test]
    fn resample_keeps_nodes_and_holes() {
        let grid = resample(&table(), &[0.0, 10.0, 20.0], &[0.0, 100.0]);
        assert_eq!(grid.shape(), &[2, 3]);
        assert_eq!(grid[[0, 1]], 10.0);
        assert_eq!(grid[[1, 0]], 5.0);
        assert_eq!(grid[[0, 2]], HOLE);
    }

    #[test]
    fn npy_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.npy");
        let xs = linspace(0.0, 10.0, 3);
        export_grid(&table(), &xs, &[0.0, 50.0, 100.0], &path).unwrap();
        let loaded: Array2<f64> = ndarray_npy::read_npy(&path).unwrap();
        assert_eq!(loaded.shape(), &[3, 3]);
        assert_eq!(loaded[[0, 2]], 10.0);
        assert_eq!(loaded[[2, 0]], 5.0);
    }

    #[test]
    fn table_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.tbl");
        export_grid(&table(), &[0.0, 10.0], &[0.0, 100.0], &path).unwrap();
        let back = GeoTable::read(&path).unwrap();
        assert_eq!(back.x(), &[0.0, 10.0]);
        assert_eq!(back.value(1, 1), 15.0);
        assert!(back.header().starts_with("synthetic"));
    }

    #[test]
    fn unsupported_format() {
        let result = infer_format(Path::new("grid.mat"));
        assert!(matches!(result, Err(LocError::UnsupportedFileFormat(_))));
        assert!(infer_format(Path::new("grid")).is_err());
        assert_eq!(infer_format(Path::new("a.tab")).unwrap(), FileFormat::Table);
    }

    #[test]
    fn event_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        let json = r#"{
            "origin": {
                "time": 100.0, "latitude": 1.0, "longitude": 2.0, "depth": 10.0,
                "arrivals": [{"pick_id": "p1", "phase": "P", "weight": 1.0}]
            },
            "picks": [{
                "id": "p1", "time": 110.0,
                "waveform_id": {"network": "GE", "station": "APE"},
                "backazimuth": {"value": 45.0, "uncertainty": 5.0}
            }],
            "stations": [{"network": "GE", "station": "APE", "latitude": 37.07, "longitude": 25.53}]
        }"#;
        std::fs::write(&path, json).unwrap();
        let bundle = load_event(&path).unwrap();
        let cat = bundle.catalog();
        let pick = cat.pick(&Arrival::new("p1", "", None)).unwrap();
        assert_eq!(pick.backazimuth.unwrap().value, 45.0);
        assert_eq!(
            cat.sensor_location(pick),
            Some(&SensorLocation {
                latitude: 37.07,
                longitude: 25.53,
                elevation: 0.0
            })
        );
        assert_eq!(pick.waveform_id, WaveformId::new("GE", "APE"));

        let out = dir.path().join("origin.json");
        save_origin(&bundle.origin, &out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        let back: Origin = serde_json::from_str(&text).unwrap();
        assert_eq!(back, bundle.origin);
    }

    #[test]
    fn bad_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_event(&path), Err(LocError::Serialization(_))));
        assert!(matches!(
            load_event(&dir.path().join("missing.json")),
            Err(LocError::Io(_))
        ));
    }

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
