// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use crate::model::WaveformId;

/// Per-station, per-phase travel-time delays in seconds.
///
/// Read from `.stacor` files with lines of the form
/// `LOCDELAY <station> <phase> <nphases> <correction>`. The station column may
/// be a bare station code or a full `NET.STA[.LOC]` identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationCorrections {
    delays: HashMap<String, HashMap<String, f64>>,
}

impl StationCorrections {
    /// No corrections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read corrections from a file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&text))
    }

    /// Parse corrections. Invalid lines are skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let mut out = Self::new();
        let mut lines = 0;
        for (lc, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            lines += 1;
            let toks: Vec<&str> = line.split_whitespace().collect();
            if toks.len() != 5 {
                warn!(line = lc + 1, "invalid station correction: expected 5 columns");
                continue;
            }
            if toks[0] != "LOCDELAY" {
                warn!(line = lc + 1, "invalid station correction: expected LOCDELAY");
                continue;
            }
            if toks[3].parse::<i32>().is_err() {
                warn!(line = lc + 1, "invalid station correction: 4th column is not an integer");
                continue;
            }
            let Ok(correction) = toks[4].parse::<f64>() else {
                warn!(line = lc + 1, "invalid station correction: 5th column is not a number");
                continue;
            };
            out.insert(toks[1], toks[2], correction);
        }
        debug!(corrections = out.len(), lines, "loaded station corrections");
        out
    }

    /// Set the delay of `phase` at `station`.
    pub fn insert(&mut self, station: &str, phase: &str, correction: f64) {
        self.delays
            .entry(station.to_string())
            .or_default()
            .insert(phase.to_string(), correction);
    }

    /// Number of station/phase entries.
    pub fn len(&self) -> usize {
        self.delays.values().map(|m| m.len()).sum()
    }

    /// True if no correction is defined.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delay for `phase`, looked up by full station id first and then by
    /// station code. Zero if neither is known.
    pub fn lookup(&self, station_id: &str, station_code: &str, phase: &str) -> f64 {
        [station_id, station_code]
            .iter()
            .find_map(|key| self.delays.get(*key).and_then(|m| m.get(phase)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Delay for a pick's stream.
    pub fn for_stream(&self, wid: &WaveformId, phase: &str) -> f64 {
        self.lookup(&correction_id(wid), &wid.station, phase)
    }
}

/// `NET.STA`, with `.LOC` appended when the location code is set.
pub fn correction_id(wid: &WaveformId) -> String {
    if wid.location.is_empty() {
        wid.station_id()
    } else {
        wid.location_id()
    }
}
