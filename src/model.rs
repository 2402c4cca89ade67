// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::quality::OriginQuality;

/// Stream identifier of a pick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveformId {
    /// Network code.
    pub network: String,
    /// Station code.
    pub station: String,
    /// Location code, often empty.
    #[serde(default)]
    pub location: String,
    /// Channel code.
    #[serde(default)]
    pub channel: String,
}

impl WaveformId {
    /// Create an identifier without location and channel.
    pub fn new(network: &str, station: &str) -> Self {
        WaveformId {
            network: network.to_string(),
            station: station.to_string(),
            ..Default::default()
        }
    }

    /// `NET.STA`
    pub fn station_id(&self) -> String {
        format!("{}.{}", self.network, self.station)
    }

    /// `NET.STA.LOC`
    pub fn location_id(&self) -> String {
        format!("{}.{}.{}", self.network, self.station, self.location)
    }
}

/// A value with an optional standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Value.
    pub value: f64,
    /// Standard deviation.
    #[serde(default)]
    pub uncertainty: Option<f64>,
}

/// A phase onset measured on one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    /// Unique identifier.
    pub id: String,
    /// Onset time in seconds since the epoch.
    pub time: f64,
    /// Standard deviation of the onset time.
    #[serde(default)]
    pub time_uncertainty: Option<f64>,
    /// Stream the pick was made on.
    pub waveform_id: WaveformId,
    /// Phase the picker assigned.
    #[serde(default)]
    pub phase_hint: Option<String>,
    /// Back-azimuth in degrees.
    #[serde(default)]
    pub backazimuth: Option<Measurement>,
    /// Horizontal slowness in s/deg.
    #[serde(default)]
    pub horizontal_slowness: Option<Measurement>,
}

impl Pick {
    /// Pick without optional attributes.
    pub fn new(id: &str, time: f64, waveform_id: WaveformId) -> Self {
        Pick {
            id: id.to_string(),
            time,
            time_uncertainty: None,
            waveform_id,
            phase_hint: None,
            backazimuth: None,
            horizontal_slowness: None,
        }
    }
}

/// Association of a pick with an origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    /// Identifier of the associated pick.
    pub pick_id: String,
    /// Phase label. Empty means "take the pick's hint".
    #[serde(default)]
    pub phase: String,
    /// Inclusion weight. Unset weights count as zero.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Epicentral distance in degrees.
    #[serde(default)]
    pub distance: Option<f64>,
    /// Source-to-station azimuth in degrees.
    #[serde(default)]
    pub azimuth: Option<f64>,
    /// Observed minus predicted time, seconds.
    #[serde(default)]
    pub time_residual: Option<f64>,
}

impl Arrival {
    /// Arrival with a phase label and weight.
    pub fn new(pick_id: &str, phase: &str, weight: Option<f64>) -> Self {
        Arrival {
            pick_id: pick_id.to_string(),
            phase: phase.to_string(),
            weight,
            distance: None,
            azimuth: None,
            time_residual: None,
        }
    }

    /// Weight with unset treated as zero.
    pub fn weight_or_zero(&self) -> f64 {
        self.weight.unwrap_or(0.0)
    }
}

/// Hypocenter with its associated arrivals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    /// Identifier.
    #[serde(default)]
    pub id: String,
    /// Origin time in seconds since the epoch.
    pub time: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Depth in km.
    #[serde(default)]
    pub depth: Option<f64>,
    /// Associated arrivals.
    #[serde(default)]
    pub arrivals: Vec<Arrival>,
    /// Method that produced the origin.
    #[serde(default)]
    pub method_id: Option<String>,
    /// Earth model used.
    #[serde(default)]
    pub earth_model_id: Option<String>,
    /// Solution statistics.
    #[serde(default)]
    pub quality: Option<OriginQuality>,
}

impl Origin {
    /// Origin at a point without arrivals.
    pub fn new(time: f64, latitude: f64, longitude: f64, depth: Option<f64>) -> Self {
        Origin {
            id: String::new(),
            time,
            latitude,
            longitude,
            depth,
            arrivals: Vec::new(),
            method_id: None,
            earth_model_id: None,
            quality: None,
        }
    }
}

/// Geographic position of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorLocation {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Elevation in metres.
    #[serde(default)]
    pub elevation: f64,
}

/// Station entry of an event bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Network code.
    pub network: String,
    /// Station code.
    pub station: String,
    /// Location code.
    #[serde(default)]
    pub location: String,
    /// Sensor position.
    #[serde(flatten)]
    pub position: SensorLocation,
}

/// Lookup of picks and sensor locations referenced by an origin.
pub trait PickCatalog {
    /// Pick referenced by `arrival`.
    fn pick(&self, arrival: &Arrival) -> Option<&Pick>;

    /// Location of the sensor that recorded `pick`.
    fn sensor_location(&self, pick: &Pick) -> Option<&SensorLocation>;
}

/// In-memory [`PickCatalog`].
///
/// Sensor locations are keyed by `NET.STA.LOC`; a lookup falls back to
/// `NET.STA` if no entry with the pick's location code exists.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    picks: HashMap<String, Pick>,
    locations: HashMap<String, SensorLocation>,
}

impl MemoryCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the given picks and stations.
    pub fn from_parts(picks: Vec<Pick>, stations: Vec<Station>) -> Self {
        let mut catalog = Self::new();
        for pick in picks {
            catalog.add_pick(pick);
        }
        for s in stations {
            catalog.add_station(&s.network, &s.station, &s.location, s.position);
        }
        catalog
    }

    /// Add or replace a pick.
    pub fn add_pick(&mut self, pick: Pick) {
        self.picks.insert(pick.id.clone(), pick);
    }

    /// Add or replace a sensor location.
    pub fn add_station(&mut self, network: &str, station: &str, location: &str, pos: SensorLocation) {
        let sta = format!("{}.{}", network, station);
        self.locations.entry(sta.clone()).or_insert(pos);
        self.locations.insert(format!("{}.{}", sta, location), pos);
    }

    /// Number of picks.
    pub fn num_picks(&self) -> usize {
        self.picks.len()
    }
}

impl PickCatalog for MemoryCatalog {
    fn pick(&self, arrival: &Arrival) -> Option<&Pick> {
        self.picks.get(&arrival.pick_id)
    }

    fn sensor_location(&self, pick: &Pick) -> Option<&SensorLocation> {
        let wid = &pick.waveform_id;
        self.locations
            .get(&wid.location_id())
            .or_else(|| self.locations.get(&wid.station_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_fallback() {
        let mut cat = MemoryCatalog::new();
        let pos = SensorLocation {
            latitude: 1.0,
            longitude: 2.0,
            elevation: 300.0,
        };
        cat.add_station("GE", "APE", "", pos);
        let mut wid = WaveformId::new("GE", "APE");
        wid.location = "00".to_string();
        let pick = Pick::new("p1", 10.0, wid);
        assert_eq!(cat.sensor_location(&pick), Some(&pos));
    }

    #[test]
    fn location_code_preferred() {
        let mut cat = MemoryCatalog::new();
        let a = SensorLocation {
            latitude: 1.0,
            longitude: 2.0,
            elevation: 0.0,
        };
        let b = SensorLocation {
            latitude: 1.5,
            longitude: 2.5,
            elevation: 0.0,
        };
        cat.add_station("GE", "APE", "", a);
        cat.add_station("GE", "APE", "10", b);
        let mut wid = WaveformId::new("GE", "APE");
        wid.location = "10".to_string();
        let pick = Pick::new("p1", 10.0, wid);
        assert_eq!(cat.sensor_location(&pick), Some(&b));
    }

    #[test]
    fn pick_lookup() {
        let cat = MemoryCatalog::from_parts(
            vec![Pick::new("p1", 10.0, WaveformId::new("GE", "APE"))],
            Vec::new(),
        );
        assert!(cat.pick(&Arrival::new("p1", "P", Some(1.0))).is_some());
        assert!(cat.pick(&Arrival::new("p2", "P", Some(1.0))).is_none());
        assert_eq!(cat.num_picks(), 1);
    }

    #[test]
    fn origin_json() {
        let json = r#"{
            "time": 1000.5,
            "latitude": 10.0,
            "longitude": 20.0,
            "arrivals": [{"pick_id": "p1", "phase": "P", "weight": 1.0}]
        }"#;
        let origin: Origin = serde_json::from_str(json).unwrap();
        assert_eq!(origin.depth, None);
        assert_eq!(origin.arrivals[0].weight, Some(1.0));
        assert_eq!(origin.arrivals[0].distance, None);
    }

    #[test]
    fn station_json_is_flat() {
        let json = r#"{"network": "GE", "station": "APE", "latitude": 37.07, "longitude": 25.53, "elevation": 620.0}"#;
        let s: Station = serde_json::from_str(json).unwrap();
        assert_eq!(s.position.elevation, 620.0);
        assert_eq!(s.location, "");
    }
}
