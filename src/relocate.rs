// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use tracing::{debug, info};

use crate::config::RelocateSettings;
use crate::error::{LocError, Result};
use crate::locator::{Capability, Locator};
use crate::model::{Arrival, Origin, Pick, PickCatalog};

/// Depth of the synthetic initial origin, km.
pub const DEFAULT_FALLBACK_DEPTH: f64 = 11.0;

/// Minimum arrival weight for a pick to take part in the fallback.
pub const DEFAULT_MIN_PICK_WEIGHT: f64 = 0.5;

/// Which components of a pick take part in a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickInclusion {
    /// Time, back-azimuth and slowness.
    All,
    /// Down-weighted arrival; only its time is used.
    Restricted,
}

impl PickInclusion {
    /// Classify a qualifying arrival weight. Full weight includes every
    /// component.
    pub fn from_weight(weight: f64) -> Self {
        if weight >= 1.0 {
            PickInclusion::All
        } else {
            PickInclusion::Restricted
        }
    }
}

/// A resolved pick of a weight-qualifying arrival.
#[derive(Debug, Clone, Copy)]
pub struct PickItem<'a> {
    /// The pick.
    pub pick: &'a Pick,
    /// Components of the pick included by its arrival weight.
    pub inclusion: PickInclusion,
}

/// Runs a locator and, if it fails, retries from the earliest station.
///
/// The first attempt relocates the origin as given. If that fails and the
/// locator accepts an initial location, a synthetic origin is placed at the
/// station of the earliest qualifying pick, at a shallow fixed depth and at
/// that pick's time, and the locator is run once more. If the retry fails too
/// the error of the first attempt is returned.
pub struct RelocateOrchestrator<'a, L: Locator + ?Sized> {
    locator: &'a mut L,
    catalog: &'a dyn PickCatalog,
    fallback_depth: f64,
    min_pick_weight: f64,
}

impl<'a, L: Locator + ?Sized> RelocateOrchestrator<'a, L> {
    /// Create an orchestrator with default settings.
    pub fn new(locator: &'a mut L, catalog: &'a dyn PickCatalog) -> Self {
        RelocateOrchestrator {
            locator,
            catalog,
            fallback_depth: DEFAULT_FALLBACK_DEPTH,
            min_pick_weight: DEFAULT_MIN_PICK_WEIGHT,
        }
    }

    /// Depth of the synthetic initial origin, km.
    pub fn with_fallback_depth(mut self, depth: f64) -> Self {
        self.fallback_depth = depth;
        self
    }

    /// Minimum arrival weight for the fallback.
    pub fn with_min_pick_weight(mut self, weight: f64) -> Self {
        self.min_pick_weight = weight;
        self
    }

    /// Apply settings from a configuration section.
    pub fn with_settings(self, settings: &RelocateSettings) -> Self {
        self.with_fallback_depth(settings.fallback_depth_km)
            .with_min_pick_weight(settings.min_pick_weight)
    }

    /// Relocate `origin`.
    ///
    /// # Errors
    /// Returns the locator's error if it does not support an initial
    /// location. Otherwise returns [`LocError::NoPicks`],
    /// [`LocError::PickNotFound`] or [`LocError::StationNotFound`] if the
    /// fallback origin cannot be built, and the first attempt's error if the
    /// retry fails.
    pub fn relocate(&mut self, origin: &Origin) -> Result<Origin> {
        let direct = match self.locator.relocate(origin, self.catalog) {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };
        debug!(locator = self.locator.name(), error = %direct, "direct relocation failed");

        if !self.locator.supports(Capability::InitialLocation) {
            return Err(direct);
        }

        let seeded = self.initial_origin(origin)?;
        info!(
            lat = seeded.latitude,
            lon = seeded.longitude,
            depth = self.fallback_depth,
            "retrying from earliest station"
        );
        match self.locator.relocate(&seeded, self.catalog) {
            Ok(result) => Ok(result),
            Err(retry) => {
                debug!(error = %retry, "relocation from initial location failed");
                Err(direct)
            }
        }
    }

    /// Resolve the picks of arrivals with weight at or above the threshold,
    /// sorted by time.
    pub fn qualifying_picks<'o>(&self, arrivals: &'o [Arrival]) -> Result<Vec<PickItem<'a>>> {
        let selected: Vec<&'o Arrival> = arrivals
            .iter()
            .filter(|a| a.weight_or_zero() >= self.min_pick_weight)
            .collect();
        if selected.is_empty() {
            return Err(LocError::NoPicks);
        }

        let mut items = Vec::with_capacity(selected.len());
        for arr in selected {
            let pick = self
                .catalog
                .pick(arr)
                .ok_or_else(|| LocError::PickNotFound(arr.pick_id.clone()))?;
            items.push(PickItem {
                pick,
                inclusion: PickInclusion::from_weight(arr.weight_or_zero()),
            });
        }
        items.sort_by(|a, b| a.pick.time.total_cmp(&b.pick.time));
        Ok(items)
    }

    /// Synthetic origin at the station of the earliest qualifying pick.
    pub fn initial_origin(&self, origin: &Origin) -> Result<Origin> {
        let items = self.qualifying_picks(&origin.arrivals)?;
        let anchor = items[0].pick;
        let loc = self
            .catalog
            .sensor_location(anchor)
            .ok_or_else(|| LocError::StationNotFound(anchor.waveform_id.station_id()))?;

        let mut seeded = origin.clone();
        seeded.latitude = loc.latitude;
        seeded.longitude = loc.longitude;
        seeded.depth = Some(self.fallback_depth);
        seeded.time = anchor.time;
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::locator::Capabilities;
    use crate::model::{MemoryCatalog, SensorLocation, WaveformId};

    /// Records every origin it is given; the first and later attempts fail
    /// as configured, otherwise the input is echoed back.
    struct Scripted {
        caps: Capabilities,
        fail_direct: bool,
        fail_retry: bool,
        calls: Vec<Origin>,
    }

    impl Scripted {
        fn new(caps: Capabilities, fail_direct: bool, fail_retry: bool) -> Self {
            Scripted {
                caps,
                fail_direct,
                fail_retry,
                calls: Vec::new(),
            }
        }
    }

    impl Locator for Scripted {
        fn name(&self) -> &str {
            "SCRIPTED"
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        fn relocate(&mut self, origin: &Origin, _catalog: &dyn PickCatalog) -> Result<Origin> {
            self.calls.push(origin.clone());
            let fail = if self.calls.len() == 1 {
                self.fail_direct
            } else {
                self.fail_retry
            };
            if fail {
                Err(LocError::Location(format!("attempt {} failed", self.calls.len())))
            } else {
                Ok(origin.clone())
            }
        }
    }

    /// Forwards to a catalog and counts every lookup.
    struct Counting {
        inner: MemoryCatalog,
        lookups: Cell<usize>,
    }

    impl Counting {
        fn new(inner: MemoryCatalog) -> Self {
            Counting {
                inner,
                lookups: Cell::new(0),
            }
        }
    }

    impl PickCatalog for Counting {
        fn pick(&self, arrival: &Arrival) -> Option<&Pick> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.pick(arrival)
        }

        fn sensor_location(&self, pick: &Pick) -> Option<&SensorLocation> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.sensor_location(pick)
        }
    }

    fn catalog() -> MemoryCatalog {
        let mut cat = MemoryCatalog::new();
        let mut late = Pick::new("late", 120.0, WaveformId::new("GE", "KBS"));
        late.phase_hint = Some("P".to_string());
        cat.add_pick(late);
        cat.add_pick(Pick::new("early", 100.0, WaveformId::new("GE", "APE")));
        cat.add_pick(Pick::new("weak", 90.0, WaveformId::new("GE", "MORC")));
        cat.add_station(
            "GE",
            "APE",
            "",
            SensorLocation {
                latitude: 37.07,
                longitude: 25.53,
                elevation: 620.0,
            },
        );
        cat.add_station(
            "GE",
            "KBS",
            "",
            SensorLocation {
                latitude: 78.92,
                longitude: 11.94,
                elevation: 46.0,
            },
        );
        cat
    }

    fn origin() -> Origin {
        let mut o = Origin::new(50.0, 0.0, 0.0, Some(33.0));
        o.arrivals = vec![
            Arrival::new("late", "P", Some(1.0)),
            Arrival::new("early", "P", Some(0.5)),
            Arrival::new("weak", "P", Some(0.2)),
        ];
        o
    }

    fn full_caps() -> Capabilities {
        Capability::InitialLocation | Capability::FixedDepth
    }

    #[test]
    fn direct_success_returns_immediately() {
        let cat = catalog();
        let mut loc = Scripted::new(full_caps(), false, false);
        let result = RelocateOrchestrator::new(&mut loc, &cat)
            .relocate(&origin())
            .unwrap();
        assert_eq!(result, origin());
        assert_eq!(loc.calls.len(), 1);
    }

    #[test]
    fn no_initial_location_support_returns_first_error() {
        let cat = Counting::new(catalog());
        let mut loc = Scripted::new(Capability::FixedDepth.into(), true, false);
        let err = RelocateOrchestrator::new(&mut loc, &cat)
            .relocate(&origin())
            .unwrap_err();
        assert_eq!(err.to_string(), "attempt 1 failed");
        assert_eq!(loc.calls.len(), 1);
        // the fallback never resolved a pick or a station
        assert_eq!(cat.lookups.get(), 0);
    }

    #[test]
    fn fallback_lookups_are_counted() {
        let cat = Counting::new(catalog());
        let mut loc = Scripted::new(full_caps(), true, false);
        RelocateOrchestrator::new(&mut loc, &cat)
            .relocate(&origin())
            .unwrap();
        // two qualifying picks and the anchor's station
        assert_eq!(cat.lookups.get(), 3);
    }

    #[test]
    fn fallback_seeds_at_earliest_station() {
        let cat = catalog();
        let mut loc = Scripted::new(full_caps(), true, false);
        let input = origin();
        let result = RelocateOrchestrator::new(&mut loc, &cat)
            .relocate(&input)
            .unwrap();
        assert_eq!(loc.calls.len(), 2);
        assert_eq!(result.latitude, 37.07);
        assert_eq!(result.longitude, 25.53);
        assert_eq!(result.depth, Some(11.0));
        assert_eq!(result.time, 100.0);
        assert_eq!(result.arrivals, input.arrivals);
        // input untouched
        assert_eq!(input, origin());
    }

    #[test]
    fn both_attempts_fail_surfaces_first_error() {
        let cat = catalog();
        let mut loc = Scripted::new(full_caps(), true, true);
        let err = RelocateOrchestrator::new(&mut loc, &cat)
            .relocate(&origin())
            .unwrap_err();
        assert_eq!(err.to_string(), "attempt 1 failed");
        assert_eq!(loc.calls.len(), 2);
    }

    #[test]
    fn no_qualifying_weights() {
        let cat = Counting::new(catalog());
        let mut o = origin();
        for a in &mut o.arrivals {
            a.weight = Some(0.49);
        }
        o.arrivals.push(Arrival::new("unset", "P", None));
        let mut loc = Scripted::new(full_caps(), true, false);
        let err = RelocateOrchestrator::new(&mut loc, &cat)
            .relocate(&o)
            .unwrap_err();
        assert!(matches!(err, LocError::NoPicks));
        assert_eq!(err.to_string(), "No picks given to relocate");
        assert_eq!(loc.calls.len(), 1);
        assert_eq!(cat.lookups.get(), 0);
    }

    #[test]
    fn picks_are_sorted_and_classified() {
        let cat = catalog();
        let mut loc = Scripted::new(full_caps(), true, false);
        let orch = RelocateOrchestrator::new(&mut loc, &cat);
        let items = orch.qualifying_picks(&origin().arrivals).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.pick.id.as_str()).collect();
        assert_eq!(ids, ["early", "late"]);
        assert_eq!(items[0].inclusion, PickInclusion::Restricted);
        assert_eq!(items[1].inclusion, PickInclusion::All);

        assert_eq!(PickInclusion::from_weight(0.5), PickInclusion::Restricted);
        assert_eq!(PickInclusion::from_weight(0.99), PickInclusion::Restricted);
        assert_eq!(PickInclusion::from_weight(1.0), PickInclusion::All);
    }

    #[test]
    fn missing_pick() {
        let cat = catalog();
        let mut o = origin();
        o.arrivals.push(Arrival::new("ghost", "S", Some(1.0)));
        let mut loc = Scripted::new(full_caps(), true, false);
        let err = RelocateOrchestrator::new(&mut loc, &cat)
            .relocate(&o)
            .unwrap_err();
        assert_eq!(err.to_string(), "pick 'ghost' not found");
    }

    #[test]
    fn missing_station() {
        let mut cat = catalog();
        cat.add_pick(Pick::new("first", 10.0, WaveformId::new("IU", "ANMO")));
        let mut o = origin();
        o.arrivals.push(Arrival::new("first", "P", Some(1.0)));
        let mut loc = Scripted::new(full_caps(), true, false);
        let err = RelocateOrchestrator::new(&mut loc, &cat)
            .relocate(&o)
            .unwrap_err();
        assert_eq!(err.to_string(), "station 'IU.ANMO' not found");
    }

    #[test]
    fn settings_are_applied() {
        let cat = catalog();
        let mut loc = Scripted::new(full_caps(), true, false);
        let settings = RelocateSettings {
            fallback_depth_km: 5.0,
            min_pick_weight: 0.1,
        };
        let result = RelocateOrchestrator::new(&mut loc, &cat)
            .with_settings(&settings)
            .relocate(&origin());
        // the weak pick now qualifies but its station is unknown
        assert!(matches!(result, Err(LocError::StationNotFound(_))));
    }

    #[test]
    fn works_with_trait_objects() {
        let cat = catalog();
        let mut boxed: Box<dyn Locator> = Box::new(Scripted::new(full_caps(), true, false));
        let result = RelocateOrchestrator::new(boxed.as_mut(), &cat)
            .relocate(&origin())
            .unwrap();
        assert_eq!(result.depth, Some(11.0));
    }
}
