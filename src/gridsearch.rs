// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Shrinking grid-search hypocenter solver.
//!
//! Every round evaluates an 11×11 latitude/longitude grid at up to three
//! depths around the current best point. For a trial hypocenter the origin
//! time is the weighted mean of the observed-minus-predicted arrival times,
//! and the misfit is the sum of squared normalised residuals of all defining
//! time, azimuth and slowness data. If the best point is the grid centre the
//! spacing is halved, otherwise the grid moves there at the same spacing.

use tracing::{debug, info, warn};

use crate::config::{LocatorConfig, SearchSettings};
use crate::error::{LocError, Result};
use crate::first_cut::{first_cut, StationObservation};
use crate::geo::{distaz, normalize_180, LatLon};
use crate::locator::{Capabilities, Capability, Locator};
use crate::model::{Arrival, Origin, PickCatalog};
use crate::quality::OriginQuality;
use crate::stacor::{correction_id, StationCorrections};
use crate::ttt::{TravelTime, TravelTimeTable};
use crate::validate::{Datum, DatumType, PickDataValidator};

/// Half-width of the search grid in nodes.
const HALF_GRID: i32 = 5;
/// Minimum number of defining data.
const MIN_DEFINING: usize = 3;
/// Misfit charged for a datum whose phase is undefined at a trial point.
const UNDEFINED_PENALTY: f64 = 100.0;
/// Depth used when the input origin has none, km.
const START_DEPTH: f64 = 10.0;
/// Arrivals in this distance range straddle the P to PKP transition.
const P_PKP_TRANSITION: (f64, f64) = (106.9, 111.1);
/// Arrivals at or above this weight enter the residual RMS.
const RMS_MIN_WEIGHT: f64 = 0.5;
/// Hypocenter parameters taken off the degrees of freedom of the RMS.
const FREE_PARAMETERS: usize = 4;

#[derive(Debug, Clone)]
struct Site {
    id: String,
    position: LatLon,
    elevation: f64,
}

#[derive(Debug, Clone)]
struct Observation {
    arrival: usize,
    site: usize,
    phase: String,
    kind: DatumType,
    value: f64,
    sigma: f64,
    defining: bool,
}

#[derive(Debug, Default)]
struct EventData {
    sites: Vec<Site>,
    observations: Vec<Observation>,
}

impl EventData {
    fn site_index(&mut self, id: String, position: LatLon, elevation: f64) -> usize {
        if let Some(k) = self.sites.iter().position(|s| s.id == id) {
            return k;
        }
        self.sites.push(Site {
            id,
            position,
            elevation,
        });
        self.sites.len() - 1
    }

    fn defining(&self) -> usize {
        self.observations.iter().filter(|o| o.defining).count()
    }

    /// Per-station summary for the first-cut estimator.
    fn first_cut_input(&self) -> Vec<StationObservation> {
        let mut out: Vec<StationObservation> = self
            .sites
            .iter()
            .map(|s| StationObservation::new(&s.id, s.position))
            .collect();
        for o in self.observations.iter().filter(|o| o.defining) {
            let entry = &mut out[o.site];
            match o.kind {
                DatumType::Time if is_p_type(&o.phase) => {
                    entry.p_time = Some(entry.p_time.map_or(o.value, |t: f64| t.min(o.value)));
                }
                DatumType::Time if is_s_type(&o.phase) => {
                    entry.s_time = Some(entry.s_time.map_or(o.value, |t: f64| t.min(o.value)));
                }
                DatumType::Azimuth if entry.azimuth.map_or(true, |(_, sd)| o.sigma < sd) => {
                    entry.azimuth = Some((o.value, o.sigma));
                }
                DatumType::Slowness if entry.slowness.map_or(true, |(_, sd)| o.sigma < sd) => {
                    entry.slowness = Some((o.value, o.sigma));
                }
                _ => {}
            }
        }
        out
    }
}

fn is_p_type(phase: &str) -> bool {
    matches!(phase, "P" | "Pn" | "Pg" | "Pb" | "P1")
}

fn is_s_type(phase: &str) -> bool {
    matches!(phase, "S" | "Sn" | "Sb" | "Sg" | "Lg")
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Hypocenter {
    lat: f64,
    lon: f64,
    depth: f64,
}

#[derive(Debug, Clone, Copy)]
struct Trial {
    hypo: Hypocenter,
    time: f64,
    misfit: f64,
    undefined: usize,
}

/// Grid-search locator over a [`TravelTimeTable`].
pub struct GridSearchLocator {
    ttt: TravelTimeTable,
    corrections: StationCorrections,
    settings: SearchSettings,
}

impl GridSearchLocator {
    /// Registry name.
    pub const NAME: &'static str = "GRIDSEARCH";

    /// Locator over `ttt` with default settings and no station corrections.
    pub fn new(ttt: TravelTimeTable) -> Self {
        GridSearchLocator {
            ttt,
            corrections: StationCorrections::new(),
            settings: SearchSettings::default(),
        }
    }

    /// Load tables and station corrections of the default profile.
    ///
    /// Corrections are read from `<directory>/<model>.stacor` if that file
    /// exists.
    pub fn from_config(config: &LocatorConfig) -> Result<Self> {
        let (directory, model) = config.profile(None)?;
        let ttt = TravelTimeTable::load(&directory, &model, &config.tables.phases)?
            .with_extrapolation(config.tables.extrapolate)
            .with_elevation_correction(config.tables.elevation_correction);
        let stacor = directory.join(format!("{}.stacor", model));
        let corrections = if stacor.is_file() {
            StationCorrections::read(&stacor)?
        } else {
            StationCorrections::new()
        };
        Ok(Self::new(ttt)
            .with_corrections(corrections)
            .with_settings(config.search.clone()))
    }

    /// Replace the solver settings.
    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the station corrections.
    pub fn with_corrections(mut self, corrections: StationCorrections) -> Self {
        self.corrections = corrections;
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Mutable settings, e.g. to fix the depth for one call.
    pub fn settings_mut(&mut self) -> &mut SearchSettings {
        &mut self.settings
    }

    /// Switch to another earth model.
    pub fn set_profile(&mut self, model: &str) -> Result<()> {
        self.ttt.set_model(model)
    }

    /// Turn the origin's arrivals into observations.
    ///
    /// `time_error` replaces the uncertainty of every arrival time.
    fn collect(
        &self,
        origin: &Origin,
        catalog: &dyn PickCatalog,
        time_error: Option<f64>,
    ) -> Result<EventData> {
        let s = &self.settings;
        let reference = LatLon::new(origin.latitude, origin.longitude);
        let has_reference = reference.lat.is_finite() && reference.lon.is_finite();
        let mut data = EventData::default();

        for (i, arr) in origin.arrivals.iter().enumerate() {
            let pick = catalog
                .pick(arr)
                .ok_or_else(|| LocError::PickNotFound(arr.pick_id.clone()))?;
            let loc = catalog
                .sensor_location(pick)
                .ok_or_else(|| LocError::StationNotFound(pick.waveform_id.station_id()))?;
            let position = LatLon::new(loc.latitude, loc.longitude);
            let distance = arr.distance.or_else(|| {
                has_reference.then(|| distaz(reference, position).0)
            });
            let travel_time = pick.time - origin.time;

            let mut defining = arr.weight_or_zero() > s.min_arrival_weight;
            if let Some(d) = distance {
                if d > P_PKP_TRANSITION.0 && d < P_PKP_TRANSITION.1 {
                    defining = false;
                }
                if s.distance_cutoff_deg.map_or(false, |cut| d > cut) {
                    defining = false;
                }
            }

            let mut phase = if !arr.phase.is_empty() {
                arr.phase.clone()
            } else {
                pick.phase_hint.clone().unwrap_or_else(|| "P".to_string())
            };
            if (phase == "P" || phase == "P1")
                && distance.map_or(false, |d| d > 110.0)
                && travel_time > 1000.0
            {
                debug!(pick = %pick.id, "renaming late P to PKP");
                phase = "PKP".to_string();
            }

            let id = correction_id(&pick.waveform_id);
            let cor = self.corrections.for_stream(&pick.waveform_id, &phase);
            let site = data.site_index(id, position, loc.elevation);

            data.observations.push(Observation {
                arrival: i,
                site,
                phase: phase.clone(),
                kind: DatumType::Time,
                value: travel_time - cor,
                sigma: time_error
                    .or(pick.time_uncertainty)
                    .unwrap_or(s.default_time_error),
                defining,
            });
            if let Some(baz) = pick.backazimuth {
                data.observations.push(Observation {
                    arrival: i,
                    site,
                    phase: phase.clone(),
                    kind: DatumType::Azimuth,
                    value: baz.value,
                    sigma: baz.uncertainty.unwrap_or(s.default_azimuth_error),
                    defining,
                });
            }
            if let Some(slow) = pick.horizontal_slowness {
                data.observations.push(Observation {
                    arrival: i,
                    site,
                    phase,
                    kind: DatumType::Slowness,
                    value: slow.value,
                    sigma: slow.uncertainty.unwrap_or(s.default_slowness_error),
                    defining,
                });
            }
        }

        self.check(&mut data)?;
        Ok(data)
    }

    /// Drop the defining flag of every datum the validator does not accept.
    fn check(&self, data: &mut EventData) -> Result<()> {
        let stations: Vec<&str> = data.sites.iter().map(|s| s.id.as_str()).collect();
        let validator = PickDataValidator::new(&stations, &self.ttt.phases());
        let datums: Vec<Datum> = data
            .observations
            .iter()
            .map(|o| Datum::new(&data.sites[o.site].id, &o.phase, o.kind, o.sigma))
            .collect();
        let report = validator.report(&datums);
        for (o, c) in data.observations.iter_mut().zip(&report.checks) {
            if !c.is_defining() {
                if o.defining {
                    debug!(phase = %o.phase, kind = %o.kind, code = c.error.code(), "datum not used");
                }
                o.defining = false;
            }
        }
        report.ensure_usable()
    }

    fn predict(&mut self, o: &Observation, site: &Site, hypo: Hypocenter) -> Option<f64> {
        let (delta, _, baz) = distaz(LatLon::new(hypo.lat, hypo.lon), site.position);
        match o.kind {
            DatumType::Azimuth => Some(baz),
            DatumType::Time | DatumType::Slowness => {
                let tt = self.ttt.compute_phase(&o.phase, delta, hypo.depth).ok()?;
                if tt.is_extrapolated() {
                    return None;
                }
                Some(if o.kind == DatumType::Time {
                    tt.time
                } else {
                    tt.dtdd
                })
            }
            DatumType::Unknown => None,
        }
    }

    fn evaluate(&mut self, data: &EventData, hypo: Hypocenter) -> Trial {
        let predictions: Vec<Option<f64>> = data
            .observations
            .iter()
            .map(|o| {
                if o.defining {
                    self.predict(o, &data.sites[o.site], hypo)
                } else {
                    None
                }
            })
            .collect();

        let (mut sum_w, mut sum_wt) = (0.0, 0.0);
        for (o, p) in data.observations.iter().zip(&predictions) {
            if let (DatumType::Time, Some(tt)) = (o.kind, p) {
                let w = 1.0 / (o.sigma * o.sigma);
                sum_w += w;
                sum_wt += w * (o.value - tt);
            }
        }
        let time = if sum_w > 0.0 { sum_wt / sum_w } else { 0.0 };

        let mut misfit = 0.0;
        let mut undefined = 0;
        for (o, p) in data.observations.iter().zip(&predictions) {
            if !o.defining {
                continue;
            }
            match p {
                None => {
                    misfit += UNDEFINED_PENALTY;
                    undefined += 1;
                }
                Some(pred) => {
                    let r = residual(o, time, *pred) / o.sigma;
                    misfit += r * r;
                }
            }
        }
        Trial {
            hypo,
            time,
            misfit,
            undefined,
        }
    }

    fn depths(&self, center: f64, step: f64) -> Vec<f64> {
        if let Some(z) = self.settings.fixed_depth_km {
            return vec![z];
        }
        let mut out: Vec<f64> = [center - step, center, center + step]
            .iter()
            .map(|z| z.clamp(0.0, self.settings.max_depth_km))
            .collect();
        out.dedup();
        out
    }

    fn search(&mut self, data: &EventData, start: Hypocenter) -> Result<Trial> {
        let mut best = self.evaluate(data, start);
        let mut step = self.settings.initial_step_deg;
        let mut dz = self.settings.initial_depth_step_km;

        for iteration in 1..=self.settings.max_iterations {
            let center = best;
            let lon_scale = center.hypo.lat.to_radians().cos().max(0.1);
            for depth in self.depths(center.hypo.depth, dz) {
                for i in -HALF_GRID..=HALF_GRID {
                    let lat = (center.hypo.lat + i as f64 * step).clamp(-90.0, 90.0);
                    for j in -HALF_GRID..=HALF_GRID {
                        let lon = normalize_180(center.hypo.lon + j as f64 * step / lon_scale);
                        let trial = self.evaluate(data, Hypocenter { lat, lon, depth });
                        if trial.misfit < best.misfit {
                            best = trial;
                        }
                    }
                }
            }

            if best.hypo == center.hypo {
                step *= 0.5;
                dz *= 0.5;
            }
            debug!(
                iteration,
                lat = best.hypo.lat,
                lon = best.hypo.lon,
                depth = best.hypo.depth,
                misfit = best.misfit,
                step,
                "grid round"
            );
            if step < self.settings.tolerance_deg {
                return Ok(best);
            }
        }
        Err(LocError::Location(
            "maximum number of iterations exhausted".to_string(),
        ))
    }

    fn start(&self, origin: &Origin, data: &EventData) -> Result<Hypocenter> {
        let depth = self
            .settings
            .fixed_depth_km
            .or(origin.depth)
            .filter(|z| z.is_finite())
            .unwrap_or(START_DEPTH);
        let given = origin.latitude.is_finite()
            && origin.longitude.is_finite()
            && origin.latitude.abs() <= 90.0;
        if given && !self.settings.ignore_initial_location {
            return Ok(Hypocenter {
                lat: origin.latitude,
                lon: origin.longitude,
                depth,
            });
        }
        let cut = first_cut(&data.first_cut_input())
            .ok_or_else(|| LocError::Location("no first-cut location".to_string()))?;
        debug!(lat = cut.lat, lon = cut.lon, method = ?cut.method, "starting from first cut");
        Ok(Hypocenter {
            lat: cut.lat,
            lon: cut.lon,
            depth,
        })
    }

    /// Residual, distance and azimuth of every arrival at the solution.
    fn annotate(&mut self, origin: &Origin, data: &EventData, best: &Trial) -> Vec<Arrival> {
        let source = LatLon::new(best.hypo.lat, best.hypo.lon);
        let mut arrivals = origin.arrivals.clone();
        for o in data.observations.iter().filter(|o| o.kind == DatumType::Time) {
            let site = &data.sites[o.site];
            let (delta, az, _) = distaz(source, site.position);
            let predicted = match self.ttt.compute_phase(&o.phase, delta, best.hypo.depth) {
                Ok(tt) => Some(tt),
                Err(_) => self.first_arrival(source, best.hypo.depth, site),
            };
            let arr = &mut arrivals[o.arrival];
            arr.phase = o.phase.clone();
            arr.distance = Some(delta);
            arr.azimuth = Some(az);
            arr.time_residual = predicted.map(|tt| o.value - best.time - tt.time);
            arr.weight = Some(if o.defining { 1.0 } else { 0.0 });
        }
        arrivals
    }

    /// One location pass.
    fn locate(
        &mut self,
        origin: &Origin,
        catalog: &dyn PickCatalog,
        time_error: Option<f64>,
    ) -> Result<Origin> {
        let data = self.collect(origin, catalog, time_error)?;
        let defining = data.defining();
        if defining < MIN_DEFINING {
            warn!(defining, "cannot relocate");
            return Err(LocError::Location("too few usable data".to_string()));
        }

        let start = self.start(origin, &data)?;
        let best = self.search(&data, start)?;
        if defining - best.undefined < MIN_DEFINING {
            warn!(undefined = best.undefined, "solution outside the tables");
            return Err(LocError::Location(
                "solution outside the travel-time tables".to_string(),
            ));
        }

        let mut result = origin.clone();
        result.latitude = best.hypo.lat;
        result.longitude = best.hypo.lon;
        result.depth = Some(best.hypo.depth);
        result.time = origin.time + best.time;
        result.arrivals = self.annotate(origin, &data, &best);
        result.method_id = Some(Self::NAME.to_string());
        result.earth_model_id = Some(self.ttt.model().to_string());
        result.quality = Some(OriginQuality::from_arrivals(&result.arrivals, catalog));

        info!(
            lat = result.latitude,
            lon = result.longitude,
            depth = best.hypo.depth,
            misfit = best.misfit,
            defining,
            "relocated"
        );
        Ok(result)
    }

    fn first_arrival(&mut self, source: LatLon, depth: f64, site: &Site) -> Option<TravelTime> {
        self.ttt
            .compute_first(
                source.lat,
                source.lon,
                depth,
                site.position.lat,
                site.position.lon,
                site.elevation,
            )
            .ok()
    }
}

/// Arrival-time error implied by the time residuals of a solution.
///
/// The squared residuals of arrivals with weight of at least 0.5 are summed
/// and divided by their count less four. With four or fewer such arrivals, or
/// when the residuals vanish, `fallback` is returned.
pub fn arrival_rms_time_error(arrivals: &[Arrival], fallback: f64) -> f64 {
    let residuals: Vec<f64> = arrivals
        .iter()
        .filter(|a| a.weight_or_zero() >= RMS_MIN_WEIGHT)
        .map(|a| a.time_residual.unwrap_or(0.0))
        .collect();
    if residuals.len() <= FREE_PARAMETERS {
        return fallback;
    }
    let sum: f64 = residuals.iter().map(|r| r * r).sum();
    let error = (sum / (residuals.len() - FREE_PARAMETERS) as f64).sqrt();
    if error.is_finite() && error > 0.0 {
        error
    } else {
        fallback
    }
}

fn residual(o: &Observation, time: f64, predicted: f64) -> f64 {
    match o.kind {
        DatumType::Time => o.value - time - predicted,
        DatumType::Azimuth => normalize_180(o.value - predicted),
        _ => o.value - predicted,
    }
}

impl Locator for GridSearchLocator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capability::InitialLocation
            | Capability::FixedDepth
            | Capability::IgnoreInitialLocation
            | Capability::DistanceCutOff
    }

    fn relocate(&mut self, origin: &Origin, catalog: &dyn PickCatalog) -> Result<Origin> {
        let first = self.locate(origin, catalog, None)?;
        if !self.settings.use_arrival_rms_as_time_error {
            return Ok(first);
        }
        let time_error = arrival_rms_time_error(&first.arrivals, self.settings.default_time_error);
        debug!(time_error, "relocating with residual RMS as time error");
        self.locate(&first, catalog, Some(time_error))
    }
}
