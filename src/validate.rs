// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

use crate::error::{LocError, Result};

/// Significant width of a phase code. Longer codes are compared on this prefix.
pub const PHASE_CODE_LEN: usize = 8;

/// Kind of observation a datum carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatumType {
    /// Arrival time.
    Time,
    /// Back-azimuth at the station.
    Azimuth,
    /// Horizontal slowness.
    Slowness,
    /// Anything else.
    Unknown,
}

impl DatumType {
    /// Parse a type code such as `t`, `a` or `s`.
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "t" | "time" => DatumType::Time,
            "a" | "az" | "azim" | "azimuth" => DatumType::Azimuth,
            "s" | "slow" | "slowness" => DatumType::Slowness,
            _ => DatumType::Unknown,
        }
    }

    /// Single-letter code.
    pub fn code(self) -> char {
        match self {
            DatumType::Time => 't',
            DatumType::Azimuth => 'a',
            DatumType::Slowness => 's',
            DatumType::Unknown => '?',
        }
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Outcome of checking one datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatumError {
    /// Usable.
    Ok,
    /// Station is not in the station list.
    StationUnknown,
    /// Time datum whose phase has no table; kept as a travel-time datum but
    /// flagged for exclusion.
    PhaseUnknownButUsable,
    /// Azimuth or slowness datum with an unknown phase.
    PhaseUnknown,
    /// The datum type is not recognised.
    DataTypeUnknown,
    /// Uncertainty is zero, negative, or not a number.
    BadUncertainty,
}

impl DatumError {
    /// Numeric code; values `<= 0` mean the datum can still be used.
    pub fn code(self) -> i32 {
        match self {
            DatumError::Ok => 0,
            DatumError::StationUnknown => 1,
            DatumError::PhaseUnknownButUsable => -2,
            DatumError::PhaseUnknown => 2,
            DatumError::DataTypeUnknown => 3,
            DatumError::BadUncertainty => 4,
        }
    }
}

/// One raw observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    /// Station code.
    pub station: String,
    /// Phase code.
    pub phase: String,
    /// Observation type.
    pub kind: DatumType,
    /// Standard deviation of the observation.
    pub uncertainty: f64,
}

impl Datum {
    /// Create a datum.
    pub fn new(station: &str, phase: &str, kind: DatumType, uncertainty: f64) -> Self {
        Datum {
            station: station.to_string(),
            phase: phase.to_string(),
            kind,
            uncertainty,
        }
    }
}

/// Classification of one datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatumCheck {
    /// Index into the station list, if the station is known.
    pub station: Option<usize>,
    /// Index into the phase list, if the phase is known.
    pub phase: Option<usize>,
    /// Datum type.
    pub kind: DatumType,
    /// Outcome.
    pub error: DatumError,
}

impl DatumCheck {
    /// True if the datum may enter an inversion.
    pub fn is_usable(&self) -> bool {
        self.error.code() <= 0
    }

    /// True if the datum is used with a known phase and station.
    pub fn is_defining(&self) -> bool {
        self.error == DatumError::Ok
    }
}

/// Checks observations against known stations and phases.
#[derive(Debug, Clone)]
pub struct PickDataValidator {
    stations: Vec<String>,
    phases: Vec<String>,
}

impl PickDataValidator {
    /// Create a validator from the known station and phase codes.
    pub fn new<S: AsRef<str>, P: AsRef<str>>(stations: &[S], phases: &[P]) -> Self {
        PickDataValidator {
            stations: stations.iter().map(|s| s.as_ref().to_string()).collect(),
            phases: phases.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }

    /// Index of `station` in the station list. Exact match only.
    pub fn find_station(&self, station: &str) -> Option<usize> {
        self.stations.iter().position(|s| s == station)
    }

    /// Index of the first known phase matching `phase`.
    pub fn find_phase(&self, phase: &str) -> Option<usize> {
        self.phases.iter().position(|p| phase_matches(phase, p))
    }

    /// Classify a single datum.
    pub fn check(&self, datum: &Datum) -> DatumCheck {
        let station = self.find_station(&datum.station);
        let phase = station.and_then(|_| self.find_phase(&datum.phase));

        let mut error = match (station, phase, datum.kind) {
            (None, _, _) => DatumError::StationUnknown,
            (Some(_), _, DatumType::Unknown) => DatumError::DataTypeUnknown,
            (Some(_), None, DatumType::Time) => DatumError::PhaseUnknownButUsable,
            (Some(_), None, _) => DatumError::PhaseUnknown,
            (Some(_), Some(_), _) => DatumError::Ok,
        };
        if datum.uncertainty.is_nan() || datum.uncertainty <= 0.0 {
            error = DatumError::BadUncertainty;
        }

        DatumCheck {
            station,
            phase,
            kind: datum.kind,
            error,
        }
    }

    /// Classify every datum, preserving order.
    pub fn validate(&self, data: &[Datum]) -> Vec<DatumCheck> {
        data.iter().map(|d| self.check(d)).collect()
    }

    /// Classify every datum and summarise the outcome.
    pub fn report(&self, data: &[Datum]) -> ValidationReport {
        ValidationReport {
            checks: self.validate(data),
        }
    }
}

/// Compare two phase codes, ignoring padding and anything past
/// [`PHASE_CODE_LEN`] characters.
pub fn phase_matches(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    a.chars()
        .take(PHASE_CODE_LEN)
        .eq(b.chars().take(PHASE_CODE_LEN))
}

/// Per-datum checks with summary counts.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Checks in input order.
    pub checks: Vec<DatumCheck>,
}

impl ValidationReport {
    /// Number of usable data of one type.
    pub fn usable(&self, kind: DatumType) -> usize {
        self.checks
            .iter()
            .filter(|c| c.kind == kind && c.is_usable())
            .count()
    }

    /// Number of data that are fully defining.
    pub fn defining(&self) -> usize {
        self.checks.iter().filter(|c| c.is_defining()).count()
    }

    /// Fail if no datum at all is usable.
    ///
    /// The error names the first rejected datum.
    pub fn ensure_usable(&self) -> Result<()> {
        if self.checks.iter().any(|c| c.is_usable()) {
            return Ok(());
        }
        let (index, reason) = match self.checks.iter().enumerate().next() {
            Some((i, c)) => (i, format!("{:?} (code {})", c.error, c.error.code())),
            None => (0, "no data".to_string()),
        };
        Err(LocError::Validation { index, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> PickDataValidator {
        PickDataValidator::new(&["APE", "MORC", "KBS"], &["P", "PKP", "Pn", "S"])
    }

    #[test]
    fn known_station_and_phase() {
        let c = validator().check(&Datum::new("MORC", "Pn", DatumType::Time, 1.0));
        assert_eq!(c.station, Some(1));
        assert_eq!(c.phase, Some(2));
        assert_eq!(c.error, DatumError::Ok);
        assert!(c.is_usable());
    }

    #[test]
    fn unknown_station() {
        let c = validator().check(&Datum::new("XYZ", "P", DatumType::Time, 1.0));
        assert_eq!(c.station, None);
        assert_eq!(c.error, DatumError::StationUnknown);
        assert_eq!(c.error.code(), 1);
        assert!(!c.is_usable());
    }

    #[test]
    fn station_lookup_is_exact() {
        let c = validator().check(&Datum::new("AP", "P", DatumType::Time, 1.0));
        assert_eq!(c.error, DatumError::StationUnknown);
    }

    #[test]
    fn unknown_phase_on_time_datum_is_usable() {
        let c = validator().check(&Datum::new("APE", "PcP", DatumType::Time, 1.0));
        assert_eq!(c.error, DatumError::PhaseUnknownButUsable);
        assert_eq!(c.kind, DatumType::Time);
        assert!(c.is_usable());
        assert!(!c.is_defining());
    }

    #[test]
    fn unknown_phase_on_azimuth_datum() {
        let v = validator();
        let c = v.check(&Datum::new("APE", "PcP", DatumType::Azimuth, 5.0));
        assert_eq!(c.error, DatumError::PhaseUnknown);
        let c = v.check(&Datum::new("APE", "Lg", DatumType::Slowness, 0.5));
        assert_eq!(c.error, DatumError::PhaseUnknown);
        assert!(!c.is_usable());
    }

    #[test]
    fn bad_uncertainty_overrides() {
        let v = validator();
        let c = v.check(&Datum::new("XYZ", "P", DatumType::Time, 0.0));
        assert_eq!(c.error, DatumError::BadUncertainty);
        let c = v.check(&Datum::new("APE", "P", DatumType::Time, -1.0));
        assert_eq!(c.error, DatumError::BadUncertainty);
        let c = v.check(&Datum::new("APE", "P", DatumType::Time, f64::NAN));
        assert_eq!(c.error.code(), 4);
    }

    #[test]
    fn padded_phase_codes_match() {
        let v = validator();
        assert_eq!(v.find_phase("P   "), Some(0));
        assert_eq!(v.find_phase(" PKP"), Some(1));
        assert_eq!(v.find_phase("PK"), None);
        assert!(phase_matches("PKiKPxxxyyy", "PKiKPxxx"));
    }

    #[test]
    fn unknown_type() {
        let c = validator().check(&Datum::new("KBS", "P", DatumType::parse("x"), 1.0));
        assert_eq!(c.error, DatumError::DataTypeUnknown);
        assert_eq!(DatumType::parse("azim"), DatumType::Azimuth);
        assert_eq!(DatumType::parse("T"), DatumType::Time);
    }

    #[test]
    fn report_counts() {
        let v = validator();
        let data = vec![
            Datum::new("APE", "P", DatumType::Time, 1.0),
            Datum::new("KBS", "PcP", DatumType::Time, 1.0),
            Datum::new("KBS", "P", DatumType::Azimuth, 10.0),
            Datum::new("XXX", "P", DatumType::Slowness, 1.0),
        ];
        let report = v.report(&data);
        assert_eq!(report.usable(DatumType::Time), 2);
        assert_eq!(report.usable(DatumType::Azimuth), 1);
        assert_eq!(report.usable(DatumType::Slowness), 0);
        assert_eq!(report.defining(), 2);
        assert!(report.ensure_usable().is_ok());
    }

    #[test]
    fn report_without_usable_data() {
        let v = validator();
        let data = vec![Datum::new("XXX", "P", DatumType::Time, 1.0)];
        let err = v.report(&data).ensure_usable().unwrap_err();
        assert!(matches!(err, LocError::Validation { index: 0, .. }));
    }
}
