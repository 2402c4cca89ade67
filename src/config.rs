// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Locator configuration from TOML files.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [tables]
//! directory = "share/locsat/tables"
//! profiles = ["iasp91", "tab"]
//! default_profile = "iasp91"
//!
//! [relocate]
//! fallback_depth_km = 11.0
//!
//! [search]
//! max_iterations = 40
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LocError, Result};
use crate::ttt::DEFAULT_PHASES;

/// Complete locator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Travel-time table settings.
    #[serde(default)]
    pub tables: TableSettings,
    /// Fallback relocation settings.
    #[serde(default)]
    pub relocate: RelocateSettings,
    /// Grid-search solver settings.
    #[serde(default)]
    pub search: SearchSettings,
}

/// Where tables live and which to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Directory holding `<model>.<phase>` files.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Model names that may be selected.
    #[serde(default = "default_profiles")]
    pub profiles: Vec<String>,
    /// Model used unless another is selected.
    #[serde(default = "default_profile")]
    pub default_profile: String,
    /// Phases to load.
    #[serde(default = "default_phases")]
    pub phases: Vec<String>,
    /// Report entries outside the tabulated range.
    #[serde(default)]
    pub extrapolate: bool,
    /// Apply the receiver elevation correction.
    #[serde(default)]
    pub elevation_correction: bool,
}

/// Initial-location fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelocateSettings {
    /// Depth given to the synthetic initial origin, km.
    #[serde(default = "default_fallback_depth")]
    pub fallback_depth_km: f64,
    /// Minimum arrival weight for a pick to anchor the fallback.
    #[serde(default = "default_min_weight")]
    pub min_pick_weight: f64,
}

/// Grid-search solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Maximum number of grid refinements.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Half-width of the first grid, degrees.
    #[serde(default = "default_initial_step")]
    pub initial_step_deg: f64,
    /// Grid spacing below which the search has converged, degrees.
    #[serde(default = "default_tolerance")]
    pub tolerance_deg: f64,
    /// Depth step of the first grid, km.
    #[serde(default = "default_depth_step")]
    pub initial_depth_step_km: f64,
    /// Deepest allowed hypocenter, km.
    #[serde(default = "default_max_depth")]
    pub max_depth_km: f64,
    /// Keep the depth fixed at this value.
    #[serde(default)]
    pub fixed_depth_km: Option<f64>,
    /// Start from a first-cut estimate instead of the input origin.
    #[serde(default)]
    pub ignore_initial_location: bool,
    /// Arrivals at or below this weight are non-defining.
    #[serde(default = "default_min_arrival_weight")]
    pub min_arrival_weight: f64,
    /// Standard deviation assigned to arrival times without one, seconds.
    #[serde(default = "default_time_error")]
    pub default_time_error: f64,
    /// Standard deviation assigned to back-azimuths without one, degrees.
    #[serde(default = "default_azimuth_error")]
    pub default_azimuth_error: f64,
    /// Standard deviation assigned to slownesses without one, s/deg.
    #[serde(default = "default_slowness_error")]
    pub default_slowness_error: f64,
    /// Skip arrivals farther than this, degrees.
    #[serde(default)]
    pub distance_cutoff_deg: Option<f64>,
    /// Locate a second time with every arrival-time error set from the
    /// residuals of the first solution.
    #[serde(default)]
    pub use_arrival_rms_as_time_error: bool,
}

fn default_directory() -> PathBuf {
    PathBuf::from("share/locsat/tables")
}

fn default_profiles() -> Vec<String> {
    vec!["iasp91".to_string(), "tab".to_string()]
}

fn default_profile() -> String {
    "iasp91".to_string()
}

fn default_phases() -> Vec<String> {
    DEFAULT_PHASES.iter().map(|p| p.to_string()).collect()
}

fn default_fallback_depth() -> f64 {
    11.0
}

fn default_min_weight() -> f64 {
    0.5
}

fn default_max_iterations() -> usize {
    40
}

fn default_initial_step() -> f64 {
    2.0
}

fn default_tolerance() -> f64 {
    1e-3
}

fn default_depth_step() -> f64 {
    20.0
}

fn default_max_depth() -> f64 {
    700.0
}

fn default_min_arrival_weight() -> f64 {
    0.5
}

fn default_time_error() -> f64 {
    1.0
}

fn default_azimuth_error() -> f64 {
    10.0
}

fn default_slowness_error() -> f64 {
    1.0
}

impl Default for TableSettings {
    fn default() -> Self {
        TableSettings {
            directory: default_directory(),
            profiles: default_profiles(),
            default_profile: default_profile(),
            phases: default_phases(),
            extrapolate: false,
            elevation_correction: false,
        }
    }
}

impl Default for RelocateSettings {
    fn default() -> Self {
        RelocateSettings {
            fallback_depth_km: default_fallback_depth(),
            min_pick_weight: default_min_weight(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            max_iterations: default_max_iterations(),
            initial_step_deg: default_initial_step(),
            tolerance_deg: default_tolerance(),
            initial_depth_step_km: default_depth_step(),
            max_depth_km: default_max_depth(),
            fixed_depth_km: None,
            ignore_initial_location: false,
            min_arrival_weight: default_min_arrival_weight(),
            default_time_error: default_time_error(),
            default_azimuth_error: default_azimuth_error(),
            default_slowness_error: default_slowness_error(),
            distance_cutoff_deg: None,
            use_arrival_rms_as_time_error: false,
        }
    }
}

impl LocatorConfig {
    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| LocError::Config(format!("failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: LocatorConfig = toml::from_str(content)
            .map_err(|e| LocError::Config(format!("failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        let t = &self.tables;
        if !t.profiles.iter().any(|p| p == &t.default_profile) {
            return Err(LocError::Config(format!(
                "default profile '{}' is not one of {:?}",
                t.default_profile, t.profiles
            )));
        }
        if t.phases.is_empty() {
            return Err(LocError::Config("no phases configured".to_string()));
        }

        let r = &self.relocate;
        if !r.fallback_depth_km.is_finite() || r.fallback_depth_km < 0.0 {
            return Err(LocError::Config(format!(
                "fallback depth must be non-negative, got {}",
                r.fallback_depth_km
            )));
        }

        let s = &self.search;
        positive("search.initial_step_deg", s.initial_step_deg)?;
        positive("search.tolerance_deg", s.tolerance_deg)?;
        positive("search.initial_depth_step_km", s.initial_depth_step_km)?;
        positive("search.max_depth_km", s.max_depth_km)?;
        positive("search.default_time_error", s.default_time_error)?;
        positive("search.default_azimuth_error", s.default_azimuth_error)?;
        positive("search.default_slowness_error", s.default_slowness_error)?;
        if s.max_iterations == 0 {
            return Err(LocError::Config(
                "search.max_iterations must be at least 1".to_string(),
            ));
        }
        if let Some(z) = s.fixed_depth_km {
            if !z.is_finite() || z < 0.0 || z > s.max_depth_km {
                return Err(LocError::Config(format!(
                    "fixed depth {} outside [0, {}]",
                    z, s.max_depth_km
                )));
            }
        }
        Ok(())
    }

    /// Table directory and model for `profile`, or the default profile.
    pub fn profile(&self, profile: Option<&str>) -> Result<(PathBuf, String)> {
        let name = profile.unwrap_or(&self.tables.default_profile);
        if !self.tables.profiles.iter().any(|p| p == name) {
            return Err(LocError::Config(format!("unknown profile '{}'", name)));
        }
        Ok((self.tables.directory.clone(), name.to_string()))
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(LocError::Config(format!(
            "{} must be positive and finite, got {}",
            name, value
        )));
    }
    Ok(())
}
