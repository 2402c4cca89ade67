// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Travel-time tables and hypocenter relocation for seismic event location.
//!
//! The library reads tabulated travel times per phase and earth model,
//! interpolates them across holes, intersects back-azimuth rays on the
//! sphere, checks observations against the known stations and phases, and
//! relocates origins through pluggable locators with an automatic retry from
//! the earliest station.

#![warn(missing_docs)]

/// Locator configuration loaded from TOML.
pub mod config;
/// Great-circle intersection of two azimuthal rays.
pub mod crossing;
/// Error types for the library.
pub mod error;
/// Epicenter estimates from sparse station observations.
pub mod first_cut;
/// Spherical distance, azimuth and projection.
pub mod geo;
/// Built-in grid-search locator.
pub mod gridsearch;
/// Hole-aware monotone interpolation kernels.
pub mod interp;
/// Event bundles, origin output and grid export.
pub mod io;
/// Locator trait, capabilities and registry.
pub mod locator;
/// Origins, arrivals, picks and stations.
pub mod model;
/// Solution statistics.
pub mod quality;
/// Relocation with fallback to the earliest station.
pub mod relocate;
/// Per-station travel-time corrections.
pub mod stacor;
/// Two-dimensional travel-time tables.
pub mod table;
/// Multi-phase travel-time lookup.
pub mod ttt;
/// Observation checks against known stations and phases.
pub mod validate;

pub use crate::config::LocatorConfig;
pub use crate::crossing::{intersect, Crossing};
pub use crate::error::{ErrorKind, GeometryError, LocError, Result};
pub use crate::gridsearch::GridSearchLocator;
pub use crate::locator::{Capabilities, Capability, Locator, LocatorRegistry};
pub use crate::model::{Arrival, MemoryCatalog, Origin, Pick, PickCatalog, SensorLocation};
pub use crate::relocate::{PickInclusion, RelocateOrchestrator};
pub use crate::table::GeoTable;
pub use crate::ttt::{TravelTime, TravelTimeTable};
pub use crate::validate::PickDataValidator;
