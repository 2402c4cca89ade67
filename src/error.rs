// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Broad failure classes used by callers that only care about the category
/// of a failure (retry, report, abort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Table files, configuration, or other setup input is missing or malformed.
    Configuration,
    /// A query could not be answered from otherwise valid tables.
    Data,
    /// An observation failed validation.
    Validation,
    /// Two azimuthal rays have no usable crossing.
    Geometry,
    /// The relocation could not produce a solution.
    Location,
}

/// Reasons why two great-circle rays do not yield a crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Both reference points coincide.
    #[error("reference points coincide")]
    Coincident,
    /// One of the rays runs along the baseline between the reference points.
    #[error("ray lies along the baseline")]
    Degenerate,
    /// The rays point to opposite sides of the baseline.
    #[error("rays diverge")]
    Diverging,
    /// The summed interior angles exceed 180 degrees.
    #[error("no reasonable crossing")]
    NoReasonableCrossing,
    /// The solved triangle has a negative side.
    #[error("crossing lies behind a reference point")]
    NegativeDistance,
}

/// Errors that can occur while loading tables, interpolating, validating
/// observations, or relocating an origin.
#[derive(Debug, Error)]
pub enum LocError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A table file could not be parsed.
    #[error("malformed table {path}: {reason}")]
    TableFormat {
        /// Path or name of the table.
        path: String,
        /// What went wrong.
        reason: String,
    },
    /// The number of samples in a table does not match its node counts.
    #[error("table dimension mismatch in {path}: expected {expected} samples, got {got}")]
    DimensionMismatch {
        /// Path or name of the table.
        path: String,
        /// Samples implied by the node counts.
        expected: usize,
        /// Samples actually found.
        got: usize,
    },
    /// No phase table could be loaded for the requested model.
    #[error("no travel-time tables found for model '{0}'")]
    ModelNotFound(String),
    /// Configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Unsupported file format (unrecognized extension).
    #[error("unsupported file format: {0}")]
    UnsupportedFileFormat(String),
    /// JSON or TOML (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Locator name is not present in the registry.
    #[error("unknown locator '{0}'")]
    UnknownLocator(String),
    /// Every phase is in a hole or outside the tables.
    #[error("no phase available")]
    NoPhaseAvailable,
    /// The phase has no table in the current model.
    #[error("phase '{0}' not available in the current model")]
    UnknownPhase(String),
    /// The query point falls inside a hole of the phase table.
    #[error("phase '{phase}' undefined at distance {distance} deg, depth {depth} km")]
    InHole {
        /// Phase code.
        phase: String,
        /// Query distance in degrees.
        distance: f64,
        /// Query depth in km.
        depth: f64,
    },
    /// An observation was rejected.
    #[error("invalid datum {index}: {reason}")]
    Validation {
        /// Position of the datum in the input.
        index: usize,
        /// Explanation of the rejection.
        reason: String,
    },
    /// Great-circle intersection failed.
    #[error("great-circle crossing failed: {0}")]
    Geometry(#[from] GeometryError),
    /// No arrival qualified for the fallback relocation.
    #[error("No picks given to relocate")]
    NoPicks,
    /// An arrival references a pick the catalog does not know.
    #[error("pick '{0}' not found")]
    PickNotFound(String),
    /// A pick references a station without a sensor location.
    #[error("station '{0}' not found")]
    StationNotFound(String),
    /// The solver failed with a descriptive message.
    #[error("{0}")]
    Location(String),
}

impl LocError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocError::Io(_)
            | LocError::TableFormat { .. }
            | LocError::DimensionMismatch { .. }
            | LocError::ModelNotFound(_)
            | LocError::Config(_)
            | LocError::UnsupportedFileFormat(_)
            | LocError::Serialization(_)
            | LocError::UnknownLocator(_) => ErrorKind::Configuration,
            LocError::NoPhaseAvailable | LocError::UnknownPhase(_) | LocError::InHole { .. } => {
                ErrorKind::Data
            }
            LocError::Validation { .. } => ErrorKind::Validation,
            LocError::Geometry(_) => ErrorKind::Geometry,
            LocError::NoPicks
            | LocError::PickNotFound(_)
            | LocError::StationNotFound(_)
            | LocError::Location(_) => ErrorKind::Location,
        }
    }
}

impl From<serde_json::Error> for LocError {
    fn from(e: serde_json::Error) -> Self {
        LocError::Serialization(e.to_string())
    }
}

/// Convenience type alias for Results with LocError.
pub type Result<T> = std::result::Result<T, LocError>;
