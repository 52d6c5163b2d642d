//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - curve coefficients (`CurveParameters`) and the per-session `ParameterSet`
//! - observed growth records (`ObservationRecord`)
//! - derived outputs (`GrowthCurve`) and the saved-curve schema (`CurveFile`)

pub mod types;

pub use types::*;
